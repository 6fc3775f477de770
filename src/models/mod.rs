pub mod gas;
pub mod network;
pub mod response;
pub mod stats;

pub use gas::*;
pub use network::*;
pub use response::*;
pub use stats::*;
