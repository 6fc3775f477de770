pub mod dispatcher;
pub mod export;
pub mod fee_source;
pub mod history;
pub mod predictor;
pub mod stats;

pub use dispatcher::{
    evaluate_and_dispatch, AlertMessage, AlertRule, ConsoleChannel, DesktopChannel,
    DispatchResult, NotifyChannel, WebhookChannel,
};
pub use export::{export_records, ExportFormat};
pub use fee_source::{FeeSource, PriceOracle, RpcClient};
pub use history::{HistoryStore, QueryWindow};
