pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod render;
pub mod server;
pub mod services;
pub mod tracker;
