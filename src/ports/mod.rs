//! Port traits between the engine and its collaborators.

pub mod candle_port;
pub mod config_port;
pub mod report_port;
pub mod run_store_port;
