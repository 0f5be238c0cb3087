//! Core domain types and simulation engines.

pub mod cadence;
pub mod candle;
pub mod config_validation;
pub mod dca;
pub mod error;
pub mod exit_policy;
pub mod metrics;
pub mod split_buy;
pub mod strategy;
