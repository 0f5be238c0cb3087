//! dcabench: dollar-cost averaging and split-buy accumulation backtester.
//!
//! Hexagonal architecture: simulation engines in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`], and the command line
//! front end in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
