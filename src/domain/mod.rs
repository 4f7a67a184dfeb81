//! Core domain types and logic.

pub mod adapter;
pub mod algorithm;
pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod position;
pub mod signal;
pub mod window;
