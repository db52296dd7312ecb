//! SMCLab Runner: backtest orchestration around `smclab-core`.
//!
//! This crate provides:
//! - TOML backtest configuration validated into core types
//! - CSV bar loading and multi-timeframe alignment
//! - Bar-by-bar backtests driven by the signal engine or raw pattern signals
//! - Markdown run reports

pub mod config;
pub mod data_loader;
pub mod report;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, SignalSource, StrategyEntry};
pub use data_loader::{load_frame, load_series, LoadError};
pub use report::markdown_report;
pub use runner::{
    latest_decision, run_backtest, run_from_files, BacktestResult, DecisionRecord, RunError,
    SCHEMA_VERSION,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
        assert_send::<DecisionRecord>();
        assert_sync::<DecisionRecord>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
    }

    #[test]
    fn error_types_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
