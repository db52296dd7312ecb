//! SMCLab Core: pattern detection, confluence scoring, signal aggregation,
//! trade simulation and weekly PnL.
//!
//! This crate is purely computational:
//! - Domain types (bars, zones, signals, trade records)
//! - Multi-timeframe frame alignment
//! - Pattern detectors (gaps, order blocks, breakers, structure, liquidity)
//! - Session classification and completed session ranges
//! - Configurable confluence scorer behind the `Strategy` trait
//! - Weighted signal engine
//! - Bar-by-bar trade lifecycle simulator with trailing-stop ratchet
//! - Weekly PnL aggregation
//!
//! It never performs I/O; loading bars and configuration lives in `smclab-runner`.

pub mod data;
pub mod domain;
pub mod patterns;
pub mod pnl;
pub mod session;
pub mod signal_engine;
pub mod simulator;
pub mod strategy;
