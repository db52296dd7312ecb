//! Backtest runner: walks the reference timeframe and simulates every entry.
//!
//! Two signal sources:
//! - `engine`: evaluate the weighted [`SignalEngine`] on the aligned frame at
//!   each bar; Buy opens a long, Sell a short.
//! - `patterns`: scan the reference bars seen so far and enter on signals that
//!   first appear at the current bar, filtered by kind and session.
//!
//! Entries fill at the signal bar's close and are simulated over the reference
//! bars that follow. Unless `allow_overlap` is set, one trade is open at a time
//! and a trade left unresolved at the end of the data blocks further entries.
//! An engine decision with zero confidence is recorded but never traded.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use smclab_core::data::MultiTimeframeFrame;
use smclab_core::domain::{Bias, Side, Signal, TradeRecord, ZoneKind};
use smclab_core::patterns::scan_signals;
use smclab_core::pnl::{KindStats, PnlAggregator, PnlSummary, WeeklyBucket};
use smclab_core::signal_engine::{SignalEngine, StrategyVote};
use smclab_core::simulator::{Entry, TradeSimulator};
use smclab_core::strategy::Direction;

use crate::config::{BacktestConfig, ConfigError, SignalSource};
use crate::data_loader::{load_frame, LoadError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("frame is aligned on '{found}' but the config expects '{expected}'")]
    ReferenceMismatch { expected: String, found: String },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// The engine decision at one reference bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub time: DateTime<Utc>,
    pub bar_index: usize,
    pub direction: Direction,
    pub confidence: f64,
    pub total: f64,
    pub votes: Vec<StrategyVote>,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    /// BLAKE3 over every aligned bar of every timeframe.
    pub dataset_hash: String,
    pub symbol: String,
    pub reference: String,
    pub signal_source: SignalSource,
    pub bar_count: usize,
    pub warmup_bars: usize,
    /// Engine mode only: every non-neutral decision after warmup.
    pub decisions: Vec<DecisionRecord>,
    /// Pattern mode only: admitted signals at the bar they first appeared.
    pub signals: Vec<Signal>,
    pub trades: Vec<TradeRecord>,
    pub summary: PnlSummary,
    /// Pattern mode only: outcomes per triggering pattern kind.
    #[serde(default)]
    pub by_kind: Vec<KindStats>,
    pub weekly: Vec<WeeklyBucket>,
}

/// A planned entry before overlap filtering.
#[derive(Debug, Clone, Copy)]
struct PlannedEntry {
    bar_index: usize,
    side: Side,
    trigger: Option<ZoneKind>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load every configured timeframe from CSV, then run.
///
/// `paths` maps timeframe labels to files and must contain the reference.
pub fn run_from_files(
    config: &BacktestConfig,
    paths: &BTreeMap<String, PathBuf>,
) -> Result<BacktestResult, RunError> {
    let frame = load_frame(&config.backtest.reference, paths)?;
    run_backtest(config, &frame)
}

/// Run a backtest on an already aligned frame. No I/O.
pub fn run_backtest(
    config: &BacktestConfig,
    frame: &MultiTimeframeFrame,
) -> Result<BacktestResult, RunError> {
    check_reference(config, frame)?;
    let simulator = TradeSimulator::new(config.risk_params()?)
        .map_err(|e| RunError::Config(ConfigError::Risk(e)))?;
    let run_id = config.run_id()?;

    let mut decisions = Vec::new();
    let mut signals = Vec::new();
    let entries = match config.backtest.signal_source {
        SignalSource::Engine => {
            let engine = config.build_engine()?;
            warn_missing_timeframes(config, frame);
            engine_entries(&engine, frame, config.backtest.warmup_bars, &mut decisions)
        }
        SignalSource::Patterns => pattern_entries(config, frame, &mut signals)?,
    };

    let reference = frame.reference_series();
    let mut trades = Vec::new();
    let mut pnl = PnlAggregator::new();
    let mut next_free = 0usize;
    for planned in entries {
        let bar_index = planned.bar_index;
        if !config.backtest.allow_overlap && bar_index < next_free {
            continue;
        }
        let Some(bar) = reference.get(bar_index) else {
            continue;
        };
        let entry = Entry {
            side: planned.side,
            time: bar.time,
            price: bar.close,
        };
        let trade = TradeRecord {
            trigger: planned.trigger,
            ..simulator.simulate(entry, reference.tail_after(bar_index))
        };
        next_free = bar_index + trade.bars_held + 1;
        pnl.record(&trade);
        trades.push(trade);
    }

    let summary = pnl.summary();
    tracing::info!(
        symbol = %config.backtest.symbol,
        bars = frame.len(),
        trades = summary.trades,
        unresolved = summary.unresolved,
        win_rate = summary.win_rate,
        total_pnl = summary.total_pnl,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash: compute_dataset_hash(frame),
        symbol: config.backtest.symbol.clone(),
        reference: config.backtest.reference.clone(),
        signal_source: config.backtest.signal_source,
        bar_count: frame.len(),
        warmup_bars: config.backtest.warmup_bars,
        decisions,
        signals,
        trades,
        summary,
        by_kind: pnl.by_kind(),
        weekly: pnl.weekly(),
    })
}

/// The engine's decision at the last bar of the frame, neutral or not.
pub fn latest_decision(
    config: &BacktestConfig,
    frame: &MultiTimeframeFrame,
) -> Result<Option<DecisionRecord>, RunError> {
    check_reference(config, frame)?;
    let engine = config.build_engine()?;
    warn_missing_timeframes(config, frame);
    let Some(bar_index) = frame.len().checked_sub(1) else {
        return Ok(None);
    };
    Ok(Some(decide(&engine, frame, bar_index)))
}

fn check_reference(config: &BacktestConfig, frame: &MultiTimeframeFrame) -> Result<(), RunError> {
    if frame.reference() != config.backtest.reference {
        return Err(RunError::ReferenceMismatch {
            expected: config.backtest.reference.clone(),
            found: frame.reference().to_string(),
        });
    }
    Ok(())
}

/// Timeframes a strategy reads but the frame lacks score as not applicable.
fn warn_missing_timeframes(config: &BacktestConfig, frame: &MultiTimeframeFrame) {
    for label in config.timeframes() {
        if frame.column(&label).is_none() {
            tracing::warn!(timeframe = %label, "no data for timeframe; its checks will not apply");
        }
    }
}

fn decide(engine: &SignalEngine, frame: &MultiTimeframeFrame, bar_index: usize) -> DecisionRecord {
    let decision = engine.decide(frame, bar_index);
    DecisionRecord {
        time: frame.times()[bar_index],
        bar_index,
        direction: decision.direction,
        confidence: decision.confidence,
        total: decision.total,
        votes: decision.votes,
    }
}

fn engine_entries(
    engine: &SignalEngine,
    frame: &MultiTimeframeFrame,
    warmup: usize,
    decisions: &mut Vec<DecisionRecord>,
) -> Vec<PlannedEntry> {
    let mut entries = Vec::new();
    for bar_index in warmup..frame.len() {
        let record = decide(engine, frame, bar_index);
        let side = match record.direction {
            Direction::Buy => Side::Long,
            Direction::Sell => Side::Short,
            Direction::Neutral => continue,
        };
        tracing::debug!(bar_index, ?side, confidence = record.confidence, "engine decision");
        // A zero threshold turns an all-neutral bar into a Buy with no confidence.
        if record.confidence > 0.0 {
            entries.push(PlannedEntry {
                bar_index,
                side,
                trigger: None,
            });
        }
        decisions.push(record);
    }
    entries
}

fn pattern_entries(
    config: &BacktestConfig,
    frame: &MultiTimeframeFrame,
    signals: &mut Vec<Signal>,
) -> Result<Vec<PlannedEntry>, RunError> {
    let sessions = config.session_table()?;
    let filter = &config.patterns;
    let bars = frame.reference_series().as_slice();
    let mut seen: HashSet<(usize, ZoneKind, Bias)> = HashSet::new();
    let mut entries = Vec::new();

    // Rescanning each prefix keeps signals from peeking at bars after the entry.
    for bar_index in 0..bars.len() {
        let fresh: Vec<Signal> = scan_signals(&bars[..=bar_index], &sessions, &filter.kinds)
            .into_iter()
            .filter(|s| seen.insert((s.bar_index, s.kind, s.bias)))
            .collect();
        if bar_index < config.backtest.warmup_bars {
            continue;
        }
        let admitted: Vec<Signal> = fresh.into_iter().filter(|s| filter.admits(s.session)).collect();
        let Some(first) = admitted.first() else {
            continue;
        };
        if admitted.iter().any(|s| s.bias != first.bias) {
            tracing::debug!(bar_index, "conflicting pattern biases; no entry");
        } else {
            let bias = if filter.fade { first.bias.opposite() } else { first.bias };
            let side = match bias {
                Bias::Bullish => Side::Long,
                Bias::Bearish => Side::Short,
            };
            entries.push(PlannedEntry {
                bar_index,
                side,
                trigger: Some(first.kind),
            });
        }
        signals.extend(admitted);
    }
    Ok(entries)
}

/// Compute a deterministic BLAKE3 hash over all aligned bar data.
///
/// Labels are visited in sorted order, so the hash does not depend on input order.
fn compute_dataset_hash(frame: &MultiTimeframeFrame) -> String {
    let mut hasher = blake3::Hasher::new();
    for label in frame.labels() {
        hasher.update(label.as_bytes());
        if let Some(series) = frame.column(label) {
            for bar in series.iter() {
                hasher.update(&bar.time.timestamp().to_le_bytes());
                hasher.update(&bar.open.to_le_bytes());
                hasher.update(&bar.high.to_le_bytes());
                hasher.update(&bar.low.to_le_bytes());
                hasher.update(&bar.close.to_le_bytes());
                hasher.update(&bar.volume.to_le_bytes());
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}
