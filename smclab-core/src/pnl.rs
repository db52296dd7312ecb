//! Weekly PnL buckets and summary statistics.
//!
//! Buckets are keyed by the Monday that starts the ISO week of each exit fill,
//! so a trade whose partial and final exits straddle a weekend contributes to
//! two weeks.
//!
//! Trades opened by a pattern signal are also tallied per pattern kind.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{TradeRecord, ZoneKind};

/// Monday of the ISO week containing `time`.
pub fn week_start(time: DateTime<Utc>) -> NaiveDate {
    let date = time.date_naive();
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBucket {
    pub week_start: NaiveDate,
    pub pnl: f64,
    /// Exit fills accumulated into this week.
    pub events: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlSummary {
    /// Resolved trades only.
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub unresolved: usize,
    /// `wins / trades` as a fraction; 0 with no trades.
    pub win_rate: f64,
    pub total_pnl: f64,
    /// Mean over weeks with at least one event; 0 with none.
    pub avg_weekly_pnl: f64,
    pub weeks: usize,
}

/// Outcomes of the trades opened by one pattern kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindStats {
    pub kind: ZoneKind,
    /// Resolved trades only.
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub unresolved: usize,
    pub win_rate: f64,
    /// Realized PnL, partial fills of unresolved trades included.
    pub pnl: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    wins: usize,
    losses: usize,
    unresolved: usize,
    pnl: f64,
}

impl Tally {
    fn add(&mut self, trade: &TradeRecord) {
        if trade.outcome.is_win() {
            self.wins += 1;
        } else if trade.outcome.is_loss() {
            self.losses += 1;
        } else {
            self.unresolved += 1;
        }
        self.pnl += trade.pnl_currency;
    }

    fn resolved(&self) -> usize {
        self.wins + self.losses
    }

    fn win_rate(&self) -> f64 {
        match self.resolved() {
            0 => 0.0,
            n => self.wins as f64 / n as f64,
        }
    }
}

/// Append-only accumulator over a run's trades.
#[derive(Debug, Clone, Default)]
pub struct PnlAggregator {
    buckets: BTreeMap<NaiveDate, WeeklyBucket>,
    overall: Tally,
    kinds: BTreeMap<ZoneKind, Tally>,
}

impl PnlAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trade: &TradeRecord) {
        for fill in &trade.exits {
            let week = week_start(fill.time);
            let bucket = self.buckets.entry(week).or_insert_with(|| WeeklyBucket {
                week_start: week,
                pnl: 0.0,
                events: 0,
            });
            bucket.pnl += fill.pnl_currency;
            bucket.events += 1;
        }
        self.overall.add(trade);
        if let Some(kind) = trade.trigger {
            self.kinds.entry(kind).or_default().add(trade);
        }
    }

    /// Buckets in chronological order.
    pub fn weekly(&self) -> Vec<WeeklyBucket> {
        self.buckets.values().cloned().collect()
    }

    /// Per-kind outcomes in `ZoneKind` order, for kinds that opened a trade.
    pub fn by_kind(&self) -> Vec<KindStats> {
        self.kinds
            .iter()
            .map(|(&kind, tally)| KindStats {
                kind,
                trades: tally.resolved(),
                wins: tally.wins,
                losses: tally.losses,
                unresolved: tally.unresolved,
                win_rate: tally.win_rate(),
                pnl: tally.pnl,
            })
            .collect()
    }

    pub fn summary(&self) -> PnlSummary {
        let active: Vec<&WeeklyBucket> = self.buckets.values().filter(|b| b.events > 0).collect();
        let total_pnl: f64 = self.buckets.values().map(|b| b.pnl).sum();
        let avg_weekly_pnl = if active.is_empty() {
            0.0
        } else {
            active.iter().map(|b| b.pnl).sum::<f64>() / active.len() as f64
        };
        PnlSummary {
            trades: self.overall.resolved(),
            wins: self.overall.wins,
            losses: self.overall.losses,
            unresolved: self.overall.unresolved,
            win_rate: self.overall.win_rate(),
            total_pnl,
            avg_weekly_pnl,
            weeks: active.len(),
        }
    }
}
