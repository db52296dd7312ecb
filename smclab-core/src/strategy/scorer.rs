//! Configurable confluence scorer.
//!
//! For each configured timeframe the scorer runs that timeframe's checks on
//! the native candles that have closed by the end of reference bar
//! `bar_index`. Attempted checks increment `total`; fired checks add +1
//! (bullish) or -1 (bearish) to `score`.

use serde::{Deserialize, Serialize};

use crate::data::MultiTimeframeFrame;
use crate::session::{Session, SessionTable};

use super::checks::{Check, CheckOutcome};
use super::{Strategy, StrategyResult};

fn default_range_session() -> Session {
    Session::Asia
}

/// Checks enabled on one timeframe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframeChecks {
    pub timeframe: String,
    pub checks: Vec<Check>,
}

/// Full scorer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub name: String,
    /// Session whose completed range feeds `session_range_sweep`.
    #[serde(default = "default_range_session")]
    pub range_session: Session,
    pub timeframes: Vec<TimeframeChecks>,
}

/// One check's outcome on one timeframe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckEntry {
    pub timeframe: String,
    pub check: Check,
    pub outcome: CheckOutcome,
}

/// Every check outcome behind one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreCard {
    pub entries: Vec<CheckEntry>,
}

impl ScoreCard {
    pub fn score(&self) -> i32 {
        self.entries.iter().map(|e| e.outcome.score()).sum()
    }

    pub fn total(&self) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.outcome.is_attempted())
            .count() as u32
    }

    pub fn result(&self) -> StrategyResult {
        StrategyResult::from_score(self.score(), self.total())
    }
}

#[derive(Debug, Clone)]
pub struct ConfluenceScorer {
    config: ScorerConfig,
    sessions: SessionTable,
}

impl ConfluenceScorer {
    pub fn new(config: ScorerConfig, sessions: SessionTable) -> Self {
        Self { config, sessions }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Run every configured check at `bar_index` and keep the outcomes.
    ///
    /// A timeframe missing from the frame, or a `bar_index` past its end,
    /// records all of its checks as not applicable.
    pub fn score_card(&self, frame: &MultiTimeframeFrame, bar_index: usize) -> ScoreCard {
        let mut entries = Vec::new();
        for tf in &self.config.timeframes {
            let bars = frame.closed_window(&tf.timeframe, bar_index);
            for &check in &tf.checks {
                let outcome = match bars {
                    Some(bars) => check.run(bars, &self.sessions, self.config.range_session),
                    None => CheckOutcome::NotApplicable,
                };
                entries.push(CheckEntry {
                    timeframe: tf.timeframe.clone(),
                    check,
                    outcome,
                });
            }
        }
        let card = ScoreCard { entries };
        tracing::trace!(
            strategy = %self.config.name,
            bar_index,
            score = card.score(),
            total = card.total(),
            "scored bar"
        );
        card
    }
}

impl Strategy for ConfluenceScorer {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn evaluate(&self, frame: &MultiTimeframeFrame, bar_index: usize) -> StrategyResult {
        self.score_card(frame, bar_index).result()
    }
}
