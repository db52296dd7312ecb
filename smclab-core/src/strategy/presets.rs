//! Named scorer configurations.
//!
//! | preset  | 15m / 30m                      | 1h / 4h        |
//! |---------|--------------------------------|----------------|
//! | `smc`   | -                              | all four checks |
//! | `ict`   | order block, gap, session range | session range |
//! | `swing` | liquidity sweep, session range | session range  |

use serde::{Deserialize, Serialize};

use crate::session::{Session, SessionTable};

use super::checks::Check;
use super::scorer::{ConfluenceScorer, ScorerConfig, TimeframeChecks};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Smc,
    Ict,
    Swing,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Smc, Preset::Ict, Preset::Swing];

    pub fn name(self) -> &'static str {
        match self {
            Self::Smc => "smc",
            Self::Ict => "ict",
            Self::Swing => "swing",
        }
    }

    pub fn config(self) -> ScorerConfig {
        use Check::*;
        let timeframes = match self {
            Self::Smc => vec![
                on("1h", &[OrderBlockRetest, GapRetest, LiquiditySweep, SessionRangeSweep]),
                on("4h", &[OrderBlockRetest, GapRetest, LiquiditySweep, SessionRangeSweep]),
            ],
            Self::Ict => vec![
                on("15m", &[OrderBlockRetest, GapRetest, SessionRangeSweep]),
                on("30m", &[OrderBlockRetest, GapRetest, SessionRangeSweep]),
                on("1h", &[SessionRangeSweep]),
                on("4h", &[SessionRangeSweep]),
            ],
            Self::Swing => vec![
                on("15m", &[LiquiditySweep, SessionRangeSweep]),
                on("30m", &[LiquiditySweep, SessionRangeSweep]),
                on("1h", &[SessionRangeSweep]),
                on("4h", &[SessionRangeSweep]),
            ],
        };
        ScorerConfig {
            name: self.name().to_string(),
            range_session: Session::Asia,
            timeframes,
        }
    }

    pub fn scorer(self, sessions: SessionTable) -> ConfluenceScorer {
        ConfluenceScorer::new(self.config(), sessions)
    }
}

fn on(timeframe: &str, checks: &[Check]) -> TimeframeChecks {
    TimeframeChecks {
        timeframe: timeframe.to_string(),
        checks: checks.to_vec(),
    }
}
