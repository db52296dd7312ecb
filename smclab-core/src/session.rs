//! Trading sessions: fixed UTC windows used to tag bars and locate session ranges.
//!
//! Windows are half-open `[start, end)` in UTC time of day. A window whose
//! start is later than its end wraps midnight. Windows may overlap; when they
//! do, the window declared first in the table wins.

use std::fmt;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

/// Named trading session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Session {
    Asia,
    London,
    NewYork,
    /// Outside every configured window.
    Off,
}

impl Session {
    pub fn name(self) -> &'static str {
        match self {
            Self::Asia => "asia",
            Self::London => "london",
            Self::NewYork => "new_york",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while building a [`SessionTable`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("`off` is the fallback session and cannot have a window")]
    OffWindow,
    #[error("session {0} has an empty window (start == end)")]
    EmptyWindow(Session),
}

/// One UTC window of the session table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub session: Session,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    pub fn contains(&self, time_of_day: NaiveTime) -> bool {
        if self.start < self.end {
            time_of_day >= self.start && time_of_day < self.end
        } else {
            time_of_day >= self.start || time_of_day < self.end
        }
    }

    /// Length of one occurrence of the window.
    pub fn duration(&self) -> Duration {
        if self.start < self.end {
            self.end - self.start
        } else {
            Duration::hours(24) - (self.start - self.end)
        }
    }
}

/// High/low of one completed session occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionRange {
    pub session: Session,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub high: f64,
    pub low: f64,
    pub high_index: usize,
    pub low_index: usize,
}

/// Ordered session table. Declaration order is the overlap tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SessionWindow>", into = "Vec<SessionWindow>")]
pub struct SessionTable {
    windows: Vec<SessionWindow>,
}

impl SessionTable {
    pub fn new(windows: Vec<SessionWindow>) -> Result<Self, SessionError> {
        for w in &windows {
            if w.session == Session::Off {
                return Err(SessionError::OffWindow);
            }
            if w.start == w.end {
                return Err(SessionError::EmptyWindow(w.session));
            }
        }
        Ok(Self { windows })
    }

    /// Asia 00:00–08:00, London 08:00–16:00, New York 14:00–22:00 (UTC).
    ///
    /// London and New York overlap 14:00–16:00; London is declared first and wins.
    pub fn standard() -> Self {
        let hm = |h: u32| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or_default();
        Self {
            windows: vec![
                SessionWindow {
                    session: Session::Asia,
                    start: hm(0),
                    end: hm(8),
                },
                SessionWindow {
                    session: Session::London,
                    start: hm(8),
                    end: hm(16),
                },
                SessionWindow {
                    session: Session::NewYork,
                    start: hm(14),
                    end: hm(22),
                },
            ],
        }
    }

    pub fn windows(&self) -> &[SessionWindow] {
        &self.windows
    }

    pub fn window(&self, session: Session) -> Option<&SessionWindow> {
        self.windows.iter().find(|w| w.session == session)
    }

    /// First declared session whose window contains `time`, else `Off`.
    pub fn classify(&self, time: DateTime<Utc>) -> Session {
        let tod = time.time();
        self.windows
            .iter()
            .find(|w| w.contains(tod))
            .map(|w| w.session)
            .unwrap_or(Session::Off)
    }

    /// Range of the most recent occurrence of `session` that ended at or before
    /// the last bar's timestamp.
    ///
    /// Returns `None` when the session has no window, the slice is empty, or
    /// that occurrence contains no bars.
    pub fn completed_range(&self, bars: &[Bar], session: Session) -> Option<SessionRange> {
        let window = self.window(session)?;
        let now = bars.last()?.time;
        let duration = window.duration();

        let (start, end) = (0..=2).find_map(|back| {
            let day = now.date_naive() - Duration::days(back);
            let start = Utc.from_utc_datetime(&day.and_time(window.start));
            let end = start + duration;
            (end <= now).then_some((start, end))
        })?;

        let from = bars.partition_point(|b| b.time < start);
        let to = bars.partition_point(|b| b.time < end);
        if from >= to {
            return None;
        }

        let mut range = SessionRange {
            session,
            start,
            end,
            high: bars[from].high,
            low: bars[from].low,
            high_index: from,
            low_index: from,
        };
        for (index, bar) in bars.iter().enumerate().take(to).skip(from + 1) {
            if bar.high > range.high {
                range.high = bar.high;
                range.high_index = index;
            }
            if bar.low < range.low {
                range.low = bar.low;
                range.low_index = index;
            }
        }
        Some(range)
    }
}

impl TryFrom<Vec<SessionWindow>> for SessionTable {
    type Error = SessionError;

    fn try_from(windows: Vec<SessionWindow>) -> Result<Self, Self::Error> {
        Self::new(windows)
    }
}

impl From<SessionTable> for Vec<SessionWindow> {
    fn from(table: SessionTable) -> Self {
        table.windows
    }
}
