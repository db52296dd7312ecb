//! Bar and BarSeries: the fundamental market data units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for one time step of one timeframe.
///
/// Timestamps are UTC and mark the bar's open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: the high/low envelope contains open and close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// Close above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Close below open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Copy of this bar carrying a different timestamp (used by frame alignment).
    pub fn restamped(&self, time: DateTime<Utc>) -> Self {
        Self { time, ..*self }
    }
}

/// Errors raised while building a [`BarSeries`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar {index} at {time} does not come strictly after the previous bar")]
    NonIncreasingTime { index: usize, time: DateTime<Utc> },
    #[error("bar {index} at {time} has an invalid OHLC envelope")]
    InsaneBar { index: usize, time: DateTime<Utc> },
}

/// Ordered, immutable sequence of bars with strictly increasing timestamps.
///
/// Every downstream component reads bars through this type (or a slice of it),
/// so the ordering invariant is checked once, here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Validate ordering and OHLC sanity, then wrap the bars.
    pub fn new(bars: Vec<Bar>) -> Result<Self, BarError> {
        for (index, bar) in bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(BarError::InsaneBar {
                    index,
                    time: bar.time,
                });
            }
            if index > 0 && bar.time <= bars[index - 1].time {
                return Err(BarError::NonIncreasingTime {
                    index,
                    time: bar.time,
                });
            }
        }
        Ok(Self { bars })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn as_slice(&self) -> &[Bar] {
        &self.bars
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    /// The first `len` bars as a new series (clamped to the series length).
    pub fn prefix(&self, len: usize) -> Self {
        let end = len.min(self.bars.len());
        Self {
            bars: self.bars[..end].to_vec(),
        }
    }

    /// Bars strictly after `index`.
    pub fn tail_after(&self, index: usize) -> &[Bar] {
        if index + 1 >= self.bars.len() {
            &[]
        } else {
            &self.bars[index + 1..]
        }
    }

    /// Index of the bar stamped exactly `time`, if any.
    pub fn position_of(&self, time: DateTime<Utc>) -> Option<usize> {
        self.bars.binary_search_by(|b| b.time.cmp(&time)).ok()
    }

    pub fn into_inner(self) -> Vec<Bar> {
        self.bars
    }
}

impl<'de> Deserialize<'de> for BarSeries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bars = Vec::<Bar>::deserialize(deserializer)?;
        BarSeries::new(bars).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

impl AsRef<[Bar]> for BarSeries {
    fn as_ref(&self) -> &[Bar] {
        &self.bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar_at(hour: u32, open: f64, close: f64) -> Bar {
        Bar {
            time: Utc.with_ymd_and_hms(2024, 1, 2, hour, 0, 0).unwrap(),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 0.0,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(bar_at(0, 100.0, 103.0).is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = bar_at(0, 100.0, 103.0);
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = bar_at(0, 100.0, 103.0);
        bar.high = 97.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn body_direction() {
        assert!(bar_at(0, 1.0, 2.0).is_bullish());
        assert!(bar_at(0, 2.0, 1.0).is_bearish());
        let doji = bar_at(0, 1.0, 1.0);
        assert!(!doji.is_bullish() && !doji.is_bearish());
    }

    #[test]
    fn series_rejects_duplicate_timestamps() {
        let err = BarSeries::new(vec![bar_at(1, 1.0, 2.0), bar_at(1, 2.0, 3.0)]).unwrap_err();
        assert!(matches!(err, BarError::NonIncreasingTime { index: 1, .. }));
    }

    #[test]
    fn series_rejects_out_of_order() {
        let err = BarSeries::new(vec![bar_at(2, 1.0, 2.0), bar_at(1, 2.0, 3.0)]).unwrap_err();
        assert!(matches!(err, BarError::NonIncreasingTime { .. }));
    }

    #[test]
    fn series_rejects_insane_bar() {
        let mut bad = bar_at(1, 1.0, 2.0);
        bad.low = 5.0;
        let err = BarSeries::new(vec![bad]).unwrap_err();
        assert!(matches!(err, BarError::InsaneBar { index: 0, .. }));
    }

    #[test]
    fn prefix_and_tail() {
        let series =
            BarSeries::new(vec![bar_at(0, 1.0, 2.0), bar_at(1, 2.0, 3.0), bar_at(2, 3.0, 4.0)])
                .unwrap();
        assert_eq!(series.prefix(2).len(), 2);
        assert_eq!(series.prefix(10).len(), 3);
        assert_eq!(series.tail_after(0).len(), 2);
        assert!(series.tail_after(2).is_empty());
        assert_eq!(series.position_of(series.as_slice()[1].time), Some(1));
    }

    #[test]
    fn series_deserialization_validates() {
        let bars = vec![bar_at(2, 1.0, 2.0), bar_at(1, 2.0, 3.0)];
        let json = serde_json::to_string(&bars).unwrap();
        assert!(serde_json::from_str::<BarSeries>(&json).is_err());
    }
}
