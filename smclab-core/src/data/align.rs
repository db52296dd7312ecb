//! Multi-timeframe alignment.
//!
//! Given one series per timeframe label, align them onto the reference series'
//! timestamp grid. For each reference timestamp every timeframe contributes its
//! last bar stamped at or before that timestamp (as-of forward fill), restamped
//! with the reference time. Reference rows where some timeframe has no bar yet
//! are dropped, so every kept row has a value for every timeframe.
//!
//! The frame also keeps every timeframe's native series. Pattern checks read
//! those through [`MultiTimeframeFrame::closed_window`], which yields only the
//! candles that have closed by the end of a reference bar.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{Bar, BarError, BarSeries};

/// Errors from frame alignment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("no timeframes supplied")]
    Empty,
    #[error("reference timeframe '{0}' not among the supplied series")]
    MissingReference(String),
    #[error("aligned series for '{label}' is invalid: {source}")]
    Series {
        label: String,
        #[source]
        source: BarError,
    },
}

/// Several timeframes aligned to one reference grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiTimeframeFrame {
    reference: String,
    times: Vec<DateTime<Utc>>,
    columns: BTreeMap<String, BarSeries>,
    native: BTreeMap<String, BarSeries>,
    /// Shortest spacing between consecutive native bars, per label.
    #[serde(skip)]
    spans: BTreeMap<String, Duration>,
}

fn span_of(series: &BarSeries) -> Option<Duration> {
    series
        .as_slice()
        .windows(2)
        .map(|w| w[1].time - w[0].time)
        .min()
}

fn spans_of(native: &BTreeMap<String, BarSeries>) -> BTreeMap<String, Duration> {
    native
        .iter()
        .filter_map(|(label, series)| Some((label.clone(), span_of(series)?)))
        .collect()
}

impl MultiTimeframeFrame {
    /// Align `inputs` onto the grid of `inputs[reference]`.
    pub fn align(
        reference: &str,
        inputs: BTreeMap<String, BarSeries>,
    ) -> Result<Self, FrameError> {
        if inputs.is_empty() {
            return Err(FrameError::Empty);
        }
        let grid = inputs
            .get(reference)
            .ok_or_else(|| FrameError::MissingReference(reference.to_string()))?;

        // One cursor per timeframe; the grid is sorted so cursors only move forward.
        let labels: Vec<&String> = inputs.keys().collect();
        let mut cursors: Vec<usize> = vec![0; labels.len()];
        let mut times = Vec::with_capacity(grid.len());
        let mut rows: Vec<Vec<Bar>> = vec![Vec::with_capacity(grid.len()); labels.len()];

        for reference_bar in grid {
            let t = reference_bar.time;
            let mut row = Vec::with_capacity(labels.len());
            for (slot, label) in labels.iter().enumerate() {
                let bars = inputs[*label].as_slice();
                while cursors[slot] < bars.len() && bars[cursors[slot]].time <= t {
                    cursors[slot] += 1;
                }
                if cursors[slot] == 0 {
                    break;
                }
                row.push(bars[cursors[slot] - 1].restamped(t));
            }
            if row.len() != labels.len() {
                continue;
            }
            times.push(t);
            for (slot, bar) in row.into_iter().enumerate() {
                rows[slot].push(bar);
            }
        }

        let mut columns = BTreeMap::new();
        for (label, bars) in labels.into_iter().zip(rows) {
            let series = BarSeries::new(bars).map_err(|source| FrameError::Series {
                label: label.clone(),
                source,
            })?;
            columns.insert(label.clone(), series);
        }

        Ok(Self {
            reference: reference.to_string(),
            times,
            columns,
            spans: spans_of(&inputs),
            native: inputs,
        })
    }

    /// A frame holding one timeframe.
    pub fn single(label: &str, series: BarSeries) -> Self {
        let times = series.iter().map(|b| b.time).collect();
        let mut columns = BTreeMap::new();
        columns.insert(label.to_string(), series);
        let native = columns.clone();
        Self {
            reference: label.to_string(),
            times,
            spans: spans_of(&native),
            columns,
            native,
        }
    }

    /// A frame where every label carries the same bars.
    pub fn uniform(labels: &[&str], series: &BarSeries) -> Result<Self, FrameError> {
        let first = labels.first().ok_or(FrameError::Empty)?;
        let inputs = labels
            .iter()
            .map(|l| (l.to_string(), series.clone()))
            .collect();
        Self::align(first, inputs)
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// The reference series after alignment.
    pub fn reference_series(&self) -> &BarSeries {
        // The reference label is always inserted by every constructor.
        &self.columns[&self.reference]
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, label: &str) -> Option<&BarSeries> {
        self.columns.get(label)
    }

    /// Native bars of one timeframe that have closed by the end of reference
    /// bar `bar_index`; `None` past the grid or for an unknown label.
    ///
    /// A bar closes one span after it opens, the span being the shortest gap
    /// between consecutive bars of its series. A series too short to measure
    /// borrows the reference span, and a single-bar reference has a zero span.
    pub fn closed_window(&self, label: &str, bar_index: usize) -> Option<&[Bar]> {
        let t = *self.times.get(bar_index)?;
        let bars = self.native.get(label)?.as_slice();
        let reference_span = self
            .spans
            .get(&self.reference)
            .copied()
            .unwrap_or_else(Duration::zero);
        let span = self.spans.get(label).copied().unwrap_or(reference_span);
        let cutoff = t + reference_span;
        let closed = bars.partition_point(|b| b.time + span <= cutoff);
        Some(&bars[..closed])
    }
}
