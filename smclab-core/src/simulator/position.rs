//! Simulated position state machine.
//!
//! One call to [`Position::step`] processes one bar in a fixed order:
//!
//! a. stop-loss hit → close remaining at the stop
//! b. take-profit hit → close remaining at the target
//! c. break-even move once the bar reaches the trigger
//! d. partial exit once the bar reaches the partial trigger
//! e. trailing activation after the partial, once the bar reaches the trail trigger
//! f. trailing update, closing the remainder if the bar breaches the trail
//!
//! Break-even, partial and trailing are independent flags that only ever turn on.

use chrono::{DateTime, Utc};

use crate::domain::{Bar, ExitFill, ExitReason, LifecycleFlags, Side, TradeOutcome};

use super::ratchet::TrailingStop;
use super::{Entry, RiskParams};

/// Result of stepping one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    Holding,
    Closed(TradeOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Fraction of the original size still open, in `(0, 1]`.
    pub remaining_size: f64,
    pub flags: LifecycleFlags,
    pub trailing_stop: Option<TrailingStop>,
    params: RiskParams,
}

impl Position {
    pub fn open(entry: Entry, params: RiskParams) -> Self {
        let sign = entry.side.sign();
        Self {
            side: entry.side,
            entry_time: entry.time,
            entry_price: entry.price,
            stop_loss: entry.price - sign * params.stop_loss,
            take_profit: entry.price + sign * params.take_profit,
            remaining_size: 1.0,
            flags: LifecycleFlags::default(),
            trailing_stop: None,
            params,
        }
    }

    /// Advance the position by one bar, appending any exit fills to `fills`.
    pub fn step(&mut self, bar: &Bar, fills: &mut Vec<ExitFill>) -> StepEvent {
        let sign = self.side.sign();
        let (favorable, adverse) = match self.side {
            Side::Long => (bar.high, bar.low),
            Side::Short => (bar.low, bar.high),
        };

        // a. stop-loss
        if self.crossed_against(adverse, self.stop_loss) {
            fills.push(self.close_remaining(bar.time, self.stop_loss, ExitReason::StopLoss));
            return StepEvent::Closed(self.outcome(false));
        }

        // b. take-profit
        if self.crossed_toward(favorable, self.take_profit) {
            fills.push(self.close_remaining(bar.time, self.take_profit, ExitReason::TakeProfit));
            return StepEvent::Closed(self.outcome(true));
        }

        // c. break-even
        if !self.flags.break_even_moved && self.reached(favorable, self.params.break_even_trigger) {
            self.move_to_break_even();
        }

        // d. partial exit
        if !self.flags.partial_taken && self.reached(favorable, self.params.partial_trigger) {
            let size = self.params.partial_ratio * self.remaining_size;
            let price = self.entry_price + sign * self.params.partial_trigger;
            fills.push(self.fill(bar.time, price, size, ExitReason::Partial));
            self.remaining_size -= size;
            self.flags.partial_taken = true;
            tracing::debug!(time = %bar.time, price, size, remaining = self.remaining_size, "partial exit");
            if !self.flags.break_even_moved {
                self.move_to_break_even();
            }
        }

        // e. trailing activation
        if self.flags.partial_taken
            && !self.flags.trailing
            && self.reached(favorable, self.params.trail_trigger)
        {
            let trail = TrailingStop::activate(self.side, favorable, self.params.trail_distance);
            tracing::debug!(time = %bar.time, level = trail.level(), "trailing stop activated");
            self.trailing_stop = Some(trail);
            self.flags.trailing = true;
        }

        // f. trailing update
        if let Some(trail) = self.trailing_stop.as_mut() {
            let level = trail.follow(favorable);
            if trail.is_breached(adverse) {
                fills.push(self.close_remaining(bar.time, level, ExitReason::TrailingStop));
                return StepEvent::Closed(self.outcome(true));
            }
        }

        StepEvent::Holding
    }

    /// Outcome when the remainder closes now.
    fn outcome(&self, win: bool) -> TradeOutcome {
        match (win, self.flags.partial_taken) {
            (true, false) => TradeOutcome::Win,
            (true, true) => TradeOutcome::PartialThenWin,
            (false, false) => TradeOutcome::Loss,
            (false, true) => TradeOutcome::PartialThenLoss,
        }
    }

    fn move_to_break_even(&mut self) {
        self.stop_loss = self.entry_price + self.side.sign() * self.params.break_even_buffer;
        self.flags.break_even_moved = true;
        tracing::debug!(stop_loss = self.stop_loss, "stop moved to break-even");
    }

    /// Whether the favorable extreme is at least `distance` beyond entry.
    fn reached(&self, favorable: f64, distance: f64) -> bool {
        match self.side {
            Side::Long => favorable >= self.entry_price + distance,
            Side::Short => favorable <= self.entry_price - distance,
        }
    }

    fn crossed_against(&self, adverse: f64, level: f64) -> bool {
        match self.side {
            Side::Long => adverse <= level,
            Side::Short => adverse >= level,
        }
    }

    fn crossed_toward(&self, favorable: f64, level: f64) -> bool {
        match self.side {
            Side::Long => favorable >= level,
            Side::Short => favorable <= level,
        }
    }

    fn close_remaining(&mut self, time: DateTime<Utc>, price: f64, reason: ExitReason) -> ExitFill {
        let fill = self.fill(time, price, self.remaining_size, reason);
        self.remaining_size = 0.0;
        tracing::debug!(%time, price, ?reason, pnl_pips = fill.pnl_pips, "position closed");
        fill
    }

    fn fill(&self, time: DateTime<Utc>, price: f64, size: f64, reason: ExitReason) -> ExitFill {
        let pnl_pips = self.side.sign() * (price - self.entry_price) / self.params.pip_size * size;
        ExitFill {
            time,
            price,
            size,
            reason,
            pnl_pips,
            pnl_currency: pnl_pips * self.params.pip_value,
        }
    }
}
