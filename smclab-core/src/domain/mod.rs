//! Domain types shared by every component.

pub mod bar;
pub mod trade;
pub mod zone;

pub use bar::{Bar, BarError, BarSeries};
pub use trade::{ExitFill, ExitReason, LifecycleFlags, Side, TradeOutcome, TradeRecord};
pub use zone::{Bias, Signal, Zone, ZoneKind};
