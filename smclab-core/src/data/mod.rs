//! Frame construction: aligning several timeframes onto one grid.

pub mod align;

pub use align::{FrameError, MultiTimeframeFrame};
