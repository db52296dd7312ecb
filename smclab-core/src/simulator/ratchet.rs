/// Trailing-stop ratchet.
///
/// **Core Rule:** the trail may tighten, never loosen.
///
/// Longs trail below the highest high, so the level can only rise; shorts
/// trail above the lowest low, so it can only fall.
use crate::domain::Side;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingStop {
    level: f64,
    side: Side,
    distance: f64,
}

impl TrailingStop {
    /// Start trailing `distance` behind `extreme` (bar high for longs, bar low for shorts).
    pub fn activate(side: Side, extreme: f64, distance: f64) -> Self {
        Self {
            level: extreme - side.sign() * distance,
            side,
            distance,
        }
    }

    /// Propose a new level from this bar's extreme and keep the tighter one.
    ///
    /// # Example
    /// ```
    /// use smclab_core::domain::Side;
    /// use smclab_core::simulator::TrailingStop;
    ///
    /// let mut trail = TrailingStop::activate(Side::Long, 105.0, 2.0);
    /// assert_eq!(trail.level(), 103.0);
    ///
    /// // New high: 103 → 106 (allowed)
    /// assert_eq!(trail.follow(108.0), 106.0);
    ///
    /// // Lower high: stays at 106
    /// assert_eq!(trail.follow(104.0), 106.0);
    /// ```
    pub fn follow(&mut self, extreme: f64) -> f64 {
        let proposed = extreme - self.side.sign() * self.distance;
        self.level = match self.side {
            Side::Long => self.level.max(proposed),
            Side::Short => self.level.min(proposed),
        };
        self.level
    }

    /// True when the bar's adverse extreme reaches the trail.
    pub fn is_breached(&self, adverse_extreme: f64) -> bool {
        match self.side {
            Side::Long => adverse_extreme <= self.level,
            Side::Short => adverse_extreme >= self.level,
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}
