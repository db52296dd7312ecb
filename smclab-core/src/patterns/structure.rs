//! Market structure: break of structure (BOS) and change of character (CHOCH).
//!
//! Swings are 3-bar fractals over `i` in `[1, n-1)`. A swing high above the
//! last confirmed swing high is a bullish BOS with zone `[previous, new]`; if
//! the break before it was bearish it is also a bullish CHOCH. Swing lows
//! mirror this. The first swing of each side only seeds the state, and every
//! swing (breaking or not) becomes the new reference extreme.

use crate::domain::{Bar, Bias, Zone, ZoneKind};

#[derive(Debug, Default)]
struct StructureState {
    last_high: Option<f64>,
    last_low: Option<f64>,
    last_break: Option<Bias>,
}

impl StructureState {
    fn on_swing(&mut self, index: usize, level: f64, bias: Bias, out: &mut Vec<Zone>) {
        let reference = match bias {
            Bias::Bullish => &mut self.last_high,
            Bias::Bearish => &mut self.last_low,
        };
        if let Some(prev) = *reference {
            let broke = match bias {
                Bias::Bullish => level > prev,
                Bias::Bearish => level < prev,
            };
            if broke {
                out.push(Zone::new(index, prev, level, bias, ZoneKind::BreakOfStructure));
                if self.last_break == Some(bias.opposite()) {
                    out.push(Zone::new(index, prev, level, bias, ZoneKind::ChangeOfCharacter));
                }
                self.last_break = Some(bias);
            }
        }
        *reference = Some(level);
    }
}

pub fn detect_structure_breaks(bars: &[Bar]) -> Vec<Zone> {
    let n = bars.len();
    let mut zones = Vec::new();
    if n < 3 {
        return zones;
    }
    let mut state = StructureState::default();
    for i in 1..n - 1 {
        let (prev, cur, next) = (&bars[i - 1], &bars[i], &bars[i + 1]);
        if cur.high > prev.high && cur.high > next.high {
            state.on_swing(i, cur.high, Bias::Bullish, &mut zones);
        }
        if cur.low < prev.low && cur.low < next.low {
            state.on_swing(i, cur.low, Bias::Bearish, &mut zones);
        }
    }
    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::make_bars;

    fn hl(high: f64, low: f64) -> (f64, f64, f64, f64) {
        let mid = (high + low) / 2.0;
        (mid, high, low, mid)
    }

    #[test]
    fn higher_swing_high_is_bullish_bos() {
        let bars = make_bars(&[
            hl(10.0, 9.0),
            hl(11.0, 9.5), // swing high 11 (seed)
            hl(10.5, 9.6),
            hl(12.0, 9.8), // swing high 12 > 11
            hl(11.0, 9.9),
        ]);
        let zones = detect_structure_breaks(&bars);
        let bos: Vec<_> = zones
            .iter()
            .filter(|z| z.kind == ZoneKind::BreakOfStructure)
            .collect();
        assert_eq!(bos.len(), 1);
        assert_eq!(bos[0].anchor_index, 3);
        assert_eq!(bos[0].bias, Bias::Bullish);
        assert_eq!((bos[0].low, bos[0].high), (11.0, 12.0));
        assert!(zones.iter().all(|z| z.kind != ZoneKind::ChangeOfCharacter));
    }

    #[test]
    fn reversal_after_bearish_break_is_choch() {
        let bars = make_bars(&[
            hl(10.0, 9.0),
            hl(10.5, 8.0), // swing high 10.5 + swing low 8.0 (seeds)
            hl(10.2, 8.5),
            hl(10.3, 7.0), // swing low 7.0 < 8.0 → bearish BOS
            hl(10.1, 7.5),
            hl(11.0, 7.6), // swing high 11.0 > 10.3 → bullish BOS + CHOCH
            hl(10.0, 7.7),
        ]);
        let zones = detect_structure_breaks(&bars);
        let choch: Vec<_> = zones
            .iter()
            .filter(|z| z.kind == ZoneKind::ChangeOfCharacter)
            .collect();
        assert_eq!(choch.len(), 1);
        assert_eq!(choch[0].bias, Bias::Bullish);
        assert_eq!(choch[0].anchor_index, 5);
    }

    #[test]
    fn lower_swing_high_replaces_reference() {
        let bars = make_bars(&[
            hl(10.0, 9.0),
            hl(12.0, 9.5), // seed 12
            hl(11.0, 9.6),
            hl(11.5, 9.7), // lower swing high 11.5 replaces 12
            hl(11.0, 9.8),
            hl(11.8, 9.9), // 11.8 > 11.5 → BOS even though < 12
            hl(11.0, 10.0),
        ]);
        let bos: Vec<_> = detect_structure_breaks(&bars)
            .into_iter()
            .filter(|z| z.kind == ZoneKind::BreakOfStructure && z.bias == Bias::Bullish)
            .collect();
        assert_eq!(bos.len(), 1);
        assert_eq!(bos[0].anchor_index, 5);
    }

    #[test]
    fn short_input_is_empty() {
        let bars = make_bars(&[hl(10.0, 9.0), hl(11.0, 9.5)]);
        assert!(detect_structure_breaks(&bars).is_empty());
    }
}
