//! Tempo map and tick-to-seconds conversion.

use alloc::vec;
use alloc::vec::Vec;

/// Default tempo in microseconds per quarter note (120 BPM).
pub const DEFAULT_TEMPO: u32 = 500_000;

/// One tempo change at an absolute tick position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TempoChange {
    /// Tick position of the change
    pub tick: u64,
    /// Microseconds per quarter note from this tick on
    pub micros_per_quarter: u32,
}

/// Ordered tempo changes with a guaranteed entry at tick 0.
///
/// Conversion from ticks to seconds is piecewise: each segment between
/// consecutive changes advances time at that segment's tempo.
#[derive(Clone, Debug)]
pub struct TempoMap {
    changes: Vec<TempoChange>,
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::new()
    }
}

impl TempoMap {
    /// Create a map holding only the default 120 BPM entry at tick 0.
    pub fn new() -> Self {
        Self {
            changes: vec![TempoChange {
                tick: 0,
                micros_per_quarter: DEFAULT_TEMPO,
            }],
        }
    }

    /// Record a tempo change, keeping ticks strictly increasing.
    ///
    /// A change at an already-present tick replaces the earlier value,
    /// so a file-provided tempo at tick 0 overrides the default.
    pub fn set(&mut self, tick: u64, micros_per_quarter: u32) {
        match self.changes.binary_search_by_key(&tick, |c| c.tick) {
            Ok(idx) => self.changes[idx].micros_per_quarter = micros_per_quarter,
            Err(idx) => self.changes.insert(
                idx,
                TempoChange {
                    tick,
                    micros_per_quarter,
                },
            ),
        }
    }

    /// Tempo in effect at the given tick.
    pub fn micros_at(&self, tick: u64) -> u32 {
        let mut current = DEFAULT_TEMPO;
        for change in &self.changes {
            if change.tick > tick {
                break;
            }
            current = change.micros_per_quarter;
        }
        current
    }

    /// Convert an absolute tick to seconds at the given resolution.
    pub fn seconds_at(&self, tick: u64, ticks_per_quarter: u16) -> f64 {
        let tick_micros = f64::from(ticks_per_quarter.max(1)) * 1_000_000.0;
        let mut seconds = 0.0f64;
        let mut prev_tick = 0u64;
        let mut prev_micros = DEFAULT_TEMPO;
        for change in &self.changes {
            if change.tick >= tick {
                break;
            }
            seconds += (change.tick - prev_tick) as f64 * f64::from(prev_micros) / tick_micros;
            prev_tick = change.tick;
            prev_micros = change.micros_per_quarter;
        }
        seconds + (tick - prev_tick) as f64 * f64::from(prev_micros) / tick_micros
    }

    /// All recorded changes in tick order.
    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tempo_conversion_is_exact() {
        // 480 ticks/quarter at the default 500000 us/quarter: two
        // quarters (960 ticks) last exactly one second.
        let map = TempoMap::new();
        assert_eq!(map.seconds_at(960, 480), 1.0);
        assert_eq!(map.seconds_at(480, 480), 0.5);
        assert_eq!(map.seconds_at(0, 480), 0.0);
    }

    #[test]
    fn set_at_tick_zero_replaces_default() {
        let mut map = TempoMap::new();
        map.set(0, 1_000_000);
        assert_eq!(map.changes().len(), 1);
        assert_eq!(map.micros_at(0), 1_000_000);
        // 60 BPM: one quarter = one second.
        assert_eq!(map.seconds_at(480, 480), 1.0);
    }

    #[test]
    fn piecewise_conversion_across_a_change() {
        let mut map = TempoMap::new();
        // Double speed after the first quarter.
        map.set(480, 250_000);
        // First quarter at 500000us = 0.5s, second at 250000us = 0.25s.
        assert_eq!(map.seconds_at(960, 480), 0.75);
    }

    #[test]
    fn changes_stay_ordered_regardless_of_insertion_order() {
        let mut map = TempoMap::new();
        map.set(960, 250_000);
        map.set(480, 400_000);
        let ticks: Vec<u64> = map.changes().iter().map(|c| c.tick).collect();
        assert_eq!(ticks, vec![0, 480, 960]);
        assert_eq!(map.micros_at(479), DEFAULT_TEMPO);
        assert_eq!(map.micros_at(480), 400_000);
        assert_eq!(map.micros_at(10_000), 250_000);
    }
}
