//! Zones: key/velocity-scoped synthesis definitions.

use crate::sample::SampleKey;

/// Linear ADSR amplitude envelope parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Adsr {
    /// Attack time in seconds (0 -> 1)
    pub attack_s: f32,
    /// Decay time in seconds (1 -> sustain)
    pub decay_s: f32,
    /// Sustain level (0.0 - 1.0)
    pub sustain_level: f32,
    /// Release time in seconds (current -> 0)
    pub release_s: f32,
}

impl Default for Adsr {
    fn default() -> Self {
        // Near-instant attack/decay/release, full sustain.
        Self {
            attack_s: 0.001,
            decay_s: 0.001,
            sustain_level: 1.0,
            release_s: 0.001,
        }
    }
}

/// One key/velocity region of a patch.
///
/// Shared read-only state: voices select a zone at note start and read
/// through it for their whole lifetime, they never own or mutate one.
#[derive(Clone, Copy, Debug)]
pub struct Zone {
    /// Lowest key this zone responds to
    pub key_lo: u8,
    /// Highest key this zone responds to
    pub key_hi: u8,
    /// Lowest velocity this zone responds to
    pub vel_lo: u8,
    /// Highest velocity this zone responds to
    pub vel_hi: u8,
    /// The sample this zone plays
    pub sample: SampleKey,
    /// Amplitude envelope
    pub envelope: Adsr,
    /// Stereo position, -1.0 (left) to 1.0 (right)
    pub pan: f32,
    /// Linear gain applied on top of the envelope
    pub gain: f32,
    /// Zone tuning in cents, additive with the sample's fine tune
    pub tune_cents: i32,
    /// True when the sample's loop region is active for this zone
    pub looped: bool,
}

impl Default for Zone {
    fn default() -> Self {
        Self {
            key_lo: 0,
            key_hi: 127,
            vel_lo: 0,
            vel_hi: 127,
            sample: SampleKey::default(),
            envelope: Adsr::default(),
            pan: 0.0,
            gain: 1.0,
            tune_cents: 0,
            looped: false,
        }
    }
}

impl Zone {
    /// True when this zone responds to the given key and velocity.
    pub fn matches(&self, key: u8, velocity: u8) -> bool {
        key >= self.key_lo && key <= self.key_hi && velocity >= self.vel_lo && velocity <= self.vel_hi
    }
}
