//! Sample headers referencing the bank's shared PCM region.

use arrayvec::ArrayString;

slotmap::new_key_type! {
    /// Key for referencing samples in the PatchBank's sample table.
    pub struct SampleKey;
}

/// One sample definition.
///
/// Holds no audio of its own: `start`/`end` are frame offsets into the
/// owning [`crate::PatchBank`]'s shared wave region, loaded once and
/// never copied per voice. Loop points are relative to `start`.
#[derive(Clone, Copy, Debug)]
pub struct Sample {
    /// Sample name from the bank
    pub name: ArrayString<20>,
    /// First frame in the shared wave region
    pub start: u32,
    /// One past the last frame in the shared wave region
    pub end: u32,
    /// Loop start, in frames from `start`
    pub loop_start: u32,
    /// Loop end (exclusive), in frames from `start`
    pub loop_end: u32,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Key at which the sample plays at native rate
    pub root_key: u8,
    /// Pitch correction in cents
    pub fine_tune_cents: i8,
    /// False for ROM or otherwise unsupported encodings; such samples
    /// degrade to silence instead of failing the load
    pub playable: bool,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            start: 0,
            end: 0,
            loop_start: 0,
            loop_end: 0,
            sample_rate: 44_100,
            root_key: 60,
            fine_tune_cents: 0,
            playable: true,
        }
    }
}

impl Sample {
    /// Create a named sample with default parameters.
    pub fn new(name: &str) -> Self {
        let mut sample = Self::default();
        for ch in name.chars() {
            if sample.name.try_push(ch).is_err() {
                break;
            }
        }
        sample
    }

    /// Length of the sample in frames.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the sample covers no frames.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns true if the loop region is usable.
    pub fn has_loop(&self) -> bool {
        self.loop_end > self.loop_start && self.loop_end <= self.len()
    }
}
