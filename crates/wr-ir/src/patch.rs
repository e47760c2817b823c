//! Patches and the loaded patch bank.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use arrayvec::ArrayString;
use slotmap::SlotMap;

use crate::sample::{Sample, SampleKey};
use crate::zone::Zone;

/// One preset: a (bank, program) address and its layered zones.
#[derive(Clone, Debug, Default)]
pub struct Patch {
    /// Bank number (0-127 melodic, 128 percussion)
    pub bank: u16,
    /// Program number (0-127)
    pub program: u8,
    /// Preset name from the bank
    pub name: ArrayString<20>,
    /// Zones in declaration order; overlapping ranges layer
    pub zones: Vec<Zone>,
}

impl Patch {
    /// Create an empty patch at the given address.
    pub fn new(bank: u16, program: u8, name: &str) -> Self {
        let mut patch = Self {
            bank,
            program,
            ..Self::default()
        };
        for ch in name.chars() {
            if patch.name.try_push(ch).is_err() {
                break;
            }
        }
        patch
    }

    /// Every zone responding to the given key and velocity.
    pub fn matching_zones(&self, key: u8, velocity: u8) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(move |z| z.matches(key, velocity))
    }
}

/// The loaded instrument bank.
///
/// Owns the shared PCM wave region plus every sample header and patch
/// decoded from it. Built once by a loader, then read-only for the
/// lifetime of a render; voices fetch wave data through it and never
/// copy sample memory.
#[derive(Clone, Debug, Default)]
pub struct PatchBank {
    /// Bank name from the container's info section
    pub name: ArrayString<32>,
    patches: BTreeMap<(u16, u8), Patch>,
    samples: SlotMap<SampleKey, Sample>,
    wave: Vec<i16>,
}

impl PatchBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bank name, truncating to capacity.
    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        for ch in name.chars() {
            if self.name.try_push(ch).is_err() {
                break;
            }
        }
    }

    /// Install the shared wave region. Called once by the loader.
    pub fn set_wave(&mut self, wave: Vec<i16>) {
        self.wave = wave;
    }

    /// The shared wave region.
    pub fn wave(&self) -> &[i16] {
        &self.wave
    }

    /// Register a sample header and return its key.
    pub fn add_sample(&mut self, sample: Sample) -> SampleKey {
        self.samples.insert(sample)
    }

    /// Look up a sample header.
    pub fn sample(&self, key: SampleKey) -> Option<&Sample> {
        self.samples.get(key)
    }

    /// Number of registered samples.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Insert a patch. The first patch at an address wins; returns
    /// false when the address was already taken.
    pub fn insert_patch(&mut self, patch: Patch) -> bool {
        let address = (patch.bank, patch.program);
        if self.patches.contains_key(&address) {
            return false;
        }
        self.patches.insert(address, patch);
        true
    }

    /// Look up a patch by (bank, program).
    pub fn patch(&self, bank: u16, program: u8) -> Option<&Patch> {
        self.patches.get(&(bank, program))
    }

    /// All patches in (bank, program) order.
    pub fn patches(&self) -> impl Iterator<Item = &Patch> {
        self.patches.values()
    }

    /// Number of patches.
    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Fetch a linearly interpolated wave value for a sample.
    ///
    /// `pos_fixed` is a 32.32 fixed-point frame position relative to the
    /// sample's start. Past the sample's end (or for unplayable
    /// samples) the result is 0. Values are normalized to [-1.0, 1.0].
    pub fn fetch(&self, sample: &Sample, pos_fixed: u64) -> f32 {
        if !sample.playable {
            return 0.0;
        }
        let idx = (pos_fixed >> 32) as u32;
        if idx >= sample.len() {
            return 0.0;
        }
        let frac = (pos_fixed & 0xFFFF_FFFF) as i64;
        let base = (sample.start + idx) as usize;

        let a = self.wave.get(base).copied().unwrap_or(0) as i64;
        let b = if idx + 1 < sample.len() {
            self.wave.get(base + 1).copied().unwrap_or(0) as i64
        } else {
            0
        };

        let blended = a + (((b - a) * frac) >> 32);
        blended as f32 / 32768.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank_with_wave(wave: &[i16]) -> (PatchBank, Sample) {
        let mut bank = PatchBank::new();
        bank.set_wave(wave.to_vec());
        let mut sample = Sample::new("test");
        sample.start = 0;
        sample.end = wave.len() as u32;
        (bank, sample)
    }

    #[test]
    fn fetch_at_integer_position_matches_frame() {
        let (bank, sample) = bank_with_wave(&[0, 16384, -8192, 100]);
        let got = bank.fetch(&sample, 1u64 << 32);
        assert!((got - 16384.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn fetch_midpoint_averages_neighbors() {
        let (bank, sample) = bank_with_wave(&[0, 16384]);
        let got = bank.fetch(&sample, 1u64 << 31);
        let expected = (0.0 + 16384.0 / 32768.0) / 2.0;
        assert!((got - expected).abs() < 1e-4);
    }

    #[test]
    fn fetch_past_end_fades_to_zero() {
        let (bank, sample) = bank_with_wave(&[16384]);
        // Index 0, frac 0.5: blends the last frame toward 0.
        let got = bank.fetch(&sample, 1u64 << 31);
        let expected = 16384.0 / 32768.0 / 2.0;
        assert!((got - expected).abs() < 1e-4);
        // Fully past the end.
        assert_eq!(bank.fetch(&sample, 5u64 << 32), 0.0);
    }

    #[test]
    fn fetch_unplayable_sample_is_silent() {
        let (bank, mut sample) = bank_with_wave(&[16384, 16384]);
        sample.playable = false;
        assert_eq!(bank.fetch(&sample, 0), 0.0);
    }

    #[test]
    fn fetch_respects_sample_offset() {
        let mut bank = PatchBank::new();
        bank.set_wave(vec![1000, 2000, 3000, 4000]);
        let mut sample = Sample::new("tail");
        sample.start = 2;
        sample.end = 4;
        let got = bank.fetch(&sample, 0);
        assert!((got - 3000.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn first_patch_at_an_address_wins() {
        let mut bank = PatchBank::new();
        assert!(bank.insert_patch(Patch::new(0, 5, "first")));
        assert!(!bank.insert_patch(Patch::new(0, 5, "second")));
        assert_eq!(bank.patch(0, 5).map(|p| p.name.as_str()), Some("first"));
        assert_eq!(bank.patch_count(), 1);
        assert!(bank.patch(1, 5).is_none());
    }

    #[test]
    fn matching_zones_filters_by_key_and_velocity() {
        let mut patch = Patch::new(0, 0, "split");
        patch.zones.push(Zone {
            key_lo: 0,
            key_hi: 59,
            ..Zone::default()
        });
        patch.zones.push(Zone {
            key_lo: 60,
            key_hi: 127,
            ..Zone::default()
        });
        assert_eq!(patch.matching_zones(40, 64).count(), 1);
        assert_eq!(patch.matching_zones(60, 64).count(), 1);
        // Overlapping ranges layer.
        patch.zones.push(Zone::default());
        assert_eq!(patch.matching_zones(60, 64).count(), 2);
    }
}
