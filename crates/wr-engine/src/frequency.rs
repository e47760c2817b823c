//! Pitch-to-increment conversion for sample playback.
//!
//! Converts a MIDI key plus a sample's root key and tuning offset into
//! a 32.32 fixed-point increment for stepping through sample data.

/// One whole sample frame in 32.32 fixed-point.
pub const FIXED_ONE: u64 = 1 << 32;

/// Compute the 32.32 fixed-point position increment for a voice.
///
/// - `key`: the sounding MIDI key
/// - `root_key`: the key at which the sample plays back unshifted
/// - `tune_cents`: zone and sample tuning, summed by the caller
/// - `native_rate`: the sample's own rate in Hz
/// - `output_rate`: the render rate in Hz
pub fn playback_increment(
    key: u8,
    root_key: u8,
    tune_cents: i32,
    native_rate: u32,
    output_rate: u32,
) -> u64 {
    if native_rate == 0 || output_rate == 0 {
        return 0;
    }
    let cents = f64::from((i32::from(key) - i32::from(root_key)) * 100 + tune_cents);
    let ratio = libm::exp2(cents / 1200.0);
    let step = f64::from(native_rate) / f64::from(output_rate) * ratio;
    (step * FIXED_ONE as f64) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 44_100;

    #[test]
    fn root_key_at_matching_rates_steps_one_frame() {
        assert_eq!(playback_increment(60, 60, 0, RATE, RATE), FIXED_ONE);
    }

    #[test]
    fn octave_up_doubles_increment() {
        let base = playback_increment(60, 60, 0, RATE, RATE);
        let octave_up = playback_increment(72, 60, 0, RATE, RATE);
        assert_eq!(octave_up, base * 2);
    }

    #[test]
    fn octave_down_halves_increment() {
        let base = playback_increment(60, 60, 0, RATE, RATE);
        let octave_down = playback_increment(48, 60, 0, RATE, RATE);
        assert_eq!(octave_down, base / 2);
    }

    #[test]
    fn semitone_up_increases_by_twelfth_root_of_two() {
        let base = playback_increment(60, 60, 0, RATE, RATE);
        let one_up = playback_increment(61, 60, 0, RATE, RATE);
        let expected = (base as f64 * 1.059_463_094) as i64;
        assert!((one_up as i64 - expected).unsigned_abs() <= 2);
    }

    #[test]
    fn tuning_cents_shift_matches_key_shift() {
        let via_cents = playback_increment(60, 60, 1200, RATE, RATE);
        let via_key = playback_increment(72, 60, 0, RATE, RATE);
        assert_eq!(via_cents, via_key);
    }

    #[test]
    fn native_rate_scales_proportionally() {
        let slow = playback_increment(60, 60, 0, 22_050, RATE);
        let fast = playback_increment(60, 60, 0, RATE, RATE);
        assert_eq!(fast, slow * 2);
    }

    #[test]
    fn output_rate_scales_inversely() {
        let at_44k = playback_increment(60, 60, 0, RATE, 44_100);
        let at_22k = playback_increment(60, 60, 0, RATE, 22_050);
        assert_eq!(at_22k, at_44k * 2);
    }

    #[test]
    fn zero_rates_return_zero() {
        assert_eq!(playback_increment(60, 60, 0, 0, RATE), 0);
        assert_eq!(playback_increment(60, 60, 0, RATE, 0), 0);
    }

    #[test]
    fn increment_is_nonzero_for_extreme_keys() {
        assert!(playback_increment(0, 127, 0, RATE, RATE) > 0);
        assert!(playback_increment(127, 0, 0, RATE, RATE) > 0);
    }
}
