//! Render configuration.

use crate::audio_buffer::MAX_CHANNELS;

/// Options recognized by a render pass.
///
/// Passed explicitly into loaders and the renderer; there is no
/// process-wide configuration state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderConfig {
    /// Target PCM sample rate in Hz
    pub sample_rate: u32,
    /// Output channel count (1 or 2)
    pub channels: u16,
    /// Fallback bank when a note's (bank, program) is missing
    pub default_bank: u16,
    /// Maximum concurrent voices
    pub voice_limit: usize,
    /// Amplitude below which a releasing voice is reclaimed
    pub silence_threshold: f32,
    /// Bank consulted first for notes on the percussion channel
    pub percussion_bank: u16,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            default_bank: 0,
            voice_limit: 256,
            silence_threshold: 1e-4,
            percussion_bank: 128,
        }
    }
}

impl RenderConfig {
    /// True when the configuration can drive a render pass.
    pub fn is_valid(&self) -> bool {
        self.sample_rate > 0
            && self.channels >= 1
            && self.channels <= MAX_CHANNELS
            && self.voice_limit > 0
            && self.silence_threshold >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RenderConfig::default();
        assert!(config.is_valid());
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.default_bank, 0);
        assert_eq!(config.voice_limit, 256);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = RenderConfig::default();
        config.channels = 3;
        assert!(!config.is_valid());
        config.channels = 0;
        assert!(!config.is_valid());
        config = RenderConfig::default();
        config.sample_rate = 0;
        assert!(!config.is_valid());
        config = RenderConfig::default();
        config.voice_limit = 0;
        assert!(!config.is_valid());
    }
}
