//! The rendered PCM product buffer.

use alloc::vec::Vec;

/// Frames rendered per block by the engine's mixing loop.
pub const BLOCK_SIZE: usize = 256;

/// Maximum output channel count the renderer supports.
pub const MAX_CHANNELS: u16 = 2;

/// Interleaved f32 PCM, produced once by a render pass.
///
/// Immutable after construction; the audio-sink collaborator encodes it
/// (e.g. to WAV) without this crate caring how.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: u16,
    data: Vec<f32>,
}

impl AudioBuffer {
    /// Wrap an interleaved sample vector.
    ///
    /// `data.len()` must be a multiple of `channels`; trailing samples
    /// of a ragged vector are dropped.
    pub fn from_interleaved(sample_rate: u32, channels: u16, mut data: Vec<f32>) -> Self {
        let channels = channels.clamp(1, MAX_CHANNELS);
        let whole = data.len() - data.len() % channels as usize;
        data.truncate(whole);
        Self {
            sample_rate,
            channels,
            data,
        }
    }

    /// Output sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels as usize
    }

    /// Buffer duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate.max(1))
    }

    /// All samples, interleaved.
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// One frame's samples.
    pub fn frame(&self, index: usize) -> &[f32] {
        let w = self.channels as usize;
        &self.data[index * w..(index + 1) * w]
    }

    /// Largest absolute sample value, 0.0 when empty.
    pub fn peak(&self) -> f32 {
        self.data
            .iter()
            .fold(0.0f32, |peak, &s| peak.max(libm::fabsf(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_and_duration_follow_channel_count() {
        let buffer = AudioBuffer::from_interleaved(100, 2, vec![0.0; 250]);
        assert_eq!(buffer.frames(), 125);
        assert_eq!(buffer.duration_seconds(), 1.25);
        assert_eq!(buffer.channels(), 2);
    }

    #[test]
    fn ragged_tail_is_dropped() {
        let buffer = AudioBuffer::from_interleaved(44_100, 2, vec![0.0; 7]);
        assert_eq!(buffer.samples().len(), 6);
        assert_eq!(buffer.frames(), 3);
    }

    #[test]
    fn peak_is_largest_magnitude() {
        let buffer = AudioBuffer::from_interleaved(44_100, 1, vec![0.1, -0.9, 0.4]);
        assert!((buffer.peak() - 0.9).abs() < 1e-6);
        let empty = AudioBuffer::from_interleaved(44_100, 1, Vec::new());
        assert_eq!(empty.peak(), 0.0);
    }

    #[test]
    fn frame_slices_are_interleaved_pairs() {
        let buffer = AudioBuffer::from_interleaved(44_100, 2, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(buffer.frame(0), &[0.1, 0.2]);
        assert_eq!(buffer.frame(1), &[0.3, 0.4]);
    }
}
