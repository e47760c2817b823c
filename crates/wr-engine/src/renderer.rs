//! Block renderer: resolved notes to an interleaved output buffer.

use alloc::vec::Vec;

use wr_ir::{AudioBuffer, Diagnostic, PatchBank, RenderConfig, BLOCK_SIZE};

use crate::timeline::ResolvedNote;
use crate::voice::Voice;
use crate::voice_pool::VoicePool;

/// Render a resolved timeline into PCM.
///
/// A global frame clock advances in [`BLOCK_SIZE`] blocks from zero to
/// the last note's end plus its release tail, then keeps going only
/// while voices are still sounding. Summed output is clipped to the
/// [-1, 1] ceiling per sample; the buffer is never renormalized.
pub fn render(
    notes: &[ResolvedNote],
    bank: &PatchBank,
    config: &RenderConfig,
) -> (AudioBuffer, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let rate = f64::from(config.sample_rate);
    let stereo = config.channels != 1;

    // Spawn every voice up front; starts are sorted so the block loop
    // only walks a cursor forward.
    let mut starts: Vec<(u64, Voice)> = Vec::new();
    let mut horizon: u64 = 0;
    for resolved in notes {
        let start = libm::round(resolved.note.start_seconds * rate) as u64;
        let end = libm::round(resolved.note.end_seconds * rate) as u64;
        horizon = horizon.max(end);
        for zone in &resolved.zones {
            let sample = match bank.sample(zone.sample) {
                Some(sample) => sample,
                None => continue,
            };
            let tail = end + libm::ceil(f64::from(zone.envelope.release_s) * rate) as u64;
            horizon = horizon.max(tail);
            starts.push((start, Voice::new(&resolved.note, zone, sample, config.sample_rate, end)));
        }
    }
    starts.sort_by_key(|&(frame, _)| frame);

    let mut pool = VoicePool::new(config.voice_limit, config.silence_threshold);
    let mut data: Vec<f32> = Vec::new();
    let mut cursor = 0usize;
    let mut frame: u64 = 0;

    while frame < horizon || cursor < starts.len() || !pool.is_idle() {
        for _ in 0..BLOCK_SIZE {
            while cursor < starts.len() && starts[cursor].0 <= frame {
                pool.allocate(starts[cursor].1.clone(), frame, &mut diagnostics);
                cursor += 1;
            }
            let (left, right) = pool.render_frame(bank, frame);
            if stereo {
                data.push(left.clamp(-1.0, 1.0));
                data.push(right.clamp(-1.0, 1.0));
            } else {
                data.push((left + right).clamp(-1.0, 1.0));
            }
            frame += 1;
        }
    }

    (
        AudioBuffer::from_interleaved(config.sample_rate, config.channels, data),
        diagnostics,
    )
}
