//! Fixed-size voice pool with eviction.

use alloc::vec::Vec;

use wr_ir::{Diagnostic, PatchBank};

use crate::envelope_state::EnvelopeStage;
use crate::voice::Voice;

/// A bounded pool of sounding voices.
///
/// Allocation never fails: when every slot is taken, the quietest voice
/// in a late envelope stage is evicted in favor of the new request and
/// the theft is reported as a [`Diagnostic::VoiceStolen`].
pub struct VoicePool {
    slots: Vec<Option<Voice>>,
    silence_threshold: f32,
}

impl VoicePool {
    /// Pool with `limit` slots, all free.
    pub fn new(limit: usize, silence_threshold: f32) -> Self {
        Self {
            slots: (0..limit.max(1)).map(|_| None).collect(),
            silence_threshold,
        }
    }

    /// Number of occupied slots.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True when no voice is sounding.
    pub fn is_idle(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    /// Place a voice in a free slot, stealing one when the pool is full.
    pub fn allocate(&mut self, voice: Voice, frame: u64, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.is_none()) {
            *slot = Some(voice);
            return;
        }
        let idx = self.steal_candidate();
        if let Some(old) = self.slots[idx].take() {
            diagnostics.push(Diagnostic::VoiceStolen {
                frame,
                key: old.key(),
                amplitude: old.amplitude(),
            });
        }
        self.slots[idx] = Some(voice);
    }

    /// Pick the eviction victim: the quietest Sustain/Release voice, or
    /// the quietest Attack/Decay voice only when no later-stage voice
    /// exists.
    fn steal_candidate(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i, v)))
            .min_by(|(_, a), (_, b)| {
                let rank = |v: &Voice| match v.stage() {
                    EnvelopeStage::Sustain | EnvelopeStage::Release | EnvelopeStage::Done => 0u8,
                    EnvelopeStage::Attack | EnvelopeStage::Decay => 1,
                };
                rank(a).cmp(&rank(b)).then(
                    a.amplitude()
                        .partial_cmp(&b.amplitude())
                        .unwrap_or(core::cmp::Ordering::Equal),
                )
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Render one output frame across all voices and return the summed
    /// stereo pair.
    ///
    /// Gates close for voices whose note end falls at or before `frame`;
    /// finished voices, and releasing voices that have decayed below the
    /// silence threshold, give their slot back immediately.
    pub fn render_frame(&mut self, bank: &PatchBank, frame: u64) -> (f32, f32) {
        let mut left = 0.0f32;
        let mut right = 0.0f32;
        for slot in &mut self.slots {
            if let Some(voice) = slot {
                if voice.release_due(frame) {
                    voice.release();
                }
                match bank.sample(voice.sample_key()) {
                    Some(sample) => {
                        let (l, r) = voice.render_frame(bank, sample);
                        left += l;
                        right += r;
                    }
                    None => voice.silence(),
                }
                let inaudible = voice.stage() == EnvelopeStage::Release
                    && voice.amplitude() < self.silence_threshold;
                if voice.is_finished() || inaudible {
                    *slot = None;
                }
            }
        }
        (left, right)
    }
}
