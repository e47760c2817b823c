//! Voice: one sounding note driving a sample through an envelope.

use wr_ir::{NoteEvent, PatchBank, Sample, SampleKey, Zone};

use crate::envelope_state::{AdsrState, EnvelopeStage};
use crate::frequency::playback_increment;

/// A single playing voice. Spawned per matching zone at note-on,
/// reclaimed by the pool once its envelope finishes or it runs off the
/// end of an unlooped sample.
#[derive(Clone, Debug)]
pub struct Voice {
    key: u8,
    sample: SampleKey,
    /// Position in the sample, 32.32 fixed-point frames.
    position: u64,
    increment: u64,
    envelope: AdsrState,
    /// Output frame at which the note gate closes.
    release_at: u64,
    gated: bool,
    looped: bool,
    loop_start: u64,
    loop_end: u64,
    end: u64,
    gain_left: f32,
    gain_right: f32,
    finished: bool,
}

impl Voice {
    /// Spawn a voice for one matching zone of a resolved note.
    pub fn new(
        note: &NoteEvent,
        zone: &Zone,
        sample: &Sample,
        output_rate: u32,
        release_at: u64,
    ) -> Self {
        let tune = zone.tune_cents + i32::from(sample.fine_tune_cents);
        let increment =
            playback_increment(note.key, sample.root_key, tune, sample.sample_rate, output_rate);
        let amp = zone.gain * f32::from(note.velocity) / 127.0;
        let pan = zone.pan.clamp(-1.0, 1.0);
        Self {
            key: note.key,
            sample: zone.sample,
            position: 0,
            increment,
            envelope: AdsrState::trigger(&zone.envelope, output_rate),
            release_at,
            gated: false,
            looped: zone.looped && sample.has_loop(),
            loop_start: u64::from(sample.loop_start) << 32,
            loop_end: u64::from(sample.loop_end) << 32,
            end: u64::from(sample.len()) << 32,
            gain_left: amp * (1.0 - pan) * 0.5,
            gain_right: amp * (1.0 + pan) * 0.5,
            finished: false,
        }
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn sample_key(&self) -> SampleKey {
        self.sample
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.envelope.stage()
    }

    /// Perceived amplitude: the envelope level scaled by velocity and
    /// zone gain. Used to pick eviction victims.
    pub fn amplitude(&self) -> f32 {
        self.envelope.level() * (self.gain_left + self.gain_right)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the gate should close at or before `frame`.
    pub fn release_due(&self, frame: u64) -> bool {
        !self.gated && frame >= self.release_at
    }

    /// Close the gate and start the envelope's release ramp.
    pub fn release(&mut self) {
        self.gated = true;
        self.envelope.gate_off();
    }

    /// Stop producing audio immediately; the slot can be reclaimed.
    pub fn silence(&mut self) {
        self.finished = true;
    }

    /// Render one output frame and return the stereo contribution.
    pub fn render_frame(&mut self, bank: &PatchBank, sample: &Sample) -> (f32, f32) {
        if self.finished {
            return (0.0, 0.0);
        }
        let value = bank.fetch(sample, self.position) * self.envelope.advance();
        self.advance_position();
        if self.envelope.is_done() {
            self.finished = true;
        }
        (value * self.gain_left, value * self.gain_right)
    }

    /// Advance through the sample. The loop region only captures the
    /// position while the envelope holds in sustain; any other stage
    /// plays linearly and silences past the sample's end.
    fn advance_position(&mut self) {
        self.position += self.increment;
        if self.looped && self.envelope.stage() == EnvelopeStage::Sustain {
            let span = self.loop_end - self.loop_start;
            while self.position >= self.loop_end {
                self.position -= span;
            }
        } else if self.position >= self.end {
            self.finished = true;
        }
    }
}
