//! Runtime evaluator for the four-stage amplitude envelope.

use wr_ir::Adsr;

/// Stage floor so a zero-length stage still ramps in finite frames.
const MIN_STAGE_SECONDS: f32 = 1e-4;

/// Where a voice's envelope currently sits. `Done` means the release
/// ramp has emptied out and the voice can be reclaimed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeStage {
    Attack,
    Decay,
    Sustain,
    Release,
    Done,
}

/// Per-voice envelope state, advanced once per output frame.
#[derive(Clone, Copy, Debug)]
pub struct AdsrState {
    stage: EnvelopeStage,
    level: f32,
    attack_step: f32,
    decay_step: f32,
    sustain_level: f32,
    release_scale: f32,
    release_step: f32,
}

impl AdsrState {
    /// Start a fresh envelope at the beginning of its attack ramp.
    pub fn trigger(envelope: &Adsr, sample_rate: u32) -> Self {
        let rate = sample_rate.max(1) as f32;
        let sustain_level = envelope.sustain_level.clamp(0.0, 1.0);
        Self {
            stage: EnvelopeStage::Attack,
            level: 0.0,
            attack_step: 1.0 / (envelope.attack_s.max(MIN_STAGE_SECONDS) * rate),
            decay_step: (1.0 - sustain_level) / (envelope.decay_s.max(MIN_STAGE_SECONDS) * rate),
            sustain_level,
            release_scale: 1.0 / (envelope.release_s.max(MIN_STAGE_SECONDS) * rate),
            release_step: 0.0,
        }
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Current amplitude in 0..=1.
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_done(&self) -> bool {
        self.stage == EnvelopeStage::Done
    }

    /// Begin the release ramp from the current amplitude, whichever
    /// stage is active. The ramp step scales with the starting level so
    /// release always takes its configured duration.
    pub fn gate_off(&mut self) {
        if self.stage == EnvelopeStage::Done {
            return;
        }
        self.release_step = self.level * self.release_scale;
        self.stage = EnvelopeStage::Release;
    }

    /// Advance by one output frame and return the new level.
    pub fn advance(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Attack => {
                self.level += self.attack_step;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                self.level -= self.decay_step;
                if self.level <= self.sustain_level {
                    self.level = self.sustain_level;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => {}
            EnvelopeStage::Release => {
                self.level -= self.release_step;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Done;
                }
            }
            EnvelopeStage::Done => {}
        }
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0.008 s at 1 kHz is 8 frames with an exactly representable step.
    const RATE: u32 = 1000;

    fn test_envelope() -> Adsr {
        Adsr {
            attack_s: 0.008,
            decay_s: 0.008,
            sustain_level: 0.5,
            release_s: 0.008,
        }
    }

    fn advance_n(state: &mut AdsrState, n: usize) {
        for _ in 0..n {
            state.advance();
        }
    }

    #[test]
    fn attack_ramps_to_full_level() {
        let mut state = AdsrState::trigger(&test_envelope(), RATE);
        assert_eq!(state.stage(), EnvelopeStage::Attack);
        advance_n(&mut state, 8);
        assert_eq!(state.level(), 1.0);
        assert_eq!(state.stage(), EnvelopeStage::Decay);
    }

    #[test]
    fn decay_settles_at_sustain_level() {
        let mut state = AdsrState::trigger(&test_envelope(), RATE);
        advance_n(&mut state, 16);
        assert_eq!(state.level(), 0.5);
        assert_eq!(state.stage(), EnvelopeStage::Sustain);
    }

    #[test]
    fn sustain_holds_indefinitely() {
        let mut state = AdsrState::trigger(&test_envelope(), RATE);
        advance_n(&mut state, 16);
        advance_n(&mut state, 1000);
        assert_eq!(state.level(), 0.5);
        assert_eq!(state.stage(), EnvelopeStage::Sustain);
    }

    #[test]
    fn release_from_sustain_reaches_done() {
        let mut state = AdsrState::trigger(&test_envelope(), RATE);
        advance_n(&mut state, 16);
        state.gate_off();
        assert_eq!(state.stage(), EnvelopeStage::Release);
        advance_n(&mut state, 8);
        assert_eq!(state.level(), 0.0);
        assert!(state.is_done());
    }

    #[test]
    fn early_release_starts_from_current_level() {
        let mut state = AdsrState::trigger(&test_envelope(), RATE);
        // Half way up the attack ramp.
        advance_n(&mut state, 4);
        let level_at_gate = state.level();
        assert_eq!(level_at_gate, 0.5);
        state.gate_off();
        let next = state.advance();
        // No upward jump, no cliff: the ramp walks down from 0.5.
        assert!(next < level_at_gate);
        assert!(next > level_at_gate - 0.1);
    }

    #[test]
    fn release_duration_is_level_independent() {
        // Gated at 0.5 or at 1.0, release takes the same 8 frames.
        let mut from_sustain = AdsrState::trigger(&test_envelope(), RATE);
        advance_n(&mut from_sustain, 16);
        from_sustain.gate_off();
        advance_n(&mut from_sustain, 7);
        assert!(!from_sustain.is_done());
        from_sustain.advance();
        assert!(from_sustain.is_done());

        let full = Adsr {
            sustain_level: 1.0,
            ..test_envelope()
        };
        let mut from_full = AdsrState::trigger(&full, RATE);
        advance_n(&mut from_full, 9);
        from_full.gate_off();
        advance_n(&mut from_full, 7);
        assert!(!from_full.is_done());
        from_full.advance();
        assert!(from_full.is_done());
    }

    #[test]
    fn full_sustain_skips_decay_ramp() {
        let envelope = Adsr {
            sustain_level: 1.0,
            ..test_envelope()
        };
        let mut state = AdsrState::trigger(&envelope, RATE);
        advance_n(&mut state, 9);
        assert_eq!(state.level(), 1.0);
        assert_eq!(state.stage(), EnvelopeStage::Sustain);
    }

    #[test]
    fn gate_off_at_zero_level_finishes_immediately() {
        let mut state = AdsrState::trigger(&test_envelope(), RATE);
        state.gate_off();
        state.advance();
        assert!(state.is_done());
        assert_eq!(state.level(), 0.0);
    }

    #[test]
    fn done_stage_is_terminal() {
        let mut state = AdsrState::trigger(&test_envelope(), RATE);
        state.gate_off();
        advance_n(&mut state, 10);
        assert!(state.is_done());
        state.gate_off();
        state.advance();
        assert!(state.is_done());
        assert_eq!(state.level(), 0.0);
    }

    #[test]
    fn zero_length_stages_still_progress() {
        let envelope = Adsr {
            attack_s: 0.0,
            decay_s: 0.0,
            sustain_level: 0.8,
            release_s: 0.0,
        };
        let mut state = AdsrState::trigger(&envelope, RATE);
        advance_n(&mut state, 4);
        assert_eq!(state.stage(), EnvelopeStage::Sustain);
        state.gate_off();
        advance_n(&mut state, 4);
        assert!(state.is_done());
    }
}
