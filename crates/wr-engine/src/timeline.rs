//! Timeline resolution: notes to patches and zones.
//!
//! Replays each track's program changes to find the (bank, program)
//! active at every note start, then snapshots the zones that respond to
//! the note's key and velocity. The engine renders from the resolved
//! list alone; the score and bank stay untouched.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use wr_ir::{Diagnostic, NoteEvent, PatchBank, RenderConfig, Score, Track, Zone};

/// MIDI channel reserved for percussion.
const PERCUSSION_CHANNEL: u8 = 9;

/// A note with its patch and zone selection pinned down.
#[derive(Clone, Debug)]
pub struct ResolvedNote {
    /// The source note event
    pub note: NoteEvent,
    /// Bank of the patch the note resolved to
    pub bank: u16,
    /// Program of the patch the note resolved to
    pub program: u8,
    /// Every zone responding to the note's key and velocity. Empty when
    /// no patch or zone matched; such a note stays in the timeline but
    /// sounds as silence.
    pub zones: Vec<Zone>,
}

/// Resolve every note of a score against a patch bank.
///
/// Missing (bank, program) addresses fall back toward program 0 of the
/// default bank and are reported once per (track, bank, program) as a
/// [`Diagnostic::MappingFallback`]; nothing here is fatal.
pub fn resolve_notes(
    score: &Score,
    bank: &PatchBank,
    config: &RenderConfig,
) -> (Vec<ResolvedNote>, Vec<Diagnostic>) {
    let mut resolved = Vec::with_capacity(score.note_count());
    let mut diagnostics = Vec::new();
    let mut reported: BTreeSet<(u16, u16, u8)> = BTreeSet::new();

    for track in &score.tracks {
        resolve_track(track, bank, config, &mut resolved, &mut diagnostics, &mut reported);
    }

    resolved.sort_by(|a, b| {
        a.note
            .start_seconds
            .partial_cmp(&b.note.start_seconds)
            .unwrap_or(core::cmp::Ordering::Equal)
            .then(a.note.track.cmp(&b.note.track))
            .then(a.note.key.cmp(&b.note.key))
    });
    (resolved, diagnostics)
}

fn resolve_track(
    track: &Track,
    bank: &PatchBank,
    config: &RenderConfig,
    resolved: &mut Vec<ResolvedNote>,
    diagnostics: &mut Vec<Diagnostic>,
    reported: &mut BTreeSet<(u16, u16, u8)>,
) {
    let mut change_idx = 0usize;
    let mut active_bank = config.default_bank;
    let mut active_program = 0u8;

    for note in &track.notes {
        // Advance program-change state up to the note's start tick.
        while change_idx < track.program_changes.len()
            && track.program_changes[change_idx].tick <= note.start_tick
        {
            active_bank = track.program_changes[change_idx].bank;
            active_program = track.program_changes[change_idx].program;
            change_idx += 1;
        }

        let lookup = if track.channel == PERCUSSION_CHANNEL {
            percussion_lookup(bank, config, active_program)
        } else {
            melodic_lookup(bank, config, active_bank, active_program)
        };

        let (patch, fell_back) = match lookup {
            Some(found) => found,
            None => {
                report_fallback(diagnostics, reported, note.track, active_bank, active_program);
                resolved.push(ResolvedNote {
                    note: *note,
                    bank: active_bank,
                    program: active_program,
                    zones: Vec::new(),
                });
                continue;
            }
        };
        if fell_back {
            report_fallback(diagnostics, reported, note.track, active_bank, active_program);
        }

        resolved.push(ResolvedNote {
            note: *note,
            bank: patch.bank,
            program: patch.program,
            zones: patch.matching_zones(note.key, note.velocity).copied().collect(),
        });
    }
}

/// Melodic chain: exact address, then the default bank at the same
/// program, then program 0 of the default bank.
fn melodic_lookup<'a>(
    bank: &'a PatchBank,
    config: &RenderConfig,
    note_bank: u16,
    program: u8,
) -> Option<(&'a wr_ir::Patch, bool)> {
    if let Some(patch) = bank.patch(note_bank, program) {
        return Some((patch, false));
    }
    bank.patch(config.default_bank, program)
        .or_else(|| bank.patch(config.default_bank, 0))
        .map(|patch| (patch, true))
}

/// Percussion channel: the percussion bank is consulted first, falling
/// through to the melodic chain when the bank has no drum patches.
fn percussion_lookup<'a>(
    bank: &'a PatchBank,
    config: &RenderConfig,
    program: u8,
) -> Option<(&'a wr_ir::Patch, bool)> {
    if let Some(patch) = bank.patch(config.percussion_bank, program) {
        return Some((patch, false));
    }
    if let Some(patch) = bank.patch(config.percussion_bank, 0) {
        return Some((patch, program != 0));
    }
    melodic_lookup(bank, config, config.default_bank, program)
}

fn report_fallback(
    diagnostics: &mut Vec<Diagnostic>,
    reported: &mut BTreeSet<(u16, u16, u8)>,
    track: u16,
    bank: u16,
    program: u8,
) {
    if reported.insert((track, bank, program)) {
        diagnostics.push(Diagnostic::MappingFallback {
            track,
            bank,
            program,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wr_ir::{Patch, ProgramChange, Sample, Zone};

    fn note_on(track: u16, channel: u8, key: u8, velocity: u8, tick: u64) -> NoteEvent {
        NoteEvent {
            track,
            channel,
            key,
            velocity,
            start_tick: tick,
            end_tick: tick + 100,
            start_seconds: tick as f64 / 960.0,
            end_seconds: (tick + 100) as f64 / 960.0,
        }
    }

    /// Bank with one full-range patch at the given address.
    fn bank_with_patch(bank_no: u16, program: u8) -> PatchBank {
        let mut bank = PatchBank::new();
        let sample = bank.add_sample(Sample::new("sine"));
        let mut patch = Patch::new(bank_no, program, "patch");
        patch.zones.push(Zone {
            sample,
            ..Zone::default()
        });
        bank.insert_patch(patch);
        bank
    }

    fn score_with_notes(channel: u8, notes: Vec<NoteEvent>) -> Score {
        let mut score = Score::new(480);
        let mut track = Track::new(0, channel);
        track.notes = notes;
        score.tracks.push(track);
        score
    }

    #[test]
    fn full_range_zone_matches_every_key() {
        let bank = bank_with_patch(0, 0);
        let notes = (0u8..=127).map(|k| note_on(0, 0, k, 64, 0)).collect();
        let score = score_with_notes(0, notes);
        let (resolved, diagnostics) = resolve_notes(&score, &bank, &RenderConfig::default());
        assert_eq!(resolved.len(), 128);
        assert!(resolved.iter().all(|r| r.zones.len() == 1));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn no_program_change_uses_default_bank_program_zero() {
        let bank = bank_with_patch(0, 0);
        let score = score_with_notes(0, vec![note_on(0, 0, 60, 100, 0)]);
        let (resolved, diagnostics) = resolve_notes(&score, &bank, &RenderConfig::default());
        assert_eq!(resolved[0].bank, 0);
        assert_eq!(resolved[0].program, 0);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn program_change_state_applies_to_later_notes_only() {
        let mut bank = bank_with_patch(0, 0);
        let sample = bank.add_sample(Sample::new("organ"));
        let mut organ = Patch::new(0, 16, "organ");
        organ.zones.push(Zone {
            sample,
            ..Zone::default()
        });
        bank.insert_patch(organ);

        let mut score = score_with_notes(
            0,
            vec![note_on(0, 0, 60, 100, 0), note_on(0, 0, 62, 100, 500)],
        );
        score.tracks[0].program_changes.push(ProgramChange {
            tick: 200,
            bank: 0,
            program: 16,
        });
        let (resolved, _) = resolve_notes(&score, &bank, &RenderConfig::default());
        assert_eq!(resolved[0].program, 0);
        assert_eq!(resolved[1].program, 16);
    }

    #[test]
    fn missing_program_falls_back_with_one_diagnostic() {
        let bank = bank_with_patch(0, 0);
        let mut score = score_with_notes(
            0,
            vec![note_on(0, 0, 60, 100, 0), note_on(0, 0, 62, 100, 100)],
        );
        score.tracks[0].program_changes.push(ProgramChange {
            tick: 0,
            bank: 3,
            program: 42,
        });
        let (resolved, diagnostics) = resolve_notes(&score, &bank, &RenderConfig::default());
        // Both notes land on the fallback patch.
        assert!(resolved.iter().all(|r| r.bank == 0 && r.program == 0));
        assert!(resolved.iter().all(|r| r.zones.len() == 1));
        // Reported once, not per note.
        assert_eq!(
            diagnostics,
            vec![Diagnostic::MappingFallback {
                track: 0,
                bank: 3,
                program: 42
            }]
        );
    }

    #[test]
    fn total_miss_resolves_to_an_empty_zone_set() {
        let bank = PatchBank::new();
        let score = score_with_notes(0, vec![note_on(0, 0, 60, 100, 0)]);
        let (resolved, diagnostics) = resolve_notes(&score, &bank, &RenderConfig::default());
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].zones.is_empty());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn out_of_range_velocity_yields_no_zones_but_keeps_the_note() {
        let mut bank = PatchBank::new();
        let sample = bank.add_sample(Sample::new("loud"));
        let mut patch = Patch::new(0, 0, "loud only");
        patch.zones.push(Zone {
            sample,
            vel_lo: 100,
            vel_hi: 127,
            ..Zone::default()
        });
        bank.insert_patch(patch);
        let score = score_with_notes(0, vec![note_on(0, 0, 60, 50, 0)]);
        let (resolved, _) = resolve_notes(&score, &bank, &RenderConfig::default());
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].zones.is_empty());
    }

    #[test]
    fn layered_zones_all_selected() {
        let mut bank = PatchBank::new();
        let sample = bank.add_sample(Sample::new("layer"));
        let mut patch = Patch::new(0, 0, "layers");
        patch.zones.push(Zone {
            sample,
            ..Zone::default()
        });
        patch.zones.push(Zone {
            sample,
            key_lo: 50,
            key_hi: 70,
            ..Zone::default()
        });
        bank.insert_patch(patch);
        let score = score_with_notes(0, vec![note_on(0, 0, 60, 100, 0)]);
        let (resolved, _) = resolve_notes(&score, &bank, &RenderConfig::default());
        assert_eq!(resolved[0].zones.len(), 2);
    }

    #[test]
    fn percussion_channel_prefers_the_percussion_bank() {
        let mut bank = bank_with_patch(0, 0);
        let sample = bank.add_sample(Sample::new("kit"));
        let mut kit = Patch::new(128, 0, "standard kit");
        kit.zones.push(Zone {
            sample,
            ..Zone::default()
        });
        bank.insert_patch(kit);
        let score = score_with_notes(9, vec![note_on(0, 9, 36, 100, 0)]);
        let (resolved, diagnostics) = resolve_notes(&score, &bank, &RenderConfig::default());
        assert_eq!(resolved[0].bank, 128);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn percussion_channel_without_drum_bank_uses_melodic_chain() {
        let bank = bank_with_patch(0, 0);
        let score = score_with_notes(9, vec![note_on(0, 9, 36, 100, 0)]);
        let (resolved, _) = resolve_notes(&score, &bank, &RenderConfig::default());
        assert_eq!(resolved[0].bank, 0);
        assert_eq!(resolved[0].zones.len(), 1);
    }

    #[test]
    fn output_is_ordered_by_start_time() {
        let bank = bank_with_patch(0, 0);
        let mut score = Score::new(480);
        let mut a = Track::new(0, 0);
        a.notes = vec![note_on(0, 0, 60, 100, 500), note_on(0, 0, 64, 100, 100)];
        a.notes.sort_by_key(|n| n.start_tick);
        let mut b = Track::new(1, 1);
        b.notes = vec![note_on(1, 1, 52, 100, 0)];
        score.tracks.push(a);
        score.tracks.push(b);
        let (resolved, _) = resolve_notes(&score, &bank, &RenderConfig::default());
        let starts: Vec<f64> = resolved.iter().map(|r| r.note.start_seconds).collect();
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }
}
