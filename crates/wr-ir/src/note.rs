//! Note events, tracks, and the parsed score.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::tempo::TempoMap;

/// One sounding note, produced from a matched note-on/note-off pair.
///
/// Times are carried both in native MIDI ticks and in seconds derived
/// from the score's tempo map, so downstream consumers never need the
/// tempo map themselves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteEvent {
    /// Id of the owning track
    pub track: u16,
    /// MIDI channel (0-15)
    pub channel: u8,
    /// Key number (0-127)
    pub key: u8,
    /// Note-on velocity (1-127; velocity-0 note-ons close notes)
    pub velocity: u8,
    /// Start position in ticks
    pub start_tick: u64,
    /// End position in ticks (>= start_tick)
    pub end_tick: u64,
    /// Start position in seconds
    pub start_seconds: f64,
    /// End position in seconds (>= start_seconds)
    pub end_seconds: f64,
}

impl NoteEvent {
    /// Duration of the note in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// A program (and bank) selection at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramChange {
    /// Tick position of the program-change message
    pub tick: u64,
    /// Bank number from bank-select controller state (default 0)
    pub bank: u16,
    /// Program number (0-127)
    pub program: u8,
}

/// One channel's worth of notes from one MIDI track chunk.
///
/// Ids are assigned once at parse time in encounter order and stay
/// stable regardless of any display ordering downstream.
#[derive(Clone, Debug, Default)]
pub struct Track {
    /// Stable track id
    pub id: u16,
    /// Display name (track-name meta, or a generated fallback)
    pub name: ArrayString<32>,
    /// MIDI channel (0-15) all notes of this track play on
    pub channel: u8,
    /// Notes ordered by start tick
    pub notes: Vec<NoteEvent>,
    /// Program changes ordered by tick
    pub program_changes: Vec<ProgramChange>,
}

impl Track {
    /// Create an empty track.
    pub fn new(id: u16, channel: u8) -> Self {
        Self {
            id,
            channel,
            ..Self::default()
        }
    }

    /// Set the display name, truncating to capacity.
    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        for ch in name.chars() {
            if self.name.try_push(ch).is_err() {
                break;
            }
        }
    }
}

/// The parse-once canonical model of a MIDI file.
///
/// Built by a format decoder, then shared read-only by the timeline
/// visualization consumer and the rendering engine.
#[derive(Clone, Debug)]
pub struct Score {
    /// File-level name (first track-name meta of the first chunk)
    pub name: ArrayString<32>,
    /// Ticks per quarter note from the header chunk
    pub ticks_per_quarter: u16,
    /// Merged tempo map across all track chunks
    pub tempo: TempoMap,
    /// Tracks with stable ids
    pub tracks: Vec<Track>,
}

impl Score {
    /// Create an empty score at the given resolution.
    pub fn new(ticks_per_quarter: u16) -> Self {
        Self {
            name: ArrayString::new(),
            ticks_per_quarter,
            tempo: TempoMap::new(),
            tracks: Vec::new(),
        }
    }

    /// Total number of notes across all tracks.
    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }

    /// End of the last note in seconds, 0.0 for an empty score.
    pub fn duration_seconds(&self) -> f64 {
        let mut end = 0.0f64;
        for track in &self.tracks {
            for note in &track.notes {
                if note.end_seconds > end {
                    end = note.end_seconds;
                }
            }
        }
        end
    }

    /// True if no track carries any notes.
    pub fn is_empty(&self) -> bool {
        self.tracks.iter().all(|t| t.notes.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(track: u16, start: f64, end: f64) -> NoteEvent {
        NoteEvent {
            track,
            channel: 0,
            key: 60,
            velocity: 100,
            start_tick: 0,
            end_tick: 0,
            start_seconds: start,
            end_seconds: end,
        }
    }

    #[test]
    fn set_name_truncates_to_capacity() {
        let mut track = Track::new(0, 0);
        track.set_name("a very long track name that exceeds thirty-two characters");
        assert_eq!(track.name.len(), 32);
        assert!(track.name.starts_with("a very long track name"));
    }

    #[test]
    fn score_duration_is_last_note_end() {
        let mut score = Score::new(480);
        let mut a = Track::new(0, 0);
        a.notes.push(note(0, 0.0, 1.5));
        let mut b = Track::new(1, 1);
        b.notes.push(note(1, 0.5, 3.25));
        score.tracks.push(a);
        score.tracks.push(b);
        assert_eq!(score.duration_seconds(), 3.25);
        assert_eq!(score.note_count(), 2);
        assert!(!score.is_empty());
    }

    #[test]
    fn empty_score_has_zero_duration() {
        let score = Score::new(96);
        assert_eq!(score.duration_seconds(), 0.0);
        assert!(score.is_empty());
    }
}
