//! Facade controller for the waveroll renderer.
//!
//! Owns the parse-once artifacts — a [`Score`] decoded from MIDI bytes
//! and a [`PatchBank`] decoded from soundfont bytes — and hands their
//! derived products to the two external consumers: a note timeline for
//! visualization and a rendered [`AudioBuffer`] (or WAV bytes) for the
//! audio sink. Neither consumer ever sees the raw input bytes.

use std::fmt;

// Re-export common types so callers don't need wr-ir/wr-formats directly.
pub use wr_engine::ResolvedNote;
pub use wr_formats::{buffer_to_wav, FormatError, MidiSource, RetriggerPolicy, SmfParser};
pub use wr_ir::{AudioBuffer, Diagnostic, PatchBank, RenderConfig, Score};

/// Facade misuse: rendering was asked for before its inputs exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderError {
    /// No MIDI file has been loaded
    NoScore,
    /// No soundfont has been loaded
    NoPatchBank,
    /// The render configuration fails validation
    BadConfig,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NoScore => write!(f, "no MIDI file loaded"),
            RenderError::NoPatchBank => write!(f, "no soundfont loaded"),
            RenderError::BadConfig => write!(f, "render configuration is invalid"),
        }
    }
}

impl std::error::Error for RenderError {}

/// One timeline entry for the visualization consumer.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineNote {
    /// Display name of the owning track
    pub track_name: String,
    /// Note start in seconds
    pub start_seconds: f64,
    /// Note end in seconds
    pub end_seconds: f64,
    /// Key number (0-127)
    pub key: u8,
    /// Note-on velocity
    pub velocity: u8,
}

/// Owns the loaded score and bank and drives resolution and rendering.
///
/// Each input is decoded exactly once; loading again replaces the prior
/// artifact. Warnings from every load, resolve, and render accumulate in
/// order and are never fatal.
#[derive(Default)]
pub struct Controller {
    score: Option<Score>,
    bank: Option<PatchBank>,
    diagnostics: Vec<Diagnostic>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a MIDI byte stream with the default parser, replacing any
    /// previously loaded score.
    pub fn load_midi(&mut self, data: &[u8]) -> Result<(), FormatError> {
        self.load_midi_with(&SmfParser::new(), data)
    }

    /// Decode a MIDI byte stream with an explicit decoder.
    pub fn load_midi_with(
        &mut self,
        source: &dyn MidiSource,
        data: &[u8],
    ) -> Result<(), FormatError> {
        self.score = Some(source.parse(data)?);
        Ok(())
    }

    /// Decode a soundfont byte stream, replacing any previously loaded
    /// bank. Load-time degradations join the diagnostics list.
    pub fn load_soundfont(&mut self, data: &[u8]) -> Result<(), FormatError> {
        let (bank, diagnostics) = wr_formats::load_sf2(data)?;
        self.bank = Some(bank);
        self.diagnostics.extend(diagnostics);
        Ok(())
    }

    /// The loaded score, if any.
    pub fn score(&self) -> Option<&Score> {
        self.score.as_ref()
    }

    /// The loaded patch bank, if any.
    pub fn patch_bank(&self) -> Option<&PatchBank> {
        self.bank.as_ref()
    }

    /// Every warning collected so far, in the order it occurred.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The note timeline for the visualization consumer, ordered by
    /// start time. Empty until a MIDI file is loaded.
    pub fn timeline(&self) -> Vec<TimelineNote> {
        let Some(score) = &self.score else {
            return Vec::new();
        };
        let mut notes: Vec<TimelineNote> = score
            .tracks
            .iter()
            .flat_map(|track| {
                track.notes.iter().map(|note| TimelineNote {
                    track_name: track.name.to_string(),
                    start_seconds: note.start_seconds,
                    end_seconds: note.end_seconds,
                    key: note.key,
                    velocity: note.velocity,
                })
            })
            .collect();
        notes.sort_by(|a, b| {
            a.start_seconds
                .partial_cmp(&b.start_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.key.cmp(&b.key))
        });
        notes
    }

    /// Render the loaded score against the loaded bank.
    pub fn render(&mut self, config: &RenderConfig) -> Result<AudioBuffer, RenderError> {
        if !config.is_valid() {
            return Err(RenderError::BadConfig);
        }
        let score = self.score.as_ref().ok_or(RenderError::NoScore)?;
        let bank = self.bank.as_ref().ok_or(RenderError::NoPatchBank)?;

        let (resolved, resolve_diagnostics) = wr_engine::resolve_notes(score, bank, config);
        self.diagnostics.extend(resolve_diagnostics);
        let (buffer, render_diagnostics) = wr_engine::render(&resolved, bank, config);
        self.diagnostics.extend(render_diagnostics);
        Ok(buffer)
    }

    /// Render and encode as a 16-bit PCM WAV file.
    pub fn render_to_wav(&mut self, config: &RenderConfig) -> Result<Vec<u8>, RenderError> {
        let buffer = self.render(config)?;
        Ok(wr_formats::buffer_to_wav(&buffer))
    }
}
