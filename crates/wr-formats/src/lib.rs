//! Format decoders and encoders for the waveroll renderer.
//!
//! Parses SMF (standard MIDI file) bytes into a [`wr_ir::Score`] and
//! SF2 soundfont bytes into a [`wr_ir::PatchBank`], and encodes
//! rendered audio as WAV. All decoding works over borrowed byte slices
//! with bounds-checked cursors; a malformed input surfaces as a
//! [`FormatError`] carrying the offending byte offset.

use core::fmt;

use wr_ir::Score;

mod sf2_format;
mod smf_format;
mod wav_format;

pub use sf2_format::load_sf2;
pub use smf_format::{load_smf, RetriggerPolicy, SmfParser};
pub use wav_format::{buffer_to_wav, write_wav};

/// Error type for format parsing.
///
/// Every variant names the byte offset the decoder was looking at when
/// it gave up; a parse aborts at the first error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatError {
    /// Invalid file header or magic bytes
    InvalidHeader { offset: usize },
    /// Unexpected end of data
    UnexpectedEof { offset: usize },
    /// Unsupported format version or container variant
    UnsupportedVersion { offset: usize },
    /// A declared chunk or record length disagrees with the data
    LengthMismatch { offset: usize, declared: usize },
    /// A field holds a value outside its legal range
    BadValue { offset: usize },
}

impl FormatError {
    /// Byte offset the decoder failed at.
    pub fn offset(&self) -> usize {
        match *self {
            FormatError::InvalidHeader { offset }
            | FormatError::UnexpectedEof { offset }
            | FormatError::UnsupportedVersion { offset }
            | FormatError::LengthMismatch { offset, .. }
            | FormatError::BadValue { offset } => offset,
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::InvalidHeader { offset } => {
                write!(f, "invalid header at byte {offset}")
            }
            FormatError::UnexpectedEof { offset } => {
                write!(f, "unexpected end of data at byte {offset}")
            }
            FormatError::UnsupportedVersion { offset } => {
                write!(f, "unsupported format version at byte {offset}")
            }
            FormatError::LengthMismatch { offset, declared } => {
                write!(
                    f,
                    "declared length {declared} at byte {offset} disagrees with the data"
                )
            }
            FormatError::BadValue { offset } => {
                write!(f, "value out of range at byte {offset}")
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// A MIDI decoder producing the canonical [`Score`] model.
///
/// Downstream components (timeline resolution, rendering) consume only
/// the `Score`, so any decoder implementing this trait can feed them.
pub trait MidiSource {
    /// Decode a full MIDI byte stream.
    fn parse(&self, data: &[u8]) -> Result<Score, FormatError>;
}
