//! Structured warnings collected during loading and rendering.

use alloc::string::String;
use core::fmt;

/// A recoverable condition worth reporting.
///
/// Diagnostics never abort a load or a render. They are collected into
/// a list returned next to the primary result so callers can inspect
/// degradations without being blocked by them.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// A note's (bank, program) had no patch; resolution fell back.
    MappingFallback {
        /// Track whose note triggered the fallback
        track: u16,
        /// Bank that was requested
        bank: u16,
        /// Program that was requested
        program: u8,
    },
    /// The voice pool was full; the named voice was evicted.
    VoiceStolen {
        /// Output frame position of the eviction
        frame: u64,
        /// Key the evicted voice was sounding
        key: u8,
        /// Amplitude of the evicted voice when it was stolen
        amplitude: f32,
    },
    /// A recognized but unimplemented feature degraded to silence.
    UnsupportedFeature {
        /// What was skipped
        subject: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MappingFallback {
                track,
                bank,
                program,
            } => write!(
                f,
                "track {track}: no patch at bank {bank} program {program}, using fallback"
            ),
            Diagnostic::VoiceStolen {
                frame,
                key,
                amplitude,
            } => write!(
                f,
                "voice pool full at frame {frame}: stole voice for key {key} (amplitude {amplitude:.5})"
            ),
            Diagnostic::UnsupportedFeature { subject } => {
                write!(f, "unsupported feature degraded to silence: {subject}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_mentions_the_fallback_address() {
        let d = Diagnostic::MappingFallback {
            track: 3,
            bank: 5,
            program: 17,
        };
        let text = d.to_string();
        assert!(text.contains("track 3"));
        assert!(text.contains("bank 5"));
        assert!(text.contains("program 17"));
    }

    #[test]
    fn display_mentions_the_stolen_key() {
        let d = Diagnostic::VoiceStolen {
            frame: 1024,
            key: 64,
            amplitude: 0.25,
        };
        let text = d.to_string();
        assert!(text.contains("frame 1024"));
        assert!(text.contains("key 64"));
    }
}
