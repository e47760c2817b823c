//! Core IR types for the waveroll renderer.
//!
//! This crate defines the intermediate representation shared across the
//! pipeline. Format decoders emit IR (a [`Score`] from MIDI bytes, a
//! [`PatchBank`] from soundfont bytes), the rendering engine consumes
//! IR, and the facade hands IR-derived views to external collaborators.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod config;
mod diagnostic;
mod note;
mod patch;
mod sample;
mod tempo;
mod zone;

pub use audio_buffer::{AudioBuffer, BLOCK_SIZE, MAX_CHANNELS};
pub use config::RenderConfig;
pub use diagnostic::Diagnostic;
pub use note::{NoteEvent, ProgramChange, Score, Track};
pub use patch::{Patch, PatchBank};
pub use sample::{Sample, SampleKey};
pub use tempo::{TempoChange, TempoMap, DEFAULT_TEMPO};
pub use zone::{Adsr, Zone};
