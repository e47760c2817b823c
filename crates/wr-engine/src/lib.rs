//! Voice and rendering engine for the waveroll renderer.
//!
//! Resolves scored note events against a patch bank, schedules voices
//! through a fixed-size pool, and renders them block by block into an
//! interleaved output buffer.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod envelope_state;
mod frequency;
mod renderer;
mod timeline;
mod voice;
mod voice_pool;

pub use envelope_state::{AdsrState, EnvelopeStage};
pub use frequency::{playback_increment, FIXED_ONE};
pub use renderer::render;
pub use timeline::{resolve_notes, ResolvedNote};
pub use voice::Voice;
pub use voice_pool::VoicePool;
