//! Audio output hardware.
//!
//! # Dependency Injection
//!
//! The sample emitter targets the [`platform::audio::SampleDac`] trait.
//! Concrete types are injected at the call site:
//!
//! ```rust,ignore
//! // Hardware:
//! SampleEmitter::new(&PLAYBACK, Mcp4921::new(cs, sck, sdi)?);
//! // Tests:
//! SampleEmitter::new(&shared, RecordingDac::new());
//! ```

pub mod dac;

pub use dac::Mcp4921;
