//! Double-buffered WAV playback to a 12-bit SPI DAC.
//!
//! Two contexts share one [`SharedPlayback`]:
//!
//! ```text
//! control (main loop)                   sample timer interrupt
//! Player::open_wav  ── fmt/data ──┐
//! Player::play_wav  ── refill ──► [slot 0 | slot 1] ──► SampleEmitter::on_tick ──► SampleDac
//!        ▲                         status: Ready / Filling / LastBuffer
//!        └──────── bytes_played, drained ◄──────────────┘
//! ```
//!
//! # Features
//!
//! - `defmt`: `defmt::Format` derives and defmt logging
//! - `tracing`: log through `tracing` on host builds

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // errors are the documented enums

#[macro_use]
mod fmt;

pub mod buffer;
pub mod config;
pub mod emitter;
pub mod error;
pub mod sample;
pub mod scheduler;
pub mod wav;

pub use buffer::{PlaybackStatus, SharedPlayback, BUFFER_SIZE};
pub use config::{PlaybackConfig, RateSource};
pub use emitter::{SampleEmitter, Tick};
pub use error::{FormatError, PlaybackError};
pub use sample::{DacPacking, Sample};
pub use scheduler::{EndReason, Player, StreamEnd};
pub use wav::{open_wav, WavFormat};
