//! WaveCard firmware
//!
//! Plays every mono PCM WAV file in the root directory of an SD/MMC card
//! through an MCP4921 DAC, one sample per timer interrupt.
//!
//! # Architecture
//!
//! ```text
//! main.rs (hardware) / card_image_player (emulator)
//!         ↓
//! jukebox::play_root ── storage::FatStorage (embedded-sdmmc)
//!         ↓                     ↓
//! playback::Player        sdcard::SdBlockDevice → sdcard::SdCard → platform::CardBus
//!         ↓
//! playback::SampleEmitter (TIM6 interrupt) → audio::Mcp4921
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for the STM32H743 target (embassy, defmt)
//! - `emulator` - Build the desktop card-image player (tracing)
//! - `std` - Enable standard library (for emulator and testing)
//!
//! # Examples
//!
//! ## Hardware Target
//!
//! ```bash
//! cargo build --release --target thumbv7em-none-eabihf --features hardware
//! ```
//!
//! ## Emulator Target
//!
//! ```bash
//! cargo run --example card_image_player --features emulator -- song.wav
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// Logging discipline (allow println in tests via clippy.toml)
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

#[macro_use]
mod fmt;

pub mod audio;
pub mod boot;
pub mod exception_handlers;
pub mod hal;
pub mod jukebox;
pub mod storage;

pub use audio::Mcp4921;
pub use jukebox::{play_root, JukeboxReport};
pub use storage::{FatStorage, FixedTime, MountError};

#[cfg(feature = "hardware")]
pub use hal::Tim6SampleTimer;
