//! Hardware Abstraction Layer (HAL) for WaveCard
//!
//! This crate provides the capability traits the card driver and the player
//! are written against, so both run unchanged on the STM32 target and in
//! host tests.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate: jukebox loop, ISR wiring)
//!         ↓
//! Feature Layers (sdcard driver, playback pipeline)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (embedded-hal implementations, Embassy HAL + PAC)
//! ```
//!
//! # Capabilities
//!
//! - [`CardBus`] - Byte exchange and chip-select toward the card
//! - [`SampleTimer`] - Fixed-rate tick source for the sample emitter
//! - [`SampleDac`] - One serial frame per output sample
//! - [`Storage`] / [`File`] - Root-directory file access
//!
//! # Features
//!
//! - `std`: Host mocks in [`mocks`] (card simulator, in-memory files)
//! - `defmt`: Enable `defmt::Format` derives

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // command names and register fields in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod audio;
pub mod audio_types;
pub mod bus;
pub mod config;
pub mod mocks;
pub mod storage;
pub mod timer;

pub use audio::SampleDac;
pub use audio_types::{OutOfRangeError, SampleRateHz, SampleWidth};
pub use bus::{BusError, CardBus, SpiCardBus};
pub use storage::{DirEntry, File, Storage};
pub use timer::SampleTimer;
