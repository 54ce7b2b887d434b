//! SD/MMC block storage over an SPI-mode bus.
//!
//! Brings a card up from power-on, classifies it (MMC v3, SD v1, SD v2
//! byte- or block-addressed) and reads any byte window of a sector while
//! always clocking the full 512 + 2 byte data block.
//!
//! ```text
//! SdCard<B: CardBus, D: DelayNs>
//!   ├── initialize()            CMD0 → CMD8 → ACMD41/CMD1 → CMD58/CMD16
//!   ├── read_partial_sector()   CMD17, token, offset/count window
//!   └── num_blocks()            CMD9
//! SectorStream   platform::File over a sector extent
//! SdBlockDevice  embedded_sdmmc::BlockDevice for FAT volumes
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
#![allow(clippy::doc_markdown)] // command names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // every fallible call returns DiskError

#[macro_use]
mod fmt;

pub mod block_device;
pub mod card;
pub mod card_type;
pub mod command;
pub mod config;
pub mod csd;
pub mod error;
pub mod stream;
pub mod write;

pub use block_device::SdBlockDevice;
pub use card::SdCard;
pub use card_type::CardType;
pub use command::{Command, CommandFrame};
pub use config::SdConfig;
pub use error::DiskError;
pub use stream::SectorStream;
pub use write::PartialSectorWrite;
