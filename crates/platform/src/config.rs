//! Application configuration and constants
//!
//! Central values shared by the driver, the player and the firmware binary.

/// The application name
pub const APP_NAME: &str = "WaveCard";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bytes per card sector; also the capacity of each audio buffer.
pub const SECTOR_SIZE: usize = 512;

/// Sample rate used when playback is configured for a fixed-rate timer.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 22_050;

/// SPI clock while the card is in identification mode (must be ≤400 kHz).
pub const SPI_INIT_FREQUENCY_HZ: u32 = 400_000;

/// SPI clock after bring-up.
pub const SPI_RUN_FREQUENCY_HZ: u32 = 16_000_000;

/// Startup banner.
pub const fn banner() -> &'static str {
    "WaveCard SD WAV player"
}
