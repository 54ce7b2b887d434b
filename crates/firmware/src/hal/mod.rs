//! Board peripherals behind the `platform` traits.
//!
//! - `sample_timer`: TIM6 update interrupt as the [`platform::timer::SampleTimer`]

#[cfg(feature = "hardware")]
pub mod sample_timer;

#[cfg(feature = "hardware")]
pub use sample_timer::Tim6SampleTimer;
