//! Playback configuration.

use platform::audio_types::SampleRateHz;

use crate::error::FormatError;
use crate::sample::DacPacking;
use crate::wav::WavFormat;

/// Where the sample timer rate comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RateSource {
    /// The `sample_rate` field of the WAV fmt chunk.
    #[default]
    FromHeader,
    /// A fixed rate regardless of the file.
    Fixed(SampleRateHz),
}

/// Options for [`Player`](crate::scheduler::Player).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlaybackConfig {
    /// Timer rate selection.
    pub rate: RateSource,
    /// DAC bit packing.
    pub packing: DacPacking,
}

impl PlaybackConfig {
    /// Behaviour of earlier firmware builds: every file ticks at
    /// 22 050 Hz and bit 1 of the high byte is sent twice.
    pub fn compatible() -> Self {
        Self {
            rate: RateSource::Fixed(SampleRateHz::DEFAULT),
            packing: DacPacking::LegacyDuplicateBit1,
        }
    }

    /// Timer rate for `format`.
    ///
    /// Only a header-driven rate can fail; a fixed rate ignores the header.
    pub fn timer_rate(&self, format: &WavFormat) -> Result<SampleRateHz, FormatError> {
        match self.rate {
            RateSource::FromHeader => format.sample_rate_hz(),
            RateSource::Fixed(rate) => Ok(rate),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use platform::config::DEFAULT_SAMPLE_RATE_HZ;

    fn format(sample_rate: u32) -> WavFormat {
        WavFormat {
            channels: 1,
            sample_rate,
            byte_rate: sample_rate,
            bits_per_sample: 8,
            data_size: 4,
        }
    }

    #[test]
    fn default_follows_the_header() {
        let config = PlaybackConfig::default();
        assert_eq!(config.timer_rate(&format(8_000)).unwrap().get(), 8_000);
        assert_eq!(config.packing, DacPacking::Full);
    }

    #[test]
    fn header_rate_outside_the_timer_range_is_refused() {
        let config = PlaybackConfig::default();
        assert_eq!(
            config.timer_rate(&format(500)),
            Err(FormatError::SampleRate(500))
        );
    }

    #[test]
    fn compatible_preset_pins_the_rate() {
        let config = PlaybackConfig::compatible();
        assert_eq!(config.timer_rate(&format(8_000)).unwrap().get(), DEFAULT_SAMPLE_RATE_HZ);
        assert_eq!(config.timer_rate(&format(500)).unwrap().get(), DEFAULT_SAMPLE_RATE_HZ);
        assert_eq!(config.packing, DacPacking::LegacyDuplicateBit1);
    }
}
