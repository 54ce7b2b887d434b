//! Audio domain newtypes.
//!
//! - `SampleRateHz`: validates the 1 kHz–44.1 kHz range the emitter can sustain
//! - `SampleWidth`: bytes consumed per mono sample (1 or 2)

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

impl core::fmt::Display for OutOfRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "value {} outside {}..={}",
            self.value, self.min, self.max
        )
    }
}

// ── SampleRateHz ─────────────────────────────────────────────────────────────

/// Sample rate in Hz, validated to the range the bit-banged DAC path can
/// sustain from a timer interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct SampleRateHz(u32);

impl SampleRateHz {
    /// Minimum supported sample rate.
    pub const MIN_HZ: u32 = 1_000;

    /// Maximum supported sample rate (CD rate).
    pub const MAX_HZ: u32 = 44_100;

    /// Fixed timer rate of earlier firmware builds.
    pub const DEFAULT: Self = Self(crate::config::DEFAULT_SAMPLE_RATE_HZ);

    /// Create a `SampleRateHz`, returning an error if out of 1000–44100 Hz.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `hz < 1000` or `hz > 44100`.
    pub fn new(hz: u32) -> Result<Self, OutOfRangeError> {
        if hz < Self::MIN_HZ || hz > Self::MAX_HZ {
            Err(OutOfRangeError {
                value: hz,
                min: Self::MIN_HZ,
                max: Self::MAX_HZ,
            })
        } else {
            Ok(Self(hz))
        }
    }

    /// Return the sample rate in Hz.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

// ── SampleWidth ──────────────────────────────────────────────────────────────

/// Bytes consumed from the stream per mono sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SampleWidth {
    /// Unsigned 8-bit PCM.
    Eight = 1,
    /// Signed 16-bit little-endian PCM.
    Sixteen = 2,
}

impl SampleWidth {
    /// Width for a `bits_per_sample` header value: anything above 8 bits is
    /// read as two bytes.
    #[must_use]
    pub fn from_bits(bits_per_sample: u16) -> Self {
        if bits_per_sample > 8 {
            Self::Sixteen
        } else {
            Self::Eight
        }
    }

    /// Number of bytes per sample.
    #[must_use]
    pub fn bytes(self) -> usize {
        self as usize
    }
}
