//! PCM sample conversion and MCP4921 frame packing.
//!
//! The DAC takes a 16-bit frame: four control bits then a 12-bit unsigned
//! code, most-significant bit first.
//!
//! ```text
//!  15   14   13   12   11 ............ 0
//! A/B  BUF  GA  SHDN   D11 ........... D0
//!  0    0    1    1    high[7:0] low[7:4]
//! ```

/// Control nibble: channel A, unbuffered reference, 1× gain, output active.
pub const DAC_CONTROL_BITS: u16 = 0b0011 << 12;

/// One sample as the two bytes the DAC code is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Unsigned, mid-scale-centred high byte.
    pub high: u8,
    /// Low byte; only its top nibble reaches the DAC.
    pub low: u8,
}

impl Sample {
    /// Signed 16-bit little-endian PCM: flip the sign bit to move from
    /// two's complement to offset binary.
    pub const fn from_pcm16(low: u8, high: u8) -> Self {
        Self {
            high: high ^ 0x80,
            low,
        }
    }

    /// Unsigned 8-bit PCM is already offset binary.
    pub const fn from_pcm8(value: u8) -> Self {
        Self {
            high: value,
            low: 0,
        }
    }
}

/// How the high byte is clocked into the 12-bit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DacPacking {
    /// All eight high bits, then the top four low bits.
    #[default]
    Full = 0,
    /// High bits 7..1 then bit 1 again in place of bit 0. Matches the bit
    /// stream of earlier firmware builds.
    LegacyDuplicateBit1 = 1,
}

impl DacPacking {
    /// Decode a value stored with `as u8`; unknown values fall back to
    /// [`DacPacking::Full`].
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::LegacyDuplicateBit1,
            _ => Self::Full,
        }
    }

    /// 12-bit DAC code for `sample`.
    pub const fn code(self, sample: Sample) -> u16 {
        let high = match self {
            Self::Full => sample.high,
            Self::LegacyDuplicateBit1 => (sample.high & 0xFE) | ((sample.high >> 1) & 0x01),
        };
        ((high as u16) << 4) | (sample.low >> 4) as u16
    }

    /// Complete 16-bit DAC frame for `sample`.
    pub const fn frame(self, sample: Sample) -> u16 {
        DAC_CONTROL_BITS | self.code(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_mid_scale() {
        let frame = DacPacking::Full.frame(Sample::from_pcm16(0x00, 0x00));
        assert_eq!(frame, 0x3800);
    }

    #[test]
    fn full_scale_extremes() {
        // i16::MAX = 0x7FFF, i16::MIN = 0x8000
        assert_eq!(DacPacking::Full.code(Sample::from_pcm16(0xFF, 0x7F)), 0xFFF);
        assert_eq!(DacPacking::Full.code(Sample::from_pcm16(0x00, 0x80)), 0x000);
    }

    #[test]
    fn eight_bit_sample_fills_the_top_of_the_code() {
        assert_eq!(DacPacking::Full.frame(Sample::from_pcm8(0xA5)), 0x3A50);
    }

    #[test]
    fn legacy_packing_repeats_bit_1() {
        let odd = Sample { high: 0b1010_1001, low: 0xF0 };
        assert_eq!(DacPacking::LegacyDuplicateBit1.code(odd), 0b1010_1000_1111);
        let two = Sample { high: 0b0000_0010, low: 0 };
        assert_eq!(DacPacking::LegacyDuplicateBit1.code(two), 0b0000_0011_0000);
    }

    #[test]
    fn packing_survives_a_u8_round_trip() {
        for packing in [DacPacking::Full, DacPacking::LegacyDuplicateBit1] {
            assert_eq!(DacPacking::from_u8(packing as u8), packing);
        }
    }
}
