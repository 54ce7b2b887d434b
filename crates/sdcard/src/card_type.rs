//! Card classification bitmask.

use core::ops::BitOr;

/// Card family and addressing mode, set once by
/// [`SdCard::initialize`](crate::SdCard::initialize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct CardType(u8);

impl CardType {
    /// Not (yet) classified.
    pub const EMPTY: Self = Self(0);
    /// MMC version 3.
    pub const MMC: Self = Self(0x01);
    /// SD version 1.
    pub const SD1: Self = Self(0x02);
    /// SD version 2.
    pub const SD2: Self = Self(0x04);
    /// Addresses are block numbers rather than byte offsets.
    pub const BLOCK: Self = Self(0x08);

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no card has been classified.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether sector numbers are sent unscaled.
    pub const fn is_block_addressed(self) -> bool {
        self.contains(Self::BLOCK)
    }
}

impl BitOr for CardType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::fmt::Display for CardType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let family = if self.contains(Self::SD2) {
            "SDv2"
        } else if self.contains(Self::SD1) {
            "SDv1"
        } else if self.contains(Self::MMC) {
            "MMCv3"
        } else {
            return f.write_str("none");
        };
        f.write_str(family)?;
        if self.is_block_addressed() {
            f.write_str(" (block addressed)")?;
        }
        Ok(())
    }
}
