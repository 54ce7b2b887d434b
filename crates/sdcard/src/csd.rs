//! Capacity from the card-specific data register.

use crate::card_type::CardType;
use crate::error::DiskError;

/// Number of 512-byte blocks described by `csd`.
///
/// CSD version 1 (SD v1, standard-capacity SD v2, MMC) encodes
/// `(C_SIZE + 1) · 2^(C_SIZE_MULT + 2) · 2^READ_BL_LEN` bytes; version 2
/// (high capacity) encodes `(C_SIZE + 1) · 512 KiB`.
#[allow(clippy::arithmetic_side_effects)] // fields are at most 12 bits wide
pub fn block_count(csd: &[u8; 16], card_type: CardType) -> Result<u32, DiskError> {
    let [b0, _, _, _, _, b5, b6, b7, b8, b9, b10, ..] = *csd;
    let structure = b0 >> 6;

    if structure == 1 && !card_type.contains(CardType::MMC) {
        let c_size = (u32::from(b7 & 0x3F) << 16) | (u32::from(b8) << 8) | u32::from(b9);
        return c_size
            .checked_add(1)
            .and_then(|n| n.checked_mul(1024))
            .ok_or(DiskError::InvalidCsd);
    }
    if structure != 0 && !card_type.contains(CardType::MMC) {
        return Err(DiskError::InvalidCsd);
    }

    let read_bl_len = u32::from(b5 & 0x0F);
    let c_size =
        (u32::from(b6 & 0x03) << 10) | (u32::from(b7) << 2) | u32::from(b8 >> 6);
    let c_size_mult = (u32::from(b9 & 0x03) << 1) | u32::from(b10 >> 7);
    // Block length is 2^9..2^11, so the shift is at least 2 and at most 11.
    let shift = (c_size_mult + 2 + read_bl_len)
        .checked_sub(9)
        .ok_or(DiskError::InvalidCsd)?;
    (c_size + 1).checked_shl(shift).ok_or(DiskError::InvalidCsd)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn csd_v2_capacity() {
        // C_SIZE 0x1DA3 → 7588 × 512 KiB, a 3.7 GiB card.
        let mut csd = [0u8; 16];
        csd[0] = 0x40;
        csd[8] = 0x1D;
        csd[9] = 0xA3;
        assert_eq!(block_count(&csd, CardType::SD2 | CardType::BLOCK), Ok(7588 * 1024));
    }

    #[test]
    fn csd_v1_capacity() {
        // READ_BL_LEN 9, C_SIZE 4095, C_SIZE_MULT 7: 2 GiB at 512-byte blocks.
        let mut csd = [0u8; 16];
        csd[5] = 0x09;
        csd[6] = 0x03;
        csd[7] = 0xFF;
        csd[8] = 0xC0;
        csd[9] = 0x03;
        csd[10] = 0x80;
        assert_eq!(block_count(&csd, CardType::SD1), Ok(4096 * 512));
    }

    #[test]
    fn reserved_structure_rejected() {
        let mut csd = [0u8; 16];
        csd[0] = 0xC0;
        assert_eq!(block_count(&csd, CardType::SD2), Err(DiskError::InvalidCsd));
    }
}
