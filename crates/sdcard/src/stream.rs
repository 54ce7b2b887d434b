//! Byte stream over a contiguous run of sectors.
//!
//! Lets the player read a file whose extent is known (a raw card image, or a
//! contiguously allocated file) without a filesystem, using nothing but
//! partial sector reads.

use embedded_hal::delay::DelayNs;
use platform::bus::CardBus;
use platform::config::SECTOR_SIZE;
use platform::storage::File;

use crate::card::SdCard;
use crate::error::DiskError;

/// [`File`] over `len` bytes starting at the first byte of sector `start`.
pub struct SectorStream<'c, B, D> {
    card: &'c mut SdCard<B, D>,
    start: u32,
    len: u32,
    pos: u32,
}

impl<'c, B, D> SectorStream<'c, B, D>
where
    B: CardBus,
    D: DelayNs,
{
    /// Stream `len` bytes from sector `start` on an initialised card.
    pub fn new(card: &'c mut SdCard<B, D>, start: u32, len: u32) -> Self {
        Self {
            card,
            start,
            len,
            pos: 0,
        }
    }

    /// Current byte position.
    pub fn position(&self) -> u32 {
        self.pos
    }
}

impl<B, D> File for SectorStream<'_, B, D>
where
    B: CardBus,
    D: DelayNs,
{
    type Error = DiskError;

    /// Fill `buf` from as many sectors as needed, stopping at the end of the
    /// extent. Each sector touched costs one single-block read.
    #[allow(clippy::arithmetic_side_effects)] // pos < len, filled < buf.len(), offset < SECTOR_SIZE
    #[allow(clippy::cast_possible_truncation)] // n <= SECTOR_SIZE
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut filled = 0usize;
        while filled < buf.len() && self.pos < self.len {
            let sector_size = SECTOR_SIZE as u32;
            let sector = self
                .start
                .checked_add(self.pos / sector_size)
                .ok_or(DiskError::OutOfRange)?;
            let offset = (self.pos % sector_size) as usize;
            let remaining = (self.len - self.pos) as usize;
            let n = (SECTOR_SIZE - offset)
                .min(remaining)
                .min(buf.len() - filled);

            let dest = buf
                .get_mut(filled..filled + n)
                .ok_or(DiskError::OutOfRange)?;
            self.card.read_partial_sector(Some(dest), sector, offset, n)?;

            filled += n;
            self.pos += n as u32;
        }
        Ok(filled)
    }

    fn skip(&mut self, bytes: u32) -> Result<(), Self::Error> {
        self.pos = self.pos.saturating_add(bytes).min(self.len);
        Ok(())
    }
}
