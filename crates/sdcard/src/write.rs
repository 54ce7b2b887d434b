//! Sector write contract.
//!
//! Writes are staged in three steps so a file layer can stream a sector in
//! pieces: open the sector (or announce a byte count), append bytes, then
//! commit. This driver reads only; its implementation refuses every step.

use embedded_hal::delay::DelayNs;
use platform::bus::CardBus;

use crate::card::SdCard;
use crate::error::DiskError;

/// Staged partial-sector writes.
pub trait PartialSectorWrite {
    /// Error type
    type Error;

    /// Begin writing `sector`, or announce `byte_count` bytes for the
    /// current sector.
    fn initiate(&mut self, sector_or_byte_count: u32) -> Result<(), Self::Error>;

    /// Append bytes to the open sector.
    fn append(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Pad and commit the open sector.
    fn finalize(&mut self) -> Result<(), Self::Error>;
}

impl<B, D> PartialSectorWrite for SdCard<B, D>
where
    B: CardBus,
    D: DelayNs,
{
    type Error = DiskError;

    fn initiate(&mut self, _sector_or_byte_count: u32) -> Result<(), Self::Error> {
        Err(DiskError::WriteUnsupported)
    }

    fn append(&mut self, _data: &[u8]) -> Result<(), Self::Error> {
        Err(DiskError::WriteUnsupported)
    }

    fn finalize(&mut self) -> Result<(), Self::Error> {
        Err(DiskError::WriteUnsupported)
    }
}
