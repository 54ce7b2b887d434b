//! `embedded-sdmmc` block device over the SPI-mode driver.
//!
//! Mounting a FAT volume needs `&self` access to the card, so the driver is
//! held in a `RefCell`; the volume manager never re-enters a block call.

use core::cell::RefCell;

use embedded_hal::delay::DelayNs;
use embedded_sdmmc::{Block, BlockCount, BlockDevice, BlockIdx};
use platform::bus::CardBus;
use platform::config::SECTOR_SIZE;

use crate::card::SdCard;
use crate::error::DiskError;

/// Read-only [`BlockDevice`] for an initialised [`SdCard`].
pub struct SdBlockDevice<B, D> {
    card: RefCell<SdCard<B, D>>,
}

impl<B, D> SdBlockDevice<B, D>
where
    B: CardBus,
    D: DelayNs,
{
    /// Wrap a card that has completed bring-up.
    pub fn new(card: SdCard<B, D>) -> Self {
        Self {
            card: RefCell::new(card),
        }
    }

    /// Run `f` with exclusive access to the card, e.g. to re-initialise it
    /// after an error.
    pub fn with_card<R>(&self, f: impl FnOnce(&mut SdCard<B, D>) -> R) -> R {
        f(&mut self.card.borrow_mut())
    }

    /// Give back the driver.
    pub fn into_inner(self) -> SdCard<B, D> {
        self.card.into_inner()
    }
}

impl<B, D> BlockDevice for SdBlockDevice<B, D>
where
    B: CardBus,
    D: DelayNs,
{
    type Error = DiskError;

    fn read(&self, blocks: &mut [Block], start_block_idx: BlockIdx, _reason: &str) -> Result<(), Self::Error> {
        let mut card = self.card.borrow_mut();
        for (block, sector) in blocks.iter_mut().zip(start_block_idx.0..) {
            card.read_partial_sector(Some(&mut block.contents), sector, 0, SECTOR_SIZE)?;
        }
        Ok(())
    }

    fn write(&self, _blocks: &[Block], _start_block_idx: BlockIdx) -> Result<(), Self::Error> {
        Err(DiskError::WriteUnsupported)
    }

    fn num_blocks(&self) -> Result<BlockCount, Self::Error> {
        self.card.borrow_mut().num_blocks().map(BlockCount)
    }
}
