//! Sector streams, the FAT block-device adapter and the write contract.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]

use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_sdmmc::{Block, BlockDevice, BlockIdx};
use platform::mocks::{CardKind, MockCard};
use platform::storage::File;
use sdcard::{DiskError, PartialSectorWrite, SdBlockDevice, SdCard, SectorStream};

fn image() -> Vec<u8> {
    (0..4 * 512).map(|i| (i / 3 % 256) as u8).collect()
}

fn card() -> SdCard<MockCard, NoopDelay> {
    let mut card = SdCard::new(MockCard::new(CardKind::SdV2 { high_capacity: true }, image()), NoopDelay);
    card.initialize().unwrap();
    card
}

#[test]
fn stream_read_spans_sector_boundaries() {
    let mut card = card();
    let mut stream = SectorStream::new(&mut card, 1, 1200);
    stream.skip(500).unwrap();

    let mut buf = [0u8; 600];
    assert_eq!(stream.read(&mut buf).unwrap(), 600);
    assert_eq!(&buf[..], &image()[1012..1612]);
    assert_eq!(stream.position(), 1100);
}

#[test]
fn stream_stops_at_extent_end() {
    let mut card = card();
    let mut stream = SectorStream::new(&mut card, 0, 700);
    let mut buf = [0u8; 1024];
    assert_eq!(stream.read(&mut buf).unwrap(), 700);
    assert_eq!(stream.read(&mut buf).unwrap(), 0);
}

#[test]
fn stream_skip_is_clamped_and_free() {
    let mut card = card();
    let mut stream = SectorStream::new(&mut card, 0, 100);
    stream.skip(u32::MAX).unwrap();
    assert_eq!(stream.position(), 100);
    drop(stream);

    let (mock, _) = card.release();
    assert!(!mock.command_indices().contains(&17));
}

#[test]
fn block_device_reads_consecutive_blocks() {
    let device = SdBlockDevice::new(card());
    let mut blocks = [Block::new(), Block::new()];
    device.read(&mut blocks, BlockIdx(2), "consecutive").unwrap();
    assert_eq!(&blocks[0].contents[..], &image()[1024..1536]);
    assert_eq!(&blocks[1].contents[..], &image()[1536..2048]);
}

#[test]
fn block_device_reports_capacity_and_refuses_writes() {
    let device = SdBlockDevice::new(card());
    assert_eq!(device.num_blocks().unwrap().0, 1024);
    assert_eq!(
        device.write(&[Block::new()], BlockIdx(0)),
        Err(DiskError::WriteUnsupported)
    );
}

#[test]
fn partial_writes_are_unsupported() {
    let mut card = card();
    assert_eq!(card.initiate(0), Err(DiskError::WriteUnsupported));
    assert_eq!(card.append(&[1, 2, 3]), Err(DiskError::WriteUnsupported));
    assert_eq!(card.finalize(), Err(DiskError::WriteUnsupported));
}
