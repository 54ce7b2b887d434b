//! Card bring-up and classification against the SPI-mode card simulator.
//!
//! Classification depends only on how the card answers CMD8, ACMD41/CMD1
//! and CMD58, so each test scripts one card family and checks both the
//! resulting `CardType` and the exact command sequence on the bus.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]

use embedded_hal_mock::eh1::delay::NoopDelay;
use platform::mocks::{CardKind, MockCard};
use sdcard::{CardType, DiskError, SdCard, SdConfig};

fn bring_up(mock: MockCard) -> (Result<CardType, DiskError>, MockCard) {
    let mut card = SdCard::new(mock, NoopDelay);
    let result = card.initialize();
    assert_eq!(card.card_type(), result.unwrap_or(CardType::EMPTY));
    let (mock, _) = card.release();
    (result, mock)
}

fn image() -> Vec<u8> {
    vec![0u8; 8 * 512]
}

#[test]
fn sd_v2_high_capacity_is_block_addressed() {
    let (result, mock) = bring_up(MockCard::new(CardKind::SdV2 { high_capacity: true }, image()));
    assert_eq!(result, Ok(CardType::SD2 | CardType::BLOCK));
    assert_eq!(mock.command_indices(), vec![0, 8, 55, 41, 58]);
}

#[test]
fn sd_v2_standard_capacity_is_byte_addressed() {
    let (result, _) = bring_up(MockCard::new(
        CardKind::SdV2 {
            high_capacity: false,
        },
        image(),
    ));
    assert_eq!(result, Ok(CardType::SD2));
}

#[test]
fn sd_v2_op_cond_carries_hcs_bit() {
    let (_, mock) = bring_up(MockCard::new(CardKind::SdV2 { high_capacity: true }, image()));
    assert!(mock.commands().contains(&(41, 1 << 30)));
    assert!(mock.commands().contains(&(8, 0x1AA)));
}

#[test]
fn sd_v1_answers_acmd41_and_gets_block_length() {
    let (result, mock) = bring_up(MockCard::new(CardKind::SdV1, image()));
    assert_eq!(result, Ok(CardType::SD1));
    assert_eq!(mock.command_indices(), vec![0, 8, 55, 41, 55, 41, 16]);
    assert!(mock.commands().contains(&(16, 512)));
}

#[test]
fn mmc_falls_back_to_cmd1() {
    let (result, mock) = bring_up(MockCard::new(CardKind::Mmc, image()));
    assert_eq!(result, Ok(CardType::MMC));
    assert_eq!(mock.command_indices(), vec![0, 8, 55, 1, 16]);
}

#[test]
fn empty_slot_reports_no_card() {
    let (result, mock) = bring_up(MockCard::new(CardKind::Absent, image()));
    assert_eq!(result, Err(DiskError::NoCard));
    assert_eq!(mock.command_indices(), vec![0]);
}

#[test]
fn power_up_clocks_precede_the_first_command() {
    let (_, mock) = bring_up(MockCard::new(CardKind::Absent, image()));
    // 10 idle bytes, 2 resync bytes, 6 frame bytes, 10 response polls, 1 release.
    assert_eq!(mock.exchanges(), 10 + 2 + 6 + 10 + 1);
}

#[test]
fn busy_card_is_polled_until_ready() {
    let (result, mock) = bring_up(
        MockCard::new(CardKind::SdV2 { high_capacity: true }, image()).with_busy_polls(3),
    );
    assert_eq!(result, Ok(CardType::SD2 | CardType::BLOCK));
    let acmd41 = mock.command_indices().iter().filter(|&&i| i == 41).count();
    assert_eq!(acmd41, 4);
}

#[test]
fn op_cond_budget_exhaustion_leaves_card_unclassified() {
    let config = SdConfig {
        op_cond_attempts: 5,
        ..SdConfig::default()
    };
    let mut card = SdCard::with_config(
        MockCard::new(CardKind::SdV2 { high_capacity: true }, image()).with_busy_polls(50),
        NoopDelay,
        config,
    )
    .unwrap();
    assert_eq!(card.initialize(), Err(DiskError::NotInitialized));
    assert!(card.card_type().is_empty());
    let (mock, _) = card.release();
    // No OCR read once the budget is gone.
    assert!(!mock.command_indices().contains(&58));
}

#[test]
fn zero_token_budget_is_refused() {
    let config = SdConfig {
        token_polls: 0,
        ..SdConfig::default()
    };
    let card = SdCard::with_config(MockCard::new(CardKind::SdV1, image()), NoopDelay, config);
    assert_eq!(
        card.err(),
        Some(DiskError::InvalidConfig("token_polls must be non-zero"))
    );
}

#[test]
fn wrong_voltage_echo_leaves_card_unclassified() {
    let (result, mock) = bring_up(
        MockCard::new(CardKind::SdV2 { high_capacity: true }, image()).with_echo_pattern(0x55),
    );
    assert_eq!(result, Err(DiskError::NotInitialized));
    assert_eq!(mock.command_indices(), vec![0, 8]);
}

#[test]
fn rejected_block_length_invalidates_legacy_classification() {
    let (result, _) = bring_up(MockCard::new(CardKind::SdV1, image()).rejecting_block_len());
    assert_eq!(result, Err(DiskError::NotInitialized));
}

#[test]
fn late_r1_within_poll_budget_is_accepted() {
    let (result, _) = bring_up(MockCard::new(CardKind::SdV1, image()).with_response_delay(9));
    assert_eq!(result, Ok(CardType::SD1));
}

#[test]
fn r1_after_poll_budget_counts_as_no_card() {
    let (result, _) = bring_up(MockCard::new(CardKind::SdV1, image()).with_response_delay(10));
    assert_eq!(result, Err(DiskError::NoCard));
}

#[test]
fn failed_reinitialisation_clears_previous_type() {
    let mut card = SdCard::new(MockCard::new(CardKind::SdV1, image()), NoopDelay);
    card.initialize().unwrap();
    assert_eq!(card.card_type(), CardType::SD1);

    let mut card = SdCard::new(MockCard::new(CardKind::Absent, image()), NoopDelay);
    assert!(card.initialize().is_err());
    assert_eq!(card.card_type(), CardType::EMPTY);
}
