//! Architecture boundary tests. Run with `cargo test -p firmware --test arch_boundaries`
// Architecture test file: expect/unwrap/panic are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
//!
//! Layering rules:
//!   Rule 1: platform (traits + mocks) must not depend on any other crate here
//!   Rule 2: sdcard and playback are no_std libraries that only see platform
//!   Rule 3: only the firmware binary touches the interrupt vector
//!
//! Rules 1 and 2 are enforced by the Cargo dependency graph; the tests below
//! are compile-time and source-level sanity checks.

/// The driver and the player compile against the platform traits alone.
#[test]
fn libraries_only_need_platform_traits() {
    fn _card<B: platform::bus::CardBus, D: embedded_hal::delay::DelayNs>(_: sdcard::SdCard<B, D>) {}
    fn _file<F: platform::storage::File>(f: &mut F, p: &mut playback::Player<'_>) {
        let _ = p.open_wav(f);
    }
    fn _dac<D: platform::audio::SampleDac>(_: playback::SampleEmitter<'_, D>) {}
}

/// Library crates stay `no_std` outside of tests.
#[test]
fn library_crates_are_no_std() {
    for (name, src) in [
        ("platform", include_str!("../../platform/src/lib.rs")),
        ("sdcard", include_str!("../../sdcard/src/lib.rs")),
        ("playback", include_str!("../../playback/src/lib.rs")),
    ] {
        assert!(src.contains("no_std"), "{name} must be no_std");
    }
}

/// Library crates must not name the HAL or the RTOS.
#[test]
fn library_crates_do_not_touch_the_hal() {
    for (name, manifest) in [
        ("platform", include_str!("../../platform/Cargo.toml")),
        ("sdcard", include_str!("../../sdcard/Cargo.toml")),
        ("playback", include_str!("../../playback/Cargo.toml")),
    ] {
        assert!(!manifest.contains("embassy"), "{name} must not depend on embassy");
        assert!(!manifest.contains("cortex-m"), "{name} must not depend on cortex-m");
    }
}

/// The sample interrupt clears its flag before doing anything else and
/// reaches the emitter only through a critical section.
#[test]
fn sample_interrupt_clears_flag_first() {
    let main_rs = include_str!("../src/main.rs");
    let handler = main_rs.find("fn TIM6_DAC()").expect("TIM6 handler missing");
    let body = &main_rs[handler..];
    let clear = body.find("set_uif(false)").expect("handler must clear UIF");
    let tick = body.find("on_tick()").expect("handler must tick the emitter");
    assert!(clear < tick, "UIF must be cleared before the emitter runs");
    assert!(body[..tick].contains("critical_section::with"));
}

/// The emitter's result is matched out in the interrupt, so a DAC with a
/// real error type cannot be dropped in silently.
#[test]
fn sample_interrupt_does_not_discard_the_tick_result() {
    let main_rs = include_str!("../src/main.rs");
    let handler = main_rs.find("fn TIM6_DAC()").expect("TIM6 handler missing");
    let end = main_rs[handler..].find("\n}\n").expect("handler must close") + handler;
    let body = &main_rs[handler..end];
    assert!(!body.contains("let _ ="), "tick result must not be discarded");
    assert!(body.contains("Err(never) => match never {}"));
}

/// Unmount reports handles that fail to close instead of dropping the error.
#[test]
fn unmount_logs_close_failures() {
    let storage_rs = include_str!("../src/storage.rs");
    let start = storage_rs.find("pub fn unmount").expect("unmount missing");
    let end = storage_rs[start..].find("\n    }\n").expect("unmount must close") + start;
    let body = &storage_rs[start..end];
    assert!(!body.contains("let _ ="), "close errors must not be discarded");
    assert_eq!(body.matches("warn!(").count(), 2);
}

/// `main.rs` must build the board clock tree, never the default one.
#[test]
fn main_uses_board_clock_config() {
    let main_rs = include_str!("../src/main.rs");
    assert!(main_rs.contains("embassy_stm32::init(firmware::boot::build_embassy_config())"));
    assert!(!main_rs.contains("embassy_stm32::init(Default::default())"));
}

/// The HardFault handler module is linked into every build.
#[test]
fn hardfault_handler_is_defined() {
    assert!(firmware::exception_handlers::HARDFAULT_DEFINED);
}
