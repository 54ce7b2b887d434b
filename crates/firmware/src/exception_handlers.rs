//! Cortex-M exception handlers.
//!
//! A HardFault on this board most often means a stack overflow or a stray
//! pointer in the sample interrupt. The handler reports the stacked frame
//! address over RTT and halts; the DAC output freezes at the last sample.
//!
//! The `#[cortex_m_rt::exception]` attribute needs the ARM target, so the
//! handler is gated behind the `hardware` feature while the module itself
//! compiles everywhere.

#![allow(clippy::doc_markdown)]

/// `true` once this module is linked; checked by the host tests.
pub const HARDFAULT_DEFINED: bool = true;

/// HardFault handler (hardware target only).
///
/// Must never return: returning from a HardFault is undefined behavior on
/// Cortex-M, which the `-> !` return type enforces.
#[cfg(feature = "hardware")]
#[cortex_m_rt::exception]
#[allow(unsafe_code)]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::panic!(
        "HardFault: stacked frame at 0x{:08X}, check the stacked PC",
        ef as *const _ as u32
    );
}
