//! Clock tree and boot order for the WaveCard board.
//!
//! Initialization order:
//!   1. RCC: PLL1 system clock, SPI1 kernel clock low enough for 400 kHz
//!   2. SPI1 blocking, card chip-select parked high
//!   3. MCP4921 lines parked (CS high, SCK low)
//!   4. TIM6 prescaled to the sample-timer tick, update interrupt unmasked
//!   5. Card bring-up at the slow clock, then the fast clock
//!   6. Mount, play the root directory, repeat

use platform::config::{SPI_INIT_FREQUENCY_HZ, SPI_RUN_FREQUENCY_HZ};

/// Ordered boot steps, mirrored by `main.rs`.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. RCC: PLL1 400 MHz sysclk, PLL1_Q 100 MHz SPI1 kernel clock",
    "2. SPI1: blocking, identification clock, card CS high",
    "3. DAC: MCP4921 CS high, SCK low",
    "4. TIM6: prescaler to 4 MHz tick, update interrupt enabled",
    "5. Card: power-up clocks, identify, raise SPI clock",
    "6. FAT: mount volume 0, play root directory, repeat",
];

/// System clock after `build_embassy_config()`.
pub const SYSCLK_HZ: u32 = 400_000_000;

/// SPI1 kernel clock (PLL1_Q).
pub const SPI_KERNEL_HZ: u32 = 100_000_000;

/// APB1 timer kernel clock: twice PCLK1 because APB1 is divided.
pub const APB1_TIMER_HZ: u32 = 200_000_000;

/// Tick rate TIM6 counts at; the auto-reload value then sets the sample rate.
pub const SAMPLE_TIMER_TICK_HZ: u32 = 4_000_000;

/// Largest divider of the STM32H7 SPI baud-rate generator.
pub const SPI_MAX_DIVIDER: u32 = 256;

/// Timer prescaler register value that turns `kernel_hz` into `tick_hz`.
///
/// `None` unless `tick_hz` divides `kernel_hz` exactly and the result fits
/// the 16-bit register.
pub const fn timer_prescaler(kernel_hz: u32, tick_hz: u32) -> Option<u16> {
    let (Some(divider), Some(0)) = (kernel_hz.checked_div(tick_hz), kernel_hz.checked_rem(tick_hz)) else {
        return None;
    };
    match divider.checked_sub(1) {
        #[allow(clippy::cast_possible_truncation)] // guarded to 16 bits
        Some(value) if value <= 0xFFFF => Some(value as u16),
        _ => None,
    }
}

/// Slowest SPI clock reachable from `kernel_hz`.
pub const fn slowest_spi_clock(kernel_hz: u32) -> u32 {
    kernel_hz / SPI_MAX_DIVIDER
}

/// Whether the identification clock can be met from the SPI kernel clock.
pub const fn spi_init_clock_reachable() -> bool {
    slowest_spi_clock(SPI_KERNEL_HZ) <= SPI_INIT_FREQUENCY_HZ && SPI_RUN_FREQUENCY_HZ <= SPI_KERNEL_HZ / 2
}

/// Embassy configuration for this board.
///
/// Always call `embassy_stm32::init(build_embassy_config())` from `main.rs`:
/// the default clock tree feeds SPI1 too fast to reach the card's 400 kHz
/// identification clock.
#[cfg(feature = "hardware")]
pub fn build_embassy_config() -> embassy_stm32::Config {
    use embassy_stm32::rcc::*;

    let mut config = embassy_stm32::Config::default();

    // ── Oscillators ─────────────────────────────────────────────────────────
    config.rcc.hsi = Some(HSIPrescaler::DIV1); // 64 MHz
    config.rcc.csi = true;

    // ── PLL1: system clock + SPI1 kernel clock ──────────────────────────────
    // HSI (64 MHz) / prediv(4) = 16 MHz → × mul(50) = 800 MHz VCO
    // PLL1_P = VCO / divp(2) = 400 MHz  → system clock
    // PLL1_Q = VCO / divq(8) = 100 MHz  → SPI1 kernel clock (SPI123SEL default)
    config.rcc.pll1 = Some(Pll {
        source: PllSource::HSI,
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL50,
        divp: Some(PllDiv::DIV2),
        divq: Some(PllDiv::DIV8),
        divr: None,
    });

    // ── System clock + bus prescalers ────────────────────────────────────────
    config.rcc.sys = Sysclk::PLL1_P; // 400 MHz
    config.rcc.ahb_pre = AHBPrescaler::DIV2; // 200 MHz
    config.rcc.apb1_pre = APBPrescaler::DIV2; // 100 MHz, timers 200 MHz
    config.rcc.apb2_pre = APBPrescaler::DIV2;
    config.rcc.apb3_pre = APBPrescaler::DIV2;
    config.rcc.apb4_pre = APBPrescaler::DIV2;
    config.rcc.voltage_scale = VoltageScale::Scale1;

    config
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use platform::audio_types::SampleRateHz;
    use platform::timer::reload_for;

    #[test]
    fn boot_steps_configure_clocks_before_the_card() {
        let rcc = BOOT_SEQUENCE_STEPS.iter().position(|s| s.contains("RCC")).unwrap();
        let card = BOOT_SEQUENCE_STEPS.iter().position(|s| s.contains("Card")).unwrap();
        let timer = BOOT_SEQUENCE_STEPS.iter().position(|s| s.contains("TIM6")).unwrap();
        assert!(rcc < card);
        assert!(timer < card, "sample timer must exist before playback starts");
    }

    #[test]
    fn tim6_prescaler_gives_4_mhz() {
        assert_eq!(timer_prescaler(APB1_TIMER_HZ, SAMPLE_TIMER_TICK_HZ), Some(49));
    }

    #[test]
    fn prescaler_rejects_inexact_or_oversized_dividers() {
        assert_eq!(timer_prescaler(200_000_000, 3_000_000), None);
        assert_eq!(timer_prescaler(200_000_000, 1), None);
        assert_eq!(timer_prescaler(200_000_000, 0), None);
    }

    #[test]
    fn every_sample_rate_fits_the_reload_register() {
        for hz in [SampleRateHz::MIN_HZ, 8_000, 22_050, SampleRateHz::MAX_HZ] {
            let rate = SampleRateHz::new(hz).unwrap();
            assert!(reload_for(SAMPLE_TIMER_TICK_HZ, rate).is_some(), "{hz} Hz");
        }
    }

    #[test]
    fn card_clocks_are_reachable() {
        assert!(spi_init_clock_reachable());
        assert!(slowest_spi_clock(SPI_KERNEL_HZ) <= 400_000);
        assert!(SYSCLK_HZ > SPI_KERNEL_HZ);
    }
}
