//! TIM6 as the sample timer.
//!
//! TIM6 is a basic timer with no pins, which makes it a clean periodic
//! interrupt source. The prescaler is fixed at boot so the counter runs at
//! [`SAMPLE_TIMER_TICK_HZ`]; arming only rewrites the auto-reload value.
//!
//! The interrupt handler itself lives in `main.rs`, next to the emitter it
//! ticks; it must clear the update flag first thing.

use embassy_stm32::interrupt::{self, InterruptExt};
use embassy_stm32::pac;
use embassy_stm32::peripherals::TIM6;
use platform::audio_types::SampleRateHz;
use platform::timer::{reload_for, SampleTimer};

use crate::boot::{timer_prescaler, APB1_TIMER_HZ, SAMPLE_TIMER_TICK_HZ};

/// TIM6 update interrupt at the sample rate.
pub struct Tim6SampleTimer {
    _tim: TIM6,
    armed: bool,
}

impl Tim6SampleTimer {
    /// Clock and prescale TIM6 and unmask its interrupt; the counter stays
    /// stopped until [`SampleTimer::arm`].
    pub fn new(tim: TIM6) -> Self {
        pac::RCC.apb1lenr().modify(|w| w.set_tim6en(true));

        let regs = pac::TIM6;
        regs.cr1().modify(|w| w.set_cen(false));
        regs.psc()
            .write_value(timer_prescaler(APB1_TIMER_HZ, SAMPLE_TIMER_TICK_HZ).unwrap_or(u16::MAX));
        regs.dier().modify(|w| w.set_uie(true));
        regs.sr().modify(|w| w.set_uif(false));

        interrupt::TIM6_DAC.unpend();
        // SAFETY: the handler only reaches shared state through a critical
        // section and the lock-free playback context.
        unsafe { interrupt::TIM6_DAC.enable() };

        Self {
            _tim: tim,
            armed: false,
        }
    }
}

impl SampleTimer for Tim6SampleTimer {
    fn arm(&mut self, rate: SampleRateHz) {
        let reload = reload_for(SAMPLE_TIMER_TICK_HZ, rate).unwrap_or(u16::MAX);
        let regs = pac::TIM6;
        regs.arr().write(|w| w.set_arr(reload));
        // Load ARR/PSC now instead of at the next overflow.
        regs.egr().write(|w| w.set_ug(true));
        regs.sr().modify(|w| w.set_uif(false));
        interrupt::TIM6_DAC.unpend();
        regs.cr1().modify(|w| w.set_cen(true));
        self.armed = true;
    }

    fn disarm(&mut self) {
        let regs = pac::TIM6;
        regs.cr1().modify(|w| w.set_cen(false));
        regs.sr().modify(|w| w.set_uif(false));
        interrupt::TIM6_DAC.unpend();
        self.armed = false;
    }

    fn is_armed(&self) -> bool {
        self.armed
    }

    fn idle(&mut self) {
        cortex_m::asm::wfi();
    }
}
