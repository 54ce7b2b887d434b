//! Periodic sample-rate timer.
//!
//! The timer owns the interrupt that drives the sample emitter. The control
//! context only arms it, disarms it, and idles between status polls.
//! Disarming is the only way to stop playback early.

use crate::audio_types::SampleRateHz;

/// Fixed-rate tick source for the sample emitter.
///
/// Contract for the registered tick callback: bounded execution time, no
/// blocking calls, and only single-writer access to shared playback state.
pub trait SampleTimer {
    /// Start ticking at `rate`.
    fn arm(&mut self, rate: SampleRateHz);

    /// Stop ticking. No tick callback runs after this returns.
    fn disarm(&mut self);

    /// Whether the timer is currently armed.
    fn is_armed(&self) -> bool;

    /// Wait for something to happen while polling playback status.
    ///
    /// On hardware this is `wfi`; host timers run one simulated tick.
    fn idle(&mut self);
}

/// Timer reload value for `rate` given the timer kernel clock.
///
/// Returns `None` when the period does not fit a 16-bit auto-reload register
/// without a prescaler.
pub fn reload_for(kernel_clock_hz: u32, rate: SampleRateHz) -> Option<u16> {
    let ticks = kernel_clock_hz.checked_div(rate.get())?;
    u16::try_from(ticks.checked_sub(1)?).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn reload_matches_22050_hz_at_4_mhz() {
        // 4 MHz / 22050 Hz = 181 ticks, auto-reload 180.
        let rate = SampleRateHz::new(22_050).unwrap();
        assert_eq!(reload_for(4_000_000, rate), Some(180));
    }

    #[test]
    fn reload_rejects_period_above_16_bits() {
        let rate = SampleRateHz::new(1_000).unwrap();
        assert_eq!(reload_for(200_000_000, rate), None);
    }
}
