//! Per-tick sample emission, run from the sample timer interrupt.
//!
//! Each tick does a bounded amount of work: at most one slot swap, one
//! sample read from memory and one 16-clock DAC frame. It never blocks and
//! never logs.

use platform::audio::SampleDac;
use platform::audio_types::SampleWidth;

use crate::buffer::{PlaybackStatus, SharedPlayback};
use crate::sample::Sample;

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tick {
    /// A frame was sent to the DAC.
    Emitted(u16),
    /// The next slot was still being refilled; nothing was sent.
    Underrun,
    /// No stream is playing (finished, drained, or never started).
    Idle,
}

/// Drains the active slot into the DAC, one sample per tick.
pub struct SampleEmitter<'a, DAC> {
    shared: &'a SharedPlayback,
    dac: DAC,
}

impl<'a, DAC> SampleEmitter<'a, DAC>
where
    DAC: SampleDac,
{
    /// Emitter for the streams started on `shared`.
    pub fn new(shared: &'a SharedPlayback, dac: DAC) -> Self {
        Self { shared, dac }
    }

    /// Borrow the DAC.
    pub fn dac(&self) -> &DAC {
        &self.dac
    }

    /// Give back the DAC.
    pub fn into_dac(self) -> DAC {
        self.dac
    }

    /// Timer tick handler.
    ///
    /// The end-of-stream check runs before anything else, and an exhausted
    /// slot is swapped (flipping the status to `Filling`) before the sample
    /// is read, so the cursor is never read at or past the live end.
    pub fn on_tick(&mut self) -> Result<Tick, DAC::Error> {
        let shared = self.shared;
        if shared.is_drained() || shared.is_complete() {
            return Ok(Tick::Idle);
        }

        if shared.active_remaining().is_empty() {
            match shared.try_swap() {
                PlaybackStatus::Ready => {}
                PlaybackStatus::Filling => {
                    shared.note_underrun();
                    return Ok(Tick::Underrun);
                }
                PlaybackStatus::LastBuffer => {
                    shared.mark_drained();
                    return Ok(Tick::Idle);
                }
            }
        }

        let width = shared.width();
        let sample = match (width, shared.active_remaining()) {
            (_, []) => {
                // Swapped into an empty slot; wait for the next refill.
                shared.note_underrun();
                return Ok(Tick::Underrun);
            }
            (SampleWidth::Sixteen, [low, rest @ ..]) => {
                Sample::from_pcm16(*low, rest.first().copied().unwrap_or(0))
            }
            (SampleWidth::Eight, [value, ..]) => Sample::from_pcm8(*value),
        };
        shared.advance(width.bytes());

        let frame = shared.packing().frame(sample);
        self.dac.write_word(frame)?;
        Ok(Tick::Emitted(frame))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::sample::DacPacking;
    use platform::mocks::RecordingDac;

    fn primed(data: &[u8], second: &[u8], width: SampleWidth, size: u32) -> SharedPlayback {
        let shared = SharedPlayback::new();
        shared.prepare(size, width, DacPacking::Full);
        for (index, bytes) in [(0, data), (1, second)] {
            shared
                .fill_slot(index, |buf| {
                    buf.get_mut(..bytes.len()).unwrap().copy_from_slice(bytes);
                    Ok::<_, ()>(bytes.len())
                })
                .unwrap()
                .unwrap();
        }
        shared.start(!second.is_empty());
        shared
    }

    #[test]
    fn idle_context_emits_nothing() {
        let shared = SharedPlayback::new();
        let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
        assert_eq!(emitter.on_tick().unwrap(), Tick::Idle);
        assert!(emitter.dac().words().is_empty());
    }

    #[test]
    fn eight_bit_samples_advance_one_byte() {
        let shared = primed(&[0x00, 0xFF], &[0x80], SampleWidth::Eight, 3);
        let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
        for _ in 0..3 {
            emitter.on_tick().unwrap();
        }
        assert_eq!(emitter.dac().words(), &[0x3000, 0x3FF0, 0x3800]);
        assert_eq!(shared.bytes_played(), 3);
        assert_eq!(emitter.on_tick().unwrap(), Tick::Idle);
    }

    #[test]
    fn swap_flips_status_before_the_sample_is_read() {
        let shared = primed(&[0x10], &[0x20], SampleWidth::Eight, 4);
        let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
        emitter.on_tick().unwrap();
        assert_eq!(shared.status(), PlaybackStatus::Ready);
        assert_eq!(emitter.on_tick().unwrap(), Tick::Emitted(0x3200));
        assert_eq!(shared.status(), PlaybackStatus::Filling);
        assert_eq!(shared.active_slot(), 1);
    }

    #[test]
    fn exhausted_slot_while_filling_is_an_underrun() {
        let shared = primed(&[0x10], &[0x20], SampleWidth::Eight, 4);
        let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
        emitter.on_tick().unwrap();
        emitter.on_tick().unwrap();
        assert_eq!(emitter.on_tick().unwrap(), Tick::Underrun);
        assert_eq!(shared.underruns(), 1);
        assert_eq!(shared.active_slot(), 1);
        assert_eq!(emitter.dac().words().len(), 2);
    }

    #[test]
    fn last_buffer_drains_the_stream() {
        let shared = primed(&[0x10], &[], SampleWidth::Eight, 100);
        let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
        emitter.on_tick().unwrap();
        assert_eq!(emitter.on_tick().unwrap(), Tick::Idle);
        assert!(shared.is_drained());
        assert_eq!(shared.bytes_played(), 1);
    }

    #[test]
    fn sixteen_bit_sample_flips_sign_and_keeps_low_nibble() {
        // -2 = 0xFFFE little-endian
        let shared = primed(&[0xFE, 0xFF], &[], SampleWidth::Sixteen, 2);
        let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
        assert_eq!(emitter.on_tick().unwrap(), Tick::Emitted(0x3000 | 0x7FF));
        assert_eq!(shared.bytes_played(), 2);
    }

    #[test]
    fn odd_trailing_byte_of_sixteen_bit_stream_reads_zero_high_byte() {
        let shared = primed(&[0x34, 0x12, 0x56], &[], SampleWidth::Sixteen, 4);
        let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
        emitter.on_tick().unwrap();
        assert_eq!(emitter.on_tick().unwrap(), Tick::Emitted(0x3805));
        // Played count overshoots the data by less than one sample.
        assert_eq!(shared.bytes_played(), 4);
        assert_eq!(emitter.on_tick().unwrap(), Tick::Idle);
    }
}
