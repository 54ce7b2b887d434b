//! Control-side playback loop: open a WAV file, prime both buffers, arm
//! the sample timer and keep the idle buffer refilled until the stream ends.

use platform::storage::File;
use platform::timer::SampleTimer;

use crate::buffer::{PlaybackStatus, SharedPlayback, BUFFER_SIZE};
use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::wav::{self, WavFormat};

/// Why a stream stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndReason {
    /// The emitter consumed the declared data size.
    DataComplete,
    /// The data chunk held no bytes; the timer was never armed.
    EmptyStream,
    /// The file ended before the declared data size.
    SourceExhausted,
}

impl core::fmt::Display for EndReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DataComplete => f.write_str("complete"),
            Self::EmptyStream => f.write_str("empty"),
            Self::SourceExhausted => f.write_str("file ended early"),
        }
    }
}

/// Summary of a finished stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamEnd {
    /// Why playback stopped.
    pub reason: EndReason,
    /// Bytes the emitter consumed.
    pub bytes_played: u32,
    /// Ticks that found the next buffer not ready.
    pub underruns: u32,
}

/// Plays one opened WAV file at a time through a [`SharedPlayback`].
pub struct Player<'s> {
    shared: &'s SharedPlayback,
    config: PlaybackConfig,
    format: Option<WavFormat>,
}

impl<'s> Player<'s> {
    /// Player feeding `shared`, whose emitter runs from the sample timer.
    pub fn new(shared: &'s SharedPlayback, config: PlaybackConfig) -> Self {
        Self {
            shared,
            config,
            format: None,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Format of the file passed to the last successful `open_wav`, until
    /// it is played.
    pub fn format(&self) -> Option<&WavFormat> {
        self.format.as_ref()
    }

    /// Validate `file` as a playable WAV and leave it positioned at the
    /// first data byte.
    ///
    /// The header rate is only checked when the timer follows it. A failure
    /// forgets any previously opened file.
    pub fn open_wav<F: File>(&mut self, file: &mut F) -> Result<WavFormat, PlaybackError<F::Error>> {
        self.format = None;
        let format = wav::open_wav(file)?;
        self.config.timer_rate(&format)?;
        info!(
            "wav: {} Hz, {} bit, {} data bytes",
            format.sample_rate, format.bits_per_sample, format.data_size
        );
        self.format = Some(format);
        Ok(format)
    }

    /// Stream the data chunk of the file last passed to
    /// [`open_wav`](Self::open_wav) and block until it has been played.
    ///
    /// The timer is disarmed and the emitter made inert before this
    /// returns, on success and on error alike.
    pub fn play_wav<F, T>(&mut self, file: &mut F, timer: &mut T) -> Result<StreamEnd, PlaybackError<F::Error>>
    where
        F: File,
        T: SampleTimer,
    {
        let format = self.format.take().ok_or(PlaybackError::NotOpened)?;
        let rate = self.config.timer_rate(&format)?;
        let width = format.sample_width();
        self.shared.prepare(format.data_size, width, self.config.packing);

        let mut queued = 0u32;
        let first = self.load(0, file, format.data_size, &mut queued);
        let first = match first {
            Ok(0) => {
                debug!("no sample data");
                return Ok(self.finish(EndReason::EmptyStream));
            }
            Ok(n) => n,
            Err(e) => {
                self.shared.halt();
                return Err(e);
            }
        };
        let second = match self.load(1, file, format.data_size, &mut queued) {
            Ok(n) => n,
            Err(e) => {
                self.shared.halt();
                return Err(e);
            }
        };
        debug!("primed {} + {} bytes", first, second);

        self.shared.start(second > 0);
        timer.arm(rate);
        debug!("timer armed at {} Hz, {} byte samples", rate.get(), width.bytes());

        let outcome = self.refill_until_done(file, timer, format.data_size, &mut queued);
        timer.disarm();
        self.shared.halt();

        let end = self.finish(outcome?);
        info!(
            "stream {}: {} bytes, {} underruns",
            end.reason, end.bytes_played, end.underruns
        );
        Ok(end)
    }

    fn refill_until_done<F, T>(
        &self,
        file: &mut F,
        timer: &mut T,
        data_size: u32,
        queued: &mut u32,
    ) -> Result<EndReason, PlaybackError<F::Error>>
    where
        F: File,
        T: SampleTimer,
    {
        loop {
            if self.shared.is_complete() {
                return Ok(EndReason::DataComplete);
            }
            if self.shared.is_drained() {
                return Ok(EndReason::SourceExhausted);
            }
            if self.shared.status() == PlaybackStatus::Filling {
                let n = self.load(self.shared.idle_slot(), file, data_size, queued)?;
                trace!("refilled slot {} with {} bytes", self.shared.idle_slot(), n);
                self.shared.refilled(n);
            } else {
                timer.idle();
            }
        }
    }

    /// Read the next chunk of data into slot `index`, never past the
    /// declared data size.
    fn load<F: File>(
        &self,
        index: usize,
        file: &mut F,
        data_size: u32,
        queued: &mut u32,
    ) -> Result<usize, PlaybackError<F::Error>> {
        let remaining = usize::try_from(data_size.saturating_sub(*queued)).unwrap_or(usize::MAX);
        let want = remaining.min(BUFFER_SIZE);
        let loaded = self
            .shared
            .fill_slot(index, |buf| {
                let (head, _) = buf.split_at_mut(want);
                wav::read_full(file, head)
            })
            .unwrap_or(Ok(0))?;
        *queued = queued.saturating_add(u32::try_from(loaded).unwrap_or(u32::MAX));
        Ok(loaded)
    }

    fn finish(&self, reason: EndReason) -> StreamEnd {
        StreamEnd {
            reason,
            bytes_played: self.shared.bytes_played(),
            underruns: self.shared.underruns(),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use crate::emitter::SampleEmitter;
    use crate::error::FormatError;
    use platform::mocks::{MemError, MemFile, RecordingDac, ScriptedTimer};

    fn wav(bits: u16, rate: u32, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&rate.to_le_bytes());
        let block = u32::from(bits / 8).max(1);
        out.extend_from_slice(&(rate * block).to_le_bytes());
        out.extend_from_slice(&(block as u16).to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn play_without_open_is_rejected() {
        let shared = SharedPlayback::new();
        let mut player = Player::new(&shared, PlaybackConfig::default());
        let mut file = MemFile::new(&[]);
        let mut timer = ScriptedTimer::new(|| {});
        assert_eq!(
            player.play_wav(&mut file, &mut timer),
            Err(PlaybackError::NotOpened)
        );
        assert_eq!(timer.arm_calls(), 0);
    }

    #[test]
    fn failed_open_forgets_the_previous_file() {
        let shared = SharedPlayback::new();
        let mut player = Player::new(&shared, PlaybackConfig::default());
        let good = wav(8, 8_000, &[1, 2]);
        player.open_wav(&mut MemFile::new(&good)).unwrap();
        let bad = b"RIFX".to_vec();
        assert_eq!(
            player.open_wav(&mut MemFile::new(&bad)),
            Err(PlaybackError::Format(FormatError::NotRiff))
        );
        assert!(player.format().is_none());
    }

    #[test]
    fn eight_bit_stream_plays_every_byte_once() {
        let data: Vec<u8> = (0..1200u32).map(|i| (i % 251) as u8).collect();
        let image = wav(8, 8_000, &data);
        let shared = SharedPlayback::new();
        let mut player = Player::new(&shared, PlaybackConfig::default());
        let mut file = MemFile::new(&image);
        player.open_wav(&mut file).unwrap();

        let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
        let mut timer = ScriptedTimer::new(|| {
            emitter.on_tick().unwrap();
        });
        let end = player.play_wav(&mut file, &mut timer).unwrap();
        assert!(!timer.is_armed());
        assert_eq!(timer.disarm_calls(), 1);
        drop(timer);

        assert_eq!(end.reason, EndReason::DataComplete);
        assert_eq!(end.bytes_played, 1200);
        let expected: Vec<u16> = data.iter().map(|&b| 0x3000 | (u16::from(b) << 4)).collect();
        assert_eq!(emitter.dac().words(), expected.as_slice());
    }

    #[test]
    fn empty_data_chunk_never_arms_the_timer() {
        let image = wav(16, 8_000, &[]);
        let shared = SharedPlayback::new();
        let mut player = Player::new(&shared, PlaybackConfig::default());
        let mut file = MemFile::new(&image);
        player.open_wav(&mut file).unwrap();
        let mut timer = ScriptedTimer::new(|| {});
        let end = player.play_wav(&mut file, &mut timer).unwrap();
        assert_eq!(end.reason, EndReason::EmptyStream);
        assert_eq!(timer.arm_calls(), 0);
    }

    #[test]
    fn read_error_mid_stream_disarms_the_timer() {
        let data = [0x80u8; 2000];
        let image = wav(8, 8_000, &data);
        let shared = SharedPlayback::new();
        let mut player = Player::new(&shared, PlaybackConfig::default());
        let mut file = MemFile::failing_at(&image, 1500);
        player.open_wav(&mut file).unwrap();

        let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
        let mut timer = ScriptedTimer::new(|| {
            emitter.on_tick().unwrap();
        });
        assert_eq!(
            player.play_wav(&mut file, &mut timer),
            Err(PlaybackError::Io(MemError::Injected))
        );
        assert!(!timer.is_armed());
        assert!(shared.is_drained());
    }

    #[test]
    fn timer_rate_follows_the_config() {
        let image = wav(8, 8_000, &[1]);
        for (config, hz) in [
            (PlaybackConfig::default(), 8_000),
            (PlaybackConfig::compatible(), 22_050),
        ] {
            let shared = SharedPlayback::new();
            let mut player = Player::new(&shared, config);
            let mut file = MemFile::new(&image);
            player.open_wav(&mut file).unwrap();

            let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
            let mut timer = ScriptedTimer::new(|| {
                emitter.on_tick().unwrap();
            });
            let end = player.play_wav(&mut file, &mut timer).unwrap();
            assert_eq!(end.bytes_played, 1);
            assert_eq!(timer.last_rate().unwrap().get(), hz);
        }
    }

    #[test]
    fn fixed_rate_plays_a_header_rate_the_timer_cannot_run() {
        let image = wav(8, 500, &[1, 2]);
        let shared = SharedPlayback::new();
        let mut player = Player::new(&shared, PlaybackConfig::compatible());
        let mut file = MemFile::new(&image);
        assert_eq!(player.open_wav(&mut file).unwrap().sample_rate, 500);

        let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
        let mut timer = ScriptedTimer::new(|| {
            emitter.on_tick().unwrap();
        });
        let end = player.play_wav(&mut file, &mut timer).unwrap();
        assert_eq!(end.bytes_played, 2);
        assert_eq!(timer.last_rate().unwrap().get(), 22_050);
    }

    #[test]
    fn header_rate_the_timer_cannot_run_fails_at_open() {
        let image = wav(8, 500, &[1, 2]);
        let shared = SharedPlayback::new();
        let mut player = Player::new(&shared, PlaybackConfig::default());
        let mut file = MemFile::new(&image);
        assert_eq!(
            player.open_wav(&mut file),
            Err(PlaybackError::Format(FormatError::SampleRate(500)))
        );
        let mut timer = ScriptedTimer::new(|| {});
        assert_eq!(player.play_wav(&mut file, &mut timer), Err(PlaybackError::NotOpened));
    }
}
