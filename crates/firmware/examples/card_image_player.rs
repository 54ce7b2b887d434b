//! Card Image Player
//!
//! Plays a WAV file through the real card driver, parser and scheduler on the
//! desktop: the file is placed in a simulated SD card image and every DAC
//! frame is recorded instead of clocked out.
//! Run with: cargo run --example card_image_player --features emulator -- song.wav [--compatible]

use embedded_hal_mock::eh1::delay::NoopDelay;
use platform::config;
use platform::config::SECTOR_SIZE;
use platform::mocks::{CardKind, MockCard, RecordingDac, ScriptedTimer};
use playback::{PlaybackConfig, Player, SampleEmitter, SharedPlayback};
use sdcard::{SdCard, SectorStream};

/// Sector the file image starts at, leaving room for a boot sector.
const FILE_SECTOR: u32 = 8;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: card_image_player <file.wav> [--compatible]")?;
    let config = if args.any(|a| a == "--compatible") {
        PlaybackConfig::compatible()
    } else {
        PlaybackConfig::default()
    };

    tracing::info!("{} - Card Image Player", config::APP_NAME);
    let wav = std::fs::read(&path)?;
    let wav_len = u32::try_from(wav.len())?;

    let mut image = vec![0u8; FILE_SECTOR as usize * SECTOR_SIZE];
    image.extend_from_slice(&wav);
    image.resize(image.len().next_multiple_of(SECTOR_SIZE), 0);

    let mock = MockCard::new(CardKind::SdV2 { high_capacity: true }, image);
    let mut card = SdCard::new(mock, NoopDelay);
    let kind = card.initialize().map_err(|e| e.to_string())?;
    tracing::info!("card: {}", kind);

    let mut stream = SectorStream::new(&mut card, FILE_SECTOR, wav_len);
    let shared = SharedPlayback::new();
    let mut player = Player::new(&shared, config);
    let format = player.open_wav(&mut stream).map_err(|e| e.to_string())?;
    tracing::info!(
        "{}: {} Hz, {} bit, {} data bytes",
        path,
        format.sample_rate,
        format.bits_per_sample,
        format.data_size
    );

    let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
    let mut timer = ScriptedTimer::new(|| {
        let _ = emitter.on_tick();
    })
    .with_ticks_per_idle(16);
    let end = player
        .play_wav(&mut stream, &mut timer)
        .map_err(|e| e.to_string())?;
    let rate = timer.last_rate();
    drop(timer);

    let frames = emitter.dac().words();
    let seconds = rate.map_or(0.0, |r| frames.len() as f64 / f64::from(r.get()));
    tracing::info!(
        "{}: {} frames ({:.2} s), {} bytes, {} underruns",
        end.reason,
        frames.len(),
        seconds,
        end.bytes_played,
        end.underruns
    );
    Ok(())
}
