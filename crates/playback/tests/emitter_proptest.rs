//! Property-based tests for the buffer handoff between the control loop
//! and the sample emitter.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]

use platform::mocks::{MemFile, RecordingDac, ScriptedTimer};
use platform::timer::SampleTimer;
use playback::{
    DacPacking, EndReason, PlaybackConfig, Player, RateSource, Sample, SampleEmitter, SharedPlayback,
};
use proptest::prelude::*;

fn wav(bits: u16, declared: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + declared).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&11_025u32.to_le_bytes());
    out.extend_from_slice(&(11_025 * u32::from(bits / 8)).to_le_bytes());
    out.extend_from_slice(&(bits / 8).to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&declared.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn expected_frames(bits: u16, payload: &[u8], packing: DacPacking) -> Vec<u16> {
    if bits == 16 {
        payload
            .chunks(2)
            .map(|pair| {
                let high = pair.get(1).copied().unwrap_or(0);
                packing.frame(Sample::from_pcm16(pair[0], high))
            })
            .collect()
    } else {
        payload.iter().map(|&b| packing.frame(Sample::from_pcm8(b))).collect()
    }
}

fn packing() -> impl Strategy<Value = DacPacking> {
    prop_oneof![Just(DacPacking::Full), Just(DacPacking::LegacyDuplicateBit1)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every sample reaches the DAC exactly once and in file order, however
    /// many ticks elapse between refill checks.
    #[test]
    fn samples_reach_the_dac_in_order(
        sixteen in any::<bool>(),
        payload in proptest::collection::vec(any::<u8>(), 1..3000),
        ticks_per_idle in 1usize..1100,
        packing in packing(),
    ) {
        let bits = if sixteen { 16 } else { 8 };
        let image = wav(bits, payload.len() as u32, &payload);
        let shared = SharedPlayback::new();
        let config = PlaybackConfig { rate: RateSource::FromHeader, packing };
        let mut player = Player::new(&shared, config);
        let mut file = MemFile::new(&image);
        player.open_wav(&mut file).unwrap();

        let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
        let mut timer = ScriptedTimer::new(|| {
            emitter.on_tick().unwrap();
        })
        .with_ticks_per_idle(ticks_per_idle);
        let end = player.play_wav(&mut file, &mut timer).unwrap();
        prop_assert!(!timer.is_armed());
        drop(timer);

        prop_assert_eq!(end.reason, EndReason::DataComplete);
        let width = usize::from(bits / 8);
        let rounded = payload.len().div_ceil(width) * width;
        prop_assert_eq!(end.bytes_played as usize, rounded);
        let expected = expected_frames(bits, &payload, packing);
        prop_assert_eq!(emitter.dac().words(), expected.as_slice());
    }

    /// A file shorter than its declared data size plays what it has and
    /// then reports that the source ran dry.
    #[test]
    fn truncated_file_plays_what_it_has(
        payload in proptest::collection::vec(any::<u8>(), 1..2000),
        missing in 1u32..4000,
        ticks_per_idle in 1usize..700,
    ) {
        let declared = payload.len() as u32 + missing;
        let image = wav(8, declared, &payload);
        let shared = SharedPlayback::new();
        let mut player = Player::new(&shared, PlaybackConfig::default());
        let mut file = MemFile::new(&image);
        player.open_wav(&mut file).unwrap();

        let mut emitter = SampleEmitter::new(&shared, RecordingDac::new());
        let mut timer = ScriptedTimer::new(|| {
            emitter.on_tick().unwrap();
        })
        .with_ticks_per_idle(ticks_per_idle);
        let end = player.play_wav(&mut file, &mut timer).unwrap();
        drop(timer);

        prop_assert_eq!(end.reason, EndReason::SourceExhausted);
        prop_assert_eq!(end.bytes_played as usize, payload.len());
        prop_assert_eq!(emitter.dac().words().len(), payload.len());
    }

    /// The control bits are always set and the DAC code tracks the sample
    /// with its sign bit flipped.
    #[test]
    fn sixteen_bit_frames_are_offset_binary(sample in any::<i16>()) {
        let [low, high] = sample.to_le_bytes();
        let frame = DacPacking::Full.frame(Sample::from_pcm16(low, high));
        prop_assert_eq!(frame & 0xF000, 0x3000);
        let offset = (i32::from(sample) + 32_768) as u16;
        prop_assert_eq!(frame & 0x0FFF, offset >> 4);
    }
}
