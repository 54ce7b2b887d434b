//! Range enforcement for the audio newtypes.

#![allow(clippy::unwrap_used)]

use platform::audio_types::{SampleRateHz, SampleWidth};

// ── SampleRateHz ─────────────────────────────────────────────────────────────

#[test]
fn sample_rate_accepts_common_wav_rates() {
    for hz in [8_000, 11_025, 16_000, 22_050, 32_000, 44_100] {
        assert_eq!(SampleRateHz::new(hz).map(SampleRateHz::get), Ok(hz));
    }
}

#[test]
fn sample_rate_rejects_above_cd_rate() {
    let err = SampleRateHz::new(48_000).unwrap_err();
    assert_eq!(err.value, 48_000);
    assert_eq!(err.max, SampleRateHz::MAX_HZ);
}

#[test]
fn sample_rate_rejects_zero() {
    assert!(SampleRateHz::new(0).is_err());
}

#[test]
fn out_of_range_error_displays_bounds() {
    let err = SampleRateHz::new(96_000).unwrap_err();
    assert_eq!(err.to_string(), "value 96000 outside 1000..=44100");
}

// ── SampleWidth ──────────────────────────────────────────────────────────────

#[test]
fn eight_bit_and_below_read_one_byte() {
    assert_eq!(SampleWidth::from_bits(8).bytes(), 1);
    assert_eq!(SampleWidth::from_bits(4).bytes(), 1);
}

#[test]
fn above_eight_bits_read_two_bytes() {
    assert_eq!(SampleWidth::from_bits(12).bytes(), 2);
    assert_eq!(SampleWidth::from_bits(16).bytes(), 2);
}
