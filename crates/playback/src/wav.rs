//! WAV container validation and chunk navigation.
//!
//! Accepts only what the emitter can play: uncompressed mono PCM of at most
//! 16 bits and a byte rate of at most 44 100. Every rejection names its
//! reason; nothing is partially accepted.

use platform::audio_types::{SampleRateHz, SampleWidth};
use platform::storage::File;

use crate::error::{FormatError, PlaybackError};

/// `RIFF` size `WAVE`.
pub const RIFF_HEADER_LEN: usize = 12;
/// Chunk id + little-endian size.
pub const CHUNK_HEADER_LEN: usize = 8;
/// Plain PCM fmt payload.
pub const FMT_LEN: u32 = 16;
/// PCM fmt payload with a (zero) extension size field.
pub const FMT_EXTENDED_LEN: u32 = 18;
/// fmt compression code for uncompressed PCM.
pub const FORMAT_PCM: u16 = 1;
/// Highest accepted byte rate.
pub const MAX_BYTE_RATE: u32 = 44_100;
/// Highest accepted sample depth.
pub const MAX_BITS_PER_SAMPLE: u16 = 16;

/// Validated format of an opened WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WavFormat {
    /// Always 1.
    pub channels: u16,
    /// Samples per second from the fmt chunk.
    pub sample_rate: u32,
    /// Bytes per second from the fmt chunk.
    pub byte_rate: u32,
    /// Bits per sample, at most 16.
    pub bits_per_sample: u16,
    /// Declared size of the `data` chunk.
    pub data_size: u32,
}

impl WavFormat {
    /// Bytes consumed per sample.
    pub fn sample_width(&self) -> SampleWidth {
        SampleWidth::from_bits(self.bits_per_sample)
    }

    /// Header sample rate as a timer rate; fails when the timer cannot run
    /// at it.
    pub fn sample_rate_hz(&self) -> Result<SampleRateHz, FormatError> {
        SampleRateHz::new(self.sample_rate).map_err(|e| FormatError::SampleRate(e.value))
    }
}

/// Validate the RIFF header and fmt chunk, then position `file` at the
/// first byte of the `data` chunk payload.
pub fn open_wav<F: File>(file: &mut F) -> Result<WavFormat, PlaybackError<F::Error>> {
    let mut format = read_format(file)?;
    format.data_size = find_data_chunk(file)?;
    debug!("data chunk: {} bytes", format.data_size);
    Ok(format)
}

/// RIFF header and fmt chunk. `data_size` is left at 0.
pub fn read_format<F: File>(file: &mut F) -> Result<WavFormat, PlaybackError<F::Error>> {
    let mut riff = [0u8; RIFF_HEADER_LEN];
    if read_full(file, &mut riff)? < RIFF_HEADER_LEN {
        return Err(FormatError::NotRiff.into());
    }
    let [r0, r1, r2, r3, _, _, _, _, w0, w1, w2, w3] = riff;
    if [r0, r1, r2, r3] != *b"RIFF" {
        return Err(FormatError::NotRiff.into());
    }
    if [w0, w1, w2, w3] != *b"WAVE" {
        return Err(FormatError::NotWave.into());
    }

    let mut header = [0u8; CHUNK_HEADER_LEN];
    if read_full(file, &mut header)? < CHUNK_HEADER_LEN {
        return Err(FormatError::MissingFmtChunk.into());
    }
    let (id, size) = split_chunk_header(header);
    if id != *b"fmt " {
        return Err(FormatError::MissingFmtChunk.into());
    }
    if size != FMT_LEN && size != FMT_EXTENDED_LEN {
        return Err(FormatError::UnsupportedFmtSize(size).into());
    }

    let mut payload = [0u8; FMT_EXTENDED_LEN as usize];
    let wanted = payload
        .get_mut(..size as usize)
        .ok_or(FormatError::UnsupportedFmtSize(size))?;
    if read_full(file, wanted)? < size as usize {
        return Err(FormatError::Truncated.into());
    }
    parse_fmt(payload, size).map_err(PlaybackError::Format)
}

/// Skip chunks until `data`; returns its declared size with `file`
/// positioned at its payload.
pub fn find_data_chunk<F: File>(file: &mut F) -> Result<u32, PlaybackError<F::Error>> {
    loop {
        let mut header = [0u8; CHUNK_HEADER_LEN];
        if read_full(file, &mut header)? < CHUNK_HEADER_LEN {
            return Err(FormatError::MissingDataChunk.into());
        }
        let (id, size) = split_chunk_header(header);
        if id == *b"data" {
            return Ok(size);
        }
        trace!("skipping {} byte chunk", size);
        file.skip(size).map_err(PlaybackError::Io)?;
    }
}

/// Fields of a 16- or 18-byte fmt payload, checked in order: compression,
/// extension size, channels, depth, byte rate. The sample rate is taken as
/// is; whether the timer can use it depends on the playback config.
fn parse_fmt(payload: [u8; FMT_EXTENDED_LEN as usize], size: u32) -> Result<WavFormat, FormatError> {
    let [c0, c1, n0, n1, s0, s1, s2, s3, b0, b1, b2, b3, _, _, d0, d1, x0, x1] = payload;

    let compression = u16::from_le_bytes([c0, c1]);
    if compression != FORMAT_PCM {
        return Err(FormatError::Compressed(compression));
    }
    if size == FMT_EXTENDED_LEN {
        let extra = u16::from_le_bytes([x0, x1]);
        if extra != 0 {
            return Err(FormatError::ExtraFormatBytes(extra));
        }
    }
    let channels = u16::from_le_bytes([n0, n1]);
    if channels != 1 {
        return Err(FormatError::NotMono(channels));
    }
    let bits_per_sample = u16::from_le_bytes([d0, d1]);
    if bits_per_sample > MAX_BITS_PER_SAMPLE {
        return Err(FormatError::BitDepth(bits_per_sample));
    }
    let byte_rate = u32::from_le_bytes([b0, b1, b2, b3]);
    if byte_rate > MAX_BYTE_RATE {
        return Err(FormatError::ByteRate(byte_rate));
    }

    Ok(WavFormat {
        channels,
        sample_rate: u32::from_le_bytes([s0, s1, s2, s3]),
        byte_rate,
        bits_per_sample,
        data_size: 0,
    })
}

fn split_chunk_header(header: [u8; CHUNK_HEADER_LEN]) -> ([u8; 4], u32) {
    let [i0, i1, i2, i3, s0, s1, s2, s3] = header;
    ([i0, i1, i2, i3], u32::from_le_bytes([s0, s1, s2, s3]))
}

/// Read until `buf` is full or the file ends; returns bytes read.
pub(crate) fn read_full<F: File>(file: &mut F, buf: &mut [u8]) -> Result<usize, PlaybackError<F::Error>> {
    let mut filled = 0;
    while let Some(rest) = buf.get_mut(filled..) {
        if rest.is_empty() {
            break;
        }
        let n = file.read(rest).map_err(PlaybackError::Io)?;
        if n == 0 {
            break;
        }
        filled = filled.saturating_add(n);
    }
    Ok(filled)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use platform::mocks::MemFile;

    fn fmt_payload(compression: u16, channels: u16, rate: u32, bits: u16) -> Vec<u8> {
        let block_align = channels * bits.div_ceil(8);
        let byte_rate = rate * u32::from(block_align);
        let mut p = Vec::new();
        p.extend_from_slice(&compression.to_le_bytes());
        p.extend_from_slice(&channels.to_le_bytes());
        p.extend_from_slice(&rate.to_le_bytes());
        p.extend_from_slice(&byte_rate.to_le_bytes());
        p.extend_from_slice(&block_align.to_le_bytes());
        p.extend_from_slice(&bits.to_le_bytes());
        p
    }

    fn wav(fmt: &[u8], chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
        let mut w = Vec::new();
        w.extend_from_slice(b"RIFF");
        w.extend_from_slice(&0u32.to_le_bytes());
        w.extend_from_slice(b"WAVE");
        w.extend_from_slice(b"fmt ");
        w.extend_from_slice(&(fmt.len() as u32).to_le_bytes());
        w.extend_from_slice(fmt);
        for (id, body) in chunks {
            w.extend_from_slice(*id);
            w.extend_from_slice(&(body.len() as u32).to_le_bytes());
            w.extend_from_slice(body);
        }
        w
    }

    fn open(bytes: &[u8]) -> Result<WavFormat, FormatError> {
        open_wav(&mut MemFile::new(bytes)).map_err(|e| match e {
            PlaybackError::Format(f) => f,
            other => panic!("unexpected {other:?}"),
        })
    }

    #[test]
    fn fmt_16_is_accepted() {
        let bytes = wav(&fmt_payload(1, 1, 8_000, 8), &[(b"data", &[1, 2, 3, 4])]);
        let format = open(&bytes).unwrap();
        assert_eq!(format.sample_rate, 8_000);
        assert_eq!(format.data_size, 4);
        assert_eq!(format.sample_width(), SampleWidth::Eight);
    }

    #[test]
    fn fmt_18_with_zero_extension_is_accepted() {
        let mut fmt = fmt_payload(1, 1, 22_050, 16);
        fmt.extend_from_slice(&0u16.to_le_bytes());
        let bytes = wav(&fmt, &[(b"data", &[0; 2])]);
        assert_eq!(open(&bytes).unwrap().sample_width(), SampleWidth::Sixteen);
    }

    #[test]
    fn fmt_18_with_extension_bytes_is_rejected() {
        let mut fmt = fmt_payload(1, 1, 22_050, 16);
        fmt.extend_from_slice(&2u16.to_le_bytes());
        let bytes = wav(&fmt, &[(b"data", &[0; 2])]);
        assert_eq!(open(&bytes), Err(FormatError::ExtraFormatBytes(2)));
    }

    #[test]
    fn other_fmt_sizes_rejected_before_payload_is_read() {
        let mut fmt = fmt_payload(1, 1, 8_000, 8);
        fmt.extend_from_slice(&[0; 24]);
        let bytes = wav(&fmt, &[]);
        let mut file = MemFile::new(&bytes);
        assert_eq!(
            read_format(&mut file),
            Err(PlaybackError::Format(FormatError::UnsupportedFmtSize(40)))
        );
        assert_eq!(file.position(), RIFF_HEADER_LEN + CHUNK_HEADER_LEN);
        assert!(FormatError::UnsupportedFmtSize(40).is_unsupported());
    }

    #[test]
    fn field_checks() {
        let cases: [(Vec<u8>, FormatError); 4] = [
            (fmt_payload(3, 1, 8_000, 8), FormatError::Compressed(3)),
            (fmt_payload(1, 2, 8_000, 8), FormatError::NotMono(2)),
            (fmt_payload(1, 1, 8_000, 24), FormatError::BitDepth(24)),
            (fmt_payload(1, 1, 44_100, 16), FormatError::ByteRate(88_200)),
        ];
        for (fmt, expected) in cases {
            let bytes = wav(&fmt, &[(b"data", &[0; 4])]);
            assert_eq!(open(&bytes), Err(expected));
            assert!(expected.is_unsupported());
        }
    }

    #[test]
    fn not_riff_and_not_wave_are_not_unsupported_but_invalid() {
        let mut bytes = wav(&fmt_payload(1, 1, 8_000, 8), &[(b"data", &[0])]);
        bytes[8..12].copy_from_slice(b"AVI ");
        assert_eq!(open(&bytes), Err(FormatError::NotWave));
        bytes[0..4].copy_from_slice(b"RIFX");
        assert_eq!(open(&bytes), Err(FormatError::NotRiff));
        assert!(!FormatError::NotRiff.is_unsupported());
        assert_eq!(open(b"RIFF"), Err(FormatError::NotRiff));
    }

    #[test]
    fn fmt_must_follow_the_riff_header() {
        let mut bytes = wav(&fmt_payload(1, 1, 8_000, 8), &[]);
        bytes[12..16].copy_from_slice(b"LIST");
        assert_eq!(open(&bytes), Err(FormatError::MissingFmtChunk));
    }

    #[test]
    fn short_fmt_payload_is_truncated() {
        let bytes = wav(&fmt_payload(1, 1, 8_000, 8), &[]);
        assert_eq!(open(&bytes[..30]), Err(FormatError::Truncated));
    }

    #[test]
    fn unknown_chunks_before_data_are_skipped() {
        let bytes = wav(
            &fmt_payload(1, 1, 11_025, 8),
            &[(b"LIST", &[0xAA; 26]), (b"fact", &[0; 4]), (b"data", &[7, 8, 9])],
        );
        let mut file = MemFile::new(&bytes);
        let format = open_wav(&mut file).unwrap();
        assert_eq!(format.data_size, 3);
        let mut sample = [0u8; 1];
        file.read(&mut sample).unwrap();
        assert_eq!(sample, [7]);
    }

    #[test]
    fn eof_before_data_chunk() {
        let bytes = wav(&fmt_payload(1, 1, 8_000, 8), &[(b"LIST", &[0; 10])]);
        assert_eq!(open(&bytes), Err(FormatError::MissingDataChunk));
    }

    #[test]
    fn parser_takes_any_sample_rate() {
        let bytes = wav(&fmt_payload(1, 1, 500, 8), &[(b"data", &[0])]);
        let format = open(&bytes).unwrap();
        assert_eq!(format.sample_rate, 500);
        assert_eq!(format.sample_rate_hz(), Err(FormatError::SampleRate(500)));
    }

    #[test]
    fn read_errors_pass_through_unchanged() {
        let bytes = wav(&fmt_payload(1, 1, 8_000, 8), &[(b"data", &[0])]);
        let mut file = MemFile::failing_at(&bytes, 12);
        assert_eq!(
            open_wav(&mut file),
            Err(PlaybackError::Io(platform::mocks::MemError::Injected))
        );
    }
}
