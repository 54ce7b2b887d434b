//! Format and playback errors.

/// Why a file was rejected by the WAV parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FormatError {
    /// Missing `RIFF` tag (or shorter than a RIFF header).
    NotRiff,
    /// RIFF form type is not `WAVE`.
    NotWave,
    /// The chunk after the RIFF header is not `fmt `.
    MissingFmtChunk,
    /// The fmt payload ended early.
    Truncated,
    /// fmt payload length other than 16 or 18.
    UnsupportedFmtSize(u32),
    /// Compression code other than 1 (PCM).
    Compressed(u16),
    /// Non-zero extension size in an 18-byte fmt payload.
    ExtraFormatBytes(u16),
    /// Channel count other than 1.
    NotMono(u16),
    /// More than 16 bits per sample.
    BitDepth(u16),
    /// Byte rate above 44 100.
    ByteRate(u32),
    /// Sample rate the timer cannot run at.
    SampleRate(u32),
    /// End of file before a `data` chunk.
    MissingDataChunk,
}

impl FormatError {
    /// Whether the file is a valid WAV this player cannot play, as opposed
    /// to not being a WAV file at all.
    pub fn is_unsupported(self) -> bool {
        matches!(
            self,
            Self::UnsupportedFmtSize(_)
                | Self::Compressed(_)
                | Self::ExtraFormatBytes(_)
                | Self::NotMono(_)
                | Self::BitDepth(_)
                | Self::ByteRate(_)
                | Self::SampleRate(_)
        )
    }
}

impl core::fmt::Display for FormatError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotRiff => f.write_str("not a RIFF file"),
            Self::NotWave => f.write_str("RIFF form is not WAVE"),
            Self::MissingFmtChunk => f.write_str("fmt chunk missing"),
            Self::Truncated => f.write_str("fmt chunk truncated"),
            Self::UnsupportedFmtSize(n) => write!(f, "unsupported fmt chunk size {n}"),
            Self::Compressed(c) => write!(f, "compressed format {c}"),
            Self::ExtraFormatBytes(n) => write!(f, "{n} extra format bytes"),
            Self::NotMono(n) => write!(f, "{n} channels, need mono"),
            Self::BitDepth(b) => write!(f, "{b} bits per sample, max 16"),
            Self::ByteRate(r) => write!(f, "byte rate {r}, max 44100"),
            Self::SampleRate(r) => write!(f, "sample rate {r} Hz unsupported"),
            Self::MissingDataChunk => f.write_str("no data chunk"),
        }
    }
}

/// Failure of `open_wav` or `play_wav`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackError<E> {
    /// The file layer (and the card driver below it) failed.
    Io(E),
    /// The file is not a playable WAV.
    Format(FormatError),
    /// `play_wav` without a successful `open_wav` first.
    NotOpened,
}

impl<E> From<FormatError> for PlaybackError<E> {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}

impl<E: core::fmt::Display> core::fmt::Display for PlaybackError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "read error: {e}"),
            Self::Format(e) => write!(f, "{e}"),
            Self::NotOpened => f.write_str("no WAV file opened"),
        }
    }
}
