//! Sample output abstraction

/// A DAC that accepts one 16-bit serial frame per sample.
///
/// Called from interrupt context: implementations must not block beyond the
/// time needed to clock the frame out.
pub trait SampleDac {
    /// Error type
    type Error: core::fmt::Debug;

    /// Clock one frame out, most-significant bit first.
    fn write_word(&mut self, word: u16) -> Result<(), Self::Error>;
}
