//! Driver error type.

use crate::command::Command;

/// Failure of a card operation. Always fatal to the current call; the driver
/// never retries beyond its own bounded polling loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiskError {
    /// The bus transport reported an error.
    Bus,
    /// Nothing answered GO_IDLE_STATE with the idle response.
    NoCard,
    /// Bring-up did not classify the card, or no successful bring-up yet.
    NotInitialized,
    /// The card answered with an error response.
    CommandRejected {
        /// Command that was rejected.
        command: Command,
        /// R1 response byte.
        response: u8,
    },
    /// No R1 response within the poll budget.
    ResponseTimeout {
        /// Command that went unanswered.
        command: Command,
    },
    /// No data start token within the poll budget.
    DataTokenTimeout,
    /// Something other than idle or the start token arrived first.
    UnexpectedToken(u8),
    /// Sector, offset or length outside the card or the sector.
    OutOfRange,
    /// CSD structure version not understood.
    InvalidCsd,
    /// Writing is not supported by this driver.
    WriteUnsupported,
    /// A polling budget that could never succeed.
    InvalidConfig(&'static str),
}

impl core::fmt::Display for DiskError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus => f.write_str("bus transfer failed"),
            Self::NoCard => f.write_str("no card responded"),
            Self::NotInitialized => f.write_str("card not initialized"),
            Self::CommandRejected { command, response } => {
                write!(f, "{command} rejected (R1 {response:#04x})")
            }
            Self::ResponseTimeout { command } => write!(f, "{command} timed out"),
            Self::DataTokenTimeout => f.write_str("data token timeout"),
            Self::UnexpectedToken(t) => write!(f, "unexpected data token {t:#04x}"),
            Self::OutOfRange => f.write_str("address out of range"),
            Self::InvalidCsd => f.write_str("unsupported CSD structure"),
            Self::WriteUnsupported => f.write_str("write not supported"),
            Self::InvalidConfig(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl DiskError {
    /// Classify a non-zero R1 for `command`.
    pub(crate) fn from_r1(command: Command, response: u8) -> Self {
        if response & crate::command::R1_START_BIT != 0 {
            Self::ResponseTimeout { command }
        } else {
            Self::CommandRejected { command, response }
        }
    }
}
