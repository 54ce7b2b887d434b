//! SPI-mode command set and frame encoding.

/// Start token preceding every 512-byte data block.
pub const DATA_START_TOKEN: u8 = 0xFE;

/// Trailing CRC bytes after a data block.
pub const DATA_CRC_LEN: usize = 2;

/// R1 bit: card is in the idle state.
pub const R1_IDLE_STATE: u8 = 0x01;

/// R1 bit that is clear on every valid response.
pub const R1_START_BIT: u8 = 0x80;

/// SEND_IF_COND argument: 2.7–3.6 V window plus check pattern 0xAA.
pub const IF_COND_CHECK: u32 = 0x1AA;

/// ACMD41 argument bit: host supports high-capacity cards.
pub const HOST_CAPACITY_SUPPORT: u32 = 1 << 30;

/// OCR byte 0 bit: card capacity status (block addressing).
pub const OCR_CCS: u8 = 0x40;

/// Commands the driver issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// CMD0: software reset into SPI mode.
    GoIdleState = 0,
    /// CMD1: MMC operating-condition poll.
    SendOpCond = 1,
    /// CMD8: voltage check; only SD v2 accepts it.
    SendIfCond = 8,
    /// CMD9: read the card-specific data register.
    SendCsd = 9,
    /// CMD16: set the block length for byte-addressed cards.
    SetBlockLen = 16,
    /// CMD17: read one block.
    ReadSingleBlock = 17,
    /// ACMD41: SD operating-condition poll (preceded by CMD55).
    AppSendOpCond = 41,
    /// CMD55: next command is an application command.
    AppCmd = 55,
    /// CMD58: read the OCR.
    ReadOcr = 58,
}

impl Command {
    /// Command index (0–63).
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Whether the command must be preceded by APP_CMD.
    pub const fn is_app(self) -> bool {
        matches!(self, Self::AppSendOpCond)
    }

    /// CRC7 + stop bit. Only CMD0 and CMD8 are checked in SPI mode; the
    /// rest carry a placeholder with the stop bit set.
    pub const fn crc(self) -> u8 {
        match self {
            Self::GoIdleState => 0x95,
            Self::SendIfCond => 0x87,
            _ => 0x01,
        }
    }

    /// Conventional name, e.g. `"CMD17"` or `"ACMD41"`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::GoIdleState => "CMD0",
            Self::SendOpCond => "CMD1",
            Self::SendIfCond => "CMD8",
            Self::SendCsd => "CMD9",
            Self::SetBlockLen => "CMD16",
            Self::ReadSingleBlock => "CMD17",
            Self::AppSendOpCond => "ACMD41",
            Self::AppCmd => "CMD55",
            Self::ReadOcr => "CMD58",
        }
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// One command as it goes on the wire: start + index, big-endian argument,
/// CRC + stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    /// Command to send.
    pub command: Command,
    /// 32-bit argument.
    pub argument: u32,
}

impl CommandFrame {
    /// Frame for `command` with `argument`.
    pub const fn new(command: Command, argument: u32) -> Self {
        Self { command, argument }
    }

    /// Six wire bytes.
    pub fn to_bytes(self) -> [u8; 6] {
        let [a3, a2, a1, a0] = self.argument.to_be_bytes();
        [
            0x40 | self.command.index(),
            a3,
            a2,
            a1,
            a0,
            self.command.crc(),
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn go_idle_frame_is_the_canonical_reset_sequence() {
        assert_eq!(
            CommandFrame::new(Command::GoIdleState, 0).to_bytes(),
            [0x40, 0x00, 0x00, 0x00, 0x00, 0x95]
        );
    }

    #[test]
    fn send_if_cond_carries_check_pattern_and_real_crc() {
        assert_eq!(
            CommandFrame::new(Command::SendIfCond, IF_COND_CHECK).to_bytes(),
            [0x48, 0x00, 0x00, 0x01, 0xAA, 0x87]
        );
    }

    #[test]
    fn argument_is_big_endian() {
        assert_eq!(
            CommandFrame::new(Command::ReadSingleBlock, 0x0102_0304).to_bytes(),
            [0x51, 0x01, 0x02, 0x03, 0x04, 0x01]
        );
    }

    #[test]
    fn only_acmd41_needs_the_app_prefix() {
        assert!(Command::AppSendOpCond.is_app());
        assert!(!Command::SendOpCond.is_app());
        assert!(!Command::AppCmd.is_app());
    }
}
