//! SD/MMC card driver in SPI mode.
//!
//! Generic over the byte transport ([`CardBus`]) and a blocking delay used
//! between operating-condition polls. Only the control context may call into
//! the driver; each call runs one full command/response/data cycle and leaves
//! the card deselected on every exit path.

use embedded_hal::delay::DelayNs;
use platform::bus::{CardBus, IDLE_BYTE};
use platform::config::SECTOR_SIZE;

use crate::card_type::CardType;
use crate::command::{
    Command, CommandFrame, DATA_CRC_LEN, DATA_START_TOKEN, HOST_CAPACITY_SUPPORT, IF_COND_CHECK,
    OCR_CCS, R1_IDLE_STATE, R1_START_BIT,
};
use crate::config::SdConfig;
use crate::csd;
use crate::error::DiskError;

const R1_READY: u8 = 0x00;

/// SD/MMC card on an SPI-mode bus.
pub struct SdCard<B, D> {
    bus: B,
    delay: D,
    config: SdConfig,
    card_type: CardType,
}

impl<B, D> SdCard<B, D>
where
    B: CardBus,
    D: DelayNs,
{
    /// Driver with the default polling budgets. Call
    /// [`initialize`](Self::initialize) before any sector operation.
    pub fn new(bus: B, delay: D) -> Self {
        Self {
            bus,
            delay,
            config: SdConfig::default(),
            card_type: CardType::EMPTY,
        }
    }

    /// Driver with explicit polling budgets.
    ///
    /// # Errors
    ///
    /// [`DiskError::InvalidConfig`] when a budget could never succeed.
    pub fn with_config(bus: B, delay: D, config: SdConfig) -> Result<Self, DiskError> {
        config.validate().map_err(DiskError::InvalidConfig)?;
        Ok(Self {
            config,
            ..Self::new(bus, delay)
        })
    }

    /// Classification from the last bring-up; empty until one succeeds.
    pub fn card_type(&self) -> CardType {
        self.card_type
    }

    /// Mutable access to the transport, e.g. to raise the bus clock after
    /// bring-up.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give back the transport and delay.
    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    // -----------------------------------------------------------------------
    // Bring-up
    // -----------------------------------------------------------------------

    /// Reset the card into SPI mode and classify it.
    ///
    /// Any failure leaves [`card_type`](Self::card_type) empty.
    pub fn initialize(&mut self) -> Result<CardType, DiskError> {
        self.card_type = CardType::EMPTY;
        self.bus
            .clock_idle(self.config.power_up_bytes)
            .map_err(bus_error)?;

        let identified = self.identify();
        let released = self.release_bus();
        let card_type = identified?;
        released?;

        if card_type.is_empty() {
            warn!("card bring-up did not classify the card");
            return Err(DiskError::NotInitialized);
        }
        debug!("card type: {}", card_type);
        self.card_type = card_type;
        Ok(card_type)
    }

    fn identify(&mut self) -> Result<CardType, DiskError> {
        if self.command(Command::GoIdleState, 0)? != R1_IDLE_STATE {
            return Err(DiskError::NoCard);
        }

        if self.command(Command::SendIfCond, IF_COND_CHECK)? == R1_IDLE_STATE {
            let [_, _, voltage, pattern] = self.read_trailer()?;
            if voltage != 0x01 || pattern != 0xAA {
                warn!("card rejected the voltage window");
                return Ok(CardType::EMPTY);
            }
            if !self.wait_op_cond(Command::AppSendOpCond, HOST_CAPACITY_SUPPORT)? {
                return Ok(CardType::EMPTY);
            }
            if self.command(Command::ReadOcr, 0)? != R1_READY {
                return Ok(CardType::EMPTY);
            }
            let [ocr0, ..] = self.read_trailer()?;
            return Ok(if ocr0 & OCR_CCS != 0 {
                CardType::SD2 | CardType::BLOCK
            } else {
                CardType::SD2
            });
        }

        // SEND_IF_COND rejected: SD v1 answers ACMD41, MMC does not.
        let (card_type, op_cond) = if self.command(Command::AppSendOpCond, 0)? <= 1 {
            (CardType::SD1, Command::AppSendOpCond)
        } else {
            (CardType::MMC, Command::SendOpCond)
        };
        trace!("legacy card, polling {}", op_cond);
        if !self.wait_op_cond(op_cond, 0)? {
            return Ok(CardType::EMPTY);
        }
        let block_len = u32::try_from(SECTOR_SIZE).map_err(|_| DiskError::OutOfRange)?;
        if self.command(Command::SetBlockLen, block_len)? != R1_READY {
            return Ok(CardType::EMPTY);
        }
        Ok(card_type)
    }

    /// Poll `command` until the card leaves the idle state. `false` when the
    /// attempt budget runs out.
    fn wait_op_cond(&mut self, command: Command, argument: u32) -> Result<bool, DiskError> {
        for _ in 0..self.config.op_cond_attempts {
            if self.command(command, argument)? == R1_READY {
                return Ok(true);
            }
            self.delay.delay_us(self.config.op_cond_interval_us);
        }
        warn!("{} never left idle", command);
        Ok(false)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Read `count` bytes starting at `offset` within `sector`.
    ///
    /// With `dest == None` the bytes are clocked and discarded. The whole
    /// 512-byte payload and its CRC are always clocked so the bus stays
    /// aligned for the next command.
    pub fn read_partial_sector(
        &mut self,
        dest: Option<&mut [u8]>,
        sector: u32,
        offset: usize,
        count: usize,
    ) -> Result<(), DiskError> {
        if self.card_type.is_empty() {
            return Err(DiskError::NotInitialized);
        }
        let end = offset
            .checked_add(count)
            .filter(|&end| end <= SECTOR_SIZE)
            .ok_or(DiskError::OutOfRange)?;
        let dest = match dest {
            Some(buf) => Some(buf.get_mut(..count).ok_or(DiskError::OutOfRange)?),
            None => None,
        };
        let address = self.address_of(sector)?;

        let transferred = self.read_block(address, dest, offset, end);
        let released = self.release_bus();
        transferred?;
        released
    }

    /// Read a whole sector.
    pub fn read_sector(&mut self, sector: u32, dest: &mut [u8; SECTOR_SIZE]) -> Result<(), DiskError> {
        self.read_partial_sector(Some(dest), sector, 0, SECTOR_SIZE)
    }

    fn read_block(
        &mut self,
        address: u32,
        dest: Option<&mut [u8]>,
        offset: usize,
        end: usize,
    ) -> Result<(), DiskError> {
        let r1 = self.command(Command::ReadSingleBlock, address)?;
        if r1 != R1_READY {
            return Err(DiskError::from_r1(Command::ReadSingleBlock, r1));
        }
        self.wait_data_token()?;

        self.discard(offset)?;
        match dest {
            Some(buf) => {
                for slot in buf.iter_mut() {
                    *slot = self.exchange(IDLE_BYTE)?;
                }
            }
            None => self.discard(end.saturating_sub(offset))?,
        }
        self.discard(SECTOR_SIZE.saturating_sub(end).saturating_add(DATA_CRC_LEN))
    }

    /// Card capacity in 512-byte blocks, from the CSD register.
    pub fn num_blocks(&mut self) -> Result<u32, DiskError> {
        if self.card_type.is_empty() {
            return Err(DiskError::NotInitialized);
        }
        let read = self.read_csd();
        let released = self.release_bus();
        let raw = read?;
        released?;
        csd::block_count(&raw, self.card_type)
    }

    fn read_csd(&mut self) -> Result<[u8; 16], DiskError> {
        let r1 = self.command(Command::SendCsd, 0)?;
        if r1 != R1_READY {
            return Err(DiskError::from_r1(Command::SendCsd, r1));
        }
        self.wait_data_token()?;
        let mut raw = [0u8; 16];
        for byte in &mut raw {
            *byte = self.exchange(IDLE_BYTE)?;
        }
        self.discard(DATA_CRC_LEN)?;
        Ok(raw)
    }

    // -----------------------------------------------------------------------
    // Transport helpers
    // -----------------------------------------------------------------------

    fn address_of(&self, sector: u32) -> Result<u32, DiskError> {
        if self.card_type.is_block_addressed() {
            return Ok(sector);
        }
        let sector_size = u32::try_from(SECTOR_SIZE).map_err(|_| DiskError::OutOfRange)?;
        sector.checked_mul(sector_size).ok_or(DiskError::OutOfRange)
    }

    /// Send `command`, prefixed by APP_CMD when needed, and return its R1.
    ///
    /// An APP_CMD response above 1 is returned as the command's response.
    fn command(&mut self, command: Command, argument: u32) -> Result<u8, DiskError> {
        if command.is_app() {
            let r1 = self.transfer(CommandFrame::new(Command::AppCmd, 0))?;
            if r1 > R1_IDLE_STATE {
                return Ok(r1);
            }
        }
        self.transfer(CommandFrame::new(command, argument))
    }

    /// One command frame: resynchronise, send, poll for R1.
    ///
    /// Returns the last byte polled; its high bit is set if the card never
    /// answered.
    fn transfer(&mut self, frame: CommandFrame) -> Result<u8, DiskError> {
        self.bus.deselect().map_err(bus_error)?;
        self.exchange(IDLE_BYTE)?;
        self.bus.select().map_err(bus_error)?;
        self.exchange(IDLE_BYTE)?;

        for byte in frame.to_bytes() {
            self.exchange(byte)?;
        }

        let mut response = IDLE_BYTE;
        for _ in 0..self.config.response_polls {
            response = self.exchange(IDLE_BYTE)?;
            if response & R1_START_BIT == 0 {
                break;
            }
        }
        trace!("{} -> {}", frame.command, response);
        Ok(response)
    }

    fn wait_data_token(&mut self) -> Result<(), DiskError> {
        for _ in 0..self.config.token_polls {
            match self.exchange(IDLE_BYTE)? {
                DATA_START_TOKEN => return Ok(()),
                IDLE_BYTE => {}
                other => {
                    warn!("unexpected data token {}", other);
                    return Err(DiskError::UnexpectedToken(other));
                }
            }
        }
        warn!("data token timeout");
        Err(DiskError::DataTokenTimeout)
    }

    /// Four bytes following an R7/R3 response.
    fn read_trailer(&mut self) -> Result<[u8; 4], DiskError> {
        let mut trailer = [0u8; 4];
        for byte in &mut trailer {
            *byte = self.exchange(IDLE_BYTE)?;
        }
        Ok(trailer)
    }

    fn discard(&mut self, bytes: usize) -> Result<(), DiskError> {
        for _ in 0..bytes {
            self.exchange(IDLE_BYTE)?;
        }
        Ok(())
    }

    fn release_bus(&mut self) -> Result<(), DiskError> {
        self.bus.deselect().map_err(bus_error)?;
        self.exchange(IDLE_BYTE).map(|_| ())
    }

    fn exchange(&mut self, out: u8) -> Result<u8, DiskError> {
        self.bus.exchange(out).map_err(bus_error)
    }
}

fn bus_error<E>(_: E) -> DiskError {
    DiskError::Bus
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;

    use embedded_hal_mock::eh1::delay::NoopDelay;
    use platform::mocks::{CardKind, MockCard};

    fn ready_card(kind: CardKind, image: Vec<u8>) -> SdCard<MockCard, NoopDelay> {
        let mut card = SdCard::new(MockCard::new(kind, image), NoopDelay);
        card.initialize().unwrap();
        card
    }

    #[test]
    fn reads_before_bring_up_are_refused() {
        let mut card = SdCard::new(MockCard::new(CardKind::SdV1, vec![0; 512]), NoopDelay);
        let mut buf = [0u8; 4];
        assert_eq!(
            card.read_partial_sector(Some(&mut buf), 0, 0, 4),
            Err(DiskError::NotInitialized)
        );
        assert!(card.bus_mut().commands().is_empty());
    }

    #[test]
    fn byte_addressed_card_gets_sector_times_512() {
        let mut card = ready_card(CardKind::SdV2 { high_capacity: false }, vec![0; 4 * 512]);
        card.read_partial_sector(None, 3, 0, 0).unwrap();
        assert_eq!(card.bus_mut().commands().last(), Some(&(17, 3 * 512)));
    }

    #[test]
    fn block_addressed_card_gets_raw_sector() {
        let mut card = ready_card(CardKind::SdV2 { high_capacity: true }, vec![0; 4 * 512]);
        card.read_partial_sector(None, 3, 0, 0).unwrap();
        assert_eq!(card.bus_mut().commands().last(), Some(&(17, 3)));
    }

    #[test]
    fn partial_read_copies_the_requested_window() {
        let image: Vec<u8> = (0..1024).map(|i| (i % 251) as u8).collect();
        let mut card = ready_card(CardKind::SdV1, image.clone());
        let mut buf = [0u8; 10];
        card.read_partial_sector(Some(&mut buf), 1, 100, 10).unwrap();
        assert_eq!(&buf[..], &image[612..622]);
    }

    #[test]
    fn window_past_sector_end_is_out_of_range() {
        let mut card = ready_card(CardKind::SdV1, vec![0; 512]);
        assert_eq!(
            card.read_partial_sector(None, 0, 500, 13),
            Err(DiskError::OutOfRange)
        );
    }

    #[test]
    fn short_destination_is_out_of_range() {
        let mut card = ready_card(CardKind::SdV1, vec![0; 512]);
        let mut buf = [0u8; 3];
        assert_eq!(
            card.read_partial_sector(Some(&mut buf), 0, 0, 4),
            Err(DiskError::OutOfRange)
        );
    }

    #[test]
    fn sector_beyond_card_is_rejected_by_the_card() {
        let mut card = ready_card(CardKind::SdV2 { high_capacity: true }, vec![0; 512]);
        assert_eq!(
            card.read_partial_sector(None, 9, 0, 0),
            Err(DiskError::CommandRejected {
                command: Command::ReadSingleBlock,
                response: 0x40,
            })
        );
    }

    #[test]
    fn bad_token_is_reported_and_card_released() {
        let mut card = SdCard::new(
            MockCard::new(CardKind::SdV1, vec![0; 512]).with_bad_token(0x0B),
            NoopDelay,
        );
        card.initialize().unwrap();
        assert_eq!(
            card.read_partial_sector(None, 0, 0, 0),
            Err(DiskError::UnexpectedToken(0x0B))
        );
        let (mock, _) = card.release();
        assert_eq!(mock.command_indices().last(), Some(&17));
    }

    #[test]
    fn slow_token_within_budget_is_accepted() {
        let mut card = SdCard::new(
            MockCard::new(CardKind::SdV1, vec![7; 512]).with_token_delay(1_000),
            NoopDelay,
        );
        card.initialize().unwrap();
        let mut buf = [0u8; 1];
        card.read_partial_sector(Some(&mut buf), 0, 511, 1).unwrap();
        assert_eq!(buf, [7]);
    }

    #[test]
    fn token_budget_exhaustion_times_out() {
        let config = SdConfig {
            token_polls: 8,
            ..SdConfig::default()
        };
        let mut card = SdCard::with_config(
            MockCard::new(CardKind::SdV1, vec![0; 512]).with_token_delay(100),
            NoopDelay,
            config,
        )
        .unwrap();
        card.initialize().unwrap();
        assert_eq!(
            card.read_partial_sector(None, 0, 0, 1),
            Err(DiskError::DataTokenTimeout)
        );
    }

    #[test]
    fn capacity_from_csd() {
        let mut card = ready_card(CardKind::SdV2 { high_capacity: true }, vec![0; 2048 * 512]);
        assert_eq!(card.num_blocks().unwrap(), 2048);

        let mut card = ready_card(CardKind::SdV1, vec![0; 1024 * 512]);
        assert_eq!(card.num_blocks().unwrap(), 1024);
    }
}
