//! Byte-level transport between the MCU and a card in SPI mode.
//!
//! The card protocol never needs more than one byte in flight, so the
//! capability is a single full-duplex exchange plus chip-select control.
//! Every higher-level transaction brackets itself with
//! deselect + dummy byte, select + dummy byte to resynchronise the card.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

/// Value clocked out when only the response matters.
pub const IDLE_BYTE: u8 = 0xFF;

/// Full-duplex byte exchange with chip-select control.
pub trait CardBus {
    /// Error type
    type Error: core::fmt::Debug;

    /// Drive chip-select active (low).
    fn select(&mut self) -> Result<(), Self::Error>;

    /// Drive chip-select inactive (high).
    fn deselect(&mut self) -> Result<(), Self::Error>;

    /// Clock `out` onto the bus and return the byte clocked in, blocking until
    /// the transfer completes.
    fn exchange(&mut self, out: u8) -> Result<u8, Self::Error>;

    /// Clock `bytes` idle bytes with the card deselected.
    ///
    /// Used for the ≥74 power-up clocks before `GO_IDLE_STATE`.
    fn clock_idle(&mut self, bytes: usize) -> Result<(), Self::Error> {
        self.deselect()?;
        for _ in 0..bytes {
            self.exchange(IDLE_BYTE)?;
        }
        Ok(())
    }
}

/// Error from [`SpiCardBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<S, P> {
    /// SPI transfer failed.
    Spi(S),
    /// Chip-select pin could not be driven.
    Pin(P),
}

impl<S, P> core::fmt::Display for BusError<S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Spi(_) => f.write_str("SPI transfer failed"),
            Self::Pin(_) => f.write_str("chip-select pin error"),
        }
    }
}

/// [`CardBus`] over an `embedded-hal` SPI bus and a GPIO chip-select.
///
/// Uses `SpiBus` (not `SpiDevice`) because the card protocol drives
/// chip-select independently of byte transfers.
pub struct SpiCardBus<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> SpiCardBus<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    /// Wrap an SPI bus and an active-low chip-select pin.
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs }
    }

    /// Mutable access to the SPI peripheral, e.g. to raise the clock after
    /// card bring-up.
    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Give back the SPI bus and chip-select pin.
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS> CardBus for SpiCardBus<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    type Error = BusError<SPI::Error, CS::Error>;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(BusError::Pin)
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        self.cs.set_high().map_err(BusError::Pin)
    }

    fn exchange(&mut self, out: u8) -> Result<u8, Self::Error> {
        let mut word = [out];
        self.spi
            .transfer_in_place(&mut word)
            .map_err(BusError::Spi)?;
        let [received] = word;
        Ok(received)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    #[test]
    fn exchange_returns_the_byte_clocked_in() {
        let mut spi = SpiMock::new(&[SpiTransaction::transfer_in_place(vec![0x40], vec![0x01])]);
        let mut cs = PinMock::new(&[]);

        let mut bus = SpiCardBus::new(spi.clone(), cs.clone());
        assert_eq!(bus.exchange(0x40).unwrap(), 0x01);

        spi.done();
        cs.done();
    }

    #[test]
    fn select_drives_cs_low_and_deselect_drives_it_high() {
        let mut spi = SpiMock::new(&[]);
        let mut cs = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);

        let mut bus = SpiCardBus::new(spi.clone(), cs.clone());
        bus.select().unwrap();
        bus.deselect().unwrap();

        spi.done();
        cs.done();
    }

    #[test]
    fn clock_idle_deselects_then_sends_idle_bytes() {
        let expectations: Vec<SpiTransaction<u8>> = (0..10)
            .map(|_| SpiTransaction::transfer_in_place(vec![IDLE_BYTE], vec![IDLE_BYTE]))
            .collect();
        let mut spi = SpiMock::new(&expectations);
        let mut cs = PinMock::new(&[PinTransaction::set(PinState::High)]);

        let mut bus = SpiCardBus::new(spi.clone(), cs.clone());
        bus.clock_idle(10).unwrap();

        spi.done();
        cs.done();
    }
}
