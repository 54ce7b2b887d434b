//! MCP4921 12-bit DAC, bit-banged over three GPIO outputs.
//!
//! One write is a 16-clock frame, MSB first, clocked on the rising edge of
//! SCK while CS is low. LDAC is tied low on the board, so the output updates
//! when CS rises.

use embedded_hal::digital::OutputPin;
use platform::audio::SampleDac;

/// Bits per DAC frame.
pub const FRAME_BITS: u32 = 16;

/// MCP4921 on bit-banged CS, SCK and SDI lines.
pub struct Mcp4921<CS, SCK, SDI> {
    cs: CS,
    sck: SCK,
    sdi: SDI,
}

impl<CS, SCK, SDI> Mcp4921<CS, SCK, SDI>
where
    CS: OutputPin,
    SCK: OutputPin<Error = CS::Error>,
    SDI: OutputPin<Error = CS::Error>,
{
    /// Take the three pins and drive them to their idle levels: CS high,
    /// SCK low.
    pub fn new(mut cs: CS, mut sck: SCK, sdi: SDI) -> Result<Self, CS::Error> {
        cs.set_high()?;
        sck.set_low()?;
        Ok(Self { cs, sck, sdi })
    }

    /// Give back the pins.
    pub fn release(self) -> (CS, SCK, SDI) {
        (self.cs, self.sck, self.sdi)
    }

    fn send_bit(&mut self, one: bool) -> Result<(), CS::Error> {
        if one {
            self.sdi.set_high()?;
        } else {
            self.sdi.set_low()?;
        }
        self.sck.set_high()?;
        self.sck.set_low()
    }
}

impl<CS, SCK, SDI> SampleDac for Mcp4921<CS, SCK, SDI>
where
    CS: OutputPin,
    SCK: OutputPin<Error = CS::Error>,
    SDI: OutputPin<Error = CS::Error>,
{
    type Error = CS::Error;

    fn write_word(&mut self, word: u16) -> Result<(), Self::Error> {
        self.cs.set_low()?;
        for bit in (0..FRAME_BITS).rev() {
            self.send_bit(word.checked_shr(bit).is_some_and(|w| w & 1 == 1))?;
        }
        self.cs.set_high()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    fn clock_pulses(n: usize) -> Vec<Transaction> {
        (0..n)
            .flat_map(|_| [Transaction::set(State::High), Transaction::set(State::Low)])
            .collect()
    }

    #[test]
    fn new_parks_the_lines() {
        let mut cs = PinMock::new(&[Transaction::set(State::High)]);
        let mut sck = PinMock::new(&[Transaction::set(State::Low)]);
        let mut sdi = PinMock::new(&[]);
        let dac = Mcp4921::new(cs.clone(), sck.clone(), sdi.clone()).unwrap();
        drop(dac);
        cs.done();
        sck.done();
        sdi.done();
    }

    #[test]
    fn frame_is_sent_msb_first_inside_one_chip_select() {
        let word: u16 = 0x3A51;
        let mut cs = PinMock::new(&[
            Transaction::set(State::High),
            Transaction::set(State::Low),
            Transaction::set(State::High),
        ]);
        let mut sck_expect = vec![Transaction::set(State::Low)];
        sck_expect.extend(clock_pulses(16));
        let mut sck = PinMock::new(&sck_expect);
        let sdi_expect: Vec<Transaction> = (0..16)
            .rev()
            .map(|bit| {
                if word & (1 << bit) != 0 {
                    Transaction::set(State::High)
                } else {
                    Transaction::set(State::Low)
                }
            })
            .collect();
        let mut sdi = PinMock::new(&sdi_expect);

        let mut dac = Mcp4921::new(cs.clone(), sck.clone(), sdi.clone()).unwrap();
        dac.write_word(word).unwrap();
        drop(dac);
        cs.done();
        sck.done();
        sdi.done();
    }
}
