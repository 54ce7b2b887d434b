//! SPI-mode SD/MMC card simulator over an in-memory disk image.
//!
//! Speaks enough of the protocol for bring-up, CSD and single-block reads.
//! Each kind answers the bring-up sequence the way real cards of that kind do,
//! and the knobs below inject busy periods, slow tokens and bad tokens.

use std::collections::VecDeque;
use std::vec::Vec;

use crate::bus::{CardBus, IDLE_BYTE};

const SECTOR: usize = 512;

const R1_READY: u8 = 0x00;
const R1_IDLE: u8 = 0x01;
const R1_ILLEGAL: u8 = 0x04;
const R1_ADDRESS_ERROR: u8 = 0x20;
const R1_PARAMETER_ERROR: u8 = 0x40;

const DATA_TOKEN: u8 = 0xFE;

/// Which card the simulator pretends to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    /// SD version 2; `high_capacity` sets the CCS bit (block addressing).
    SdV2 {
        /// Report CCS in the OCR.
        high_capacity: bool,
    },
    /// SD version 1: rejects SEND_IF_COND, accepts ACMD41.
    SdV1,
    /// MMC version 3: rejects SEND_IF_COND and APP_CMD, accepts CMD1.
    Mmc,
    /// Slot is empty: nothing ever answers.
    Absent,
}

impl CardKind {
    fn block_addressed(self) -> bool {
        matches!(self, Self::SdV2 { high_capacity: true })
    }
}

/// Simulated card; implements [`CardBus`] directly.
pub struct MockCard {
    kind: CardKind,
    image: Vec<u8>,
    selected: bool,
    idle: bool,
    app_cmd: bool,
    frame: Vec<u8>,
    out: VecDeque<u8>,
    busy_polls: usize,
    busy_remaining: usize,
    response_delay: usize,
    token_delay: usize,
    bad_token: Option<u8>,
    echo_pattern: u8,
    reject_block_len: bool,
    csd: Option<[u8; 16]>,
    commands: Vec<(u8, u32)>,
    after_token: Option<usize>,
    data_reads: Vec<usize>,
    exchanges: usize,
}

impl MockCard {
    /// Card of `kind` holding `image` (padded to a whole number of sectors).
    pub fn new(kind: CardKind, mut image: Vec<u8>) -> Self {
        let padded = image.len().div_ceil(SECTOR).max(1) * SECTOR;
        image.resize(padded, 0);
        Self {
            kind,
            image,
            selected: false,
            idle: false,
            app_cmd: false,
            frame: Vec::with_capacity(6),
            out: VecDeque::new(),
            busy_polls: 0,
            busy_remaining: 0,
            response_delay: 1,
            token_delay: 0,
            bad_token: None,
            echo_pattern: 0xAA,
            reject_block_len: false,
            csd: None,
            commands: Vec::new(),
            after_token: None,
            data_reads: Vec::new(),
            exchanges: 0,
        }
    }

    /// Card that stays busy for the first `n` op-cond polls.
    pub fn with_busy_polls(mut self, n: usize) -> Self {
        self.busy_polls = n;
        self
    }

    /// Idle bytes between a command frame and its R1 response.
    pub fn with_response_delay(mut self, n: usize) -> Self {
        self.response_delay = n;
        self
    }

    /// Idle bytes between the R1 of a read and its data token.
    pub fn with_token_delay(mut self, n: usize) -> Self {
        self.token_delay = n;
        self
    }

    /// Send `token` instead of the data start token.
    pub fn with_bad_token(mut self, token: u8) -> Self {
        self.bad_token = Some(token);
        self
    }

    /// Echo `pattern` in the SEND_IF_COND reply instead of 0xAA.
    pub fn with_echo_pattern(mut self, pattern: u8) -> Self {
        self.echo_pattern = pattern;
        self
    }

    /// Answer SET_BLOCKLEN with a parameter error.
    pub fn rejecting_block_len(mut self) -> Self {
        self.reject_block_len = true;
        self
    }

    /// Return `csd` from SEND_CSD instead of one derived from the image.
    pub fn with_csd(mut self, csd: [u8; 16]) -> Self {
        self.csd = Some(csd);
        self
    }

    /// Every command received, as `(index, argument)`.
    pub fn commands(&self) -> &[(u8, u32)] {
        &self.commands
    }

    /// Command indices received, in order.
    pub fn command_indices(&self) -> Vec<u8> {
        self.commands.iter().map(|&(idx, _)| idx).collect()
    }

    /// For each finished data transfer, the number of bytes clocked while
    /// selected after the data token was sent.
    pub fn bytes_after_token(&self) -> &[usize] {
        &self.data_reads
    }

    /// Total bytes exchanged on the bus.
    pub fn exchanges(&self) -> usize {
        self.exchanges
    }

    /// The disk image.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    fn sectors(&self) -> usize {
        self.image.len() / SECTOR
    }

    fn respond(&mut self, r1: u8) {
        self.out.extend(core::iter::repeat(IDLE_BYTE).take(self.response_delay));
        self.out.push_back(r1);
    }

    fn op_cond(&mut self) -> u8 {
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            R1_IDLE
        } else {
            self.idle = false;
            R1_READY
        }
    }

    fn status(&self) -> u8 {
        if self.idle {
            R1_IDLE
        } else {
            R1_READY
        }
    }

    fn process(&mut self, index: u8, arg: u32) {
        self.commands.push((index, arg));
        let app = core::mem::take(&mut self.app_cmd);
        if self.kind == CardKind::Absent {
            return;
        }
        match (index, app) {
            (0, _) => {
                self.idle = true;
                self.busy_remaining = self.busy_polls;
                self.respond(R1_IDLE);
            }
            (8, _) => match self.kind {
                CardKind::SdV2 { .. } => {
                    self.respond(self.status());
                    let echo = self.echo_pattern;
                    self.out.extend([0x00, 0x00, 0x01, echo]);
                }
                _ => self.respond(R1_ILLEGAL | self.status()),
            },
            (55, _) => {
                if self.kind == CardKind::Mmc {
                    self.respond(R1_ILLEGAL | self.status());
                } else {
                    self.app_cmd = true;
                    self.respond(self.status());
                }
            }
            (41, true) => {
                let r1 = self.op_cond();
                self.respond(r1);
            }
            (1, false) => {
                let r1 = self.op_cond();
                self.respond(r1);
            }
            (58, _) => {
                self.respond(self.status());
                let ccs = if self.kind.block_addressed() { 0xC0 } else { 0x80 };
                self.out.extend([ccs, 0xFF, 0x80, 0x00]);
            }
            (16, _) => {
                let r1 = if self.reject_block_len || arg != 512 {
                    R1_PARAMETER_ERROR
                } else {
                    self.status()
                };
                self.respond(r1);
            }
            (9, _) => {
                self.respond(self.status());
                let csd = self.csd.unwrap_or_else(|| self.derived_csd());
                self.out.push_back(DATA_TOKEN);
                self.out.extend(csd);
                self.out.extend([0xFF, 0xFF]);
            }
            (17, _) => self.read_block(arg),
            _ => self.respond(R1_ILLEGAL | self.status()),
        }
    }

    fn read_block(&mut self, arg: u32) {
        let arg = arg as usize;
        let sector = if self.kind.block_addressed() {
            arg
        } else if arg % SECTOR != 0 {
            self.respond(R1_ADDRESS_ERROR);
            return;
        } else {
            arg / SECTOR
        };
        if self.idle || sector >= self.sectors() {
            self.respond(R1_PARAMETER_ERROR);
            return;
        }
        self.respond(R1_READY);
        self.out
            .extend(core::iter::repeat(IDLE_BYTE).take(self.token_delay));
        self.out.push_back(self.bad_token.unwrap_or(DATA_TOKEN));
        if self.bad_token.is_some() {
            return;
        }
        let start = sector * SECTOR;
        let payload: Vec<u8> = self.image[start..start + SECTOR].to_vec();
        self.out.extend(payload);
        self.out.extend([0x5A, 0xA5]);
    }

    /// CSD v2 for high-capacity cards, CSD v1 (512-byte blocks, ×512
    /// multiplier) otherwise.
    fn derived_csd(&self) -> [u8; 16] {
        let blocks = self.sectors();
        let mut csd = [0u8; 16];
        if self.kind.block_addressed() {
            let c_size = (blocks.div_ceil(1024).max(1) - 1) as u32;
            csd[0] = 0x40;
            csd[5] = 0x09;
            csd[7] = ((c_size >> 16) & 0x3F) as u8;
            csd[8] = (c_size >> 8) as u8;
            csd[9] = c_size as u8;
        } else {
            let c_size = (blocks.div_ceil(512).max(1) - 1) as u32;
            csd[5] = 0x09;
            csd[6] = ((c_size >> 10) & 0x03) as u8;
            csd[7] = (c_size >> 2) as u8;
            csd[8] = ((c_size & 0x03) << 6) as u8;
            // C_SIZE_MULT = 7
            csd[9] = 0x03;
            csd[10] = 0x80;
        }
        csd
    }
}

impl CardBus for MockCard {
    type Error = core::convert::Infallible;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.selected = true;
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        if let Some(n) = self.after_token.take() {
            self.data_reads.push(n);
        }
        self.selected = false;
        self.frame.clear();
        self.out.clear();
        Ok(())
    }

    fn exchange(&mut self, byte: u8) -> Result<u8, Self::Error> {
        self.exchanges += 1;
        if !self.selected {
            return Ok(IDLE_BYTE);
        }
        if let Some(n) = self.after_token.as_mut() {
            *n += 1;
        }

        if !self.frame.is_empty() || byte & 0xC0 == 0x40 {
            self.frame.push(byte);
            if self.frame.len() == 6 {
                let index = self.frame[0] & 0x3F;
                let arg = u32::from_be_bytes([
                    self.frame[1],
                    self.frame[2],
                    self.frame[3],
                    self.frame[4],
                ]);
                self.frame.clear();
                self.out.clear();
                self.process(index, arg);
            }
            return Ok(IDLE_BYTE);
        }

        let reply = self.out.pop_front().unwrap_or(IDLE_BYTE);
        if reply == DATA_TOKEN && self.after_token.is_none() && self.commands.last().is_some_and(|c| c.0 == 17) {
            self.after_token = Some(0);
        }
        Ok(reply)
    }
}
