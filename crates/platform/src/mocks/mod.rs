//! Mock implementations for testing
//!
//! Host-side doubles for every platform trait, used by unit and integration
//! tests across the workspace and by the desktop card-image player.

#![cfg(any(test, feature = "std"))]
// Test doubles: a scripted expectation that cannot be met is a test failure.
#![allow(clippy::panic)]
// Host-only doubles; bounds are enforced by the surrounding tests.
#![allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]

mod card;

pub use card::{CardKind, MockCard};

use std::vec::Vec;

use crate::audio::SampleDac;
use crate::audio_types::SampleRateHz;
use crate::storage::{DirEntry, File, Storage};
use crate::timer::SampleTimer;

// ---------------------------------------------------------------------------
// File layer
// ---------------------------------------------------------------------------

/// Error from the in-memory file layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    /// No entry with the requested name.
    NotFound,
    /// Read failure injected by the test.
    Injected,
}

/// In-memory file over a borrowed byte slice.
pub struct MemFile<'a> {
    data: &'a [u8],
    pos: usize,
    fail_at: Option<usize>,
    reads: usize,
}

impl<'a> MemFile<'a> {
    /// Open `data` as a file positioned at byte 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            fail_at: None,
            reads: 0,
        }
    }

    /// Fail every read that starts at or beyond byte `offset`.
    pub fn failing_at(data: &'a [u8], offset: usize) -> Self {
        Self {
            fail_at: Some(offset),
            ..Self::new(data)
        }
    }

    /// Current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of `read` calls so far.
    pub fn read_calls(&self) -> usize {
        self.reads
    }
}

impl File for MemFile<'_> {
    type Error = MemError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.reads = self.reads.saturating_add(1);
        if self.fail_at.is_some_and(|at| self.pos >= at) {
            return Err(MemError::Injected);
        }
        let rest = self.data.get(self.pos..).unwrap_or_default();
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }

    fn skip(&mut self, bytes: u32) -> Result<(), Self::Error> {
        self.pos = self.pos.saturating_add(bytes as usize);
        Ok(())
    }
}

/// In-memory root directory.
#[derive(Default)]
pub struct MemStorage {
    entries: Vec<(DirEntry, Vec<u8>, Option<usize>)>,
}

impl MemStorage {
    /// Empty root directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file.
    pub fn with_file(mut self, name: &str, data: Vec<u8>) -> Self {
        self.entries.push((entry(name, false, data.len()), data, None));
        self
    }

    /// Add a file whose reads fail from byte `offset` on.
    pub fn with_failing_file(mut self, name: &str, data: Vec<u8>, offset: usize) -> Self {
        self.entries
            .push((entry(name, false, data.len()), data, Some(offset)));
        self
    }

    /// Add a sub-directory.
    pub fn with_dir(mut self, name: &str) -> Self {
        self.entries.push((entry(name, true, 0), Vec::new(), None));
        self
    }
}

fn entry(name: &str, is_dir: bool, size: usize) -> DirEntry {
    let mut short = heapless::String::new();
    for c in name.chars() {
        if short.push(c).is_err() {
            break;
        }
    }
    DirEntry {
        name: short,
        is_dir,
        size: u32::try_from(size).unwrap_or(u32::MAX),
    }
}

impl Storage for MemStorage {
    type Error = MemError;
    type File<'a> = MemFile<'a>;

    fn open_file(&mut self, name: &str) -> Result<Self::File<'_>, Self::Error> {
        self.entries
            .iter()
            .find(|(e, _, _)| !e.is_dir && e.name.as_str().eq_ignore_ascii_case(name))
            .map(|(_, data, fail_at)| match fail_at {
                Some(offset) => MemFile::failing_at(data, *offset),
                None => MemFile::new(data),
            })
            .ok_or(MemError::NotFound)
    }

    fn for_each_entry<F>(&mut self, mut visit: F) -> Result<(), Self::Error>
    where
        F: FnMut(&DirEntry),
    {
        for (e, _, _) in &self.entries {
            visit(e);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DAC
// ---------------------------------------------------------------------------

/// DAC that records every frame written to it.
#[derive(Default)]
pub struct RecordingDac {
    words: Vec<u16>,
}

impl RecordingDac {
    /// Empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames written so far.
    pub fn words(&self) -> &[u16] {
        &self.words
    }
}

impl SampleDac for RecordingDac {
    type Error = core::convert::Infallible;

    fn write_word(&mut self, word: u16) -> Result<(), Self::Error> {
        self.words.push(word);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// Timer that runs the tick callback synchronously from [`SampleTimer::idle`].
///
/// Each `idle` call fires `ticks_per_idle` ticks while armed, which lets tests
/// model a refill that takes several sample periods.
pub struct ScriptedTimer<F: FnMut()> {
    on_tick: F,
    armed: Option<SampleRateHz>,
    last_rate: Option<SampleRateHz>,
    ticks: usize,
    ticks_per_idle: usize,
    budget: usize,
    arm_calls: usize,
    disarm_calls: usize,
}

impl<F: FnMut()> ScriptedTimer<F> {
    /// Default tick budget before the timer declares the test hung.
    pub const DEFAULT_BUDGET: usize = 1_000_000;

    /// Timer firing one tick per idle.
    pub fn new(on_tick: F) -> Self {
        Self {
            on_tick,
            armed: None,
            last_rate: None,
            ticks: 0,
            ticks_per_idle: 1,
            budget: Self::DEFAULT_BUDGET,
            arm_calls: 0,
            disarm_calls: 0,
        }
    }

    /// Fire `n` ticks per idle call.
    pub fn with_ticks_per_idle(mut self, n: usize) -> Self {
        self.ticks_per_idle = n.max(1);
        self
    }

    /// Panic once more than `budget` ticks have fired.
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    /// Ticks fired so far.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Rate passed to the most recent `arm`.
    pub fn armed_rate(&self) -> Option<SampleRateHz> {
        self.armed
    }

    /// Rate passed to the most recent `arm`, kept after `disarm`.
    pub fn last_rate(&self) -> Option<SampleRateHz> {
        self.last_rate
    }

    /// Number of `arm` calls.
    pub fn arm_calls(&self) -> usize {
        self.arm_calls
    }

    /// Number of `disarm` calls.
    pub fn disarm_calls(&self) -> usize {
        self.disarm_calls
    }
}

impl<F: FnMut()> SampleTimer for ScriptedTimer<F> {
    fn arm(&mut self, rate: SampleRateHz) {
        self.armed = Some(rate);
        self.last_rate = Some(rate);
        self.arm_calls += 1;
    }

    fn disarm(&mut self) {
        self.armed = None;
        self.disarm_calls += 1;
    }

    fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    fn idle(&mut self) {
        if self.armed.is_none() {
            return;
        }
        for _ in 0..self.ticks_per_idle {
            self.ticks += 1;
            if self.ticks > self.budget {
                panic!("ScriptedTimer: tick budget of {} exhausted", self.budget);
            }
            (self.on_tick)();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn mem_file_reads_then_reports_eof() {
        let data = [1u8, 2, 3];
        let mut f = MemFile::new(&data);
        let mut buf = [0u8; 2];
        assert_eq!(f.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(f.read(&mut buf).unwrap(), 1);
        assert_eq!(f.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn mem_file_skip_past_end_reads_nothing() {
        let data = [0u8; 4];
        let mut f = MemFile::new(&data);
        f.skip(10).unwrap();
        assert_eq!(f.read(&mut [0u8; 4]).unwrap(), 0);
    }

    #[test]
    fn mem_storage_opens_files_case_insensitively() {
        let mut storage = MemStorage::new()
            .with_dir("MUSIC")
            .with_file("TONE.WAV", vec![9, 9]);
        let mut f = storage.open_file("tone.wav").unwrap();
        assert_eq!(f.read(&mut [0u8; 8]).unwrap(), 2);
        assert!(matches!(storage.open_file("MUSIC"), Err(MemError::NotFound)));
    }

    #[test]
    fn scripted_timer_only_ticks_while_armed() {
        let mut count = 0;
        {
            let mut timer = ScriptedTimer::new(|| count += 1).with_ticks_per_idle(3);
            timer.idle();
            timer.arm(SampleRateHz::new(8_000).unwrap());
            timer.idle();
            timer.disarm();
            timer.idle();
            assert_eq!(timer.ticks(), 3);
        }
        assert_eq!(count, 3);
    }
}
