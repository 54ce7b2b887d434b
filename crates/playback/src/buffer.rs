//! Double buffer shared between the control context and the sample emitter.
//!
//! # Ownership protocol
//!
//! Exactly one slot is *active* (drained by the emitter); the other is
//! *idle* (written by the control context). Ownership changes hands only
//! through [`PlaybackStatus`]:
//!
//! - Emitter: `Ready → Filling`, at the tick where it swaps the active slot.
//!   It is the sole writer of the active index, the cursor and the played
//!   byte counter.
//! - Control: `Filling → Ready | LastBuffer`, after refilling the idle slot.
//!   It is the sole writer of slot contents and only touches a slot while
//!   the emitter is inert or the slot is idle and the status is `Filling`.
//!
//! Neither side ever waits on the other, so the emitter can run from an
//! interrupt that preempts the control context at any point.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};

use platform::audio_types::SampleWidth;
use platform::config::SECTOR_SIZE;

use crate::sample::DacPacking;

/// Capacity of each audio slot.
pub const BUFFER_SIZE: usize = SECTOR_SIZE;

/// Handoff signal between the two contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PlaybackStatus {
    /// The idle slot holds fresh data.
    Ready = 0,
    /// The emitter swapped; the idle slot needs refilling.
    Filling = 1,
    /// The last refill read nothing; no more data will arrive.
    LastBuffer = 2,
}

impl PlaybackStatus {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Filling,
            2 => Self::LastBuffer,
            _ => Self::Ready,
        }
    }
}

impl core::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Ready => "ready",
            Self::Filling => "filling",
            Self::LastBuffer => "last buffer",
        })
    }
}

/// One fixed-capacity slot with a live length.
pub struct AudioBuffer {
    data: UnsafeCell<[u8; BUFFER_SIZE]>,
    len: AtomicUsize,
}

impl AudioBuffer {
    const fn new() -> Self {
        Self {
            data: UnsafeCell::new([0; BUFFER_SIZE]),
            len: AtomicUsize::new(0),
        }
    }

    /// Live length.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Whether the live range is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Playback context: both slots, the status flag and the counters.
///
/// `const`-constructible so the hardware build can keep it in a `static`
/// that the timer interrupt reaches.
pub struct SharedPlayback {
    slots: [AudioBuffer; 2],
    status: AtomicU8,
    active: AtomicU8,
    cursor: AtomicUsize,
    bytes_played: AtomicU32,
    data_size: AtomicU32,
    width: AtomicU8,
    packing: AtomicU8,
    underruns: AtomicU32,
    drained: AtomicBool,
}

// SAFETY: slot contents are the only non-atomic state. The ownership
// protocol in the module docs guarantees a slot is never written by the
// control context while the emitter can read it, and the Release store of
// `status`/`drained` after every write orders the data before the handoff.
unsafe impl Sync for SharedPlayback {}

impl Default for SharedPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedPlayback {
    /// Inert context: the emitter does nothing until a stream starts.
    pub const fn new() -> Self {
        Self {
            slots: [AudioBuffer::new(), AudioBuffer::new()],
            status: AtomicU8::new(PlaybackStatus::Ready as u8),
            active: AtomicU8::new(0),
            cursor: AtomicUsize::new(0),
            bytes_played: AtomicU32::new(0),
            data_size: AtomicU32::new(0),
            width: AtomicU8::new(SampleWidth::Eight as u8),
            packing: AtomicU8::new(DacPacking::Full as u8),
            underruns: AtomicU32::new(0),
            drained: AtomicBool::new(true),
        }
    }

    // -----------------------------------------------------------------------
    // Shared observers
    // -----------------------------------------------------------------------

    /// Current handoff status.
    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Bytes consumed by the emitter in the current stream.
    pub fn bytes_played(&self) -> u32 {
        self.bytes_played.load(Ordering::Acquire)
    }

    /// Declared size of the current data chunk.
    pub fn data_size(&self) -> u32 {
        self.data_size.load(Ordering::Acquire)
    }

    /// Ticks that found the next slot still being refilled.
    pub fn underruns(&self) -> u32 {
        self.underruns.load(Ordering::Acquire)
    }

    /// Whether the emitter ran out of data before the declared size.
    pub fn is_drained(&self) -> bool {
        self.drained.load(Ordering::Acquire)
    }

    /// Whether the played byte count reached the declared size.
    pub fn is_complete(&self) -> bool {
        self.bytes_played() >= self.data_size()
    }

    /// Index of the slot the emitter is draining.
    pub fn active_slot(&self) -> usize {
        usize::from(self.active.load(Ordering::Acquire) & 1)
    }

    /// Index of the slot the control context may refill.
    pub fn idle_slot(&self) -> usize {
        self.active_slot() ^ 1
    }

    /// Emitter position within the active slot.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Live length of slot `index`.
    pub fn slot_len(&self, index: usize) -> usize {
        self.slots.get(index).map_or(0, AudioBuffer::len)
    }

    // -----------------------------------------------------------------------
    // Control context
    // -----------------------------------------------------------------------

    /// Make the emitter inert and load the parameters of a new stream.
    ///
    /// Call only with the sample timer disarmed.
    pub(crate) fn prepare(&self, data_size: u32, width: SampleWidth, packing: DacPacking) {
        self.drained.store(true, Ordering::Release);
        self.data_size.store(data_size, Ordering::Relaxed);
        self.width.store(width as u8, Ordering::Relaxed);
        self.packing.store(packing as u8, Ordering::Relaxed);
        self.bytes_played.store(0, Ordering::Relaxed);
        self.underruns.store(0, Ordering::Relaxed);
        self.cursor.store(0, Ordering::Relaxed);
        self.active.store(0, Ordering::Relaxed);
        for slot in &self.slots {
            slot.len.store(0, Ordering::Relaxed);
        }
    }

    /// Hand slot 0 to the emitter; `next_ready` says whether slot 1 holds
    /// data. Called once both slots are primed.
    pub(crate) fn start(&self, next_ready: bool) {
        let status = if next_ready {
            PlaybackStatus::Ready
        } else {
            PlaybackStatus::LastBuffer
        };
        self.status.store(status as u8, Ordering::Release);
        self.drained.store(false, Ordering::Release);
    }

    /// Make the emitter inert again.
    pub(crate) fn halt(&self) {
        self.drained.store(true, Ordering::Release);
    }

    /// Whether the control context may write slot `index` now.
    fn writable(&self, index: usize) -> bool {
        self.is_drained() || (self.status() == PlaybackStatus::Filling && index == self.idle_slot())
    }

    /// Fill slot `index` with `fill`, which returns the number of bytes it
    /// wrote, and record that as the slot's live length.
    ///
    /// Returns `None` without calling `fill` if the slot currently belongs to
    /// the emitter.
    pub(crate) fn fill_slot<E>(
        &self,
        index: usize,
        fill: impl FnOnce(&mut [u8; BUFFER_SIZE]) -> Result<usize, E>,
    ) -> Option<Result<usize, E>> {
        if !self.writable(index) {
            return None;
        }
        let slot = self.slots.get(index)?;
        // SAFETY: `writable` established that the emitter is inert or that
        // this slot is idle while the status is `Filling`. The emitter only
        // leaves `Filling` state through a control-side store, so it cannot
        // swap this slot in until we publish `Ready`/`LastBuffer` below.
        let data = unsafe { &mut *slot.data.get() };
        Some(fill(data).map(|n| {
            let n = n.min(BUFFER_SIZE);
            slot.len.store(n, Ordering::Release);
            n
        }))
    }

    /// Publish the result of a steady-state refill.
    pub(crate) fn refilled(&self, bytes: usize) {
        let status = if bytes == 0 {
            PlaybackStatus::LastBuffer
        } else {
            PlaybackStatus::Ready
        };
        self.status.store(status as u8, Ordering::Release);
    }

    // -----------------------------------------------------------------------
    // Emitter context
    // -----------------------------------------------------------------------

    pub(crate) fn width(&self) -> SampleWidth {
        if self.width.load(Ordering::Relaxed) == SampleWidth::Sixteen as u8 {
            SampleWidth::Sixteen
        } else {
            SampleWidth::Eight
        }
    }

    pub(crate) fn packing(&self) -> DacPacking {
        DacPacking::from_u8(self.packing.load(Ordering::Relaxed))
    }

    /// Swap to the idle slot if it holds data. Returns the status seen.
    pub(crate) fn try_swap(&self) -> PlaybackStatus {
        let status = self.status();
        if status == PlaybackStatus::Ready {
            let next = self.active.load(Ordering::Relaxed) ^ 1;
            self.active.store(next & 1, Ordering::Release);
            self.cursor.store(0, Ordering::Release);
            self.status
                .store(PlaybackStatus::Filling as u8, Ordering::Release);
        }
        status
    }

    pub(crate) fn note_underrun(&self) {
        let n = self.underruns.load(Ordering::Relaxed);
        self.underruns.store(n.saturating_add(1), Ordering::Release);
    }

    pub(crate) fn mark_drained(&self) {
        self.drained.store(true, Ordering::Release);
    }

    /// Bytes of the active slot from the cursor to its live end.
    pub(crate) fn active_remaining(&self) -> &[u8] {
        let Some(slot) = self.slots.get(self.active_slot()) else {
            return &[];
        };
        // SAFETY: the active slot is never written by the control context
        // while the emitter is running (see the ownership protocol).
        let data = unsafe { &*slot.data.get() };
        data.get(self.cursor()..slot.len()).unwrap_or_default()
    }

    /// Advance the cursor and the played byte count by `bytes`.
    pub(crate) fn advance(&self, bytes: usize) {
        let cursor = self.cursor.load(Ordering::Relaxed);
        self.cursor
            .store(cursor.saturating_add(bytes), Ordering::Release);
        let played = self.bytes_played.load(Ordering::Relaxed);
        let step = u32::try_from(bytes).unwrap_or(u32::MAX);
        self.bytes_played
            .store(played.saturating_add(step), Ordering::Release);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[allow(clippy::indexing_slicing)]
    fn fill(shared: &SharedPlayback, index: usize, bytes: &[u8]) -> Option<usize> {
        shared
            .fill_slot(index, |buf| {
                buf[..bytes.len()].copy_from_slice(bytes);
                Ok::<_, ()>(bytes.len())
            })
            .map(Result::unwrap)
    }

    #[test]
    fn new_context_is_inert() {
        let shared = SharedPlayback::new();
        assert!(shared.is_drained());
        assert!(shared.is_complete());
    }

    #[test]
    fn active_slot_is_locked_while_streaming() {
        let shared = SharedPlayback::new();
        shared.prepare(8, SampleWidth::Eight, DacPacking::Full);
        assert_eq!(fill(&shared, 0, &[1, 2]), Some(2));
        assert_eq!(fill(&shared, 1, &[3]), Some(1));
        shared.start(true);

        // Ready: neither slot is writable yet.
        assert_eq!(fill(&shared, 0, &[9]), None);
        assert_eq!(fill(&shared, 1, &[9]), None);

        shared.advance(2);
        assert_eq!(shared.try_swap(), PlaybackStatus::Ready);
        assert_eq!(shared.active_slot(), 1);
        assert_eq!(shared.status(), PlaybackStatus::Filling);

        // Filling: only the vacated slot is writable.
        assert_eq!(fill(&shared, 1, &[9]), None);
        assert_eq!(fill(&shared, 0, &[4, 5, 6]), Some(3));
        shared.refilled(3);
        assert_eq!(shared.status(), PlaybackStatus::Ready);
    }

    #[test]
    fn empty_refill_marks_last_buffer() {
        let shared = SharedPlayback::new();
        shared.prepare(4, SampleWidth::Eight, DacPacking::Full);
        shared.start(true);
        shared.refilled(0);
        assert_eq!(shared.status(), PlaybackStatus::LastBuffer);
        assert_eq!(shared.try_swap(), PlaybackStatus::LastBuffer);
        assert_eq!(shared.active_slot(), 0);
    }

    #[test]
    fn oversized_fill_count_is_clamped() {
        let shared = SharedPlayback::new();
        shared.prepare(4, SampleWidth::Eight, DacPacking::Full);
        let n = shared.fill_slot(0, |_| Ok::<_, ()>(BUFFER_SIZE + 10));
        assert_eq!(n, Some(Ok(BUFFER_SIZE)));
        assert_eq!(shared.slot_len(0), BUFFER_SIZE);
    }
}
