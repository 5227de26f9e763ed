//! Fixed-block sample pool.
//!
//! All storage is allocated up front. Slots circulate through a bounded
//! free list, so `alloc` from interrupt context is a single non-blocking
//! `try_recv`. Each slot carries a reference count; the slot returns to the
//! free list exactly once, when the count reaches zero.

use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use marionette_types::error::{MarionetteError, Result};

/// Handle to an allocated sample set.
///
/// Copies of a handle share one slot; the slot's reference count decides
/// when it goes back to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleHandle {
    index: u16,
}

impl SampleHandle {
    pub fn index(&self) -> usize {
        usize::from(self.index)
    }
}

#[derive(Debug, Default)]
struct Slot {
    sequence: AtomicU16,
    len: AtomicU16,
    refs: AtomicU32,
}

/// Pool telemetry. Every field only ever grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub allocs: u64,
    pub frees: u64,
    pub alloc_failed: u64,
    /// Releases of a handle whose count was already zero.
    pub release_underflow: u64,
}

#[derive(Debug, Default)]
struct Counters {
    allocs: AtomicU64,
    frees: AtomicU64,
    alloc_failed: AtomicU64,
    release_underflow: AtomicU64,
}

pub struct SamplePool {
    slots: Box<[Slot]>,
    samples: Box<[AtomicU16]>,
    samples_per_set: usize,
    free_tx: Sender<u16>,
    free_rx: Receiver<u16>,
    counters: Counters,
}

impl SamplePool {
    /// `size` sample sets of `samples_per_set` values each.
    pub fn new(size: usize, samples_per_set: usize) -> Result<Self> {
        if size == 0 || size > usize::from(u16::MAX) {
            return Err(MarionetteError::Config(format!(
                "sample pool size {size} out of range"
            )));
        }
        if samples_per_set == 0 || samples_per_set > usize::from(u16::MAX) {
            return Err(MarionetteError::Config(format!(
                "samples per set {samples_per_set} out of range"
            )));
        }
        let (free_tx, free_rx) = bounded(size);
        for index in 0..size {
            // Capacity equals size, so seeding never fails.
            let _ = free_tx.try_send(index as u16);
        }
        Ok(Self {
            slots: (0..size).map(|_| Slot::default()).collect(),
            samples: (0..size * samples_per_set).map(|_| AtomicU16::new(0)).collect(),
            samples_per_set,
            free_tx,
            free_rx,
            counters: Counters::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn samples_per_set(&self) -> usize {
        self.samples_per_set
    }

    /// Slots currently on the free list.
    pub fn available(&self) -> usize {
        self.free_rx.len()
    }

    /// Non-blocking allocation. Safe to call from interrupt context.
    ///
    /// The returned slot holds one reference owned by the caller.
    pub fn alloc(&self) -> Option<SampleHandle> {
        match self.free_rx.try_recv() {
            Ok(index) => {
                self.slot(index).refs.store(1, Ordering::Release);
                self.counters.allocs.fetch_add(1, Ordering::Relaxed);
                Some(SampleHandle { index })
            },
            Err(_) => {
                self.counters.alloc_failed.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    fn slot(&self, index: u16) -> &Slot {
        &self.slots[usize::from(index)]
    }

    fn sample_range(&self, handle: SampleHandle) -> std::ops::Range<usize> {
        let start = handle.index() * self.samples_per_set;
        start..start + self.samples_per_set
    }

    /// Copy a raw conversion into the slot and stamp its sequence number.
    ///
    /// Values beyond `samples_per_set` are dropped. Returns the number stored.
    pub fn fill(&self, handle: SampleHandle, sequence: u16, raw: &[u16]) -> usize {
        let cells = &self.samples[self.sample_range(handle)];
        let n = raw.len().min(cells.len());
        for (cell, value) in cells.iter().zip(raw) {
            cell.store(*value, Ordering::Relaxed);
        }
        let slot = self.slot(handle.index);
        slot.len.store(n as u16, Ordering::Relaxed);
        slot.sequence.store(sequence, Ordering::Release);
        n
    }

    pub fn sequence(&self, handle: SampleHandle) -> u16 {
        self.slot(handle.index).sequence.load(Ordering::Acquire)
    }

    /// Values stored by the last `fill`.
    pub fn samples(&self, handle: SampleHandle) -> impl Iterator<Item = u16> + '_ {
        let len = usize::from(self.slot(handle.index).len.load(Ordering::Acquire));
        self.samples[self.sample_range(handle)]
            .iter()
            .take(len)
            .map(|cell| cell.load(Ordering::Relaxed))
    }

    /// Current reference count of a slot.
    pub fn ref_count(&self, handle: SampleHandle) -> u32 {
        self.slot(handle.index).refs.load(Ordering::Acquire)
    }

    /// Add a reference for one more holder.
    pub fn retain(&self, handle: SampleHandle) {
        self.slot(handle.index).refs.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop one reference; the slot returns to the pool when none remain.
    ///
    /// Returns `Ok(true)` when this call freed the slot. Releasing a slot whose
    /// count is already zero is refused and counted, never wrapped.
    pub fn release(&self, handle: SampleHandle) -> Result<bool> {
        let previous = self
            .slot(handle.index)
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match previous {
            Ok(1) => {
                self.free(handle);
                Ok(true)
            },
            Ok(_) => Ok(false),
            Err(_) => {
                self.counters.release_underflow.fetch_add(1, Ordering::Relaxed);
                Err(MarionetteError::Overflow(format!(
                    "sample set {} released with no references",
                    handle.index
                )))
            },
        }
    }

    fn free(&self, handle: SampleHandle) {
        // The free list has room for every slot, so this cannot be full.
        if self.free_tx.try_send(handle.index).is_ok() {
            self.counters.frees.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocs: self.counters.allocs.load(Ordering::Relaxed),
            frees: self.counters.frees.load(Ordering::Relaxed),
            alloc_failed: self.counters.alloc_failed.load(Ordering::Relaxed),
            release_underflow: self.counters.release_underflow.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for SamplePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplePool")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .field("samples_per_set", &self.samples_per_set)
            .finish()
    }
}
