//! Acquisition source: the interrupt-side half of the pipeline.
//!
//! `on_conversion_complete` runs in interrupt context. It only uses
//! non-blocking pool and mailbox operations, never logs, and reports every
//! failure through a sticky counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};

use crate::mailbox::Mailbox;
use crate::pool::{PoolStats, SampleHandle, SamplePool};

/// Conversion faults raised by the converter hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionFault {
    /// DMA transfer or conversion failure.
    Dma,
    /// Analog watchdog / overrun.
    AnalogOverflow,
}

/// Outcome of one fan-out pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub sequence: u16,
    /// Sinks that took a reference.
    pub accepted: usize,
    /// Sinks that were full.
    pub rejected: usize,
    /// The set went straight back to the pool because no sink took it.
    pub reclaimed: bool,
}

/// Point-in-time view of every pipeline counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStatus {
    pub pool: PoolStats,
    pub conversions: u64,
    pub dma_errors: u64,
    pub analog_overflow: u64,
    /// `(name, overflow count, pending)` per sink.
    pub sinks: Vec<(String, u64, usize)>,
}

#[derive(Debug, Default)]
struct FaultCounters {
    conversions: AtomicU64,
    dma_errors: AtomicU64,
    analog_overflow: AtomicU64,
}

#[derive(Debug)]
pub struct AcquisitionSource {
    pool: Arc<SamplePool>,
    sinks: Vec<Arc<Mailbox<SampleHandle>>>,
    sequence: AtomicU16,
    faults: FaultCounters,
}

impl AcquisitionSource {
    pub fn new(pool: Arc<SamplePool>, sinks: Vec<Arc<Mailbox<SampleHandle>>>) -> Self {
        Self {
            pool,
            sinks,
            sequence: AtomicU16::new(0),
            faults: FaultCounters::default(),
        }
    }

    pub fn pool(&self) -> &Arc<SamplePool> {
        &self.pool
    }

    pub fn sinks(&self) -> &[Arc<Mailbox<SampleHandle>>] {
        &self.sinks
    }

    /// Conversion-complete interrupt.
    ///
    /// Every completed conversion consumes one sequence number, so a host
    /// sees a gap wherever a set was dropped for lack of pool space. Returns
    /// `None` when the pool was exhausted.
    pub fn on_conversion_complete(&self, raw: &[u16]) -> Option<Delivery> {
        self.faults.conversions.fetch_add(1, Ordering::Relaxed);
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);

        // The pool hands us one reference; it keeps the set alive while
        // consumers race to release theirs during fan-out.
        let handle = self.pool.alloc()?;
        self.pool.fill(handle, sequence, raw);

        let mut accepted = 0;
        let mut rejected = 0;
        for sink in &self.sinks {
            self.pool.retain(handle);
            match sink.try_post(handle) {
                Ok(()) => accepted += 1,
                Err(_) => {
                    // Undo the reservation; our own reference keeps this
                    // from reaching zero.
                    let _ = self.pool.release(handle);
                    rejected += 1;
                },
            }
        }

        // Single reclaim check after the whole pass.
        let reclaimed = matches!(self.pool.release(handle), Ok(true)) && accepted == 0;
        Some(Delivery {
            sequence,
            accepted,
            rejected,
            reclaimed,
        })
    }

    /// Conversion-error interrupt.
    pub fn on_conversion_error(&self, fault: ConversionFault) {
        let counter = match fault {
            ConversionFault::Dma => &self.faults.dma_errors,
            ConversionFault::AnalogOverflow => &self.faults.analog_overflow,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            pool: self.pool.stats(),
            conversions: self.faults.conversions.load(Ordering::Relaxed),
            dma_errors: self.faults.dma_errors.load(Ordering::Relaxed),
            analog_overflow: self.faults.analog_overflow.load(Ordering::Relaxed),
            sinks: self
                .sinks
                .iter()
                .map(|s| (s.name().to_string(), s.overflow_count(), s.len()))
                .collect(),
        }
    }
}
