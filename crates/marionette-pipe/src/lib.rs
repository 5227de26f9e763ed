//! Interrupt-safe sample pipeline for Marionette.
//!
//! Conversions leave interrupt context through a fixed [`SamplePool`] and one
//! or more bounded [`Mailbox`]es. Nothing on the producer side blocks or
//! allocates; consumer threads drain the mailboxes, stream each sample set to
//! the [`Console`] and hand the slot back to the pool.

pub mod console;
pub mod consumer;
pub mod converter;
pub mod mailbox;
pub mod pool;
pub mod source;

pub use console::{Console, Transcript};
pub use consumer::Pipe;
pub use converter::{AcquisitionMode, Converter, TimerConverter};
pub use mailbox::Mailbox;
pub use pool::{PoolStats, SampleHandle, SamplePool};
pub use source::{AcquisitionSource, ConversionFault, Delivery, PipelineStatus};
