//! IO resource management for Marionette.
//!
//! Every physical pad has a capability mask naming the subsystems allowed to
//! drive it. The [`IoManager`] is the only path that changes a pad's mode or
//! owner, so two subsystems can never fight over the same pin.

pub mod board;
pub mod hal;
pub mod manager;
pub mod pin;

pub use hal::{DacChannel, DacDriver, PadDriver, SimBoard};
pub use manager::{IoManager, PinState};
pub use pin::{CapabilityMask, PadMode, PinId, Port, Sense, Subsystem};
