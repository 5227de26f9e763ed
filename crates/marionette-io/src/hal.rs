//! Hardware access traits and the simulated desktop board.
//!
//! On the instrument these wrap the pad and DAC registers. The desktop build
//! uses [`SimBoard`], which keeps pad state in memory so the host loop and
//! the tests can observe what the firmware drove.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::PoisonError;

use marionette_types::error::{MarionetteError, Result};

use crate::pin::{PadMode, PinId, Port, Sense};

// ---------------------------------------------------------------------------
// Pad driver
// ---------------------------------------------------------------------------

/// Register-level pad control.
pub trait PadDriver: Send + Sync {
    /// Reconfigure the pad electrically.
    fn apply_mode(&self, pin: PinId, mode: PadMode);

    /// Drive an output latch.
    fn write(&self, pin: PinId, high: bool);

    /// Sample the input level.
    fn read(&self, pin: PinId) -> bool;

    /// Raw 12-bit conversion of the pad voltage.
    fn read_analog(&self, pin: PinId) -> u16;
}

// ---------------------------------------------------------------------------
// DAC driver
// ---------------------------------------------------------------------------

/// Full-scale DAC code.
pub const DAC_MAX: u16 = 4095;

/// On-chip DAC output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DacChannel {
    Ch1,
    Ch2,
}

impl DacChannel {
    pub const ALL: [DacChannel; 2] = [DacChannel::Ch1, DacChannel::Ch2];

    /// Pad the channel drives (PA4 / PA5).
    pub fn pin(self) -> PinId {
        let pad = match self {
            DacChannel::Ch1 => 4,
            DacChannel::Ch2 => 5,
        };
        PinId::fixed(Port::A, pad)
    }
}

impl fmt::Display for DacChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DacChannel::Ch1 => "ch1",
            DacChannel::Ch2 => "ch2",
        })
    }
}

pub trait DacDriver: Send + Sync {
    /// Latch a 12-bit code on a channel.
    fn write(&self, channel: DacChannel, value: u16) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Simulated board
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct SimPad {
    mode: PadMode,
    level: bool,
    analog: u16,
}

impl Default for SimPad {
    fn default() -> Self {
        Self {
            mode: PadMode::Input(Sense::Floating),
            level: false,
            analog: 0,
        }
    }
}

/// In-memory board used on the desktop and in tests.
#[derive(Debug, Default)]
pub struct SimBoard {
    pads: Mutex<HashMap<PinId, SimPad>>,
    dac: Mutex<HashMap<DacChannel, u16>>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_pad<R>(&self, pin: PinId, f: impl FnOnce(&mut SimPad) -> R) -> R {
        let mut pads = self.pads.lock().unwrap_or_else(PoisonError::into_inner);
        f(pads.entry(pin).or_default())
    }

    /// Last mode applied to a pad.
    pub fn mode(&self, pin: PinId) -> PadMode {
        self.with_pad(pin, |p| p.mode)
    }

    /// Current logic level of a pad.
    pub fn level(&self, pin: PinId) -> bool {
        self.with_pad(pin, |p| p.level)
    }

    /// Drive a pad from outside the board (a host-side stimulus).
    pub fn set_external_level(&self, pin: PinId, high: bool) {
        self.with_pad(pin, |p| p.level = high);
    }

    /// Voltage seen by the converter on a pad, as a 12-bit code.
    pub fn set_analog(&self, pin: PinId, value: u16) {
        self.with_pad(pin, |p| p.analog = value.min(DAC_MAX));
    }

    /// Last code latched on a DAC channel.
    pub fn dac_value(&self, channel: DacChannel) -> Option<u16> {
        self.dac
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&channel)
            .copied()
    }
}

impl PadDriver for SimBoard {
    fn apply_mode(&self, pin: PinId, mode: PadMode) {
        self.with_pad(pin, |p| {
            p.mode = mode;
            match mode {
                PadMode::Input(Sense::PullUp) => p.level = true,
                PadMode::Input(Sense::PullDown) => p.level = false,
                _ => {},
            }
        });
    }

    fn write(&self, pin: PinId, high: bool) {
        self.with_pad(pin, |p| {
            if p.mode == PadMode::Output {
                p.level = high;
            }
        });
    }

    fn read(&self, pin: PinId) -> bool {
        self.with_pad(pin, |p| p.level)
    }

    fn read_analog(&self, pin: PinId) -> u16 {
        self.with_pad(pin, |p| p.analog)
    }
}

impl DacDriver for SimBoard {
    fn write(&self, channel: DacChannel, value: u16) -> Result<()> {
        if value > DAC_MAX {
            return Err(MarionetteError::Argument(format!(
                "dac value {value} exceeds {DAC_MAX}"
            )));
        }
        self.dac
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel, value);
        // The DAC pad loops back into the converter.
        self.set_analog(channel.pin(), value);
        Ok(())
    }
}
