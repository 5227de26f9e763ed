//! Pin identifiers, subsystems and pad modes.

use std::fmt;
use std::str::FromStr;

use marionette_types::error::{MarionetteError, Result};

/// Pads per GPIO port.
pub const PADS_PER_PORT: u8 = 16;

/// GPIO port letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Port {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
}

impl Port {
    /// All ports in table order.
    pub const ALL: [Port; 9] = [
        Port::A,
        Port::B,
        Port::C,
        Port::D,
        Port::E,
        Port::F,
        Port::G,
        Port::H,
        Port::I,
    ];

    pub fn letter(self) -> char {
        (b'A' + self as u8) as char
    }

    /// Port from its position in [`Port::ALL`].
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    fn from_letter(c: char) -> Option<Self> {
        let upper = c.to_ascii_uppercase();
        Self::ALL.iter().copied().find(|p| p.letter() == upper)
    }
}

/// A physical pad: port plus pad number (0-15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinId {
    port: Port,
    pad: u8,
}

impl PinId {
    /// Returns `None` if `pad` is outside the port.
    pub const fn new(port: Port, pad: u8) -> Option<Self> {
        if pad < PADS_PER_PORT {
            Some(Self { port, pad })
        } else {
            None
        }
    }

    /// Board-table constructor for pads known at compile time.
    pub(crate) const fn fixed(port: Port, pad: u8) -> Self {
        Self {
            port,
            pad: pad % PADS_PER_PORT,
        }
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn pad(&self) -> u8 {
        self.pad
    }

    /// Every pad on the board, port-major.
    pub fn all() -> impl Iterator<Item = PinId> {
        Port::ALL
            .into_iter()
            .flat_map(|port| (0..PADS_PER_PORT).map(move |pad| PinId { port, pad }))
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}{}", self.port.letter(), self.pad)
    }
}

impl FromStr for PinId {
    type Err = MarionetteError;

    /// Accepts `PA3`, `pd7`, `PC15`.
    fn from_str(s: &str) -> Result<Self> {
        let bad = || MarionetteError::Argument(format!("invalid pin name: {s}"));
        let mut chars = s.chars();
        match chars.next() {
            Some('P' | 'p') => {},
            _ => return Err(bad()),
        }
        let port = chars.next().and_then(Port::from_letter).ok_or_else(bad)?;
        let digits = chars.as_str();
        if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let pad: u8 = digits.parse().map_err(|_| bad())?;
        PinId::new(port, pad).ok_or_else(bad)
    }
}

// ---------------------------------------------------------------------------
// Subsystems
// ---------------------------------------------------------------------------

/// A peripheral subsystem that can own a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Gpio,
    Adc,
    Dac,
    Spi,
    I2c,
    Usb,
    Can,
    Uart,
}

impl Subsystem {
    pub const ALL: [Subsystem; 8] = [
        Subsystem::Gpio,
        Subsystem::Adc,
        Subsystem::Dac,
        Subsystem::Spi,
        Subsystem::I2c,
        Subsystem::Usb,
        Subsystem::Can,
        Subsystem::Uart,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Subsystem::Gpio => "GPIO",
            Subsystem::Adc => "ADC",
            Subsystem::Dac => "DAC",
            Subsystem::Spi => "SPI",
            Subsystem::I2c => "I2C",
            Subsystem::Usb => "USB",
            Subsystem::Can => "CAN",
            Subsystem::Uart => "UART",
        }
    }

    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Display name of an owner slot, `None` when unowned.
pub fn owner_name(owner: Option<Subsystem>) -> &'static str {
    owner.map_or("None", Subsystem::name)
}

/// Set of subsystems allowed to claim a pin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilityMask(u16);

impl CapabilityMask {
    /// Hard-wired or system pin: never claimable.
    pub const EMPTY: CapabilityMask = CapabilityMask(0);

    pub const fn with(self, s: Subsystem) -> Self {
        CapabilityMask(self.0 | s.bit())
    }

    pub const fn contains(self, s: Subsystem) -> bool {
        self.0 & s.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Subsystem> {
        Subsystem::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl FromIterator<Subsystem> for CapabilityMask {
    fn from_iter<I: IntoIterator<Item = Subsystem>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, CapabilityMask::with)
    }
}

// ---------------------------------------------------------------------------
// Pad modes
// ---------------------------------------------------------------------------

/// Input bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sense {
    PullUp,
    PullDown,
    Floating,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sense::PullUp => "pullup",
            Sense::PullDown => "pulldown",
            Sense::Floating => "floating",
        })
    }
}

/// Electrical configuration of a pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadMode {
    Input(Sense),
    /// Push-pull output.
    Output,
    Analog,
    /// Alternate function number.
    Alternate(u8),
}

impl fmt::Display for PadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PadMode::Input(sense) => write!(f, "input:{sense}"),
            PadMode::Output => f.write_str("output"),
            PadMode::Analog => f.write_str("analog"),
            PadMode::Alternate(af) => write!(f, "alternate{af}"),
        }
    }
}
