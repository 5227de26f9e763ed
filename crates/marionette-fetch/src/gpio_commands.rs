//! `gpio` command: pin level and mode control.

use marionette_io::{PadMode, PinId, Port, Sense, Subsystem};
use marionette_io::pin::owner_name;
use marionette_types::error::{MarionetteError, Result};

use crate::args::expect_no_more;
use crate::context::Runtime;
use crate::registry::Command;
use crate::vocab::{self, DIRECTIONS, GPIO_ACTIONS, PINS, PORTS, SENSES};

/// Resolve the `<port>:<pin>` pair at `command[at..at + 2]`.
pub(crate) fn resolve_pin(command: &[&str], at: usize) -> Result<PinId> {
    let port = PORTS.resolve(command.get(at))?;
    let pad = PINS.resolve(command.get(at + 1))?;
    Port::from_index(port)
        .and_then(|p| PinId::new(p, pad as u8))
        .ok_or_else(|| MarionetteError::Parse(format!("no such pin: {}:{}", command[at], command[at + 1])))
}

pub struct GpioCommand;

impl GpioCommand {
    fn configure(rt: &Runtime, pin: PinId, command: &[&str]) -> Result<()> {
        let direction = DIRECTIONS.resolve(command.get(4))?;
        let (mode, used) = match direction {
            vocab::DIR_OUTPUT => {
                // A sense token is accepted and ignored for outputs.
                if let Some(sense) = command.get(5) {
                    SENSES.resolve(Some(sense))?;
                    (PadMode::Output, 6)
                } else {
                    (PadMode::Output, 5)
                }
            },
            vocab::DIR_ANALOG => (PadMode::Analog, 5),
            _ => {
                let mode = match SENSES.resolve(command.get(5))? {
                    vocab::SENSE_PULLUP => PadMode::Input(Sense::PullUp),
                    vocab::SENSE_PULLDOWN => PadMode::Input(Sense::PullDown),
                    vocab::SENSE_FLOATING => PadMode::Input(Sense::Floating),
                    _ => PadMode::Analog,
                };
                (mode, 6)
            },
        };
        expect_no_more(command, used)?;

        if mode == PadMode::Analog && !rt.io.is_capable(pin, Subsystem::Adc)? {
            return Err(MarionetteError::Argument(format!(
                "{pin} has no analog function"
            )));
        }
        rt.io.claim(pin, mode, Subsystem::Gpio)?;
        rt.console.debug(&format!("{pin} configured {mode}"))
    }

    fn release(rt: &Runtime, pin: PinId) -> Result<()> {
        let (_, owner) = rt.io.query(pin)?;
        if owner.is_some_and(|o| o != Subsystem::Gpio) {
            return Err(MarionetteError::ResourceConflict {
                pin: pin.to_string(),
                owner: owner_name(owner).to_string(),
                requested: Subsystem::Gpio.name().to_string(),
            });
        }
        rt.io.release(pin)
    }
}

impl Command for GpioCommand {
    fn name(&self) -> &str {
        "gpio"
    }

    fn description(&self) -> &str {
        "Drive, read and configure GPIO pins"
    }

    fn usage(&self) -> &str {
        "gpio:<get|set|clear|query|release>:<port>:<pin> | \
         gpio:configure:<port>:<pin>:<input|output|analog>[:<pullup|pulldown|floating|analog>]"
    }

    fn dispatch(&mut self, rt: &Runtime, command: &[&str], data: &[&str]) -> Result<()> {
        if !data.is_empty() {
            return Err(MarionetteError::Argument("gpio takes no data".into()));
        }
        let action = GPIO_ACTIONS.resolve(command.get(1))?;
        let pin = resolve_pin(command, 2)?;

        match action {
            vocab::GPIO_CONFIGURE | vocab::GPIO_CONFIG => Self::configure(rt, pin, command),
            vocab::GPIO_SET | vocab::GPIO_CLEAR => {
                expect_no_more(command, 4)?;
                let high = action == vocab::GPIO_SET;
                rt.io.claim(pin, PadMode::Output, Subsystem::Gpio)?;
                rt.pads.write(pin, high);
                rt.console.debug(&format!("{pin} <- {}", u8::from(high)))
            },
            vocab::GPIO_GET => {
                expect_no_more(command, 4)?;
                rt.console.value_bool(&pin.to_string(), rt.pads.read(pin))
            },
            vocab::GPIO_QUERY => {
                expect_no_more(command, 4)?;
                let (mode, owner) = rt.io.query(pin)?;
                rt.console.value_str(&pin.to_string(), owner_name(owner))?;
                rt.console.value_str("mode", &mode.to_string())
            },
            _ => {
                expect_no_more(command, 4)?;
                Self::release(rt, pin)
            },
        }
    }

    fn reset(&mut self, rt: &Runtime) -> Result<()> {
        for pin in rt.io.owned_by(Subsystem::Gpio) {
            rt.io.release(pin)?;
        }
        Ok(())
    }
}
