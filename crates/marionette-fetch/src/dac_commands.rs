//! `dac` command: on-chip DAC outputs on PA4/PA5.

use marionette_io::hal::DAC_MAX;
use marionette_io::{DacChannel, PadMode, Subsystem};
use marionette_types::error::{MarionetteError, Result};

use crate::args::{expect_data, expect_no_more, parse_in_range};
use crate::context::Runtime;
use crate::registry::Command;
use crate::vocab::{self, DAC_ACTIONS, DAC_CHANNELS};

#[derive(Default)]
pub struct DacCommand {
    started: bool,
}

impl DacCommand {
    fn start(&mut self, rt: &Runtime) -> Result<()> {
        if self.started {
            return Err(MarionetteError::DeviceNotReady("dac already started".into()));
        }
        let mut taken = Vec::new();
        for channel in DacChannel::ALL {
            if let Err(e) = rt.io.claim(channel.pin(), PadMode::Analog, Subsystem::Dac) {
                for pin in taken {
                    rt.io.release(pin)?;
                }
                return Err(e);
            }
            taken.push(channel.pin());
        }
        self.started = true;
        log::info!("dac started");
        Ok(())
    }

    fn stop(&mut self, rt: &Runtime) -> Result<()> {
        if !self.started {
            return Err(MarionetteError::DeviceNotReady("dac not started".into()));
        }
        self.release(rt)
    }

    fn release(&mut self, rt: &Runtime) -> Result<()> {
        for channel in DacChannel::ALL {
            rt.io.release(channel.pin())?;
        }
        self.started = false;
        Ok(())
    }

    fn write(&self, rt: &Runtime, command: &[&str], data: &[&str]) -> Result<()> {
        let channel = match DAC_CHANNELS.resolve(command.get(2))? {
            0 => DacChannel::Ch1,
            _ => DacChannel::Ch2,
        };
        expect_no_more(command, 3)?;
        if !self.started {
            return Err(MarionetteError::DeviceNotReady("dac not started".into()));
        }
        let value = parse_in_range(expect_data(data, 1)?[0], 0, u32::from(DAC_MAX))?;
        rt.dac.write(channel, value as u16)?;
        rt.console.debug(&format!("dac {channel} <- {value}"))
    }
}

impl Command for DacCommand {
    fn name(&self) -> &str {
        "dac"
    }

    fn description(&self) -> &str {
        "Drive the on-chip DAC outputs"
    }

    fn usage(&self) -> &str {
        "dac:<start|stop> | dac:write:<ch1|ch2>(value)"
    }

    fn dispatch(&mut self, rt: &Runtime, command: &[&str], data: &[&str]) -> Result<()> {
        let action = DAC_ACTIONS.resolve(command.get(1))?;
        if action == vocab::DAC_WRITE {
            return self.write(rt, command, data);
        }
        expect_no_more(command, 2)?;
        expect_data(data, 0)?;
        if action == vocab::DAC_START {
            self.start(rt)
        } else {
            self.stop(rt)
        }
    }

    fn reset(&mut self, rt: &Runtime) -> Result<()> {
        if self.started {
            self.release(rt)?;
        }
        Ok(())
    }
}
