//! System commands: version and status.

use marionette_io::Subsystem;
use marionette_types::error::Result;

use crate::args::{expect_data, expect_no_more};
use crate::context::Runtime;
use crate::registry::Command;

pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// version
// ---------------------------------------------------------------------------

pub struct VersionCmd;

impl Command for VersionCmd {
    fn name(&self) -> &str {
        "version"
    }
    fn description(&self) -> &str {
        "Show firmware version"
    }
    fn usage(&self) -> &str {
        "version"
    }
    fn dispatch(&mut self, rt: &Runtime, command: &[&str], data: &[&str]) -> Result<()> {
        expect_no_more(command, 1)?;
        expect_data(data, 0)?;
        rt.console.value_str("version", FIRMWARE_VERSION)
    }
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

pub struct StatusCmd;

impl Command for StatusCmd {
    fn name(&self) -> &str {
        "status"
    }
    fn description(&self) -> &str {
        "Pipeline counters and pin ownership"
    }
    fn usage(&self) -> &str {
        "status"
    }
    fn dispatch(&mut self, rt: &Runtime, command: &[&str], data: &[&str]) -> Result<()> {
        expect_no_more(command, 1)?;
        expect_data(data, 0)?;
        rt.console.value_bool("pipe", rt.pipe.is_running())?;
        rt.report_pipeline()?;
        for subsystem in Subsystem::ALL {
            let pins = rt.io.owned_by(subsystem);
            if !pins.is_empty() {
                let names: Vec<String> = pins.iter().map(ToString::to_string).collect();
                rt.console.value_str(subsystem.name(), &names.join(","))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandRegistry;
    use crate::tokenizer::Limits;
    use marionette_io::{PadMode, PinId};
    use marionette_pipe::{Console, Transcript};
    use marionette_types::config::MarionetteConfig;

    fn setup() -> (CommandRegistry, Runtime, Transcript) {
        let (console, transcript) = Console::in_memory();
        let (rt, _board) = Runtime::simulated(MarionetteConfig::default(), console).unwrap();
        let mut reg = CommandRegistry::new(Limits::default());
        reg.register(Box::new(VersionCmd));
        reg.register(Box::new(StatusCmd));
        (reg, rt, transcript)
    }

    #[test]
    fn version_line() {
        let (mut reg, rt, transcript) = setup();
        assert!(reg.parse("version", &rt));
        assert_eq!(transcript.lines(), vec![format!("S:version:{FIRMWARE_VERSION}")]);
    }

    #[test]
    fn version_rejects_extra_tokens() {
        let (mut reg, rt, _t) = setup();
        assert!(!reg.parse("version:now", &rt));
        assert!(!reg.parse("version(1)", &rt));
    }

    #[test]
    fn status_lists_owned_pins() {
        let (mut reg, rt, transcript) = setup();
        let pd7: PinId = "PD7".parse().unwrap();
        let pb8: PinId = "PB8".parse().unwrap();
        rt.io.claim(pd7, PadMode::Output, Subsystem::Gpio).unwrap();
        rt.io.claim(pb8, PadMode::Output, Subsystem::Gpio).unwrap();
        assert!(reg.parse("status", &rt));
        let lines = transcript.lines();
        assert_eq!(lines[0], "B:pipe:0");
        assert!(lines.contains(&"S:GPIO:PB8,PD7".to_string()));
        assert!(lines.contains(&"U64:conversions:0".to_string()));
    }
}
