//! Built-in command registration.

use crate::adc_commands::AdcCommand;
use crate::context::Runtime;
use crate::dac_commands::DacCommand;
use crate::gpio_commands::GpioCommand;
use crate::registry::CommandRegistry;
use crate::system_commands::{StatusCmd, VersionCmd};
use crate::tokenizer::Limits;

/// Register every subsystem command into `reg`.
pub fn register_builtins(reg: &mut CommandRegistry, rt: &Runtime) {
    reg.register(Box::new(VersionCmd));
    reg.register(Box::new(StatusCmd));
    reg.register(Box::new(GpioCommand));
    reg.register(Box::new(AdcCommand::from_runtime(rt)));
    reg.register(Box::new(DacCommand::default()));
}

/// A registry with every built-in registered, sized from the runtime config.
pub fn builtin_registry(rt: &Runtime) -> CommandRegistry {
    let mut reg = CommandRegistry::new(Limits::from(&rt.config.fetch));
    register_builtins(&mut reg, rt);
    reg
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_io::{PadMode, PinId, Subsystem};
    use marionette_pipe::Console;
    use marionette_types::config::MarionetteConfig;

    fn setup() -> (CommandRegistry, Runtime, marionette_pipe::Transcript) {
        let (console, transcript) = Console::in_memory();
        let (rt, _board) = Runtime::simulated(MarionetteConfig::default(), console).unwrap();
        let mut reg = builtin_registry(&rt);
        reg.init(&rt).unwrap();
        (reg, rt, transcript)
    }

    #[test]
    fn all_builtins_reachable() {
        let (reg, _rt, _t) = setup();
        let names: Vec<&str> = reg.list_commands().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec!["adc", "dac", "gpio", "help", "resetpins", "status", "version"]
        );
    }

    #[test]
    fn gpio_claim_blocks_adc_pin_use() {
        let (mut reg, rt, _t) = setup();
        let pd7: PinId = "PD7".parse().unwrap();
        assert!(reg.parse("gpio:set:portd:pin7", &rt));
        let before = rt.io.state(pd7).unwrap();
        assert!(rt.io.claim(pd7, PadMode::Analog, Subsystem::Adc).is_err());
        assert_eq!(rt.io.state(pd7).unwrap(), before);
    }

    #[test]
    fn gpio_and_adc_contend_for_pa3() {
        let (mut reg, rt, transcript) = setup();
        assert!(reg.parse("gpio:configure:porta:pin3:input:pullup", &rt));
        assert!(!reg.parse("adc:start", &rt));
        assert!(transcript.text().contains("E:resource conflict: PA3 owned by GPIO"));
        assert!(reg.parse("gpio:release:porta:pin3", &rt));
        assert!(reg.parse("adc:configure:oneshot", &rt));
        assert!(reg.parse("adc:start", &rt));
        assert!(!reg.parse("gpio:set:porta:pin3", &rt));
        assert!(reg.parse("resetpins", &rt));
        assert!(reg.parse("gpio:set:porta:pin3", &rt));
        rt.pipe.stop();
    }

    #[test]
    fn resetpins_stops_dac() {
        let (mut reg, rt, _t) = setup();
        assert!(reg.parse("dac:start", &rt));
        assert!(reg.parse("resetpins", &rt));
        assert!(!reg.parse("dac:write:ch1(1)", &rt));
        assert!(reg.parse("dac:start", &rt));
    }
}
