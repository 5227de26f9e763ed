//! `adc` command: converter configuration and start/stop.

use std::time::Duration;

use marionette_io::{PadMode, PinId, Subsystem};
use marionette_pipe::{AcquisitionMode, Converter, TimerConverter};
use marionette_types::error::{MarionetteError, Result};

use crate::args::{expect_data, expect_no_more, parse_in_range};
use crate::context::Runtime;
use crate::registry::Command;
use crate::vocab::{self, ADC_ACTIONS, ADC_MODES};

const MIN_PERIOD_US: u32 = 10;
const MAX_PERIOD_US: u32 = 10_000_000;

pub struct AdcCommand {
    converter: Box<dyn Converter>,
    inputs: Vec<PinId>,
    default_mode: AcquisitionMode,
    mode: AcquisitionMode,
    claimed: Vec<PinId>,
}

impl AdcCommand {
    pub fn new(converter: Box<dyn Converter>, inputs: Vec<PinId>, period: Duration) -> Self {
        let default_mode = AcquisitionMode::Continuous { period };
        Self {
            converter,
            inputs,
            default_mode,
            mode: default_mode,
            claimed: Vec::new(),
        }
    }

    /// Timer-driven converter over the runtime's configured inputs.
    pub fn from_runtime(rt: &Runtime) -> Self {
        let converter = TimerConverter::new(
            std::sync::Arc::clone(&rt.pads),
            std::sync::Arc::clone(rt.source()),
            rt.adc_inputs.clone(),
            rt.config.pipe.samples_per_set,
        );
        Self::new(
            Box::new(converter),
            rt.adc_inputs.clone(),
            Duration::from_micros(rt.config.adc.period_us),
        )
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    fn configure(&mut self, rt: &Runtime, command: &[&str], data: &[&str]) -> Result<()> {
        if self.converter.is_running() {
            return Err(MarionetteError::DeviceNotReady(
                "stop the adc before reconfiguring".into(),
            ));
        }
        let kind = ADC_MODES.resolve(command.get(2))?;
        expect_no_more(command, 3)?;
        self.mode = if kind == vocab::ADC_ONESHOT {
            expect_data(data, 0)?;
            AcquisitionMode::OneShot
        } else {
            let period = match data {
                [] => match self.default_mode {
                    AcquisitionMode::Continuous { period } => period,
                    AcquisitionMode::OneShot => Duration::from_millis(1),
                },
                [token] => Duration::from_micros(u64::from(parse_in_range(
                    token,
                    MIN_PERIOD_US,
                    MAX_PERIOD_US,
                )?)),
                _ => {
                    return Err(MarionetteError::Argument(format!(
                        "expected at most 1 data argument, got {}",
                        data.len()
                    )));
                },
            };
            AcquisitionMode::Continuous { period }
        };
        rt.console.debug(&format!("adc mode {}", self.mode))
    }

    /// Claim every input as analog; on a conflict release the ones taken.
    fn claim_inputs(&mut self, rt: &Runtime) -> Result<()> {
        for pin in &self.inputs {
            if let Err(e) = rt.io.claim(*pin, PadMode::Analog, Subsystem::Adc) {
                self.release_inputs(rt)?;
                return Err(e);
            }
            self.claimed.push(*pin);
        }
        Ok(())
    }

    fn release_inputs(&mut self, rt: &Runtime) -> Result<()> {
        for pin in self.claimed.drain(..) {
            rt.io.release(pin)?;
        }
        Ok(())
    }

    fn start(&mut self, rt: &Runtime) -> Result<()> {
        if self.converter.is_running() {
            return Err(MarionetteError::DeviceNotReady("adc already started".into()));
        }
        if self.claimed.is_empty() {
            self.claim_inputs(rt)?;
        }
        if let Err(e) = rt.pipe.start().and_then(|()| self.converter.start(self.mode)) {
            self.release_inputs(rt)?;
            return Err(e);
        }
        log::info!("adc started ({})", self.mode);
        rt.console.debug(&format!("adc started ({})", self.mode))
    }

    fn stop(&mut self, rt: &Runtime) -> Result<()> {
        if !self.converter.is_running() && self.claimed.is_empty() {
            return Err(MarionetteError::DeviceNotReady("adc not started".into()));
        }
        self.converter.stop();
        self.release_inputs(rt)?;
        log::info!("adc stopped");
        rt.console.debug("adc stopped")
    }

    fn status(&self, rt: &Runtime) -> Result<()> {
        rt.console.value_bool("running", self.converter.is_running())?;
        rt.console.value_str("mode", &self.mode.to_string())?;
        rt.report_pipeline()
    }
}

impl Command for AdcCommand {
    fn name(&self) -> &str {
        "adc"
    }

    fn description(&self) -> &str {
        "Configure, start and stop sample acquisition"
    }

    fn usage(&self) -> &str {
        "adc:configure:<oneshot|continuous>[(period_us)] | adc:<start|stop|status>"
    }

    fn dispatch(&mut self, rt: &Runtime, command: &[&str], data: &[&str]) -> Result<()> {
        let action = ADC_ACTIONS.resolve(command.get(1))?;
        if action == vocab::ADC_CONFIGURE {
            return self.configure(rt, command, data);
        }
        expect_no_more(command, 2)?;
        expect_data(data, 0)?;
        match action {
            vocab::ADC_START => self.start(rt),
            vocab::ADC_STOP => self.stop(rt),
            _ => self.status(rt),
        }
    }

    fn reset(&mut self, rt: &Runtime) -> Result<()> {
        self.converter.stop();
        self.mode = self.default_mode;
        self.release_inputs(rt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandRegistry;
    use crate::tokenizer::Limits;
    use marionette_io::SimBoard;
    use marionette_pipe::{Console, Transcript};
    use marionette_types::config::MarionetteConfig;
    use std::sync::Arc;
    use std::time::Instant;

    fn setup_with(cfg: MarionetteConfig) -> (CommandRegistry, Runtime, Arc<SimBoard>, Transcript) {
        let (console, transcript) = Console::in_memory();
        let (rt, board) = Runtime::simulated(cfg, console).unwrap();
        let mut reg = CommandRegistry::new(Limits::default());
        reg.register(Box::new(AdcCommand::from_runtime(&rt)));
        (reg, rt, board, transcript)
    }

    fn setup() -> (CommandRegistry, Runtime, Arc<SimBoard>, Transcript) {
        setup_with(MarionetteConfig::default())
    }

    fn pin(s: &str) -> PinId {
        s.parse().unwrap()
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn oneshot_streams_one_data_line() {
        let (mut reg, rt, board, transcript) = setup();
        board.set_analog(pin("PA3"), 0x0abc);
        assert!(reg.parse("adc:configure:oneshot", &rt));
        assert!(reg.parse("adc:start", &rt));
        assert_eq!(rt.io.query(pin("PA3")).unwrap(), (PadMode::Analog, Some(Subsystem::Adc)));

        wait_for(|| transcript.lines().iter().any(|l| l.starts_with("A2:")));
        let line = transcript
            .lines()
            .into_iter()
            .find(|l| l.starts_with("A2:"))
            .unwrap();
        assert_eq!(line, format!("A2:0000{}", "0ABC".repeat(16)));

        assert!(reg.parse("adc:stop", &rt));
        assert_eq!(rt.io.query(pin("PA3")).unwrap().1, None);
        rt.pipe.stop();
    }

    #[test]
    fn continuous_until_stop() {
        let (mut reg, rt, _board, transcript) = setup();
        assert!(reg.parse("adc:configure:continuous(500)", &rt));
        assert!(reg.parse("adc:start", &rt));
        wait_for(|| transcript.lines().iter().filter(|l| l.starts_with("A2:")).count() >= 3);
        assert!(reg.parse("adc:stop", &rt));
        rt.pipe.stop();
        let stats = rt.source().pool().stats();
        assert_eq!(stats.release_underflow, 0);
    }

    #[test]
    fn double_start_not_ready() {
        let (mut reg, rt, _board, transcript) = setup();
        assert!(reg.parse("adc:start", &rt));
        transcript.clear();
        assert!(!reg.parse("adc:start", &rt));
        assert_eq!(
            transcript.lines(),
            vec!["E:device not ready: adc already started"]
        );
        assert!(reg.parse("adc:stop", &rt));
        rt.pipe.stop();
    }

    #[test]
    fn stop_when_idle_not_ready() {
        let (mut reg, rt, _board, transcript) = setup();
        assert!(!reg.parse("adc:stop", &rt));
        assert_eq!(transcript.lines(), vec!["E:device not ready: adc not started"]);
    }

    #[test]
    fn reconfigure_while_running_refused() {
        let (mut reg, rt, _board, _t) = setup();
        assert!(reg.parse("adc:start", &rt));
        assert!(!reg.parse("adc:configure:oneshot", &rt));
        assert!(reg.parse("adc:stop", &rt));
        assert!(reg.parse("adc:configure:oneshot", &rt));
        rt.pipe.stop();
    }

    #[test]
    fn start_rolls_back_on_conflict() {
        let mut cfg = MarionetteConfig::default();
        cfg.adc.inputs = vec!["PA3".into(), "PA6".into()];
        let (mut reg, rt, _board, transcript) = setup_with(cfg);
        rt.io.claim(pin("PA6"), PadMode::Output, Subsystem::Gpio).unwrap();

        assert!(!reg.parse("adc:start", &rt));
        assert!(transcript.text().contains("resource conflict: PA6 owned by GPIO"));
        assert_eq!(rt.io.query(pin("PA3")).unwrap().1, None);
        assert_eq!(rt.io.query(pin("PA6")).unwrap().1, Some(Subsystem::Gpio));
        assert!(!rt.pipe.is_running());
    }

    #[test]
    fn period_range_checked() {
        let (mut reg, rt, _board, _t) = setup();
        assert!(!reg.parse("adc:configure:continuous(5)", &rt));
        assert!(!reg.parse("adc:configure:continuous(1 2)", &rt));
        assert!(!reg.parse("adc:configure:continuous(abc)", &rt));
        assert!(!reg.parse("adc:configure:oneshot(1)", &rt));
        assert!(reg.parse("adc:configure:continuous(0x3e8)", &rt));
    }

    #[test]
    fn status_reports_counters() {
        let (mut reg, rt, _board, transcript) = setup();
        assert!(reg.parse("adc:configure:continuous(250)", &rt));
        assert!(reg.parse("adc:status", &rt));
        let lines = transcript.lines();
        assert_eq!(lines[0], "B:running:0");
        assert_eq!(lines[1], "S:mode:continuous(250us)");
        assert!(lines.contains(&"U64:alloc_failed:0".to_string()));
        assert!(lines.contains(&"U64:overflow.adc:0".to_string()));
    }

    #[test]
    fn reset_stops_and_releases() {
        let (mut reg, rt, _board, _t) = setup();
        assert!(reg.parse("adc:configure:oneshot", &rt));
        assert!(reg.parse("adc:start", &rt));
        reg.reset(&rt).unwrap();
        assert_eq!(rt.io.query(pin("PA3")).unwrap().1, None);
        assert!(!reg.parse("adc:stop", &rt));
        rt.pipe.stop();
    }
}
