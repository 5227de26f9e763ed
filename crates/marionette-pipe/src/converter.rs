//! Conversion drivers that feed an [`AcquisitionSource`].

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use marionette_io::{PadDriver, PinId};
use marionette_types::error::{MarionetteError, Result};

use crate::source::{AcquisitionSource, ConversionFault};

/// Largest code a 12-bit conversion can produce.
const ADC_FULL_SCALE: u16 = 0x0fff;

/// How the converter is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    /// A single conversion, then idle.
    OneShot,
    /// Timer-triggered conversions every `period`.
    Continuous { period: Duration },
}

impl std::fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionMode::OneShot => f.write_str("oneshot"),
            AcquisitionMode::Continuous { period } => {
                write!(f, "continuous({}us)", period.as_micros())
            },
        }
    }
}

/// Converter hardware: start, stop, and report whether it is running.
pub trait Converter: Send {
    fn start(&mut self, mode: AcquisitionMode) -> Result<()>;

    /// Stop triggering. Idempotent.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Timer-driven converter for the simulated board.
///
/// A timer thread samples the input pads round-robin into a fixed buffer and
/// raises the conversion-complete interrupt on the source.
pub struct TimerConverter {
    driver: Arc<dyn PadDriver>,
    source: Arc<AcquisitionSource>,
    inputs: Vec<PinId>,
    samples_per_set: usize,
    worker: Option<(Sender<()>, JoinHandle<()>)>,
}

impl TimerConverter {
    pub fn new(
        driver: Arc<dyn PadDriver>,
        source: Arc<AcquisitionSource>,
        inputs: Vec<PinId>,
        samples_per_set: usize,
    ) -> Self {
        Self {
            driver,
            source,
            inputs,
            samples_per_set,
            worker: None,
        }
    }

    pub fn inputs(&self) -> &[PinId] {
        &self.inputs
    }

    fn convert(
        driver: &dyn PadDriver,
        source: &AcquisitionSource,
        inputs: &[PinId],
        buf: &mut [u16],
    ) {
        let mut overrange = false;
        for (slot, pin) in buf.iter_mut().zip(inputs.iter().cycle()) {
            let raw = driver.read_analog(*pin);
            overrange |= raw > ADC_FULL_SCALE;
            *slot = raw.min(ADC_FULL_SCALE);
        }
        if overrange {
            source.on_conversion_error(ConversionFault::AnalogOverflow);
        }
        source.on_conversion_complete(buf);
    }
}

impl Converter for TimerConverter {
    fn start(&mut self, mode: AcquisitionMode) -> Result<()> {
        if self.is_running() {
            return Err(MarionetteError::DeviceNotReady(
                "converter already running".into(),
            ));
        }
        if self.inputs.is_empty() {
            return Err(MarionetteError::DeviceNotReady(
                "no converter inputs configured".into(),
            ));
        }
        // Reap a finished one-shot run.
        self.stop();

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let driver = Arc::clone(&self.driver);
        let source = Arc::clone(&self.source);
        let inputs = self.inputs.clone();
        let mut buf = vec![0u16; self.samples_per_set];

        let handle = std::thread::Builder::new()
            .name("adc-timer".to_string())
            .spawn(move || match mode {
                AcquisitionMode::OneShot => {
                    Self::convert(driver.as_ref(), &source, &inputs, &mut buf);
                },
                AcquisitionMode::Continuous { period } => loop {
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {
                            Self::convert(driver.as_ref(), &source, &inputs, &mut buf);
                        },
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                },
            })?;
        log::info!("converter started ({mode}) on {} input(s)", self.inputs.len());
        self.worker = Some((stop_tx, handle));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some((stop_tx, handle)) = self.worker.take() {
            let _ = stop_tx.try_send(());
            drop(stop_tx);
            if handle.join().is_err() {
                log::error!("converter thread panicked");
            }
            log::debug!("converter stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }
}

impl Drop for TimerConverter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::Mailbox;
    use crate::pool::SamplePool;
    use marionette_io::SimBoard;
    use std::time::Instant;

    fn setup(pool_size: usize) -> (Arc<SimBoard>, Arc<AcquisitionSource>) {
        let board = Arc::new(SimBoard::new());
        let pool = Arc::new(SamplePool::new(pool_size, 4).unwrap());
        let sinks = vec![Arc::new(Mailbox::new("adc", 64))];
        (board, Arc::new(AcquisitionSource::new(pool, sinks)))
    }

    fn pin(s: &str) -> PinId {
        s.parse().unwrap()
    }

    #[test]
    fn oneshot_converts_once() {
        let (board, src) = setup(4);
        board.set_analog(pin("PA3"), 0x123);
        board.set_analog(pin("PA6"), 0x456);
        let mut conv = TimerConverter::new(
            Arc::clone(&board) as Arc<dyn PadDriver>,
            Arc::clone(&src),
            vec![pin("PA3"), pin("PA6")],
            4,
        );
        conv.start(AcquisitionMode::OneShot).unwrap();
        let h = src.sinks()[0].fetch(Duration::from_secs(5)).unwrap();
        assert_eq!(
            src.pool().samples(h).collect::<Vec<_>>(),
            vec![0x123, 0x456, 0x123, 0x456]
        );
        conv.stop();
        assert!(!conv.is_running());
        assert_eq!(src.status().conversions, 1);
    }

    #[test]
    fn continuous_runs_until_stopped() {
        let (board, src) = setup(64);
        let mut conv = TimerConverter::new(board, Arc::clone(&src), vec![pin("PA3")], 4);
        conv.start(AcquisitionMode::Continuous {
            period: Duration::from_millis(1),
        })
        .unwrap();
        assert!(conv.is_running());
        assert!(matches!(
            conv.start(AcquisitionMode::OneShot),
            Err(MarionetteError::DeviceNotReady(_))
        ));

        let deadline = Instant::now() + Duration::from_secs(5);
        while src.status().conversions < 3 {
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(1));
        }
        conv.stop();
        assert!(!conv.is_running());
        let after_stop = src.status().conversions;
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(src.status().conversions, after_stop);
    }

    #[test]
    fn no_inputs_is_not_ready() {
        let (board, src) = setup(1);
        let mut conv = TimerConverter::new(board, src, Vec::new(), 4);
        assert!(conv.start(AcquisitionMode::OneShot).is_err());
    }

    #[test]
    fn stop_when_idle_is_noop() {
        let (board, src) = setup(1);
        let mut conv = TimerConverter::new(board, src, vec![pin("PA3")], 4);
        conv.stop();
        assert!(!conv.is_running());
    }

    #[test]
    fn mode_display() {
        assert_eq!(AcquisitionMode::OneShot.to_string(), "oneshot");
        let mode = AcquisitionMode::Continuous {
            period: Duration::from_micros(500),
        };
        assert_eq!(mode.to_string(), "continuous(500us)");
    }
}
