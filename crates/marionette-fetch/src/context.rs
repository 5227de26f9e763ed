//! The runtime context shared by every command handler.

use std::sync::Arc;
use std::time::Duration;

use marionette_io::{DacDriver, IoManager, PadDriver, PinId, Subsystem, SimBoard};
use marionette_pipe::{AcquisitionSource, Console, Mailbox, Pipe, SamplePool};
use marionette_types::config::MarionetteConfig;
use marionette_types::error::{MarionetteError, Result};

/// Everything a handler may touch: pins, converters, the pipeline and the
/// host console. Built once by the application and passed by reference.
pub struct Runtime {
    pub config: MarionetteConfig,
    pub io: Arc<IoManager>,
    pub pads: Arc<dyn PadDriver>,
    pub dac: Arc<dyn DacDriver>,
    pub console: Arc<Console>,
    pub pipe: Arc<Pipe>,
    /// Pins sampled by the converter, parsed from `adc.inputs`.
    pub adc_inputs: Vec<PinId>,
}

impl Runtime {
    /// Wire the pin table, sample pool, mailboxes and consumers.
    pub fn new(
        config: MarionetteConfig,
        pads: Arc<dyn PadDriver>,
        dac: Arc<dyn DacDriver>,
        console: Console,
    ) -> Result<Self> {
        config.validate()?;
        let adc_inputs = config
            .adc
            .inputs
            .iter()
            .map(|name| {
                name.parse::<PinId>()
                    .map_err(|e| MarionetteError::Config(format!("adc.inputs: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let io = Arc::new(IoManager::with_board(Arc::clone(&pads)));
        for pin in &adc_inputs {
            if !io.is_capable(*pin, Subsystem::Adc)? {
                return Err(MarionetteError::Config(format!(
                    "adc.inputs: {pin} has no analog function"
                )));
            }
        }

        let console = Arc::new(console);
        console.set_debug(config.fetch.debug);

        let pool = Arc::new(SamplePool::new(
            config.pipe.pool_size,
            config.pipe.samples_per_set,
        )?);
        let sinks = config
            .pipe
            .sinks
            .iter()
            .map(|s| Arc::new(Mailbox::new(s.name.clone(), s.capacity)))
            .collect();
        let source = Arc::new(AcquisitionSource::new(pool, sinks));
        let pipe = Arc::new(Pipe::new(
            source,
            Arc::clone(&console),
            config.adc.tag.clone(),
            Duration::from_millis(config.pipe.consumer_timeout_ms),
        ));

        log::info!(
            "runtime ready: pool {}x{}, {} sink(s), adc inputs {:?}",
            config.pipe.pool_size,
            config.pipe.samples_per_set,
            config.pipe.sinks.len(),
            adc_inputs.iter().map(ToString::to_string).collect::<Vec<_>>()
        );
        Ok(Self {
            config,
            io,
            pads,
            dac,
            console,
            pipe,
            adc_inputs,
        })
    }

    /// Runtime on the simulated board.
    pub fn simulated(config: MarionetteConfig, console: Console) -> Result<(Self, Arc<SimBoard>)> {
        let board = Arc::new(SimBoard::new());
        let rt = Self::new(
            config,
            Arc::clone(&board) as Arc<dyn PadDriver>,
            Arc::clone(&board) as Arc<dyn DacDriver>,
            console,
        )?;
        Ok((rt, board))
    }

    pub fn source(&self) -> &Arc<AcquisitionSource> {
        self.pipe.source()
    }

    /// Print every pipeline counter as typed value lines.
    pub fn report_pipeline(&self) -> Result<()> {
        let status = self.source().status();
        let c = &self.console;
        c.value_u64("allocs", status.pool.allocs)?;
        c.value_u64("frees", status.pool.frees)?;
        c.value_u64("alloc_failed", status.pool.alloc_failed)?;
        c.value_u64("release_underflow", status.pool.release_underflow)?;
        c.value_u64("conversions", status.conversions)?;
        c.value_u64("dma_errors", status.dma_errors)?;
        c.value_u64("analog_overflow", status.analog_overflow)?;
        for (name, overflow, pending) in &status.sinks {
            c.value_u64(&format!("overflow.{name}"), *overflow)?;
            c.value_u64(&format!("pending.{name}"), *pending as u64)?;
        }
        Ok(())
    }
}
