//! Marionette host entry point.
//!
//! Reads Fetch lines from stdin, streams framed responses and sample data to
//! stdout. Log records go to stderr (`RUST_LOG` controls the level).
//! The first argument, or `MARIONETTE_CONFIG`, names a TOML config file.

mod session;
mod shell;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};

use marionette_fetch::{Runtime, builtin_registry};
use marionette_pipe::Console;
use marionette_types::MarionetteConfig;

use shell::Shell;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MARIONETTE_CONFIG").ok())
        .map(PathBuf::from);
    let config = match &config_path {
        Some(path) => MarionetteConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MarionetteConfig::default(),
    };

    let (rt, _board) = Runtime::simulated(config, Console::new(io::stdout()))?;
    let mut registry = builtin_registry(&rt);
    registry.init(&rt)?;
    let mut shell = Shell::new(&rt.config.shell);

    log::info!("Marionette {} ready", marionette_fetch::system_commands::FIRMWARE_VERSION);
    if rt.config.shell.banner {
        rt.console.info("Marionette ready")?;
    }

    let summary = session::run(
        io::stdin().lock(),
        &mut io::stdout(),
        &rt,
        &mut registry,
        &mut shell,
    )?;

    rt.pipe.stop();
    registry.reset(&rt)?;
    log::info!(
        "session ended: {} ok, {} failed",
        summary.ok,
        summary.failed
    );
    Ok(())
}
