//! Shell-escape commands (`+cmd` or `.cmd`).
//!
//! These control the session itself rather than a subsystem.

use std::time::Instant;

use marionette_fetch::system_commands::FIRMWARE_VERSION;
use marionette_fetch::{CommandRegistry, Runtime};
use marionette_types::config::ShellConfig;
use marionette_types::error::{MarionetteError, Result};

/// How a host line is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Empty,
    /// Escaped shell command, prefix removed.
    Shell(&'a str),
    Fetch(&'a str),
}

pub fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Empty;
    }
    match trimmed.strip_prefix(['+', '.']) {
        Some(rest) => Line::Shell(rest.trim()),
        None => Line::Fetch(trimmed),
    }
}

const SHELL_COMMANDS: &[(&str, &str)] = &[
    ("info", "Query system info"),
    ("systime", "Milliseconds since the session started"),
    ("prompt", "Enable shell prompt"),
    ("noprompt", "Disable shell prompt"),
    ("echo", "Echo received lines"),
    ("noecho", "Disable line echo"),
    ("debug", "Enable ?: debug lines"),
    ("nodebug", "Disable ?: debug lines"),
    ("reset", "Reset every subsystem and pin"),
    ("help", "List shell commands"),
];

pub struct Shell {
    prompt: String,
    show_prompt: bool,
    echo: bool,
    started: Instant,
}

impl Shell {
    pub fn new(cfg: &ShellConfig) -> Self {
        Self {
            prompt: cfg.prompt.clone(),
            show_prompt: !cfg.prompt.is_empty(),
            echo: false,
            started: Instant::now(),
        }
    }

    /// Prompt to print before reading a line, if enabled.
    pub fn prompt(&self) -> Option<&str> {
        (self.show_prompt && !self.prompt.is_empty()).then_some(self.prompt.as_str())
    }

    /// Whether received lines are written back to the host.
    pub fn echo(&self) -> bool {
        self.echo
    }

    pub fn execute(&mut self, cmd: &str, rt: &Runtime, registry: &mut CommandRegistry) -> Result<()> {
        let mut words = cmd.split_whitespace();
        let name = words.next().unwrap_or_default().to_ascii_lowercase();
        if words.next().is_some() {
            return Err(MarionetteError::Argument(format!(
                "extra arguments for command '{name}'"
            )));
        }
        match name.as_str() {
            "info" => {
                rt.console.value_str("version", FIRMWARE_VERSION)?;
                rt.console.value_str("tag", &rt.config.adc.tag)?;
                rt.console.value_u32("pool_size", rt.config.pipe.pool_size as u32)?;
                rt.console
                    .value_u32("samples_per_set", rt.config.pipe.samples_per_set as u32)
            },
            "prompt" => {
                if self.prompt.is_empty() {
                    self.prompt = "> ".to_string();
                }
                self.show_prompt = true;
                Ok(())
            },
            // Wraps like a 32-bit tick counter.
            "systime" => rt
                .console
                .value_u32("systime", self.started.elapsed().as_millis() as u32),
            "noprompt" | "no_prompt" => {
                self.show_prompt = false;
                Ok(())
            },
            "echo" => {
                self.echo = true;
                Ok(())
            },
            "noecho" | "no_echo" => {
                self.echo = false;
                Ok(())
            },
            "debug" => {
                rt.console.set_debug(true);
                Ok(())
            },
            "nodebug" => {
                rt.console.set_debug(false);
                Ok(())
            },
            "reset" => {
                registry.reset(rt)?;
                rt.console.info("reset complete")
            },
            "help" | "?" => {
                for (name, description) in SHELL_COMMANDS {
                    rt.console.info(&format!("+{name:<9} {description}"))?;
                }
                Ok(())
            },
            _ => Err(MarionetteError::Parse(format!("invalid shell command '{cmd}'"))),
        }
    }
}
