//! Command trait, registry, and dispatch.
//!
//! The first command-path token selects a handler; the handler interprets
//! the remaining tokens against its own vocabulary. Every failure becomes a
//! single `E:` line and a `false` return, never a panic.

use std::collections::HashMap;

use marionette_types::error::{MarionetteError, Result};

use crate::args::{expect_data, expect_no_more};
use crate::context::Runtime;
use crate::tokenizer::{Limits, tokenize};

/// A subsystem reachable from the Fetch language.
pub trait Command: Send {
    /// The first command token (what the host types).
    fn name(&self) -> &str;

    /// Other tokens that select this handler.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// One-line description for `help`.
    fn description(&self) -> &str;

    /// Usage string, e.g. `gpio:<action>:<port>:<pin>`.
    fn usage(&self) -> &str;

    /// Called once after registration.
    fn init(&mut self, _rt: &Runtime) -> Result<()> {
        Ok(())
    }

    /// Handle one line. `command[0]` is the token that selected this handler.
    fn dispatch(&mut self, rt: &Runtime, command: &[&str], data: &[&str]) -> Result<()>;

    /// Return the subsystem to its power-on state.
    fn reset(&mut self, _rt: &Runtime) -> Result<()> {
        Ok(())
    }
}

/// Registry of available commands with dispatch.
pub struct CommandRegistry {
    commands: Vec<Box<dyn Command>>,
    index: HashMap<String, usize>,
    limits: Limits,
    scratch: String,
}

impl CommandRegistry {
    pub fn new(limits: Limits) -> Self {
        Self {
            commands: Vec::new(),
            index: HashMap::new(),
            limits,
            scratch: String::with_capacity(limits.max_line_chars),
        }
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        let name = cmd.name().to_ascii_lowercase();
        let slot = match self.index.get(&name) {
            Some(&existing) => {
                self.index.retain(|_, i| *i != existing);
                self.commands[existing] = cmd;
                existing
            },
            None => {
                self.commands.push(cmd);
                self.commands.len() - 1
            },
        };
        let cmd = &self.commands[slot];
        self.index.insert(name, slot);
        for alias in cmd.aliases() {
            self.index.insert(alias.to_ascii_lowercase(), slot);
        }
    }

    /// `(name, description)` pairs sorted by name, including built-ins.
    pub fn list_commands(&self) -> Vec<(&str, &str)> {
        let mut list: Vec<(&str, &str)> = self
            .commands
            .iter()
            .map(|c| (c.name(), c.description()))
            .collect();
        list.push(("help", "List commands"));
        list.push(("resetpins", "Stop every subsystem and release all pins"));
        list.sort_by_key(|(name, _)| *name);
        list
    }

    /// Run `init` on every handler.
    pub fn init(&mut self, rt: &Runtime) -> Result<()> {
        for cmd in &mut self.commands {
            cmd.init(rt)?;
            log::debug!("initialized {}", cmd.name());
        }
        Ok(())
    }

    /// Reset every handler, then return all pins to their defaults.
    ///
    /// Every handler is reset even if an earlier one fails; the first error
    /// is returned.
    pub fn reset(&mut self, rt: &Runtime) -> Result<()> {
        let mut first_err = None;
        for cmd in &mut self.commands {
            if let Err(e) = cmd.reset(rt) {
                log::warn!("reset {}: {e}", cmd.name());
                first_err.get_or_insert(e);
            }
        }
        rt.io.reset_all();
        first_err.map_or(Ok(()), Err)
    }

    /// Tokenize and dispatch one line.
    pub fn execute(&mut self, line: &str, rt: &Runtime) -> Result<()> {
        let mut scratch = std::mem::take(&mut self.scratch);
        let result = self.execute_in(line, rt, &mut scratch);
        self.scratch = scratch;
        result
    }

    fn execute_in(&mut self, line: &str, rt: &Runtime, scratch: &mut String) -> Result<()> {
        let Some(parsed) = tokenize(line, &self.limits, scratch)? else {
            return Ok(());
        };
        rt.console.debug(&format!("fetch: {}", parsed.to_line()))?;

        let name = parsed.command[0].to_ascii_lowercase();
        match name.as_str() {
            "help" | "?" => {
                expect_no_more(&parsed.command, 1)?;
                expect_data(&parsed.data, 0)?;
                return self.execute_help(rt);
            },
            "resetpins" => {
                expect_no_more(&parsed.command, 1)?;
                expect_data(&parsed.data, 0)?;
                self.reset(rt)?;
                return rt.console.info("all pins reset");
            },
            _ => {},
        }

        let slot = *self.index.get(&name).ok_or_else(|| {
            MarionetteError::Parse(format!("unrecognized command: {}", parsed.command[0]))
        })?;
        self.commands[slot].dispatch(rt, &parsed.command, &parsed.data)
    }

    /// Dispatch `line`, writing one `E:` diagnostic on failure.
    pub fn parse(&mut self, line: &str, rt: &Runtime) -> bool {
        match self.execute(line, rt) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("line {:?} failed: {e}", line.trim_end());
                if let Err(io) = rt.console.error(&e.to_string()) {
                    log::warn!("console write failed: {io}");
                }
                false
            },
        }
    }

    /// Handle a host line inside a `BEGIN:` / `END:` frame.
    ///
    /// Blank lines produce no frame.
    pub fn handle_line(&mut self, line: &str, rt: &Runtime) -> bool {
        if line.trim().is_empty() {
            return true;
        }
        let framed = rt.console.begin();
        let ok = self.parse(line, rt);
        if let Err(e) = framed.and_then(|()| rt.console.end(ok)) {
            log::warn!("console write failed: {e}");
        }
        ok
    }

    fn execute_help(&self, rt: &Runtime) -> Result<()> {
        for (name, description) in self.list_commands() {
            rt.console.info(&format!("{name:<10} {description}"))?;
        }
        for cmd in &self.commands {
            rt.console.info(&format!("  usage: {}", cmd.usage()))?;
        }
        Ok(())
    }
}
