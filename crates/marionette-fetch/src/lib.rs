//! The Fetch command language.
//!
//! A host line is tokenized into a colon-delimited command path and an
//! optional parenthesized data list. The first command token selects a
//! registered [`Command`]; that handler validates the rest against its own
//! vocabulary and acts through the shared [`Runtime`].

pub mod adc_commands;
pub mod args;
mod commands;
pub mod context;
pub mod dac_commands;
pub mod gpio_commands;
pub mod registry;
pub mod system_commands;
pub mod tokenizer;
pub mod vocab;

/// Register all built-in commands (gpio, adc, dac, version, status).
pub use commands::{builtin_registry, register_builtins};
/// Shared state passed to every command.
pub use context::Runtime;
/// A single Fetch subsystem handler.
pub use registry::Command;
/// Registry of commands with dispatch.
pub use registry::CommandRegistry;
/// Tokenizer output and bounds.
pub use tokenizer::{Limits, ParsedCommand, tokenize};
