//! Error types for Marionette.

use std::io;

/// Errors produced by the Marionette core.
///
/// Every variant is recoverable: the dispatcher turns it into a single
/// diagnostic line and waits for the next host command.
#[derive(Debug, thiserror::Error)]
pub enum MarionetteError {
    /// Malformed line, unknown token or too many tokens.
    #[error("parse error: {0}")]
    Parse(String),

    /// Wrong argument count, out-of-range or unparsable number.
    #[error("argument error: {0}")]
    Argument(String),

    /// Pin already owned by another subsystem, or not capable of the request.
    #[error("resource conflict: {pin} owned by {owner}, requested by {requested}")]
    ResourceConflict {
        pin: String,
        owner: String,
        requested: String,
    },

    /// Peripheral not in a ready state for the requested operation.
    #[error("device not ready: {0}")]
    DeviceNotReady(String),

    /// Bus or IO operation did not complete in time.
    #[error("transport timeout: {0}")]
    TransportTimeout(String),

    /// Pool or mailbox exhaustion.
    #[error("overflow: {0}")]
    Overflow(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, MarionetteError>;
