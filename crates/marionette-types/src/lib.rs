//! Foundation types for Marionette.
//!
//! Shared by every Marionette crate: the error taxonomy reported back to the
//! host and the runtime configuration loaded at start-up.

pub mod config;
pub mod error;

pub use config::MarionetteConfig;
pub use error::{MarionetteError, Result};
