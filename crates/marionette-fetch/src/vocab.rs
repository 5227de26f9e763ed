//! Terminal vocabularies for each grammar slot.
//!
//! Matching is exact and case-insensitive: `pin1` never matches `pin10`.

use marionette_types::error::{MarionetteError, Result};

/// Ordered set of valid words for one grammar slot.
#[derive(Debug, Clone, Copy)]
pub struct Terminals {
    slot: &'static str,
    words: &'static [&'static str],
}

impl Terminals {
    pub const fn new(slot: &'static str, words: &'static [&'static str]) -> Self {
        Self { slot, words }
    }

    pub fn slot(&self) -> &'static str {
        self.slot
    }

    pub fn words(&self) -> &'static [&'static str] {
        self.words
    }

    /// Index of `token` in the table.
    pub fn find(&self, token: &str) -> Option<usize> {
        token_match(self.words, token)
    }

    /// Resolve a required token, reporting a missing or unknown word.
    pub fn resolve(&self, token: Option<&&str>) -> Result<usize> {
        let token = token.ok_or_else(|| {
            MarionetteError::Parse(format!("missing {} ({})", self.slot, self.words.join("|")))
        })?;
        self.find(token)
            .ok_or_else(|| MarionetteError::Parse(format!("unknown {}: {token}", self.slot)))
    }
}

/// Exact, case-insensitive lookup.
pub fn token_match(words: &[&str], token: &str) -> Option<usize> {
    words.iter().position(|w| w.eq_ignore_ascii_case(token))
}

pub const GPIO_ACTIONS: Terminals = Terminals::new(
    "gpio action",
    &["get", "set", "clear", "query", "configure", "config", "release"],
);
pub const GPIO_GET: usize = 0;
pub const GPIO_SET: usize = 1;
pub const GPIO_CLEAR: usize = 2;
pub const GPIO_QUERY: usize = 3;
pub const GPIO_CONFIGURE: usize = 4;
pub const GPIO_CONFIG: usize = 5;
pub const GPIO_RELEASE: usize = 6;

pub const DIRECTIONS: Terminals = Terminals::new("direction", &["input", "output", "analog"]);
pub const DIR_INPUT: usize = 0;
pub const DIR_OUTPUT: usize = 1;
pub const DIR_ANALOG: usize = 2;

pub const SENSES: Terminals =
    Terminals::new("sense", &["pullup", "pulldown", "floating", "analog"]);
pub const SENSE_PULLUP: usize = 0;
pub const SENSE_PULLDOWN: usize = 1;
pub const SENSE_FLOATING: usize = 2;
pub const SENSE_ANALOG: usize = 3;

pub const PORTS: Terminals = Terminals::new(
    "port",
    &[
        "porta", "portb", "portc", "portd", "porte", "portf", "portg", "porth", "porti",
    ],
);

pub const PINS: Terminals = Terminals::new(
    "pin",
    &[
        "pin0", "pin1", "pin2", "pin3", "pin4", "pin5", "pin6", "pin7", "pin8", "pin9", "pin10",
        "pin11", "pin12", "pin13", "pin14", "pin15",
    ],
);

pub const ADC_ACTIONS: Terminals =
    Terminals::new("adc action", &["configure", "start", "stop", "status"]);
pub const ADC_CONFIGURE: usize = 0;
pub const ADC_START: usize = 1;
pub const ADC_STOP: usize = 2;
pub const ADC_STATUS: usize = 3;

pub const ADC_MODES: Terminals = Terminals::new("sample type", &["oneshot", "continuous"]);
pub const ADC_ONESHOT: usize = 0;
pub const ADC_CONTINUOUS: usize = 1;

pub const DAC_ACTIONS: Terminals = Terminals::new("dac action", &["start", "write", "stop"]);
pub const DAC_START: usize = 0;
pub const DAC_WRITE: usize = 1;
pub const DAC_STOP: usize = 2;

pub const DAC_CHANNELS: Terminals = Terminals::new("dac channel", &["ch1", "ch2"]);
