//! Splits a Fetch line into command-path and data tokens.
//!
//! ```text
//! command[:sub1[:sub2:...]][(<data0> [<data1> ...])]
//! ```
//!
//! The line is copied into a caller-owned scratch buffer with whitespace
//! removed from the command path; the returned tokens borrow that buffer.

use marionette_types::config::FetchConfig;
use marionette_types::error::{MarionetteError, Result};

/// Bounds applied to every line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_line_chars: usize,
    pub max_command_tokens: usize,
    pub max_data_tokens: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for Limits {
    fn from(cfg: &FetchConfig) -> Self {
        Self {
            max_line_chars: cfg.max_line_chars,
            max_command_tokens: cfg.max_command_tokens,
            max_data_tokens: cfg.max_data_tokens,
        }
    }
}

/// A tokenized line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub command: Vec<&'a str>,
    pub data: Vec<&'a str>,
}

impl ParsedCommand<'_> {
    /// Canonical text: command tokens joined by `:`, data by single spaces.
    pub fn to_line(&self) -> String {
        let mut line = self.command.join(":");
        if !self.data.is_empty() {
            line.push('(');
            line.push_str(&self.data.join(" "));
            line.push(')');
        }
        line
    }
}

fn parse_err(msg: impl Into<String>) -> MarionetteError {
    MarionetteError::Parse(msg.into())
}

/// Tokenize `line`. Returns `Ok(None)` for an empty or blank line.
pub fn tokenize<'s>(
    line: &str,
    limits: &Limits,
    scratch: &'s mut String,
) -> Result<Option<ParsedCommand<'s>>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.chars().count() > limits.max_line_chars {
        return Err(parse_err(format!(
            "line exceeds {} characters",
            limits.max_line_chars
        )));
    }
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.starts_with(['(', ')']) {
        return Err(parse_err("no command (only data?)"));
    }

    let (path, data) = match line.split_once('(') {
        Some((path, rest)) => {
            let inner = rest
                .trim_end()
                .strip_suffix(')')
                .ok_or_else(|| parse_err("missing closing ')'"))?;
            if inner.contains(['(', ')']) {
                return Err(parse_err("unbalanced parentheses"));
            }
            (path, inner)
        },
        None => (line, ""),
    };
    if path.contains(')') {
        return Err(parse_err("unbalanced parentheses"));
    }

    scratch.clear();
    scratch.extend(path.chars().filter(|c| !c.is_whitespace()));
    let split = scratch.len();
    scratch.push_str(data);
    let (path, data) = scratch.split_at(split);

    let command: Vec<&str> = path.split(':').filter(|t| !t.is_empty()).collect();
    if command.is_empty() {
        return Err(parse_err("no command (only data?)"));
    }
    if command.len() > limits.max_command_tokens {
        return Err(parse_err(format!(
            "too many command tokens (max {})",
            limits.max_command_tokens
        )));
    }

    let data: Vec<&str> = data.split_whitespace().collect();
    if data.len() > limits.max_data_tokens {
        return Err(parse_err(format!(
            "too many data tokens (max {})",
            limits.max_data_tokens
        )));
    }

    Ok(Some(ParsedCommand { command, data }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tok(line: &str) -> Result<Option<(Vec<String>, Vec<String>)>> {
        let mut scratch = String::new();
        Ok(tokenize(line, &Limits::default(), &mut scratch)?.map(|p| {
            (
                p.command.iter().map(|s| s.to_string()).collect(),
                p.data.iter().map(|s| s.to_string()).collect(),
            )
        }))
    }

    #[test]
    fn command_path_only() {
        let (cmd, data) = tok("gpio:set:portd:pin7\n").unwrap().unwrap();
        assert_eq!(cmd, vec!["gpio", "set", "portd", "pin7"]);
        assert!(data.is_empty());
    }

    #[test]
    fn command_with_data() {
        let (cmd, data) = tok("dac:write:ch1( 0x800\t12 )\r\n").unwrap().unwrap();
        assert_eq!(cmd, vec!["dac", "write", "ch1"]);
        assert_eq!(data, vec!["0x800", "12"]);
    }

    #[test]
    fn spaces_in_path_removed() {
        let (cmd, _) = tok("  gpio : get: porta :pin 3").unwrap().unwrap();
        assert_eq!(cmd, vec!["gpio", "get", "porta", "pin3"]);
    }

    #[test]
    fn empty_tokens_skipped() {
        let (cmd, _) = tok("gpio::get:::porta:pin0:").unwrap().unwrap();
        assert_eq!(cmd, vec!["gpio", "get", "porta", "pin0"]);
    }

    #[test]
    fn blank_lines_are_noops() {
        assert!(tok("").unwrap().is_none());
        assert!(tok(" \t \r\n").unwrap().is_none());
    }

    #[test]
    fn data_only_rejected() {
        assert!(tok("(1 2 3)").is_err());
        assert!(tok(")").is_err());
        assert!(tok(":::(1)").is_err());
    }

    #[test]
    fn unbalanced_rejected() {
        assert!(tok("adc:configure:continuous(500").is_err());
        assert!(tok("adc(1(2))").is_err());
        assert!(tok("adc)").is_err());
    }

    #[test]
    fn empty_data_segment() {
        let (cmd, data) = tok("version()").unwrap().unwrap();
        assert_eq!(cmd, vec!["version"]);
        assert!(data.is_empty());
    }

    #[test]
    fn too_many_command_tokens() {
        let err = tok("a:b:c:d:e:f:g:h:i").unwrap_err();
        assert!(err.to_string().contains("too many command tokens"));
        assert!(tok("a:b:c:d:e:f:g:h").unwrap().is_some());
    }

    #[test]
    fn too_many_data_tokens() {
        let err = tok("x(1 2 3 4 5 6 7 8 9)").unwrap_err();
        assert!(err.to_string().contains("too many data tokens"));
    }

    #[test]
    fn overlong_line_rejected() {
        let line = format!("gpio:{}", "x".repeat(300));
        assert!(tok(&line).unwrap_err().to_string().contains("exceeds 256"));
    }

    #[test]
    fn terminator_not_counted_against_limit() {
        let limits = Limits {
            max_line_chars: 4,
            ..Limits::default()
        };
        let mut scratch = String::new();
        assert!(tokenize("help\r\n", &limits, &mut scratch).unwrap().is_some());
    }

    #[test]
    fn to_line_canonical() {
        let mut scratch = String::new();
        let parsed = tokenize("adc : configure:continuous(  500 )", &Limits::default(), &mut scratch)
            .unwrap()
            .unwrap();
        assert_eq!(parsed.to_line(), "adc:configure:continuous(500)");
    }

    fn word() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_]{1,8}"
    }

    proptest! {
        #[test]
        fn round_trip_up_to_whitespace(
            command in proptest::collection::vec(word(), 1..=8),
            data in proptest::collection::vec("[a-zA-Z0-9_.:x+-]{1,6}", 0..=8),
            pad in "[ \t]{0,3}",
        ) {
            let mut line = command.join(&format!("{pad}:{pad}"));
            if !data.is_empty() {
                line.push_str(&format!("({pad}{}{pad})", data.join(&format!(" {pad}"))));
            }
            line.push_str("\r\n");

            let mut scratch = String::new();
            let parsed = tokenize(&line, &Limits::default(), &mut scratch).unwrap().unwrap();
            let mut expected = command.join(":");
            if !data.is_empty() {
                expected.push_str(&format!("({})", data.join(" ")));
            }
            prop_assert_eq!(parsed.to_line(), expected);
            prop_assert_eq!(parsed.command.len(), command.len());
            prop_assert_eq!(parsed.data.len(), data.len());
        }

        #[test]
        fn never_panics(line in "\\PC{0,300}") {
            let mut scratch = String::new();
            let _ = tokenize(&line, &Limits::default(), &mut scratch);
        }
    }
}
