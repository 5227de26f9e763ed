//! The host session loop.

use std::io::{BufRead, Write};

use marionette_fetch::{CommandRegistry, Runtime};
use marionette_types::error::{MarionetteError, Result};

use crate::shell::{Line, Shell, classify};

/// End-of-transmission from a terminal (Ctrl+D).
const CTRL_D: u8 = 0x04;

/// Tallies for one session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub ok: usize,
    pub failed: usize,
}

/// Read lines until EOF or Ctrl+D, framing and dispatching each.
///
/// A line that is not valid UTF-8 is answered with a framed parse error;
/// the session carries on with the next line.
pub fn run(
    mut input: impl BufRead,
    prompt_out: &mut impl Write,
    rt: &Runtime,
    registry: &mut CommandRegistry,
    shell: &mut Shell,
) -> Result<SessionSummary> {
    let mut summary = SessionSummary::default();
    let mut raw = Vec::new();
    show_prompt(prompt_out, shell)?;
    loop {
        raw.clear();
        if input.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        if raw.contains(&CTRL_D) {
            log::info!("host closed the session");
            break;
        }
        if shell.echo() {
            echo_line(prompt_out, &raw)?;
        }
        let ok = match std::str::from_utf8(&raw) {
            Ok(line) => dispatch(line, rt, registry, shell)?,
            Err(e) => {
                log::debug!("rejected line: {e}");
                rt.console.begin()?;
                rt.console.error(&MarionetteError::Parse("invalid UTF-8".into()).to_string())?;
                rt.console.end(false)?;
                Some(false)
            },
        };
        match ok {
            Some(true) => summary.ok += 1,
            Some(false) => summary.failed += 1,
            None => {},
        }
        show_prompt(prompt_out, shell)?;
    }
    Ok(summary)
}

/// Route one decoded line. `None` for blank lines, which get no frame.
fn dispatch(
    line: &str,
    rt: &Runtime,
    registry: &mut CommandRegistry,
    shell: &mut Shell,
) -> Result<Option<bool>> {
    let ok = match classify(line) {
        Line::Empty => return Ok(None),
        Line::Shell(cmd) => {
            rt.console.begin()?;
            let ok = match shell.execute(cmd, rt, registry) {
                Ok(()) => true,
                Err(e) => {
                    rt.console.error(&e.to_string())?;
                    false
                },
            };
            rt.console.end(ok)?;
            ok
        },
        Line::Fetch(text) => registry.handle_line(text, rt),
    };
    Ok(Some(ok))
}

fn echo_line(out: &mut impl Write, raw: &[u8]) -> Result<()> {
    let text = String::from_utf8_lossy(raw);
    out.write_all(text.trim_end_matches(['\r', '\n']).as_bytes())?;
    out.write_all(b"\r\n")?;
    out.flush()?;
    Ok(())
}

fn show_prompt(out: &mut impl Write, shell: &Shell) -> Result<()> {
    if let Some(prompt) = shell.prompt() {
        out.write_all(prompt.as_bytes())?;
        out.flush()?;
    }
    Ok(())
}
