//! Host-facing output stream.
//!
//! Every line is tagged with its message class and terminated with CRLF.
//! Consumer threads and the dispatcher share one `Console`; the writer lock
//! keeps their lines from interleaving.

use std::fmt::Write as _;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use marionette_types::error::Result;

pub const TAG_INFO: &str = "#";
pub const TAG_DEBUG: &str = "?";
pub const TAG_ERROR: &str = "E";
pub const TAG_WARNING: &str = "W";

pub struct Console {
    out: Mutex<Box<dyn Write + Send>>,
    debug: AtomicBool,
}

impl Console {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            debug: AtomicBool::new(false),
        }
    }

    /// A console writing into memory, plus a handle to read what it wrote.
    pub fn in_memory() -> (Self, Transcript) {
        let transcript = Transcript::default();
        (Self::new(transcript.clone()), transcript)
    }

    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Write one raw line, appending CRLF.
    pub fn line(&self, text: &str) -> Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(text.as_bytes())?;
        out.write_all(b"\r\n")?;
        out.flush()?;
        Ok(())
    }

    fn tagged(&self, tag: &str, msg: &str) -> Result<()> {
        self.line(&format!("{tag}:{msg}"))
    }

    /// Start of a response frame.
    pub fn begin(&self) -> Result<()> {
        self.line("BEGIN:")
    }

    /// End of a response frame.
    pub fn end(&self, ok: bool) -> Result<()> {
        self.line(if ok { "END:OK" } else { "END:ERROR" })
    }

    pub fn info(&self, msg: &str) -> Result<()> {
        self.tagged(TAG_INFO, msg)
    }

    /// Suppressed unless debug output is enabled.
    pub fn debug(&self, msg: &str) -> Result<()> {
        if self.debug_enabled() {
            self.tagged(TAG_DEBUG, msg)?;
        }
        Ok(())
    }

    pub fn error(&self, msg: &str) -> Result<()> {
        self.tagged(TAG_ERROR, msg)
    }

    pub fn warning(&self, msg: &str) -> Result<()> {
        self.tagged(TAG_WARNING, msg)
    }

    pub fn value_bool(&self, name: &str, value: bool) -> Result<()> {
        self.line(&format!("B:{name}:{}", u8::from(value)))
    }

    pub fn value_str(&self, name: &str, value: &str) -> Result<()> {
        self.line(&format!("S:{name}:{value}"))
    }

    pub fn value_u32(&self, name: &str, value: u32) -> Result<()> {
        self.line(&format!("U32:{name}:{value}"))
    }

    pub fn value_u64(&self, name: &str, value: u64) -> Result<()> {
        self.line(&format!("U64:{name}:{value}"))
    }

    /// A sample-set data line: tag, sequence number, then every sample,
    /// each as four upper-case hex digits.
    pub fn data(&self, tag: &str, sequence: u16, samples: impl Iterator<Item = u16>) -> Result<()> {
        let mut text = String::with_capacity(tag.len() + 1 + 4 * 17);
        text.push_str(tag);
        text.push(':');
        let _ = write!(text, "{sequence:04X}");
        for sample in samples {
            let _ = write!(text, "{sample:04X}");
        }
        self.line(&text)
    }
}

/// Shared in-memory sink behind [`Console::in_memory`].
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<u8>>>);

impl Transcript {
    pub fn text(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Lines written so far, without terminators.
    pub fn lines(&self) -> Vec<String> {
        self.text()
            .split_terminator("\r\n")
            .map(str::to_string)
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_end_with_crlf() {
        let (console, transcript) = Console::in_memory();
        console.info("marionette ready").unwrap();
        assert_eq!(transcript.text(), "#:marionette ready\r\n");
    }

    #[test]
    fn frame_markers() {
        let (console, transcript) = Console::in_memory();
        console.begin().unwrap();
        console.end(true).unwrap();
        console.begin().unwrap();
        console.end(false).unwrap();
        assert_eq!(transcript.lines(), vec!["BEGIN:", "END:OK", "BEGIN:", "END:ERROR"]);
    }

    #[test]
    fn debug_gated() {
        let (console, transcript) = Console::in_memory();
        console.debug("hidden").unwrap();
        console.set_debug(true);
        console.debug("shown").unwrap();
        assert_eq!(transcript.lines(), vec!["?:shown"]);
    }

    #[test]
    fn message_classes() {
        let (console, transcript) = Console::in_memory();
        console.error("bad").unwrap();
        console.warning("careful").unwrap();
        assert_eq!(transcript.lines(), vec!["E:bad", "W:careful"]);
    }

    #[test]
    fn typed_values() {
        let (console, transcript) = Console::in_memory();
        console.value_bool("PD7", true).unwrap();
        console.value_str("PD7", "GPIO").unwrap();
        console.value_u32("allocs", 12).unwrap();
        console.value_u64("conversions", 1 << 40).unwrap();
        assert_eq!(
            transcript.lines(),
            vec!["B:PD7:1", "S:PD7:GPIO", "U32:allocs:12", "U64:conversions:1099511627776"]
        );
    }

    #[test]
    fn data_line_is_hex16() {
        let (console, transcript) = Console::in_memory();
        console.data("A2", 3, [0x0fff, 0x0001].into_iter()).unwrap();
        assert_eq!(transcript.lines(), vec!["A2:00030FFF0001"]);
    }

    #[test]
    fn concurrent_lines_do_not_interleave() {
        let (console, transcript) = Console::in_memory();
        let console = Arc::new(console);
        let workers: Vec<_> = (0..4)
            .map(|t| {
                let console = Arc::clone(&console);
                std::thread::spawn(move || {
                    for i in 0..50u16 {
                        console.data("A2", i, std::iter::repeat_n(t, 8)).unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        let lines = transcript.lines();
        assert_eq!(lines.len(), 200);
        assert!(lines.iter().all(|l| l.len() == 3 + 4 + 8 * 4));
    }
}
