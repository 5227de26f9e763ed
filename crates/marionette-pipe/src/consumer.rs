//! Consumer threads that stream sample sets to the host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use marionette_types::error::Result;

use crate::console::Console;
use crate::mailbox::Mailbox;
use crate::pool::{SampleHandle, SamplePool};
use crate::source::AcquisitionSource;

/// Fetch one sample set from `mailbox`, write it, and release it.
///
/// Returns `Ok(false)` when the wait timed out. The set is released even if
/// the write fails.
pub fn consume_one(
    pool: &SamplePool,
    mailbox: &Mailbox<SampleHandle>,
    console: &Console,
    tag: &str,
    timeout: Duration,
) -> Result<bool> {
    let Some(handle) = mailbox.fetch(timeout) else {
        return Ok(false);
    };
    let written = console.data(tag, pool.sequence(handle), pool.samples(handle));
    pool.release(handle)?;
    written.map(|()| true)
}

/// The set of consumer threads, one per sink.
pub struct Pipe {
    source: Arc<AcquisitionSource>,
    console: Arc<Console>,
    tag: String,
    timeout: Duration,
    stop: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Pipe {
    pub fn new(
        source: Arc<AcquisitionSource>,
        console: Arc<Console>,
        tag: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            console,
            tag: tag.into(),
            timeout,
            stop: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn source(&self) -> &Arc<AcquisitionSource> {
        &self.source
    }

    pub fn is_running(&self) -> bool {
        !self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Spawn the consumers. Does nothing if they are already running.
    pub fn start(&self) -> Result<()> {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if !workers.is_empty() {
            return Ok(());
        }
        self.stop.store(false, Ordering::Release);
        for sink in self.source.sinks() {
            let sink = Arc::clone(sink);
            let pool = Arc::clone(self.source.pool());
            let console = Arc::clone(&self.console);
            let stop = Arc::clone(&self.stop);
            let tag = self.tag.clone();
            let timeout = self.timeout;
            let handle = std::thread::Builder::new()
                .name(format!("mpipe-{}", sink.name()))
                .spawn(move || {
                    log::debug!("consumer {} started", sink.name());
                    while !stop.load(Ordering::Acquire) {
                        if let Err(e) = consume_one(&pool, &sink, &console, &tag, timeout) {
                            log::warn!("consumer {}: {e}", sink.name());
                        }
                    }
                    log::debug!("consumer {} stopped", sink.name());
                })?;
            workers.push(handle);
        }
        log::info!("pipe started with {} consumer(s)", workers.len());
        Ok(())
    }

    /// Ask every consumer to finish and wait for it. Idempotent.
    ///
    /// Sets still queued in the mailboxes stay there; they are streamed after
    /// the next `start`.
    pub fn stop(&self) {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if workers.is_empty() {
            return;
        }
        self.stop.store(true, Ordering::Release);
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                log::error!("consumer thread panicked");
            }
        }
        log::info!("pipe stopped");
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Transcript;
    use std::time::Instant;

    fn build(pool_size: usize, sinks: &[&str]) -> (Arc<AcquisitionSource>, Arc<Console>, Transcript) {
        let pool = Arc::new(SamplePool::new(pool_size, 2).unwrap());
        let sinks = sinks.iter().map(|n| Arc::new(Mailbox::new(*n, 8))).collect();
        let (console, transcript) = Console::in_memory();
        (
            Arc::new(AcquisitionSource::new(pool, sinks)),
            Arc::new(console),
            transcript,
        )
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn consume_one_formats_and_frees() {
        let (src, console, transcript) = build(1, &["adc"]);
        src.on_conversion_complete(&[0x0123, 0x0fff]).unwrap();
        let consumed = consume_one(
            src.pool(),
            &src.sinks()[0],
            &console,
            "A2",
            Duration::from_millis(10),
        )
        .unwrap();
        assert!(consumed);
        assert_eq!(transcript.lines(), vec!["A2:000001230FFF"]);
        assert_eq!(src.pool().available(), 1);
    }

    #[test]
    fn consume_one_times_out() {
        let (src, console, transcript) = build(1, &["adc"]);
        let consumed = consume_one(
            src.pool(),
            &src.sinks()[0],
            &console,
            "A2",
            Duration::from_millis(5),
        )
        .unwrap();
        assert!(!consumed);
        assert!(transcript.text().is_empty());
    }

    #[test]
    fn threads_drain_every_sink() {
        let (src, console, transcript) = build(4, &["a", "b"]);
        let pipe = Pipe::new(Arc::clone(&src), console, "A2", Duration::from_millis(10));
        pipe.start().unwrap();
        assert!(pipe.is_running());
        for _ in 0..3 {
            while src.on_conversion_complete(&[1, 2]).is_none() {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        wait_for(|| transcript.lines().len() == 6);
        wait_for(|| src.pool().available() == 4);
        pipe.stop();
        assert!(!pipe.is_running());
        let stats = src.pool().stats();
        assert_eq!(stats.allocs, stats.frees);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (src, console, _transcript) = build(1, &["adc"]);
        let pipe = Pipe::new(src, console, "A2", Duration::from_millis(5));
        pipe.stop();
        pipe.start().unwrap();
        pipe.start().unwrap();
        assert_eq!(pipe.workers.lock().unwrap().len(), 1);
        pipe.stop();
        pipe.stop();
        assert!(!pipe.is_running());
        pipe.start().unwrap();
        assert!(pipe.is_running());
    }
}
