//! Bounded mailbox for interrupt-to-thread handoff.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};

/// Fixed-capacity FIFO. Posting never blocks; a full mailbox counts the
/// overflow and hands the message back.
pub struct Mailbox<T> {
    name: String,
    capacity: usize,
    tx: Sender<T>,
    rx: Receiver<T>,
    overflow: AtomicU64,
}

impl<T> Mailbox<T> {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            name: name.into(),
            capacity,
            tx,
            rx,
            overflow: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Messages waiting to be fetched.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Non-blocking post. Safe to call from interrupt context.
    pub fn try_post(&self, msg: T) -> Result<(), T> {
        match self.tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(msg)) | Err(TrySendError::Disconnected(msg)) => {
                self.overflow.fetch_add(1, Ordering::Relaxed);
                Err(msg)
            },
        }
    }

    /// Wait up to `timeout` for the next message.
    pub fn fetch(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_fetch(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Posts refused because the mailbox was full.
    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }
}

impl<T> std::fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("overflow", &self.overflow_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn fifo_order() {
        let mb = Mailbox::new("adc", 4);
        for i in 0..3 {
            mb.try_post(i).unwrap();
        }
        assert_eq!(mb.len(), 3);
        assert_eq!(mb.try_fetch(), Some(0));
        assert_eq!(mb.try_fetch(), Some(1));
        assert_eq!(mb.try_fetch(), Some(2));
        assert!(mb.is_empty());
    }

    #[test]
    fn full_mailbox_counts_overflow() {
        let mb = Mailbox::new("can", 2);
        mb.try_post('a').unwrap();
        mb.try_post('b').unwrap();
        assert_eq!(mb.try_post('c'), Err('c'));
        assert_eq!(mb.try_post('d'), Err('d'));
        assert_eq!(mb.overflow_count(), 2);
        assert_eq!(mb.len(), 2);
    }

    #[test]
    fn fetch_times_out_when_empty() {
        let mb: Mailbox<u8> = Mailbox::new("adc", 1);
        let start = Instant::now();
        assert_eq!(mb.fetch(Duration::from_millis(10)), None);
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn fetch_wakes_on_post_from_other_thread() {
        let mb = Arc::new(Mailbox::new("adc", 1));
        let producer = {
            let mb = Arc::clone(&mb);
            std::thread::spawn(move || mb.try_post(42u16))
        };
        assert_eq!(mb.fetch(Duration::from_secs(5)), Some(42));
        producer.join().unwrap().unwrap();
    }
}
