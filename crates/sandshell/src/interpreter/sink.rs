//! Side-channel output
//!
//! Captured stdout travels as return values. Everything else (stderr of
//! backend tools, background job notices, timing lines, errors recovered by
//! `||`) is written to an [`OutputSink`] as soon as it is produced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Receiver of side-channel text.
pub trait OutputSink: Send + Sync {
    /// Deliver a chunk of text.
    fn write(&self, text: &str);

    /// Signal that no more text will be written.
    fn close(&self) {}
}

/// Sink shared between the foreground chain and background jobs.
pub type SharedSink = Arc<dyn OutputSink>;

/// Sink that accumulates everything in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    buffer: Mutex<String>,
    closed: AtomicBool,
}

impl BufferSink {
    /// Create an empty buffer sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer sink ready to be passed to the interpreter.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take the accumulated text, leaving the buffer empty.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl OutputSink for BufferSink {
    fn write(&self, text: &str) {
        // Text arriving after close is dropped
        if self.is_closed() {
            return;
        }
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(text);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Sink that forwards every chunk to a callback.
pub struct FnSink<F>(F);

impl<F> FnSink<F>
where
    F: Fn(&str) + Send + Sync,
{
    /// Wrap a callback.
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> OutputSink for FnSink<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn write(&self, text: &str) {
        if !text.is_empty() {
            (self.0)(text);
        }
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write(&self, _text: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sink() {
        let sink = BufferSink::new();
        sink.write("a");
        sink.write("b\n");
        assert_eq!(sink.contents(), "ab\n");
        assert_eq!(sink.take(), "ab\n");
        assert_eq!(sink.contents(), "");

        sink.close();
        sink.write("late");
        assert!(sink.is_closed());
        assert_eq!(sink.contents(), "");
    }

    #[test]
    fn test_fn_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink = FnSink::new(move |text: &str| captured.lock().unwrap().push(text.to_string()));
        sink.write("x");
        sink.write("");
        assert_eq!(*seen.lock().unwrap(), vec!["x".to_string()]);
    }
}
