//! Debug sinks that record values as they are decoded.
//!
//! Nothing here is global: a sink is attached to a stream with
//! [`Stream::with_sink`](crate::Stream::with_sink) and inherited by its slices.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::value::Value;

/// Receiver for decoded values.
///
/// Recording must not fail or block for long; decoders call it inline.
pub trait DebugSink: Send + Sync {
    fn record(&self, value: &Value);

    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);
}

/// Run `f` with recording disabled on `sink`, restoring the previous state
/// afterwards, including when `f` panics.
pub fn without_tracking<S, T>(sink: &S, f: impl FnOnce() -> T) -> T
where
    S: DebugSink + ?Sized,
{
    let _restore = RestoreEnabled {
        sink,
        previous: sink.is_enabled(),
    };
    sink.set_enabled(false);
    f()
}

struct RestoreEnabled<'a, S: DebugSink + ?Sized> {
    sink: &'a S,
    previous: bool,
}

impl<S: DebugSink + ?Sized> Drop for RestoreEnabled<'_, S> {
    fn drop(&mut self) {
        self.sink.set_enabled(self.previous);
    }
}

/// In-memory sink collecting every value recorded while enabled.
#[derive(Debug, Default)]
pub struct Tracker {
    buffer: Mutex<Vec<Value>>,
    enabled: AtomicBool,
}

impl Tracker {
    /// A tracker that starts out enabled.
    pub fn enabled() -> Self {
        Self {
            buffer: Mutex::default(),
            enabled: AtomicBool::new(true),
        }
    }

    /// Snapshot of everything recorded so far.
    pub fn buffer(&self) -> Vec<Value> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Comma-separated dump of the buffer, or `None` while disabled.
    pub fn render(&self) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        let buffer = self.lock();
        let items: Vec<String> = buffer.iter().map(ToString::to_string).collect();
        Some(items.join(", "))
    }

    // A panic while holding the lock cannot leave the Vec half-written.
    fn lock(&self) -> MutexGuard<'_, Vec<Value>> {
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DebugSink for Tracker {
    fn record(&self, value: &Value) {
        if self.is_enabled() {
            self.lock().push(value.clone());
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}
