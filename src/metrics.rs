//! Stream instrumentation - counters and stage timings.
//!
//! The core reports into an [`Instruments`] implementation when one is
//! attached; with none attached the hooks cost a branch and nothing else.
//! [`StreamMetrics`] is a ready-made lock-free implementation backed by
//! atomics, with an immutable [`MetricsSnapshot`] for export.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use linewire::metrics::{Counter, Instruments, StreamMetrics};
//!
//! let metrics = Arc::new(StreamMetrics::new());
//! metrics.add(Counter::MessagesRead, 1);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.messages_read, 1);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Named counters the core increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Structured records successfully decoded.
    MessagesRead,
    /// Values serialized and handed to the writer task.
    MessagesWritten,
    /// Bytes consumed by decoded records, delimiter included.
    BytesRead,
    /// Bytes produced by serialized records, delimiter included.
    BytesWritten,
    /// Writes that queued behind earlier lines instead of going straight
    /// out (the backpressure signal, counted).
    WritesBuffered,
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Counter::MessagesRead => "messages_read",
            Counter::MessagesWritten => "messages_written",
            Counter::BytesRead => "bytes_read",
            Counter::BytesWritten => "bytes_written",
            Counter::WritesBuffered => "writes_buffered",
        };
        f.write_str(name)
    }
}

/// Timed operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Decoding one inbound record.
    Decode,
    /// Serializing and framing one outbound value.
    Compose,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decode => "decode",
            Stage::Compose => "compose",
        };
        f.write_str(name)
    }
}

/// Instrumentation collaborator the core reports into.
///
/// Implementations must be cheap and non-blocking: the hooks run inline
/// on the chunk-processing and write paths.
pub trait Instruments: Send + Sync {
    /// Add `delta` to a named counter.
    fn add(&self, counter: Counter, delta: u64);

    /// Record one timed run of a stage.
    fn observe(&self, stage: Stage, elapsed: Duration);
}

/// Atomic counters and accumulated stage times.
///
/// Shareable across the reader and writer sides of one stream via `Arc`.
#[derive(Debug, Default)]
pub struct StreamMetrics {
    messages_read: AtomicU64,
    messages_written: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    writes_buffered: AtomicU64,
    decode_nanos: AtomicU64,
    decode_samples: AtomicU64,
    compose_nanos: AtomicU64,
    compose_samples: AtomicU64,
}

impl StreamMetrics {
    /// Create a zeroed metrics sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture an immutable point-in-time view.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_read: self.messages_read.load(Ordering::Relaxed),
            messages_written: self.messages_written.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            writes_buffered: self.writes_buffered.load(Ordering::Relaxed),
            decode_nanos: self.decode_nanos.load(Ordering::Relaxed),
            decode_samples: self.decode_samples.load(Ordering::Relaxed),
            compose_nanos: self.compose_nanos.load(Ordering::Relaxed),
            compose_samples: self.compose_samples.load(Ordering::Relaxed),
        }
    }
}

impl Instruments for StreamMetrics {
    fn add(&self, counter: Counter, delta: u64) {
        let cell = match counter {
            Counter::MessagesRead => &self.messages_read,
            Counter::MessagesWritten => &self.messages_written,
            Counter::BytesRead => &self.bytes_read,
            Counter::BytesWritten => &self.bytes_written,
            Counter::WritesBuffered => &self.writes_buffered,
        };
        cell.fetch_add(delta, Ordering::Relaxed);
    }

    fn observe(&self, stage: Stage, elapsed: Duration) {
        let (nanos, samples) = match stage {
            Stage::Decode => (&self.decode_nanos, &self.decode_samples),
            Stage::Compose => (&self.compose_nanos, &self.compose_samples),
        };
        nanos.fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        samples.fetch_add(1, Ordering::Relaxed);
    }
}

/// Immutable point-in-time view of a [`StreamMetrics`], serializable for
/// export or logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Structured records successfully decoded.
    pub messages_read: u64,
    /// Values serialized and handed to the writer task.
    pub messages_written: u64,
    /// Bytes consumed by decoded records, delimiter included.
    pub bytes_read: u64,
    /// Bytes produced by serialized records, delimiter included.
    pub bytes_written: u64,
    /// Writes that queued behind earlier lines.
    pub writes_buffered: u64,
    /// Total nanoseconds spent decoding.
    pub decode_nanos: u64,
    /// Number of decode timings recorded.
    pub decode_samples: u64,
    /// Total nanoseconds spent composing.
    pub compose_nanos: u64,
    /// Number of compose timings recorded.
    pub compose_samples: u64,
}

impl MetricsSnapshot {
    /// Mean decode duration, zero when no samples were recorded.
    pub fn mean_decode(&self) -> Duration {
        mean(self.decode_nanos, self.decode_samples)
    }

    /// Mean compose duration, zero when no samples were recorded.
    pub fn mean_compose(&self) -> Duration {
        mean(self.compose_nanos, self.compose_samples)
    }
}

fn mean(nanos: u64, samples: u64) -> Duration {
    if samples == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(nanos / samples)
}
