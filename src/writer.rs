//! Dedicated writer task for framed line output.
//!
//! Outbound values are serialized on the caller's task, framed with the
//! delimiter, and handed to a dedicated writer task over a channel. The
//! handle never blocks on a slow sink: the boolean returned by
//! [`WriterHandle::write`] says whether the line went straight out or
//! queued behind earlier writes, and flow-control policy stays with the
//! caller.
//!
//! # Architecture
//!
//! ```text
//! Task 1 ─┐
//! Task 2 ─┼─► WriterHandle ─► channel ─► Writer Task ─► Sink
//! Task N ─┘
//! ```
//!
//! The writer task drains a small batch of queued lines per wakeup and
//! flushes once, so bursts cost one flush instead of one per line. Flush
//! notifications requested through [`WriterHandle::write_notified`]
//! resolve after that flush.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::codec::{JsonCodec, RecordCodec};
use crate::error::{LinewireError, Result};
use crate::framing::DEFAULT_DELIMITER;
use crate::metrics::{Counter, Instruments, Stage};

/// Default pending-line threshold for the backpressure gauge.
pub const DEFAULT_MAX_PENDING_LINES: usize = 1024;

/// Maximum lines drained per writer-task wakeup.
const MAX_BATCH_SIZE: usize = 64;

/// A framed line ready to be written to the sink.
#[derive(Debug)]
pub struct OutboundLine {
    /// Serialized record with the delimiter already appended.
    pub data: Bytes,
    /// Resolved once the line has been flushed to the sink.
    notify: Option<oneshot::Sender<()>>,
}

/// Configuration for the writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Delimiter appended to every serialized record.
    pub delimiter: String,
    /// Pending-line count at which
    /// [`WriterHandle::is_backpressure_active`] trips.
    pub max_pending_lines: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            max_pending_lines: DEFAULT_MAX_PENDING_LINES,
        }
    }
}

/// Handle for composing and sending framed lines.
///
/// Cheaply cloneable; any number of tasks may write through it. The
/// writer task exits cleanly once every handle is dropped.
pub struct WriterHandle<C: RecordCodec = JsonCodec> {
    /// Channel sender for framed lines.
    tx: mpsc::UnboundedSender<OutboundLine>,
    /// Lines accepted but not yet flushed (for the backpressure gauge).
    pending: Arc<AtomicUsize>,
    /// Threshold for `is_backpressure_active`.
    max_pending: usize,
    /// Delimiter appended to every record.
    delimiter: String,
    /// Optional instrumentation sink.
    instruments: Option<Arc<dyn Instruments>>,
    _codec: PhantomData<fn() -> C>,
}

impl<C: RecordCodec> Clone for WriterHandle<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            pending: self.pending.clone(),
            max_pending: self.max_pending,
            delimiter: self.delimiter.clone(),
            instruments: self.instruments.clone(),
            _codec: PhantomData,
        }
    }
}

impl<C: RecordCodec> WriterHandle<C> {
    /// Serialize `value`, append the delimiter, and hand the line to the
    /// writer task.
    ///
    /// Returns `Ok(true)` when the writer task was idle and the line goes
    /// straight out, `Ok(false)` when it queued behind earlier writes.
    /// The queue is unbounded and this call never blocks; the boolean is
    /// a signal, and flow control stays with the caller.
    ///
    /// # Errors
    ///
    /// Serialization failures propagate here, synchronously - they are a
    /// failure of this call, not of the stream, and never appear on the
    /// event surface. Returns [`LinewireError::ChannelClosed`] once the
    /// writer task is gone.
    pub fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<bool> {
        self.write_inner(value, None)
    }

    /// Like [`write`](Self::write), additionally returning a receiver
    /// that resolves once the line has been flushed to the sink.
    ///
    /// The receiver yields an error if the writer task dies before
    /// flushing this line.
    pub fn write_notified<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<(bool, oneshot::Receiver<()>)> {
        let (notify_tx, notify_rx) = oneshot::channel();
        let flushed = self.write_inner(value, Some(notify_tx))?;
        Ok((flushed, notify_rx))
    }

    fn write_inner<T: Serialize + ?Sized>(
        &self,
        value: &T,
        notify: Option<oneshot::Sender<()>>,
    ) -> Result<bool> {
        let started = Instant::now();
        let mut line = C::encode(value)?;
        line.push_str(&self.delimiter);

        if let Some(instruments) = &self.instruments {
            instruments.observe(Stage::Compose, started.elapsed());
            instruments.add(Counter::MessagesWritten, 1);
            instruments.add(Counter::BytesWritten, line.len() as u64);
        }

        // Claim the pending slot before sending so the writer task's
        // decrement can never cross it.
        let was_idle = self.pending.fetch_add(1, Ordering::AcqRel) == 0;
        if !was_idle {
            if let Some(instruments) = &self.instruments {
                instruments.add(Counter::WritesBuffered, 1);
            }
        }

        let outbound = OutboundLine {
            data: Bytes::from(line),
            notify,
        };
        self.tx.send(outbound).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::Release);
            LinewireError::ChannelClosed
        })?;

        Ok(was_idle)
    }

    /// Lines accepted but not yet flushed to the sink.
    #[inline]
    pub fn pending_lines(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether the pending-line count has reached the configured
    /// threshold.
    #[inline]
    pub fn is_backpressure_active(&self) -> bool {
        self.pending.load(Ordering::Acquire) >= self.max_pending
    }

    /// The delimiter appended to every record.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }
}

/// Spawn the writer task and return a handle for sending lines.
///
/// The task exits cleanly when every handle is dropped, or with an error
/// when the sink fails; the returned [`JoinHandle`] carries the outcome.
pub fn spawn_writer_task<W, C>(
    sink: W,
    config: WriterConfig,
    instruments: Option<Arc<dyn Instruments>>,
) -> (WriterHandle<C>, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
    C: RecordCodec,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));

    let handle = WriterHandle {
        tx,
        pending: pending.clone(),
        max_pending: config.max_pending_lines,
        delimiter: config.delimiter,
        instruments,
        _codec: PhantomData,
    };

    let task = tokio::spawn(writer_loop(rx, sink, pending));

    (handle, task)
}

/// Main writer loop - receives framed lines and writes them to the sink.
async fn writer_loop<W>(
    mut rx: mpsc::UnboundedReceiver<OutboundLine>,
    mut sink: W,
    pending: Arc<AtomicUsize>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let first = match rx.recv().await {
            Some(line) => line,
            // Every handle dropped: clean shutdown.
            None => return Ok(()),
        };

        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        batch.push(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(line) => batch.push(line),
                Err(_) => break,
            }
        }

        for line in &batch {
            sink.write_all(&line.data).await?;
        }
        sink.flush().await?;

        let batch_len = batch.len();
        for line in batch {
            if let Some(notify) = line.notify {
                // Receiver may have been dropped; that is not our problem.
                let _ = notify.send(());
            }
        }
        pending.fetch_sub(batch_len, Ordering::Release);
    }
}
