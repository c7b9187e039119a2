//! Endpoint builder and stream wiring.
//!
//! [`EndpointBuilder`] carries the configuration surface; `connect` wires
//! a reader task and a writer task over a caller-supplied stream pair and
//! returns the [`Endpoint`] plus the event receiver. The two streams may
//! be the halves of one bidirectional object or entirely separate; either
//! way, read-side and write-side failures arrive as distinguishable
//! [`StreamError`] variants on the same event stream.
//!
//! # Example
//!
//! ```ignore
//! use linewire::{Endpoint, StreamEvent};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (endpoint, mut events) = Endpoint::builder().connect_stdio();
//!
//!     endpoint.write(&json!({ "ready": true }))?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             StreamEvent::Record(value) => println!("record: {}", value),
//!             StreamEvent::Text(text) => eprint!("{}", text),
//!             StreamEvent::Error(e) => eprintln!("stream error: {}", e),
//!             StreamEvent::End => break,
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::io;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::codec::{JsonCodec, RecordCodec};
use crate::error::{LinewireError, Result, StreamError};
use crate::framing::{RecordDemux, RecordPattern, StreamEvent, DEFAULT_DELIMITER,
    DEFAULT_MAX_RECORD_LEN};
use crate::metrics::Instruments;
use crate::reader::spawn_reader_task;
use crate::writer::{spawn_writer_task, WriterConfig, WriterHandle, DEFAULT_MAX_PENDING_LINES};

/// Default capacity of the event channel handed to the caller.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Builder for configuring and connecting an [`Endpoint`].
///
/// Use the fluent API to adjust framing and classification policy, then
/// call [`connect`](Self::connect) (or
/// [`connect_stdio`](Self::connect_stdio)) to start the tasks.
pub struct EndpointBuilder<C: RecordCodec = JsonCodec> {
    delimiter: String,
    pattern: RecordPattern,
    preserve_whitespace: bool,
    max_record_len: usize,
    max_pending_lines: usize,
    event_capacity: usize,
    instruments: Option<Arc<dyn Instruments>>,
    _codec: PhantomData<fn() -> C>,
}

impl EndpointBuilder<JsonCodec> {
    /// Create a builder with the default JSON codec and policies.
    pub fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            pattern: RecordPattern::default(),
            preserve_whitespace: false,
            max_record_len: DEFAULT_MAX_RECORD_LEN,
            max_pending_lines: DEFAULT_MAX_PENDING_LINES,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            instruments: None,
            _codec: PhantomData,
        }
    }
}

impl Default for EndpointBuilder<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: RecordCodec + 'static> EndpointBuilder<C> {
    /// Switch to a different codec, keeping every other setting.
    pub fn codec<D: RecordCodec>(self) -> EndpointBuilder<D> {
        EndpointBuilder {
            delimiter: self.delimiter,
            pattern: self.pattern,
            preserve_whitespace: self.preserve_whitespace,
            max_record_len: self.max_record_len,
            max_pending_lines: self.max_pending_lines,
            event_capacity: self.event_capacity,
            instruments: self.instruments,
            _codec: PhantomData,
        }
    }

    /// Set the record delimiter, shared by the read and write paths.
    /// Default: the platform newline.
    ///
    /// # Panics
    ///
    /// Panics if `delimiter` is empty.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        assert!(!delimiter.is_empty(), "delimiter must be non-empty");
        self.delimiter = delimiter;
        self
    }

    /// Set the structured-record pattern.
    /// Default: leading-whitespace-then-brace.
    pub fn pattern(mut self, pattern: RecordPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Surface purely-whitespace records as text instead of dropping
    /// them. Default: off.
    pub fn preserve_whitespace(mut self, preserve: bool) -> Self {
        self.preserve_whitespace = preserve;
        self
    }

    /// Set the maximum buffered-record length, in characters.
    /// Default: 1,048,576.
    pub fn max_record_len(mut self, max_record_len: usize) -> Self {
        self.max_record_len = max_record_len;
        self
    }

    /// Set the pending-line threshold for the backpressure gauge.
    /// Default: 1024.
    pub fn max_pending_lines(mut self, max_pending_lines: usize) -> Self {
        self.max_pending_lines = max_pending_lines;
        self
    }

    /// Set the event channel capacity. Default: 256.
    pub fn event_capacity(mut self, event_capacity: usize) -> Self {
        self.event_capacity = event_capacity;
        self
    }

    /// Attach an instrumentation sink shared by both sides.
    pub fn instruments(mut self, instruments: Arc<dyn Instruments>) -> Self {
        self.instruments = Some(instruments);
        self
    }

    /// Wire the endpoint over a stream pair and start its tasks.
    ///
    /// `reader` and `writer` may be the split halves of one stream or two
    /// unrelated streams; the core never closes either.
    pub fn connect<R, W>(
        self,
        reader: R,
        writer: W,
    ) -> (Endpoint<C>, mpsc::Receiver<StreamEvent<C::Value>>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (events_tx, events_rx) = mpsc::channel(self.event_capacity);

        let mut demux = RecordDemux::<C>::with_codec();
        demux.set_delimiter(self.delimiter.clone());
        demux.set_pattern(self.pattern);
        demux.set_preserve_whitespace(self.preserve_whitespace);
        demux.set_max_record_len(self.max_record_len);
        if let Some(instruments) = &self.instruments {
            demux.attach_instruments(instruments.clone());
        }

        let reader_task = spawn_reader_task(reader, demux, events_tx.clone());

        let writer_config = WriterConfig {
            delimiter: self.delimiter,
            max_pending_lines: self.max_pending_lines,
        };
        let (writer_handle, writer_task) =
            spawn_writer_task::<W, C>(writer, writer_config, self.instruments);

        // Writer failures surface on the same event stream as read-side
        // failures, under the write-side variant.
        let monitor_task = tokio::spawn(async move {
            match writer_task.await {
                Ok(Ok(())) => {}
                Ok(Err(LinewireError::Io(e))) => {
                    let _ = events_tx.send(StreamEvent::Error(StreamError::Output(e))).await;
                }
                Ok(Err(e)) => {
                    tracing::error!("writer task failed: {}", e);
                    let _ = events_tx
                        .send(StreamEvent::Error(StreamError::Output(io::Error::new(
                            io::ErrorKind::Other,
                            e.to_string(),
                        ))))
                        .await;
                }
                Err(join_error) => {
                    tracing::error!("writer task panicked: {}", join_error);
                }
            }
        });

        let endpoint = Endpoint {
            writer: writer_handle,
            reader_task,
            _monitor_task: monitor_task,
        };

        (endpoint, events_rx)
    }

    /// Wire the endpoint over this process's stdin and stdout.
    ///
    /// The conventional split for a child process speaking a line
    /// protocol with its parent: records on stdout, logs on stderr.
    pub fn connect_stdio(self) -> (Endpoint<C>, mpsc::Receiver<StreamEvent<C::Value>>) {
        self.connect(tokio::io::stdin(), tokio::io::stdout())
    }
}

/// A connected endpoint: write handle plus the tasks driving one stream
/// pair.
///
/// Dropping the endpoint and every cloned [`WriterHandle`] stops the
/// writer task; the reader task stops at end-of-stream, on input error,
/// or when the event receiver is dropped.
pub struct Endpoint<C: RecordCodec = JsonCodec> {
    writer: WriterHandle<C>,
    reader_task: JoinHandle<()>,
    _monitor_task: JoinHandle<()>,
}

impl Endpoint<JsonCodec> {
    /// Create an endpoint builder.
    pub fn builder() -> EndpointBuilder<JsonCodec> {
        EndpointBuilder::new()
    }
}

impl<C: RecordCodec> Endpoint<C> {
    /// Serialize `value` and send it as one framed record.
    ///
    /// Returns whether the line went straight out (`true`) or queued
    /// behind earlier writes (`false`). See [`WriterHandle::write`].
    pub fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<bool> {
        self.writer.write(value)
    }

    /// Like [`write`](Self::write), additionally returning a receiver
    /// that resolves once the line has been flushed to the sink.
    pub fn write_notified<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<(bool, oneshot::Receiver<()>)> {
        self.writer.write_notified(value)
    }

    /// Lines accepted but not yet flushed to the sink.
    pub fn pending_lines(&self) -> usize {
        self.writer.pending_lines()
    }

    /// Whether the pending-line count has reached the configured
    /// threshold.
    pub fn is_backpressure_active(&self) -> bool {
        self.writer.is_backpressure_active()
    }

    /// A cloned write handle, usable from any task.
    pub fn writer_handle(&self) -> WriterHandle<C> {
        self.writer.clone()
    }

    /// Wait until the input stream has ended or failed.
    ///
    /// Consumes the endpoint; the write side shuts down once every
    /// cloned handle is dropped.
    pub async fn wait_for_end(self) {
        let _ = self.reader_task.await;
    }
}
