//! Record demultiplexer - classification and decode of framed records.
//!
//! Sits between the [`LineBuffer`] and the notification surface. Every
//! complete record is either decoded as structured data, surfaced as
//! plain text, or reported as a per-record decode error; a malformed
//! record never aborts the stream or disturbs the records after it.
//!
//! The demultiplexer is synchronous and single-owner: one call site
//! drives [`on_chunk`](RecordDemux::on_chunk) with whatever the stream
//! delivered, and events come back in input order.
//!
//! # Example
//!
//! ```
//! use linewire::framing::{RecordDemux, StreamEvent};
//!
//! let mut demux = RecordDemux::new();
//!
//! let events = demux.on_chunk("hello world\n{\"x\":1}\n");
//! assert!(matches!(events[0], StreamEvent::Text(ref t) if t == "hello world\n"));
//! assert!(matches!(events[1], StreamEvent::Record(ref v) if v["x"] == 1));
//! ```

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use crate::codec::{JsonCodec, RecordCodec};
use crate::error::StreamError;
use crate::metrics::{Counter, Instruments, Stage};

use super::{LineBuffer, RecordPattern};

/// One notification from the read side of the stream.
#[derive(Debug)]
pub enum StreamEvent<V = serde_json::Value> {
    /// A structured record, decoded.
    Record(V),
    /// Plain text passed through, with its delimiter reattached.
    Text(String),
    /// A failure. Decode failures are per-record and recoverable;
    /// input/output failures are terminal for their side.
    Error(StreamError),
    /// The input stream ended. Nothing follows.
    End,
}

/// Classifier/decoder over a [`LineBuffer`].
///
/// Generic over the codec so the decoded value type is chosen at compile
/// time; [`JsonCodec`] (decoding to [`serde_json::Value`]) is the
/// default. Configuration may be changed between chunks via the setters;
/// changes take effect from the next `on_chunk`.
pub struct RecordDemux<C: RecordCodec = JsonCodec> {
    buffer: LineBuffer,
    pattern: RecordPattern,
    preserve_whitespace: bool,
    instruments: Option<Arc<dyn Instruments>>,
    ended: bool,
    _codec: PhantomData<fn() -> C>,
}

impl RecordDemux<JsonCodec> {
    /// Create a demultiplexer with the default JSON codec, platform
    /// delimiter, brace pattern, and whitespace dropping.
    pub fn new() -> Self {
        Self::with_codec()
    }
}

impl Default for RecordDemux<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: RecordCodec> RecordDemux<C> {
    /// Create a demultiplexer for an explicitly chosen codec.
    pub fn with_codec() -> Self {
        Self {
            buffer: LineBuffer::new(),
            pattern: RecordPattern::default(),
            preserve_whitespace: false,
            instruments: None,
            ended: false,
            _codec: PhantomData,
        }
    }

    /// Process one chunk of input and return the events it produced, in
    /// input order.
    ///
    /// Returns nothing once the stream has ended: after
    /// [`finish`](Self::finish) no record or text notification is ever
    /// emitted, even if data arrives late.
    pub fn on_chunk(&mut self, chunk: &str) -> Vec<StreamEvent<C::Value>> {
        if self.ended {
            return Vec::new();
        }

        let records = self.buffer.push(chunk);
        let mut events = Vec::with_capacity(records.len());
        for record in records {
            self.classify(record, &mut events);
        }
        events
    }

    /// Classify one complete record and append the resulting event, if
    /// any.
    fn classify(&mut self, record: String, events: &mut Vec<StreamEvent<C::Value>>) {
        if self.pattern.matches(&record) {
            let started = Instant::now();
            match C::decode(&record) {
                Ok(value) => {
                    if let Some(instruments) = &self.instruments {
                        instruments.observe(Stage::Decode, started.elapsed());
                        instruments.add(Counter::MessagesRead, 1);
                        instruments.add(
                            Counter::BytesRead,
                            (record.len() + self.buffer.delimiter().len()) as u64,
                        );
                    }
                    events.push(StreamEvent::Record(value));
                }
                Err(err) => {
                    events.push(StreamEvent::Error(StreamError::Decode {
                        reason: err.to_string(),
                        raw: record,
                    }));
                }
            }
        } else if self.preserve_whitespace || record.chars().any(|c| !c.is_whitespace()) {
            // Reattach the delimiter: concatenating the emitted text (plus
            // re-serialized records) reconstructs the original stream,
            // minus the still-buffered undelimited tail.
            let mut text = record;
            text.push_str(self.buffer.delimiter());
            events.push(StreamEvent::Text(text));
        }
    }

    /// Signal end of input. Returns the terminal event the first time,
    /// `None` on repeats.
    ///
    /// Any buffered partial record is dropped rather than flushed: a line
    /// known to be truncated is not worth handing to the decoder.
    pub fn finish(&mut self) -> Option<StreamEvent<C::Value>> {
        if self.ended {
            return None;
        }
        self.ended = true;
        self.buffer.clear();
        Some(StreamEvent::End)
    }

    /// Whether [`finish`](Self::finish) has been called.
    pub fn ended(&self) -> bool {
        self.ended
    }

    /// The underlying line buffer.
    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    /// Replace the delimiter. Takes effect from the next chunk.
    ///
    /// # Panics
    ///
    /// Panics if `delimiter` is empty.
    pub fn set_delimiter(&mut self, delimiter: impl Into<String>) {
        self.buffer.set_delimiter(delimiter);
    }

    /// Replace the record pattern.
    pub fn set_pattern(&mut self, pattern: RecordPattern) {
        self.pattern = pattern;
    }

    /// Control whether purely-whitespace records are surfaced as text.
    /// Off by default: blank lines are dropped.
    pub fn set_preserve_whitespace(&mut self, preserve: bool) {
        self.preserve_whitespace = preserve;
    }

    /// Replace the maximum buffered-record length, in characters.
    pub fn set_max_record_len(&mut self, max_record_len: usize) {
        self.buffer.set_max_record_len(max_record_len);
    }

    /// Attach an instrumentation sink for decode timings and counters.
    pub fn attach_instruments(&mut self, instruments: Arc<dyn Instruments>) {
        self.instruments = Some(instruments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::StreamMetrics;

    fn records(events: &[StreamEvent]) -> Vec<&serde_json::Value> {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Record(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    fn texts(events: &[StreamEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_record_split_across_chunks() {
        let mut demux = RecordDemux::new();

        let first = demux.on_chunk("{\"a\":1}\n{\"b\"");
        assert_eq!(first.len(), 1);
        assert!(matches!(&first[0], StreamEvent::Record(v) if v["a"] == 1));

        let second = demux.on_chunk(":2}\n");
        assert_eq!(second.len(), 1);
        assert!(matches!(&second[0], StreamEvent::Record(v) if v["b"] == 2));
    }

    #[test]
    fn test_text_before_record() {
        let mut demux = RecordDemux::new();
        let events = demux.on_chunk("hello world\n{\"x\":1}\n");

        assert_eq!(events.len(), 2);
        assert_eq!(texts(&events), vec!["hello world\n"]);
        assert_eq!(records(&events)[0]["x"], 1);
    }

    #[test]
    fn test_blank_lines_dropped_by_default() {
        let mut demux = RecordDemux::new();
        let events = demux.on_chunk("\n\n");
        assert!(events.is_empty());
    }

    #[test]
    fn test_blank_lines_kept_when_preserving_whitespace() {
        let mut demux = RecordDemux::new();
        demux.set_preserve_whitespace(true);

        let events = demux.on_chunk("\n\n");
        assert_eq!(texts(&events), vec!["\n", "\n"]);
    }

    #[test]
    fn test_whitespace_only_record_follows_flag() {
        let mut demux = RecordDemux::new();
        assert!(demux.on_chunk("   \t\n").is_empty());

        demux.set_preserve_whitespace(true);
        let events = demux.on_chunk("   \t\n");
        assert_eq!(texts(&events), vec!["   \t\n"]);
    }

    #[test]
    fn test_decode_error_is_isolated() {
        let mut demux = RecordDemux::new();
        let events = demux.on_chunk("{broken\n{\"ok\":true}\n");

        assert_eq!(events.len(), 2);
        match &events[0] {
            StreamEvent::Error(StreamError::Decode { raw, .. }) => assert_eq!(raw, "{broken"),
            other => panic!("expected decode error, got {:?}", other),
        }
        assert!(matches!(&events[1], StreamEvent::Record(v) if v["ok"] == true));
    }

    #[test]
    fn test_bad_record_emits_no_record_event() {
        let mut demux = RecordDemux::new();
        let events = demux.on_chunk("{nope}\n");

        assert_eq!(events.len(), 1);
        assert!(records(&events).is_empty());
    }

    #[test]
    fn test_text_keeps_delimiter() {
        let mut demux = RecordDemux::new();
        demux.set_delimiter("\r\n");

        let events = demux.on_chunk("plain\r\n");
        assert_eq!(texts(&events), vec!["plain\r\n"]);
    }

    #[test]
    fn test_custom_pattern_reroutes_classification() {
        let mut demux = RecordDemux::new();
        demux.set_pattern(RecordPattern::custom(|r| r.starts_with("J:")));

        // Braced line is now plain text; nothing decodes.
        let events = demux.on_chunk("{\"a\":1}\n");
        assert_eq!(texts(&events), vec!["{\"a\":1}\n"]);
    }

    #[test]
    fn test_finish_emits_end_once() {
        let mut demux = RecordDemux::new();

        assert!(matches!(demux.finish(), Some(StreamEvent::End)));
        assert!(demux.finish().is_none());
        assert!(demux.ended());
    }

    #[test]
    fn test_finish_drops_pending_partial() {
        let mut demux = RecordDemux::new();
        demux.on_chunk("{\"tail\":");

        demux.finish();
        assert!(demux.buffer().is_empty());
    }

    #[test]
    fn test_no_events_after_end() {
        let mut demux = RecordDemux::new();
        demux.finish();

        assert!(demux.on_chunk("{\"late\":1}\n").is_empty());
    }

    #[test]
    fn test_instruments_count_messages_and_bytes() {
        let metrics = Arc::new(StreamMetrics::new());
        let mut demux = RecordDemux::new();
        demux.attach_instruments(metrics.clone());

        demux.on_chunk("{\"a\":1}\n{bad\nplain\n");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_read, 1);
        // Record plus its one-byte delimiter; failures and text add nothing.
        assert_eq!(snapshot.bytes_read, "{\"a\":1}\n".len() as u64);
        assert_eq!(snapshot.decode_samples, 1);
    }

    #[test]
    fn test_chunking_invariance() {
        let input = "alpha\n{\"n\":1}\n\n{bad\n{\"n\":2}\nbeta";

        let chunkings: Vec<Vec<&str>> = vec![
            vec![input],
            input.split_inclusive(|_c: char| true).collect(), // char at a time
            vec![&input[..7], &input[7..20], &input[20..]],
        ];

        let mut outputs = Vec::new();
        for chunks in chunkings {
            let mut demux = RecordDemux::new();
            let mut events = Vec::new();
            for chunk in chunks {
                events.extend(demux.on_chunk(chunk));
            }
            outputs.push(format!("{:?}", events));
        }

        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(outputs[0], outputs[2]);
    }
}
