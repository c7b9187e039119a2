//! Integration tests for linewire.
//!
//! These tests exercise the framing, classification, and write paths
//! together, the way a process would drive them over a real stream.

use std::sync::Arc;

use serde_json::json;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

use linewire::framing::{RecordDemux, StreamEvent};
use linewire::metrics::StreamMetrics;
use linewire::{Endpoint, RecordPattern, StreamError};

fn drive(demux: &mut RecordDemux, chunks: &[&str]) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(demux.on_chunk(chunk));
    }
    events
}

/// Chunking invariance: however the same logical stream is cut into
/// chunks, the decoded output is identical.
#[test]
fn test_chunking_invariance() {
    let input = "noise\n{\"a\":1}\n{\"b\":2}\n{bad\n{\"c\":3}\ntail-partial";

    let whole = {
        let mut demux = RecordDemux::new();
        format!("{:?}", drive(&mut demux, &[input]))
    };

    // Cut at every position, pairwise.
    for cut in 0..=input.len() {
        let mut demux = RecordDemux::new();
        let events = drive(&mut demux, &[&input[..cut], &input[cut..]]);
        assert_eq!(format!("{:?}", events), whole, "differs at cut {}", cut);
    }

    // One character at a time.
    let chars: Vec<String> = input.chars().map(|c| c.to_string()).collect();
    let chunks: Vec<&str> = chars.iter().map(String::as_str).collect();
    let mut demux = RecordDemux::new();
    assert_eq!(format!("{:?}", drive(&mut demux, &chunks)), whole);
}

/// Spec scenario: `{"a":1}\n{"b"` then `:2}\n` - one record per chunk,
/// no text events.
#[test]
fn test_record_straddling_chunks() {
    let mut demux = RecordDemux::new();

    let first = demux.on_chunk("{\"a\":1}\n{\"b\"");
    assert_eq!(first.len(), 1);
    assert!(matches!(&first[0], StreamEvent::Record(v) if v["a"] == 1));

    let second = demux.on_chunk(":2}\n");
    assert_eq!(second.len(), 1);
    assert!(matches!(&second[0], StreamEvent::Record(v) if v["b"] == 2));
}

/// Spec scenario: text ahead of a record keeps its delimiter.
#[test]
fn test_text_then_record() {
    let mut demux = RecordDemux::new();
    let events = demux.on_chunk("hello world\n{\"x\":1}\n");

    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], StreamEvent::Text(t) if t == "hello world\n"));
    assert!(matches!(&events[1], StreamEvent::Record(v) if v["x"] == 1));
}

/// Spec scenario: two blank lines - nothing by default, two text events
/// of one delimiter each when preserving whitespace.
#[test]
fn test_blank_line_policy() {
    let mut demux = RecordDemux::new();
    assert!(demux.on_chunk("\n\n").is_empty());

    let mut demux = RecordDemux::new();
    demux.set_preserve_whitespace(true);
    let events = demux.on_chunk("\n\n");
    assert_eq!(events.len(), 2);
    for event in &events {
        assert!(matches!(event, StreamEvent::Text(t) if t == "\n"));
    }
}

/// A bad record yields one error and zero records, and the records after
/// it still decode.
#[test]
fn test_decode_failure_is_isolated() {
    let mut demux = RecordDemux::new();
    let events = demux.on_chunk("{\"ok\":1}\n{definitely not json\n{\"ok\":2}\n");

    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], StreamEvent::Record(v) if v["ok"] == 1));
    match &events[1] {
        StreamEvent::Error(StreamError::Decode { raw, .. }) => {
            assert_eq!(raw, "{definitely not json");
        }
        other => panic!("expected decode error, got {:?}", other),
    }
    assert!(matches!(&events[2], StreamEvent::Record(v) if v["ok"] == 2));
}

/// Truncation: the buffered content never exceeds the limit and is a
/// suffix of what was pushed.
#[test]
fn test_truncation_bounds_buffer() {
    let mut demux = RecordDemux::new();
    demux.set_max_record_len(16);

    let long_run = "x".repeat(100);
    demux.on_chunk(&long_run);

    let pending = demux.buffer().pending().to_string();
    assert_eq!(pending.chars().count(), 16);
    assert!(long_run.ends_with(&pending));
}

/// Round-trip through real streams: write on one endpoint, decode on a
/// peer endpoint sharing the delimiter, deep-equal value out.
#[tokio::test]
async fn test_round_trip_between_endpoints() {
    let (a, b) = duplex(4096);
    let (a_read, a_write) = tokio::io::split(a);
    let (b_read, b_write) = tokio::io::split(b);

    let (left, _left_events) = Endpoint::builder().connect(a_read, a_write);
    let (right, mut right_events) = Endpoint::builder().connect(b_read, b_write);

    let original = json!({
        "method": "update",
        "params": { "values": [1, 2, 3], "note": "héllo 世界" }
    });
    left.write(&original).unwrap();

    match right_events.recv().await.unwrap() {
        StreamEvent::Record(value) => assert_eq!(value, original),
        other => panic!("expected record, got {:?}", other),
    }

    // And the reverse direction over the same pair.
    right.write(&json!({ "ack": true })).unwrap();
    drop(right);
}

/// Writing `{"code":0}` with delimiter `\n` produces exactly those bytes
/// on the sink.
#[tokio::test]
async fn test_write_exact_bytes_on_sink() {
    let (mut peer, local) = duplex(4096);
    let (read_half, write_half) = tokio::io::split(local);
    let (endpoint, _events) = Endpoint::builder().connect(read_half, write_half);

    let (_, notify) = endpoint.write_notified(&json!({ "code": 0 })).unwrap();
    notify.await.unwrap();

    let mut buf = vec![0u8; 64];
    let n = peer.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"{\"code\":0}\n");
}

/// End-of-stream: records already framed come out, the unterminated tail
/// is dropped, and End is final.
#[tokio::test]
async fn test_eof_drops_partial_and_ends() {
    let (mut peer, local) = duplex(4096);
    let (read_half, write_half) = tokio::io::split(local);
    let (endpoint, mut events) = Endpoint::builder().connect(read_half, write_half);

    peer.write_all(b"{\"n\":1}\n{\"n\":2}\n{\"n\":3").await.unwrap();
    drop(peer);
    // Dropping the endpoint releases its write handle, so every event
    // sender goes away once the reader hits EOF and the channel closes.
    drop(endpoint);

    let mut got = Vec::new();
    while let Some(event) = events.recv().await {
        got.push(event);
    }

    assert_eq!(got.len(), 3);
    assert!(matches!(&got[0], StreamEvent::Record(v) if v["n"] == 1));
    assert!(matches!(&got[1], StreamEvent::Record(v) if v["n"] == 2));
    assert!(matches!(&got[2], StreamEvent::End));
}

/// A custom delimiter and pattern flow through both sides of an
/// endpoint.
#[tokio::test]
async fn test_custom_delimiter_and_pattern() {
    let (mut peer, local) = duplex(4096);
    let (read_half, write_half) = tokio::io::split(local);
    let (endpoint, mut events) = Endpoint::builder()
        .delimiter("\u{0}")
        .pattern(RecordPattern::custom(|r| r.starts_with('{')))
        .connect(read_half, write_half);

    peer.write_all("  {\"indented\":true}\u{0}{\"flush\":true}\u{0}".as_bytes())
        .await
        .unwrap();

    // The stricter pattern sends the indented object down the text path.
    let first = events.recv().await.unwrap();
    assert!(matches!(&first, StreamEvent::Text(t) if t == "  {\"indented\":true}\u{0}"));
    let second = events.recv().await.unwrap();
    assert!(matches!(&second, StreamEvent::Record(v) if v["flush"] == true));

    let (_, notify) = endpoint.write_notified(&json!({ "out": 1 })).unwrap();
    notify.await.unwrap();
    let mut buf = vec![0u8; 64];
    let n = peer.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], "{\"out\":1}\u{0}".as_bytes());
}

/// Shared metrics observe both directions of one endpoint.
#[tokio::test]
async fn test_metrics_cover_both_sides() {
    let metrics = Arc::new(StreamMetrics::new());
    let (mut peer, local) = duplex(4096);
    let (read_half, write_half) = tokio::io::split(local);
    let (endpoint, mut events) = Endpoint::builder()
        .instruments(metrics.clone())
        .connect(read_half, write_half);

    peer.write_all(b"{\"in\":1}\n").await.unwrap();
    let event = events.recv().await.unwrap();
    assert!(matches!(event, StreamEvent::Record(_)));

    let (_, notify) = endpoint.write_notified(&json!({ "out": 2 })).unwrap();
    notify.await.unwrap();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.messages_read, 1);
    assert_eq!(snapshot.messages_written, 1);
    assert_eq!(snapshot.bytes_read, b"{\"in\":1}\n".len() as u64);
    assert_eq!(snapshot.bytes_written, b"{\"out\":2}\n".len() as u64);
    assert_eq!(snapshot.decode_samples, 1);
    assert_eq!(snapshot.compose_samples, 1);
}
