//! Reader task - drives the demultiplexer from an async input stream.
//!
//! Reads fixed-size chunks, repairs UTF-8 sequences split across read
//! boundaries, feeds the [`RecordDemux`], and forwards every event to an
//! mpsc channel. End-of-stream becomes a single [`StreamEvent::End`]; a
//! read error becomes [`StreamError::Input`]. The task stops on either,
//! or as soon as the event receiver is dropped.
//!
//! The core attaches to streams it does not own: nothing here closes the
//! reader, and a stalled stream simply never produces further events.

use std::borrow::Cow;
use std::mem;
use std::str;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::codec::RecordCodec;
use crate::error::StreamError;
use crate::framing::{RecordDemux, StreamEvent};

/// Read buffer size for each pass over the input stream.
const READ_BUF_SIZE: usize = 64 * 1024;

/// Spawn the reader task.
///
/// Every event the demultiplexer produces is forwarded to `events` in
/// input order. The returned handle resolves when the input stream ends,
/// fails, or the receiver side of `events` is dropped.
pub fn spawn_reader_task<R, C>(
    reader: R,
    demux: RecordDemux<C>,
    events: mpsc::Sender<StreamEvent<C::Value>>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    C: RecordCodec + 'static,
{
    tokio::spawn(read_loop(reader, demux, events))
}

/// Main read loop - reads chunks and forwards demultiplexed events.
async fn read_loop<R, C>(
    mut reader: R,
    mut demux: RecordDemux<C>,
    events: mpsc::Sender<StreamEvent<C::Value>>,
) where
    R: AsyncRead + Unpin,
    C: RecordCodec,
{
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut carry = Utf8Carry::new();

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                if let Some(event) = demux.finish() {
                    let _ = events.send(event).await;
                }
                return;
            }
            Ok(n) => {
                let chunk = carry.decode(&buf[..n]);
                for event in demux.on_chunk(&chunk) {
                    if events.send(event).await.is_err() {
                        tracing::debug!("event receiver dropped, stopping reader");
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::error!("input stream error: {}", e);
                let _ = events.send(StreamEvent::Error(StreamError::Input(e))).await;
                return;
            }
        }
    }
}

/// Carries an incomplete UTF-8 sequence from the tail of one read to the
/// head of the next, so a multi-byte character split across reads
/// reassembles instead of corrupting.
///
/// Definitely-invalid sequences (as opposed to incomplete ones) are
/// replaced with U+FFFD: a corrupt byte must not wedge the stream.
struct Utf8Carry {
    /// Incomplete trailing sequence, at most three bytes.
    partial: Vec<u8>,
}

impl Utf8Carry {
    fn new() -> Self {
        Self {
            partial: Vec::new(),
        }
    }

    /// Decode `input`, prepending any carried bytes and stashing a new
    /// incomplete tail.
    fn decode(&mut self, input: &[u8]) -> String {
        let data: Cow<'_, [u8]> = if self.partial.is_empty() {
            Cow::Borrowed(input)
        } else {
            let mut joined = mem::take(&mut self.partial);
            joined.extend_from_slice(input);
            Cow::Owned(joined)
        };

        let mut out = String::with_capacity(data.len());
        let mut rest: &[u8] = &data;

        loop {
            match str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(str::from_utf8(valid).expect("prefix is valid UTF-8"));
                    match e.error_len() {
                        Some(bad) => {
                            out.push('\u{FFFD}');
                            rest = &after[bad..];
                        }
                        None => {
                            // Incomplete tail: carry it into the next read.
                            self.partial = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }
}
