//! # linewire
//!
//! Line-delimited JSON framing for pipes, sockets, and process stdio.
//!
//! Turns an unbounded stream of text chunks into discrete, fully-parsed
//! JSON records, and serializes outgoing values back into delimited
//! lines. This is the transport-framing building block underneath a
//! request/response or event-style protocol running over raw streams:
//! the framing discipline and a minimal content classifier, with no
//! protocol of its own on top.
//!
//! ## Architecture
//!
//! - **Framing** ([`framing::LineBuffer`]): carry-over buffering of
//!   partial records across chunk boundaries, exact-match delimiter
//!   splitting, bounded memory via front-truncation.
//! - **Classification** ([`framing::RecordDemux`]): records matching the
//!   configured pattern are decoded through the codec; everything else
//!   passes through as text (blank lines dropped unless preserved); a
//!   malformed record becomes a per-record error, never a stream abort.
//! - **Writing** ([`writer`]): serialize on the caller's task, frame,
//!   hand to a dedicated writer task; the caller gets a backpressure
//!   signal, never a block.
//! - **Wiring** ([`endpoint`]): a builder that connects the above over
//!   any `AsyncRead`/`AsyncWrite` pair, stdio included, and surfaces
//!   read-side and write-side failures distinguishably on one event
//!   stream.
//!
//! ## Example
//!
//! ```ignore
//! use linewire::{Endpoint, StreamEvent};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (endpoint, mut events) = Endpoint::builder().connect_stdio();
//!
//!     endpoint.write(&json!({ "event": "ready" }))?;
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

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod framing;
pub mod metrics;
pub mod reader;
pub mod writer;

pub use codec::{JsonCodec, RecordCodec};
pub use endpoint::{Endpoint, EndpointBuilder};
pub use error::{LinewireError, Result, StreamError};
pub use framing::{LineBuffer, RecordDemux, RecordPattern, StreamEvent};
pub use writer::WriterHandle;
