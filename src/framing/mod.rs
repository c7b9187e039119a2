//! Framing module - chunk-to-record framing and classification.
//!
//! This is the synchronous core of the crate:
//!
//! - [`LineBuffer`] accumulates arbitrary-sized text chunks and extracts
//!   delimiter-bounded records, carrying the undelimited tail across
//!   chunk boundaries and clamping it to a configurable maximum length.
//! - [`RecordPattern`] decides per record whether it should be decoded as
//!   structured data or passed through as plain text.
//! - [`RecordDemux`] drives both, decodes matching records through the
//!   configured codec, and produces the tagged [`StreamEvent`] sequence.
//!
//! Nothing here touches I/O; the async wiring lives in
//! [`reader`](crate::reader) and [`endpoint`](crate::endpoint).

mod demux;
mod line_buffer;
mod pattern;

pub use demux::{RecordDemux, StreamEvent};
pub use line_buffer::{LineBuffer, DEFAULT_DELIMITER, DEFAULT_MAX_RECORD_LEN};
pub use pattern::RecordPattern;
