//! JSON codec using `serde_json`.
//!
//! `serde_json::to_string` produces compact output with no embedded
//! newlines, so a serialized record is always a single line and can never
//! collide with the default delimiter. Decoding tolerates surrounding
//! whitespace, which covers records that arrive with a trailing `\r` when
//! the peer writes `\r\n` but the delimiter is configured as `\n`.
//!
//! # Example
//!
//! ```
//! use linewire::codec::{JsonCodec, RecordCodec};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Message {
//!     id: u32,
//!     content: String,
//! }
//!
//! let msg = Message { id: 42, content: "hello".to_string() };
//! let line = JsonCodec::encode(&msg).unwrap();
//! let value = JsonCodec::decode(&line).unwrap();
//! assert_eq!(value["id"], 42);
//! ```

use serde::Serialize;
use serde_json::Value;

use super::RecordCodec;
use crate::error::Result;

/// JSON codec for structured records.
///
/// Decodes to [`serde_json::Value`] so callers can inspect records
/// without committing to a schema; outbound values are any
/// [`serde::Serialize`] type.
pub struct JsonCodec;

impl RecordCodec for JsonCodec {
    type Value = Value;

    /// Decode one raw record as JSON.
    ///
    /// # Errors
    ///
    /// Returns error if the record is not valid JSON.
    #[inline]
    fn decode(raw: &str) -> Result<Value> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serialize a value to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized (for example a map
    /// with non-string keys).
    #[inline]
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }
}
