//! Codec module - serialization/deserialization for records.
//!
//! A codec pairs the decode step for inbound structured records with the
//! serialize step for outbound values. Codecs are implemented as marker
//! structs selected at compile time through the [`RecordCodec`] trait
//! rather than as trait objects, so the framing layer pays no dynamic
//! dispatch on the per-record hot path.
//!
//! [`JsonCodec`] is the default and decodes to [`serde_json::Value`].
//!
//! # Example
//!
//! ```
//! use linewire::codec::{JsonCodec, RecordCodec};
//!
//! let line = JsonCodec::encode(&serde_json::json!({ "code": 0 })).unwrap();
//! assert_eq!(line, r#"{"code":0}"#);
//!
//! let value = JsonCodec::decode(r#"{"code":0}"#).unwrap();
//! assert_eq!(value["code"], 0);
//! ```

mod json;

pub use json::JsonCodec;

use serde::Serialize;

use crate::error::Result;

/// Decode/serialize policy for structured records.
///
/// The record pattern and the codec are independent, replaceable
/// policies: the pattern is a cheap prefix test deciding *whether* to
/// decode, the codec decides *how*. A custom implementation can enforce a
/// stricter grammar or decode into a concrete type instead of a generic
/// value tree.
pub trait RecordCodec {
    /// Decoded representation of one structured record.
    type Value: Send + 'static;

    /// Decode one raw record (delimiter already stripped).
    fn decode(raw: &str) -> Result<Self::Value>;

    /// Serialize a value to its single-record text representation,
    /// without the delimiter. The output must not contain the delimiter
    /// sequence, or the peer will split it into multiple records.
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String>;
}
