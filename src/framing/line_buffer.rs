//! Line buffer for accumulating partial records across chunk boundaries.
//!
//! Chunks of text arrive in whatever sizes the stream delivers; records
//! leave bounded by the configured delimiter. The trailing undelimited
//! fragment is carried over to the next push, so a record split across
//! any number of chunks reassembles exactly.
//!
//! # Example
//!
//! ```
//! use linewire::framing::LineBuffer;
//!
//! let mut buffer = LineBuffer::new();
//!
//! let records = buffer.push("{\"a\":1}\n{\"b\"");
//! assert_eq!(records, vec!["{\"a\":1}".to_string()]);
//! assert_eq!(buffer.pending(), "{\"b\"");
//!
//! let records = buffer.push(":2}\n");
//! assert_eq!(records, vec!["{\"b\":2}".to_string()]);
//! assert!(buffer.is_empty());
//! ```

use std::mem;

/// Default maximum buffered-record length, in characters.
pub const DEFAULT_MAX_RECORD_LEN: usize = 1024 * 1024;

/// Default record delimiter: the platform newline.
#[cfg(windows)]
pub const DEFAULT_DELIMITER: &str = "\r\n";
/// Default record delimiter: the platform newline.
#[cfg(not(windows))]
pub const DEFAULT_DELIMITER: &str = "\n";

/// Buffer for accumulating incoming text and extracting complete records.
///
/// Splitting is an exact match on the configured delimiter sequence, not
/// a general whitespace rule. The buffer never grows past
/// `max_record_len` characters: when an undelimited run exceeds the
/// limit, the oldest characters are discarded and the most recent kept.
/// Streams that overwrite a line in place with carriage returns and never
/// send a delimiter would otherwise grow the buffer without bound, and
/// the tail is the part that still means something.
pub struct LineBuffer {
    /// Undelimited tail carried across pushes.
    pending: String,
    /// Literal separator marking record boundaries. Never empty.
    delimiter: String,
    /// Upper bound on the buffered concatenation, in characters.
    max_record_len: usize,
}

impl LineBuffer {
    /// Create a line buffer with the platform delimiter and default
    /// length limit.
    pub fn new() -> Self {
        Self::with_delimiter(DEFAULT_DELIMITER)
    }

    /// Create a line buffer with a custom delimiter.
    ///
    /// # Panics
    ///
    /// Panics if `delimiter` is empty.
    pub fn with_delimiter(delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        assert!(!delimiter.is_empty(), "delimiter must be non-empty");
        Self {
            pending: String::new(),
            delimiter,
            max_record_len: DEFAULT_MAX_RECORD_LEN,
        }
    }

    /// Push a chunk into the buffer and extract all complete records.
    ///
    /// This is the main API for processing incoming stream data. The
    /// chunk is appended to any carried-over partial record, the
    /// concatenation is clamped to the length limit, and every
    /// delimiter-terminated record is returned in order. The final,
    /// delimiter-incomplete fragment (possibly empty) becomes the new
    /// pending buffer.
    ///
    /// An empty chunk returns no records. A chunk equal to the delimiter
    /// yields one empty record; N consecutive delimiters yield N empty
    /// records. Whether empty records are surfaced downstream is the
    /// classifier's whitespace policy, not this buffer's concern.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);
        self.clamp();

        if !self.pending.contains(self.delimiter.as_str()) {
            return Vec::new();
        }

        let data = mem::take(&mut self.pending);
        let mut parts: Vec<&str> = data.split(self.delimiter.as_str()).collect();
        let tail = parts.pop().expect("split yields at least one element");
        self.pending = tail.to_owned();

        parts.into_iter().map(str::to_owned).collect()
    }

    /// Clamp the pending buffer to `max_record_len` characters, keeping
    /// the most recent ones. The cut always lands on a `char` boundary,
    /// so a multi-byte character at the truncation point is dropped
    /// whole, never split.
    fn clamp(&mut self) {
        // Byte length bounds character count from above, so a buffer
        // within the limit in bytes needs no counting pass.
        if self.pending.len() <= self.max_record_len {
            return;
        }

        let total = self.pending.chars().count();
        if total <= self.max_record_len {
            return;
        }

        let excess = total - self.max_record_len;
        match self.pending.char_indices().nth(excess) {
            Some((cut, _)) => {
                self.pending.drain(..cut);
            }
            None => self.pending.clear(),
        }
    }

    /// The delimiter currently in effect.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Replace the delimiter.
    ///
    /// Takes effect from the next `push`; a carried-over partial record
    /// is re-split under the new delimiter at that point.
    ///
    /// # Panics
    ///
    /// Panics if `delimiter` is empty.
    pub fn set_delimiter(&mut self, delimiter: impl Into<String>) {
        let delimiter = delimiter.into();
        assert!(!delimiter.is_empty(), "delimiter must be non-empty");
        self.delimiter = delimiter;
    }

    /// The maximum buffered length, in characters.
    pub fn max_record_len(&self) -> usize {
        self.max_record_len
    }

    /// Replace the maximum buffered length. Applied on the next `push`.
    pub fn set_max_record_len(&mut self, max_record_len: usize) {
        self.max_record_len = max_record_len;
    }

    /// The carried-over partial record.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Discard any buffered partial record.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
