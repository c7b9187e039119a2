//! Record pattern - the structured-vs-plain test applied to each record.

use std::fmt;

/// Predicate deciding whether a raw record should be decoded as
/// structured data.
///
/// The default is deliberately a loose, fast prefix test rather than a
/// grammar check: it only has to avoid paying full-parse cost on records
/// that are obviously not structured. Exactness belongs to the decode
/// step, whose failure path is non-fatal.
pub struct RecordPattern {
    matcher: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl RecordPattern {
    /// Default pattern: ignoring leading whitespace, the record begins
    /// with an opening brace.
    pub fn braced() -> Self {
        Self::custom(|record| record.trim_start().starts_with('{'))
    }

    /// Build a pattern from an arbitrary predicate.
    ///
    /// # Example
    ///
    /// ```
    /// use linewire::framing::RecordPattern;
    ///
    /// // Stricter policy: objects must start in column zero.
    /// let pattern = RecordPattern::custom(|r| r.starts_with('{'));
    /// assert!(pattern.matches("{\"a\":1}"));
    /// assert!(!pattern.matches("  {\"a\":1}"));
    /// ```
    pub fn custom<F>(matcher: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            matcher: Box::new(matcher),
        }
    }

    /// Test one record.
    #[inline]
    pub fn matches(&self, record: &str) -> bool {
        (self.matcher)(record)
    }
}

impl Default for RecordPattern {
    fn default() -> Self {
        Self::braced()
    }
}

impl fmt::Debug for RecordPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RecordPattern(..)")
    }
}
