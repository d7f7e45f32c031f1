//! Compiling a secret's encoded variants into one byte matcher.

use regex::bytes::{Regex, RegexBuilder};
use std::fmt;
use std::fmt::Write as _;
use std::ops::Range;
use thiserror::Error;

use crate::shell::Dialect;

/// Errors that can occur when compiling a matcher.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("secret must not be empty")]
    EmptySecret,

    #[error("failed to compile secret matcher: {0}")]
    Regex(#[from] regex::Error),
}

/// A match of one full variant inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

impl From<regex::bytes::Match<'_>> for Span {
    fn from(m: regex::bytes::Match<'_>) -> Self {
        Self {
            start: m.start(),
            len: m.len(),
        }
    }
}

/// Recognizer for every rendering of one secret.
///
/// Immutable once compiled; scanning carries no state between calls.
#[derive(Clone)]
pub struct Matcher {
    dialect: Dialect,
    variants: Vec<Vec<u8>>,
    regex: Regex,
}

impl Matcher {
    /// Compile the matcher for `secret` as rendered by `dialect`.
    pub fn compile(secret: &[u8], dialect: Dialect) -> Result<Self, PatternError> {
        if secret.is_empty() {
            return Err(PatternError::EmptySecret);
        }
        let variants = order_variants(dialect.enumerate_variants(secret));
        let regex = build_alternation(&variants)?;
        Ok(Self {
            dialect,
            variants,
            regex,
        })
    }

    /// All non-overlapping matches, left to right, longest variant first at
    /// each position.
    pub fn scan(&self, buffer: &[u8]) -> Vec<Span> {
        self.regex.find_iter(buffer).map(Span::from).collect()
    }

    /// Replace every match in a complete buffer with `marker`.
    pub fn redact(&self, buffer: &[u8], marker: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(buffer.len());
        let mut last = 0;
        for span in self.scan(buffer) {
            out.extend_from_slice(&buffer[last..span.start]);
            out.extend_from_slice(marker);
            last = span.end();
        }
        out.extend_from_slice(&buffer[last..]);
        out
    }

    /// Deduplicated variants, longest first.
    pub fn variants(&self) -> &[Vec<u8>] {
        &self.variants
    }

    pub fn max_variant_len(&self) -> usize {
        self.variants.first().map_or(0, Vec::len)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("dialect", &self.dialect)
            .field("variants", &self.variants.len())
            .finish_non_exhaustive()
    }
}

/// Drop duplicates (first occurrence wins) and sort longest first.
///
/// The sort is stable, so equal-length variants keep enumeration order.
pub(crate) fn order_variants(variants: impl IntoIterator<Item = Vec<u8>>) -> Vec<Vec<u8>> {
    let mut ordered: Vec<Vec<u8>> = Vec::new();
    for variant in variants {
        if !variant.is_empty() && !ordered.contains(&variant) {
            ordered.push(variant);
        }
    }
    ordered.sort_by_key(|v| std::cmp::Reverse(v.len()));
    ordered
}

/// Build a leftmost-first alternation of literal byte strings.
///
/// Alternatives are tried in order at the leftmost matching position, so
/// passing variants longest first makes the longest one win.
pub(crate) fn build_alternation(variants: &[Vec<u8>]) -> Result<Regex, regex::Error> {
    let mut pattern = String::new();
    for (i, variant) in variants.iter().enumerate() {
        if i > 0 {
            pattern.push('|');
        }
        for &b in variant {
            if b.is_ascii_alphanumeric() {
                pattern.push(char::from(b));
            } else {
                let _ = write!(pattern, r"\x{b:02X}");
            }
        }
    }
    RegexBuilder::new(&pattern).unicode(false).build()
}
