//! Incremental masking of a live output stream.
//!
//! ```text
//!   Idle ──feed──▶ Holding ──feed──▶ Idle | Holding
//!     │               │
//!     └────finish─────┴──▶ Closed
//! ```
//!
//! Each call to [`MaskingFilter::feed`] scans the held suffix plus the new
//! chunk, emits everything that can no longer become part of a match and
//! keeps the shortest tail that is still a strict prefix of some active
//! variant. That tail is bounded by the longest variant minus one byte.

use regex::bytes::Regex;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace};

use super::pattern::{Matcher, PatternError, build_alternation, order_variants};
use crate::binding::SecretBinding;
use crate::shell::Dialect;

/// Marker written in place of every detected secret.
pub const DEFAULT_MARKER: &[u8] = b"****";

/// Errors returned by stream operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("masking filter is closed")]
    Closed,
}

/// Observable state of the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// No pending bytes.
    Idle,
    /// A tail is held back because it could still complete a match.
    Holding,
    /// End of input was signalled; no further input is accepted.
    Closed,
}

/// Match count for one registered binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingStats {
    pub name: String,
    pub dialect: Dialect,
    pub masked: usize,
}

struct ActiveMatcher {
    matcher: Arc<Matcher>,
    stats: BindingStats,
}

/// Stateful masking transform over a byte stream.
pub struct MaskingFilter {
    marker: Vec<u8>,
    active: Vec<ActiveMatcher>,
    retired: Vec<BindingStats>,
    /// Union of all active variants, longest first.
    variants: Vec<Vec<u8>>,
    combined: Option<Regex>,
    held: Vec<u8>,
    closed: bool,
}

impl Default for MaskingFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskingFilter {
    /// Create a filter using [`DEFAULT_MARKER`].
    pub fn new() -> Self {
        Self::with_marker(DEFAULT_MARKER)
    }

    /// Create a filter that writes `marker` in place of every match.
    pub fn with_marker(marker: impl Into<Vec<u8>>) -> Self {
        Self {
            marker: marker.into(),
            active: Vec::new(),
            retired: Vec::new(),
            variants: Vec::new(),
            combined: None,
            held: Vec::new(),
            closed: false,
        }
    }

    pub fn marker(&self) -> &[u8] {
        &self.marker
    }

    /// Activate `matcher` under `name`, replacing a previous matcher with
    /// the same name. Bytes already emitted are not rescanned.
    pub fn register(&mut self, name: impl Into<String>, matcher: Matcher) -> Result<(), PatternError> {
        let name = name.into();
        let matcher = Arc::new(matcher);

        let mut variants = self.variants_without(&name);
        variants.extend(matcher.variants().iter().cloned());
        let variants = order_variants(variants);
        let combined = build_alternation(&variants)?;

        debug!(
            binding = %name,
            dialect = %matcher.dialect(),
            variants = matcher.variants().len(),
            "registered secret"
        );

        let previous = self.active.iter().position(|a| a.stats.name == name);
        let stats = BindingStats {
            name,
            dialect: matcher.dialect(),
            masked: 0,
        };
        let entry = ActiveMatcher { matcher, stats };
        match previous {
            Some(i) => {
                let old = std::mem::replace(&mut self.active[i], entry);
                self.retired.push(old.stats);
            }
            None => self.active.push(entry),
        }
        self.variants = variants;
        self.combined = Some(combined);
        Ok(())
    }

    /// Compile and activate a matcher for `secret`.
    pub fn register_secret(
        &mut self,
        name: impl Into<String>,
        secret: &[u8],
        dialect: Dialect,
    ) -> Result<(), PatternError> {
        let matcher = Matcher::compile(secret, dialect)?;
        self.register(name, matcher)
    }

    /// Activate a bound secret under its binding name.
    pub fn register_binding(&mut self, binding: &SecretBinding) -> Result<(), PatternError> {
        self.register(binding.name.clone(), binding.matcher()?)
    }

    /// End the binding scope of `name`. Returns whether it was active.
    pub fn deregister(&mut self, name: &str) -> Result<bool, PatternError> {
        let Some(i) = self.active.iter().position(|a| a.stats.name == name) else {
            return Ok(false);
        };
        let variants = order_variants(self.variants_without(name));
        let combined = if variants.is_empty() {
            None
        } else {
            Some(build_alternation(&variants)?)
        };

        let removed = self.active.remove(i);
        debug!(binding = %name, masked = removed.stats.masked, "deregistered secret");
        self.retired.push(removed.stats);
        self.variants = variants;
        self.combined = combined;
        Ok(true)
    }

    /// Mask one chunk of output.
    ///
    /// The returned bytes may be shorter than the input when a tail is held
    /// back; they are released by a later call or by [`finish`](Self::finish).
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<u8>, FilterError> {
        if self.closed {
            return Err(FilterError::Closed);
        }
        let mut buf = std::mem::take(&mut self.held);
        buf.extend_from_slice(chunk);

        let Some(regex) = self.combined.clone() else {
            return Ok(buf);
        };

        let mut out = Vec::with_capacity(buf.len());
        let mut pos = 0;
        let mut hold = partial_start(&self.variants, &buf, 0);
        loop {
            if hold < pos {
                hold = partial_start(&self.variants, &buf, pos);
            }
            match regex.find_at(&buf, pos) {
                Some(m) if m.start() < hold => {
                    out.extend_from_slice(&buf[pos..m.start()]);
                    out.extend_from_slice(&self.marker);
                    self.record(&buf[m.range()]);
                    pos = m.end();
                }
                _ => {
                    out.extend_from_slice(&buf[pos..hold]);
                    break;
                }
            }
        }
        self.held = buf.split_off(hold);

        trace!(
            input = chunk.len(),
            output = out.len(),
            held = self.held.len(),
            "masked chunk"
        );
        Ok(out)
    }

    /// Signal end of input and release the held tail.
    ///
    /// Nothing can extend the tail any more, so complete matches inside it
    /// are still masked; incomplete prefixes pass through verbatim.
    pub fn finish(&mut self) -> Result<Vec<u8>, FilterError> {
        if self.closed {
            return Err(FilterError::Closed);
        }
        self.closed = true;
        let held = std::mem::take(&mut self.held);

        let out = match self.combined.clone() {
            Some(regex) => {
                let mut out = Vec::with_capacity(held.len());
                let mut last = 0;
                for m in regex.find_iter(&held) {
                    out.extend_from_slice(&held[last..m.start()]);
                    out.extend_from_slice(&self.marker);
                    self.record(&held[m.range()]);
                    last = m.end();
                }
                out.extend_from_slice(&held[last..]);
                out
            }
            None => held,
        };

        let total: usize = self.stats().iter().map(|s| s.masked).sum();
        info!(secrets = self.active.len(), masked = total, "masking stream closed");
        Ok(out)
    }

    pub fn state(&self) -> FilterState {
        if self.closed {
            FilterState::Closed
        } else if self.held.is_empty() {
            FilterState::Idle
        } else {
            FilterState::Holding
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of bytes currently held back.
    pub fn held_len(&self) -> usize {
        self.held.len()
    }

    /// Number of active bindings.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Longest variant across all active matchers.
    pub fn max_variant_len(&self) -> usize {
        self.variants.first().map_or(0, Vec::len)
    }

    /// Match counts for retired bindings followed by active ones.
    pub fn stats(&self) -> Vec<BindingStats> {
        self.retired
            .iter()
            .cloned()
            .chain(self.active.iter().map(|a| a.stats.clone()))
            .collect()
    }

    fn variants_without(&self, name: &str) -> Vec<Vec<u8>> {
        self.active
            .iter()
            .filter(|a| a.stats.name != name)
            .flat_map(|a| a.matcher.variants().iter().cloned())
            .collect()
    }

    /// Attribute a match to the first binding owning that exact variant.
    fn record(&mut self, matched: &[u8]) {
        if let Some(entry) = self
            .active
            .iter_mut()
            .find(|a| a.matcher.variants().iter().any(|v| v == matched))
        {
            entry.stats.masked += 1;
        }
    }
}

/// Earliest index `i >= from` such that `buf[i..]` is a strict prefix of
/// some variant, or `buf.len()` when no tail can still grow into a match.
fn partial_start(variants: &[Vec<u8>], buf: &[u8], from: usize) -> usize {
    let max_len = variants.first().map_or(0, Vec::len);
    let lower = from.max(buf.len().saturating_sub(max_len.saturating_sub(1)));
    (lower..buf.len())
        .find(|&i| {
            let tail = &buf[i..];
            variants
                .iter()
                .any(|v| v.len() > tail.len() && v.starts_with(tail))
        })
        .unwrap_or(buf.len())
}
