//! Rendering a secret the way a shell re-emits it.
//!
//! When a script echoes `$SECRET` under `set -x`, the trace line carries the
//! value re-quoted by the shell, e.g. `+ echo 'ab'"'"'cd'` for `ab'cd` under
//! dash. Every rendering here is one deterministic transform of the whole
//! secret; embedded quotes are rewritten positionally, so N quotes still
//! produce a single variant per context.

use super::dialect::{Dialect, SingleQuoteStyle};

/// The quoting context a secret is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuotingContext {
    /// The literal bytes, as printed by the command itself.
    Raw,
    /// Wrapped in single quotes.
    SingleQuoted,
    /// Wrapped in double quotes with the dialect's escapes.
    DoubleQuoted,
    /// A bare word with every special byte escaped.
    Unquoted,
    /// Part of a larger single-quoted string, e.g. `'x=ab'"'"'cd y'`.
    EmbeddedSingleQuoted,
    /// Part of a larger double-quoted string.
    EmbeddedDoubleQuoted,
}

impl QuotingContext {
    /// Contexts in enumeration order.
    pub const ALL: [QuotingContext; 6] = [
        QuotingContext::Raw,
        QuotingContext::SingleQuoted,
        QuotingContext::DoubleQuoted,
        QuotingContext::Unquoted,
        QuotingContext::EmbeddedSingleQuoted,
        QuotingContext::EmbeddedDoubleQuoted,
    ];
}

impl Dialect {
    /// Every byte sequence this dialect could emit for `secret`.
    ///
    /// The raw bytes always come first. A secret without any byte that is
    /// special in a bare word is never re-quoted, so it yields only itself.
    /// The result may contain duplicates; the pattern factory removes them.
    pub fn enumerate_variants(self, secret: &[u8]) -> Vec<Vec<u8>> {
        if !self.needs_quoting(secret) {
            return vec![secret.to_vec()];
        }
        QuotingContext::ALL
            .iter()
            .map(|&context| self.encode(secret, context))
            .collect()
    }

    /// Render `secret` in one quoting context.
    pub fn encode(self, secret: &[u8], context: QuotingContext) -> Vec<u8> {
        match context {
            QuotingContext::Raw => secret.to_vec(),
            QuotingContext::SingleQuoted => self.single_quote(secret),
            QuotingContext::DoubleQuoted => self.double_quote(secret),
            QuotingContext::Unquoted => self.escape_unquoted(secret),
            QuotingContext::EmbeddedSingleQuoted => self.single_quote_inner(secret),
            QuotingContext::EmbeddedDoubleQuoted => self.double_quote_inner(secret),
        }
    }

    /// The secret wrapped in single quotes as a unit.
    ///
    /// For the POSIX family a quote at the first or last byte would leave an
    /// empty `''` segment at that end; the shell omits it, so do we.
    fn single_quote(self, secret: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(secret.len() + 8);
        out.push(b'\'');
        out.extend(self.single_quote_inner(secret));
        out.push(b'\'');

        if self.rules().single_quote == SingleQuoteStyle::Doubled {
            return out;
        }
        if secret.last() == Some(&b'\'') {
            out.truncate(out.len() - 2);
        }
        if secret.first() == Some(&b'\'') {
            out.drain(..2);
        }
        out
    }

    /// The secret's bytes as they appear between the quotes of a larger
    /// single-quoted string.
    fn single_quote_inner(self, secret: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(secret.len() + 8);
        match self.rules().single_quote {
            // ash/dash close the quote and emit a whole run of quotes
            // double-quoted: `'` -> `'"'"'`, `''` -> `'"''"'`.
            SingleQuoteStyle::DoubleQuotedRun => {
                for run in secret.chunk_by(|a, b| (*a == b'\'') == (*b == b'\'')) {
                    if run[0] == b'\'' {
                        out.extend_from_slice(b"'\"");
                        out.extend_from_slice(run);
                        out.extend_from_slice(b"\"'");
                    } else {
                        out.extend_from_slice(run);
                    }
                }
            }
            SingleQuoteStyle::BackslashEscaped => {
                for &b in secret {
                    if b == b'\'' {
                        out.extend_from_slice(b"'\\''");
                    } else {
                        out.push(b);
                    }
                }
            }
            SingleQuoteStyle::Doubled => {
                for &b in secret {
                    if b == b'\'' {
                        out.push(b'\'');
                    }
                    out.push(b);
                }
            }
        }
        out
    }

    fn double_quote(self, secret: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(secret.len() + 2);
        out.push(b'"');
        out.extend(self.double_quote_inner(secret));
        out.push(b'"');
        out
    }

    fn double_quote_inner(self, secret: &[u8]) -> Vec<u8> {
        let escape = self.rules().escape;
        let mut out = Vec::with_capacity(secret.len() + 4);
        for &b in secret {
            if self.is_special_double_quoted(b) {
                out.push(escape);
            }
            out.push(b);
        }
        out
    }

    fn escape_unquoted(self, secret: &[u8]) -> Vec<u8> {
        let escape = self.rules().escape;
        let mut out = Vec::with_capacity(secret.len() * 2);
        for run in secret.chunk_by(|a, b| (*a == b'\n') == (*b == b'\n')) {
            if run[0] == b'\n' {
                // An escaped newline is a line continuation, so newlines are
                // quoted, a whole run per segment.
                out.push(b'\'');
                out.extend_from_slice(run);
                out.push(b'\'');
                continue;
            }
            for &b in run {
                if self.is_special_unquoted(b) {
                    out.push(escape);
                }
                out.push(b);
            }
        }
        out
    }
}
