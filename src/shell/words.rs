//! Shell word decoding (shlex-like), the inverse of [`Dialect::encode`].
//!
//! [`Dialect::encode`]: super::Dialect::encode

use super::dialect::Dialect;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

impl Dialect {
    /// Interpret `input` as one shell word and return its literal bytes.
    ///
    /// Blanks outside quotes are kept, so a raw value containing spaces
    /// decodes to itself. Unterminated quotes keep their content.
    pub fn decode_word(self, input: &[u8]) -> Vec<u8> {
        let mut words = self.scan(input, false);
        words.pop().unwrap_or_default()
    }

    /// Split a traced command line into decoded words.
    pub fn split_words(self, input: &[u8]) -> Vec<Vec<u8>> {
        self.scan(input, true)
    }

    fn scan(self, input: &[u8], split_on_blank: bool) -> Vec<Vec<u8>> {
        let escape = self.rules().escape;
        let doubled_quotes = self == Dialect::PowerShell;

        let mut words = Vec::new();
        let mut current = Vec::new();
        let mut started = false;
        let mut quote = Quote::None;
        let mut bytes = input.iter().copied().peekable();

        while let Some(b) = bytes.next() {
            match quote {
                Quote::Single => {
                    if b != b'\'' {
                        current.push(b);
                    } else if doubled_quotes && bytes.peek() == Some(&b'\'') {
                        bytes.next();
                        current.push(b'\'');
                    } else {
                        quote = Quote::None;
                    }
                }
                Quote::Double => {
                    if b == escape {
                        match bytes.peek().copied() {
                            // Line continuation.
                            Some(b'\n') => {
                                bytes.next();
                            }
                            Some(next) if doubled_quotes || self.is_special_double_quoted(next) => {
                                bytes.next();
                                current.push(next);
                            }
                            _ => current.push(b),
                        }
                    } else if b == b'"' {
                        if doubled_quotes && bytes.peek() == Some(&b'"') {
                            bytes.next();
                            current.push(b'"');
                        } else {
                            quote = Quote::None;
                        }
                    } else {
                        current.push(b);
                    }
                }
                Quote::None => {
                    if b == escape {
                        started = true;
                        match bytes.next() {
                            Some(b'\n') => {}
                            Some(next) => current.push(next),
                            None => current.push(b),
                        }
                    } else if b == b'\'' {
                        started = true;
                        quote = Quote::Single;
                    } else if b == b'"' {
                        started = true;
                        quote = Quote::Double;
                    } else if split_on_blank && matches!(b, b' ' | b'\t' | b'\n') {
                        if started {
                            words.push(std::mem::take(&mut current));
                            started = false;
                        }
                    } else {
                        started = true;
                        current.push(b);
                    }
                }
            }
        }

        if started || !split_on_blank {
            words.push(current);
        }
        words
    }
}
