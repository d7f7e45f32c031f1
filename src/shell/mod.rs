//! Shell quoting model.

mod dialect;
mod quoting;
mod words;

pub use dialect::{Dialect, DialectRules, SingleQuoteStyle, UnknownDialect};
pub use quoting::QuotingContext;
