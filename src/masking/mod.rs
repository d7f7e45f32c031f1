//! Secret matchers and the masking stream filter.

mod filter;
mod pattern;

pub use filter::{BindingStats, DEFAULT_MARKER, FilterError, FilterState, MaskingFilter};
pub use pattern::{Matcher, PatternError, Span};
