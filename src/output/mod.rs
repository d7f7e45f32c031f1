//! Masked output plumbing.

mod writer;

pub use writer::{MaskingWriter, pump};
