//! shell-mask - secret masking for captured shell output.
//!
//! Secrets injected into a shell script can come back out re-quoted by the
//! shell (`set -x` traces, `printf %q`, echoed assignments). This crate
//! enumerates every rendering a given shell dialect can produce for a
//! secret, compiles them into one matcher and masks a live byte stream
//! with it, including matches split across read boundaries.

pub mod audit;
pub mod binding;
pub mod config;
pub mod masking;
pub mod output;
pub mod shell;

pub use binding::{Secret, SecretBinding};
pub use config::{CompiledConfig, Config};
pub use masking::{Matcher, MaskingFilter};
pub use output::MaskingWriter;
pub use shell::{Dialect, QuotingContext};
