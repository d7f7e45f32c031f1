//! Secret values and their binding to a name and dialect.

use std::ffi::OsString;
use std::fmt;
use thiserror::Error;

use crate::masking::{Matcher, PatternError};
use crate::shell::Dialect;

/// Errors that can occur when binding secrets from the environment.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("secret variable '{0}' is not set")]
    MissingVariable(String),

    #[error("secret variable '{0}' is empty")]
    EmptyVariable(String),
}

/// An opaque, non-empty secret value.
///
/// The bytes are only reachable through [`Secret::as_bytes`]; `Debug` never
/// prints them.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, PatternError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(PatternError::EmptySecret);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// A secret together with the name it was bound under and its dialect.
#[derive(Debug, Clone)]
pub struct SecretBinding {
    /// Binding name (the environment variable), safe to log.
    pub name: String,
    pub secret: Secret,
    pub dialect: Dialect,
}

impl SecretBinding {
    pub fn new(name: impl Into<String>, secret: Secret, dialect: Dialect) -> Self {
        Self {
            name: name.into(),
            secret,
            dialect,
        }
    }

    /// Bind the value of environment variable `name`, looked up via `lookup`.
    pub fn from_env(
        name: &str,
        dialect: Dialect,
        lookup: impl Fn(&str) -> Option<OsString>,
    ) -> Result<Self, BindingError> {
        let value = lookup(name).ok_or_else(|| BindingError::MissingVariable(name.to_string()))?;
        let secret = Secret::new(os_bytes(value))
            .map_err(|_| BindingError::EmptyVariable(name.to_string()))?;
        Ok(Self::new(name, secret, dialect))
    }

    pub fn matcher(&self) -> Result<Matcher, PatternError> {
        Matcher::compile(self.secret.as_bytes(), self.dialect)
    }
}

#[cfg(unix)]
fn os_bytes(value: OsString) -> Vec<u8> {
    use std::os::unix::ffi::OsStringExt;
    value.into_vec()
}

#[cfg(not(unix))]
fn os_bytes(value: OsString) -> Vec<u8> {
    value.to_string_lossy().into_owned().into_bytes()
}
