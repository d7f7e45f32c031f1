//! Configuration loading and merging.

use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::binding::{BindingError, SecretBinding};
use crate::masking::{DEFAULT_MARKER, MaskingFilter, PatternError};
use crate::shell::{Dialect, UnknownDialect};

/// Read size used when no `chunk_size` is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid dialect for '{context}': {source}")]
    Dialect {
        context: String,
        #[source]
        source: UnknownDialect,
    },

    #[error("redaction marker must not be empty")]
    EmptyMarker,

    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Default dialect for every secret.
    pub dialect: Option<String>,

    /// Text written in place of a detected secret.
    pub marker: Option<String>,

    /// Read size used when piping.
    pub chunk_size: Option<usize>,

    /// Secrets to bind from the environment.
    pub secrets: Vec<SecretSource>,

    /// Audit logging settings.
    pub audit: AuditConfig,
}

/// A secret read from an environment variable.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretSource {
    /// Environment variable holding the value.
    pub env: String,
    /// Dialect override for this secret.
    #[serde(default)]
    pub dialect: Option<String>,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuditConfig {
    /// Enable audit logging.
    pub enabled: bool,
    /// Path to audit log file.
    pub path: Option<String>,
}

/// Validated configuration with parsed dialects.
#[derive(Debug)]
pub struct CompiledConfig {
    /// The raw config.
    pub raw: Config,
    /// Default dialect.
    pub dialect: Dialect,
    /// Redaction marker bytes.
    pub marker: Vec<u8>,
    /// Read size used when piping.
    pub chunk_size: usize,
    /// Secret sources with their resolved dialect.
    pub secrets: Vec<(SecretSource, Dialect)>,
}

impl Config {
    /// Load configuration, merging user and project configs.
    pub fn load(cwd: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config()? {
            config = user_config;
        }

        if let Some(cwd) = cwd
            && let Some(project_config) = Self::load_project_config(cwd)?
        {
            config.merge(project_config);
        }

        Ok(config)
    }

    /// Parse a config from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn load_user_config() -> Result<Option<Self>, ConfigError> {
        match Self::user_config_path() {
            Some(path) if path.exists() => Ok(Some(Self::parse(&fs::read_to_string(&path)?)?)),
            _ => Ok(None),
        }
    }

    /// Load project-level config from `.shell-mask.toml`.
    pub fn load_project_config(cwd: &Path) -> Result<Option<Self>, ConfigError> {
        let path = cwd.join(".shell-mask.toml");
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            return Ok(Some(Self::parse(&content)?));
        }
        Ok(None)
    }

    /// Get user config path.
    /// Respects SHELL_MASK_CONFIG env var for testing.
    fn user_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SHELL_MASK_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|h| h.join(".shell-mask.toml"))
    }

    /// Merge another config into this one (other takes precedence for scalars).
    pub fn merge(&mut self, other: Config) {
        self.secrets.extend(other.secrets);

        if other.dialect.is_some() {
            self.dialect = other.dialect;
        }
        if other.marker.is_some() {
            self.marker = other.marker;
        }
        if other.chunk_size.is_some() {
            self.chunk_size = other.chunk_size;
        }
        if other.audit.enabled {
            self.audit.enabled = true;
            if other.audit.path.is_some() {
                self.audit.path = other.audit.path;
            }
        }
    }

    /// Validate dialects and scalars.
    pub fn compile(self) -> Result<CompiledConfig, ConfigError> {
        let dialect = match &self.dialect {
            Some(id) => parse_dialect(id, "dialect")?,
            None => Dialect::default(),
        };

        let marker = match &self.marker {
            Some(m) if m.is_empty() => return Err(ConfigError::EmptyMarker),
            Some(m) => m.as_bytes().to_vec(),
            None => DEFAULT_MARKER.to_vec(),
        };

        let chunk_size = match self.chunk_size {
            Some(0) => return Err(ConfigError::ZeroChunkSize),
            Some(n) => n,
            None => DEFAULT_CHUNK_SIZE,
        };

        let secrets = self
            .secrets
            .iter()
            .map(|source| {
                let resolved = match &source.dialect {
                    Some(id) => parse_dialect(id, &source.env)?,
                    None => dialect,
                };
                Ok((source.clone(), resolved))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(CompiledConfig {
            raw: self,
            dialect,
            marker,
            chunk_size,
            secrets,
        })
    }
}

fn parse_dialect(id: &str, context: &str) -> Result<Dialect, ConfigError> {
    id.parse().map_err(|source| ConfigError::Dialect {
        context: context.to_string(),
        source,
    })
}

impl CompiledConfig {
    /// Bind every configured secret, failing on the first missing one.
    pub fn resolve_bindings(
        &self,
        lookup: impl Fn(&str) -> Option<OsString>,
    ) -> Result<Vec<SecretBinding>, BindingError> {
        self.secrets
            .iter()
            .map(|(source, dialect)| SecretBinding::from_env(&source.env, *dialect, &lookup))
            .collect()
    }

    /// Build a filter with the configured marker and `bindings` registered.
    pub fn build_filter(&self, bindings: &[SecretBinding]) -> Result<MaskingFilter, PatternError> {
        let mut filter = MaskingFilter::with_marker(self.marker.clone());
        for binding in bindings {
            filter.register_binding(binding)?;
        }
        Ok(filter)
    }
}
