//! Sealer configuration, read from TOML.
//!
//! ```toml
//! violation = "warn"
//!
//! [checks]
//! silenced = ["seal.E001"]
//! ```

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    seal::ViolationMode,
};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::Read { .. } => ErrorClass::NotFound,
            Self::Parse(_) => ErrorClass::InvariantViolation,
        }
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(err.class(), ErrorOrigin::Config, err.to_string())
    }
}

///
/// SealConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SealConfig {
    pub violation: ViolationMode,
    pub checks: CheckConfig,
}

impl SealConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    #[must_use]
    pub const fn with_violation(mut self, violation: ViolationMode) -> Self {
        self.violation = violation;
        self
    }
}

///
/// CheckConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Diagnostic ids left out of check output.
    pub silenced: Vec<String>,
}

impl CheckConfig {
    #[must_use]
    pub fn is_silenced(&self, id: &str) -> bool {
        self.silenced.iter().any(|s| s == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_is_default() {
        let config = SealConfig::from_toml_str("").expect("empty config should parse");

        assert_eq!(config, SealConfig::default());
        assert_eq!(config.violation, ViolationMode::Error);
    }

    #[test]
    fn reads_mode_and_silenced_checks() {
        let config = SealConfig::from_toml_str(
            r#"
            violation = "warn"

            [checks]
            silenced = ["seal.E001"]
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.violation, ViolationMode::Warn);
        assert!(config.checks.is_silenced("seal.E001"));
        assert!(!config.checks.is_silenced("seal.E002"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = SealConfig::from_toml_str("strict = true").expect_err("unknown key");

        let internal = InternalError::from(err);
        assert_eq!(internal.class, ErrorClass::InvariantViolation);
        assert_eq!(internal.origin, ErrorOrigin::Config);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(SealConfig::from_toml_str(r#"violation = "ignore""#).is_err());
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = SealConfig::load("/nonexistent/seal.toml").expect_err("file is missing");

        assert!(matches!(err, ConfigError::Read { .. }));
        assert_eq!(InternalError::from(err).class, ErrorClass::NotFound);
    }
}
