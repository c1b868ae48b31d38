use derive_more::Display;
use seal_core::{
    AccessError, InternalError,
    check::Diagnostic,
    config::ConfigError,
    error::{ErrorClass, ErrorOrigin as CoreErrorOrigin},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_unsealed(&self) -> bool {
        matches!(self.kind, ErrorKind::Unsealed)
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match err.class {
            ErrorClass::NotFound => ErrorKind::NotFound,
            ErrorClass::Conflict => ErrorKind::Conflict,
            ErrorClass::Unsupported => ErrorKind::Unsupported,
            ErrorClass::InvariantViolation => ErrorKind::Invalid,
            ErrorClass::Internal => ErrorKind::Internal,
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

impl From<AccessError> for Error {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Internal(err) => err.into(),
            AccessError::Unsealed(err) => {
                Self::new(ErrorKind::Unsealed, ErrorOrigin::Seal, err.to_string())
            }
        }
    }
}

impl From<Diagnostic> for Error {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::new(
            ErrorKind::Configuration,
            ErrorOrigin::Seal,
            diagnostic.to_string(),
        )
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        InternalError::from(err).into()
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// A sealed instance tried to load data.
    Unsealed,

    /// Startup misconfiguration: a failed check or `make_sealable` call.
    Configuration,

    NotFound,
    Conflict,
    Unsupported,

    /// Definition or input breaks an invariant.
    Invalid,

    /// The caller cannot remediate this.
    Internal,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Accessor,
    Config,
    Instance,
    Registry,
    Schema,
    Seal,
    Store,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Accessor => Self::Accessor,
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::Instance => Self::Instance,
            CoreErrorOrigin::Registry => Self::Registry,
            CoreErrorOrigin::Schema => Self::Schema,
            CoreErrorOrigin::Store => Self::Store,
        }
    }
}
