use crate::seal::UnsealedAttributeAccess;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Sealing violations are not internal errors; see [`AccessError`].
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct an instance-origin unsupported error.
    pub(crate) fn instance_unsupported(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::Unsupported,
            ErrorOrigin::Instance,
            message.into(),
        )
    }

    /// Construct an accessor-origin invariant violation.
    pub(crate) fn accessor_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Accessor,
            message.into(),
        )
    }

    /// Attribute name that resolves to nothing on the given type.
    pub fn unknown_attribute(entity: &str, name: &str) -> Self {
        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Instance,
            format!("'{entity}' has no attribute '{name}'"),
        )
    }

    /// Relation target that has not been defined (or was dropped).
    pub fn unresolved_target(path: &str) -> Self {
        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Registry,
            format!("related type '{path}' is not defined"),
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// AccessError
///
/// Outcome of an attribute read that did not produce a value: either a
/// sealing violation or an ordinary runtime failure.
///

#[derive(Debug, ThisError)]
pub enum AccessError {
    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error(transparent)]
    Unsealed(#[from] UnsealedAttributeAccess),
}

impl AccessError {
    #[must_use]
    pub const fn as_unsealed(&self) -> Option<&UnsealedAttributeAccess> {
        match self {
            Self::Unsealed(v) => Some(v),
            Self::Internal(_) => None,
        }
    }

    #[must_use]
    pub const fn is_unsealed(&self) -> bool {
        matches!(self, Self::Unsealed(_))
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    NotFound,
    Internal,
    Conflict,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Conflict => "conflict",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Accessor,
    Config,
    Instance,
    Registry,
    Schema,
    Store,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Accessor => "accessor",
            Self::Config => "config",
            Self::Instance => "instance",
            Self::Registry => "registry",
            Self::Schema => "schema",
            Self::Store => "store",
        };
        write!(f, "{label}")
    }
}
