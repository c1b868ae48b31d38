//! Declarative schema nodes for sealable entity types.
//!
//! Nothing in here touches instances or stores. The runtime registry in
//! `seal-core` consumes these definitions, validates them, and builds the
//! runtime types that carry accessor tables.

pub mod error;
pub mod node;
pub mod types;
pub mod validate;

/// Maximum length for entity schema identifiers.
pub const MAX_ENTITY_NAME_LEN: usize = 64;

/// Maximum length for field schema identifiers.
pub const MAX_FIELD_NAME_LEN: usize = 64;

/// Maximum length for app labels.
pub const MAX_APP_LABEL_LEN: usize = 32;

/// Reference that points a relation back at its declaring type.
pub const RECURSIVE_RELATIONSHIP: &str = "self";

/// Related name that suppresses the reverse accessor on the target type.
pub const HIDDEN_RELATED_NAME: &str = "+";

use thiserror::Error as ThisError;

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid definition '{path}': {errors}")]
    Validation {
        path: String,
        errors: error::ErrorTree,
    },
}

impl Error {
    #[must_use]
    pub fn validation(path: &str, errors: error::ErrorTree) -> Self {
        Self::Validation {
            path: path.to_string(),
            errors,
        }
    }
}
