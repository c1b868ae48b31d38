//! Persistence boundary.
//!
//! Accessors load through a [`Store`]; the core never assumes anything about
//! how rows are kept. [`MemoryStore`] is the in-process implementation used by
//! tests and embedders without a database.

mod memory;

pub use memory::MemoryStore;

use crate::{
    error::{AccessError, ErrorClass, ErrorOrigin, InternalError},
    model::EntityType,
};
use seal_schema::types::Value;
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error as ThisError;

/// Column name → value, for one stored record.
pub type Row = BTreeMap<String, Value>;

///
/// StoreError
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("no '{entity}' row with key {key}")]
    RowNotFound { entity: String, key: String },

    #[error("'{entity}' has no stored column '{column}'")]
    UnknownColumn { entity: String, column: String },

    #[error("row for '{entity}' is missing its primary key")]
    MissingKey { entity: String },
}

impl StoreError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::RowNotFound { .. } | Self::UnknownColumn { .. } => ErrorClass::NotFound,
            Self::MissingKey { .. } => ErrorClass::InvariantViolation,
        }
    }
}

impl From<StoreError> for InternalError {
    fn from(err: StoreError) -> Self {
        Self::new(err.class(), ErrorOrigin::Store, err.to_string())
    }
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.into())
    }
}

///
/// RelatedQuery
/// Description of a many-valued relation's rows; built without querying.
///

#[derive(Clone, Debug)]
pub enum RelatedQuery {
    /// Rows of `entity` whose `column` holds `key`.
    ReverseForeignKey {
        entity: Arc<EntityType>,
        column: String,
        key: Value,
    },

    /// Rows of `target` linked to `key` through the `link` table. `reverse`
    /// walks the link from its far side.
    ManyToMany {
        link: String,
        target: Arc<EntityType>,
        reverse: bool,
        key: Value,
    },

    /// Rows of `entity` pointing at (`type_id`, `key`) through a generic
    /// relation.
    Generic {
        entity: Arc<EntityType>,
        type_column: String,
        key_column: String,
        type_id: u64,
        key: Value,
    },
}

impl RelatedQuery {
    /// Type of the rows the query returns.
    #[must_use]
    pub const fn target(&self) -> &Arc<EntityType> {
        match self {
            Self::ReverseForeignKey { entity, .. } | Self::Generic { entity, .. } => entity,
            Self::ManyToMany { target, .. } => target,
        }
    }
}

///
/// Store
///
/// Every method is one query. `entity` is always a concrete type.
///

pub trait Store: Send + Sync {
    /// Load one column of the row identified by `key`.
    fn fetch_value(
        &self,
        entity: &EntityType,
        key: &Value,
        column: &str,
    ) -> Result<Value, StoreError>;

    fn fetch_row(&self, entity: &EntityType, key: &Value) -> Result<Option<Row>, StoreError>;

    /// First row whose `column` holds `value`.
    fn fetch_by_column(
        &self,
        entity: &EntityType,
        column: &str,
        value: &Value,
    ) -> Result<Option<Row>, StoreError>;

    fn fetch_many(&self, query: &RelatedQuery) -> Result<Vec<Row>, StoreError>;

    fn scan(&self, entity: &EntityType) -> Result<Vec<Row>, StoreError>;
}
