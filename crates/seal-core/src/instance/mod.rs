mod manager;

#[cfg(test)]
mod tests;

pub use manager::RelatedManager;

use crate::{
    error::{AccessError, ErrorClass, ErrorOrigin, InternalError},
    model::EntityType,
    store::{Row, Store},
};
use seal_schema::{node::FieldKind, types::Value};
use std::{collections::BTreeMap, fmt, sync::Arc};

///
/// SealState
/// Terminal once set; nothing unseals an instance.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SealState {
    sealed: bool,
}

impl SealState {
    pub const fn seal(&mut self) {
        self.sealed = true;
    }

    #[must_use]
    pub const fn is_sealed(self) -> bool {
        self.sealed
    }
}

///
/// InstanceState
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct InstanceState {
    pub seal: SealState,
}

///
/// Instance
///
/// One loaded record: the columns fetched so far, related instances resolved
/// so far, and its seal state. Owned by the caller; reads that may load data
/// take `&mut self`.
///

#[derive(Clone)]
pub struct Instance {
    entity: Arc<EntityType>,
    store: Option<Arc<dyn Store>>,
    values: BTreeMap<String, Value>,
    related: BTreeMap<String, Option<Self>>,
    state: InstanceState,
}

impl Instance {
    /// Build an instance from a partial row, as a query with deferred
    /// columns would.
    pub fn from_db<I, K, V>(
        entity: &Arc<EntityType>,
        store: Arc<dyn Store>,
        row: I,
    ) -> Result<Self, InternalError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        if entity.is_abstract() {
            return Err(InternalError::instance_unsupported(format!(
                "abstract type '{}' cannot be instantiated",
                entity.path()
            )));
        }

        let mut values = BTreeMap::new();
        for (column, value) in row {
            let column = column.into();
            if !entity.has_column(&column) {
                return Err(InternalError::new(
                    ErrorClass::NotFound,
                    ErrorOrigin::Instance,
                    format!("'{}' has no column '{column}'", entity.path()),
                ));
            }
            values.insert(column, value.into());
        }

        Ok(Self::from_values(entity, Some(store), values))
    }

    /// Instance known only by its primary key.
    #[must_use]
    pub fn deferred(
        entity: &Arc<EntityType>,
        store: Option<Arc<dyn Store>>,
        key: Value,
    ) -> Self {
        let mut values = BTreeMap::new();
        if let Some(pk) = entity.primary_key() {
            values.insert(pk.to_string(), key);
        }

        Self::from_values(entity, store, values)
    }

    pub(crate) fn from_row(
        entity: &Arc<EntityType>,
        store: Option<Arc<dyn Store>>,
        row: Row,
    ) -> Self {
        Self::from_values(entity, store, row)
    }

    fn from_values(
        entity: &Arc<EntityType>,
        store: Option<Arc<dyn Store>>,
        values: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            entity: Arc::clone(entity),
            store,
            values,
            related: BTreeMap::new(),
            state: InstanceState::default(),
        }
    }

    /// Parent-link target built from whatever parent columns the child has
    /// loaded, keyed by the link value. It is the same row, so it shares the
    /// child's seal state.
    pub(crate) fn parent_from_child(parent: &Arc<EntityType>, child: &Self, key: Value) -> Self {
        let mut values = parent
            .columns()
            .filter_map(|column| {
                child
                    .values
                    .get(column)
                    .map(|value| (column.to_string(), value.clone()))
            })
            .collect::<BTreeMap<_, _>>();
        if let Some(pk) = parent.primary_key() {
            values.insert(pk.to_string(), key);
        }

        let mut instance = Self::from_values(parent, child.store.clone(), values);
        instance.state = child.state;

        instance
    }

    // ---------------------------------------------------------------------
    // Identity
    // ---------------------------------------------------------------------

    #[must_use]
    pub const fn entity(&self) -> &Arc<EntityType> {
        &self.entity
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        self.entity.ident()
    }

    #[must_use]
    pub fn key(&self) -> Option<&Value> {
        self.entity.primary_key().and_then(|pk| self.values.get(pk))
    }

    // ---------------------------------------------------------------------
    // Loaded state
    // ---------------------------------------------------------------------

    /// Loaded column value; never fetches.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    #[must_use]
    pub fn is_loaded(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn loaded_columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_cached(&self, name: &str) -> bool {
        self.related.contains_key(name)
    }

    /// Cached related instance: outer `None` when nothing is cached, inner
    /// `None` when the relation is cached as empty.
    #[must_use]
    pub fn cached(&self, name: &str) -> Option<Option<&Self>> {
        self.related.get(name).map(Option::as_ref)
    }

    /// Assign a column, dropping any related instance cached through it.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<(), InternalError> {
        if !self.entity.has_column(column) {
            return Err(InternalError::unknown_attribute(self.entity.path(), column));
        }
        self.values.insert(column.to_string(), value.into());

        let stale = self
            .entity
            .fields()
            .iter()
            .filter(|f| match f.kind() {
                FieldKind::ForeignKey { .. } => f.attname == column,
                FieldKind::GenericForeignKey {
                    type_field,
                    key_field,
                } => type_field == column || key_field == column,
                _ => false,
            })
            .map(|f| f.ident().to_string())
            .collect::<Vec<_>>();
        for name in stale {
            self.related.remove(&name);
        }

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Attribute access
    // ---------------------------------------------------------------------

    /// Read an attribute through its (possibly guarded) accessor.
    pub fn get(&mut self, name: &str) -> Result<Attr, AccessError> {
        let accessor = self
            .entity
            .accessor(name)
            .ok_or_else(|| InternalError::unknown_attribute(self.entity.path(), name))?;

        accessor.get(self)
    }

    // ---------------------------------------------------------------------
    // Sealing
    // ---------------------------------------------------------------------

    pub const fn seal(&mut self) {
        self.state.seal.seal();
    }

    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.state.seal.is_sealed()
    }

    #[must_use]
    pub const fn state(&self) -> InstanceState {
        self.state
    }

    // ---------------------------------------------------------------------
    // Accessor plumbing
    // ---------------------------------------------------------------------

    /// Loaded value of `column`, fetching it by primary key when deferred.
    pub(crate) fn column_value(&mut self, column: &str) -> Result<Value, AccessError> {
        if let Some(value) = self.values.get(column) {
            return Ok(value.clone());
        }

        let key = self.key().cloned().ok_or_else(|| {
            InternalError::instance_unsupported(format!(
                "cannot load '{column}' on {self} without a primary key"
            ))
        })?;
        let store = self.store()?;
        let value = store.fetch_value(self.entity.concrete(), &key, column)?;
        self.values.insert(column.to_string(), value.clone());

        Ok(value)
    }

    pub(crate) fn cache_related(&mut self, name: &str, related: Option<Self>) {
        self.related.insert(name.to_string(), related);
    }

    pub(crate) fn store(&self) -> Result<Arc<dyn Store>, InternalError> {
        self.store.clone().ok_or_else(|| {
            InternalError::instance_unsupported(format!("{self} is not bound to a store"))
        })
    }

    pub(crate) fn store_handle(&self) -> Option<Arc<dyn Store>> {
        self.store.clone()
    }
}

// Type name only; printing contents could force a fetch.
impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.entity.ident())
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("entity", &self.entity.path())
            .field("values", &self.values)
            .field("sealed", &self.is_sealed())
            .finish_non_exhaustive()
    }
}

///
/// Attr
/// Result of reading one attribute.
///

#[derive(Debug)]
pub enum Attr {
    Many(RelatedManager),
    Related(Option<Instance>),
    Value(Value),
}

impl Attr {
    pub fn into_value(self) -> Result<Value, InternalError> {
        match self {
            Self::Value(v) => Ok(v),
            other => Err(InternalError::accessor_invariant(format!(
                "expected a value, found {}",
                other.shape()
            ))),
        }
    }

    pub fn into_related(self) -> Result<Option<Instance>, InternalError> {
        match self {
            Self::Related(v) => Ok(v),
            other => Err(InternalError::accessor_invariant(format!(
                "expected a related instance, found {}",
                other.shape()
            ))),
        }
    }

    pub fn into_many(self) -> Result<RelatedManager, InternalError> {
        match self {
            Self::Many(v) => Ok(v),
            other => Err(InternalError::accessor_invariant(format!(
                "expected a related manager, found {}",
                other.shape()
            ))),
        }
    }

    const fn shape(&self) -> &'static str {
        match self {
            Self::Many(_) => "a related manager",
            Self::Related(_) => "a related instance",
            Self::Value(_) => "a value",
        }
    }
}
