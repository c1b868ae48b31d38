//! Runtime entity type registry.
//!
//! Owns every defined [`EntityType`], emits the type-defined event, and keeps
//! the queue of work waiting on types that are referenced before they are
//! defined.

mod build;
mod content_type;


pub use content_type::ContentTypes;

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::EntityType,
    obs::sink::{self, MetricsEvent},
};
use seal_schema::{node::EntityDef, validate::ValidateNode};
use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, RwLock},
};
use thiserror::Error as ThisError;

/// Callback run for every newly defined type.
pub type TypeListener = Arc<dyn Fn(&Registry, &Arc<EntityType>) + Send + Sync>;

/// Work waiting on a type that is not defined yet.
pub type PendingOperation = Box<dyn FnOnce(&Registry, &Arc<EntityType>) + Send>;

///
/// RegistryError
///

#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("type '{0}' is already defined")]
    AlreadyDefined(String),

    #[error("'{path}' is a proxy of abstract type '{base}'")]
    AbstractProxyBase { path: String, base: String },

    #[error("attribute '{field}' on '{path}' clashes with an existing attribute")]
    FieldClash { path: String, field: String },

    #[error("parent '{parent}' of '{path}' is not defined")]
    UnknownParent { path: String, parent: String },

    #[error("proxy base '{base}' of '{path}' is not defined")]
    UnknownProxyBase { path: String, base: String },

    #[error(transparent)]
    Validation(#[from] seal_schema::Error),
}

impl RegistryError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::AlreadyDefined(_) | Self::FieldClash { .. } => ErrorClass::Conflict,
            Self::UnknownParent { .. } | Self::UnknownProxyBase { .. } => ErrorClass::NotFound,
            Self::AbstractProxyBase { .. } => ErrorClass::Unsupported,
            Self::Validation(_) => ErrorClass::InvariantViolation,
        }
    }

    pub(crate) const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::Validation(_) => ErrorOrigin::Schema,
            _ => ErrorOrigin::Registry,
        }
    }
}

impl From<RegistryError> for InternalError {
    fn from(err: RegistryError) -> Self {
        Self::new(err.class(), err.origin(), err.to_string())
    }
}

///
/// Registry
///
/// Cheap to clone; clones share the same set of types. Locks are never
/// held while listeners or pending operations run.
///

#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    label: String,
    types: RwLock<BTreeMap<String, Arc<EntityType>>>,
    pending: Mutex<BTreeMap<String, Vec<PendingOperation>>>,
    listeners: RwLock<Vec<TypeListener>>,
    content_types: Arc<ContentTypes>,
}

impl Registry {
    /// New registry; unqualified references resolve under `label`.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                label: label.into(),
                types: RwLock::new(BTreeMap::new()),
                pending: Mutex::new(BTreeMap::new()),
                listeners: RwLock::new(Vec::new()),
                content_types: Arc::new(ContentTypes::default()),
            }),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    #[must_use]
    pub fn content_types(&self) -> &Arc<ContentTypes> {
        &self.inner.content_types
    }

    /// Qualify a reference (`Name` or `label.Name`) under this registry.
    #[must_use]
    pub fn qualify(&self, reference: &str) -> String {
        if reference.contains('.') {
            reference.to_string()
        } else {
            format!("{}.{reference}", self.label())
        }
    }

    #[must_use]
    pub fn get(&self, reference: &str) -> Option<Arc<EntityType>> {
        let path = self.qualify(reference);

        self.inner
            .types
            .read()
            .expect("registry types RwLock poisoned")
            .get(&path)
            .cloned()
    }

    /// Whether `entity` is the type registered here under its path.
    #[must_use]
    pub fn contains(&self, entity: &Arc<EntityType>) -> bool {
        self.get(entity.path())
            .is_some_and(|found| Arc::ptr_eq(&found, entity))
    }

    /// All defined types, ordered by path.
    #[must_use]
    pub fn types(&self) -> Vec<Arc<EntityType>> {
        self.inner
            .types
            .read()
            .expect("registry types RwLock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Paths that still have work queued against them.
    #[must_use]
    pub fn pending_targets(&self) -> Vec<String> {
        self.inner
            .pending
            .lock()
            .expect("registry pending Mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    /// Subscribe to the type-defined event. Types defined before the call
    /// are not replayed.
    pub fn on_type_defined(
        &self,
        listener: impl Fn(&Self, &Arc<EntityType>) + Send + Sync + 'static,
    ) {
        self.inner
            .listeners
            .write()
            .expect("registry listeners RwLock poisoned")
            .push(Arc::new(listener));
    }

    /// Run `on_ready` with the target type: now if it is defined, otherwise
    /// right after it is. Operations queued on one target run in FIFO order.
    pub fn resolve_forward_reference(
        &self,
        target: &str,
        on_ready: impl FnOnce(&Self, &Arc<EntityType>) + Send + 'static,
    ) {
        let path = self.qualify(target);

        let entity = {
            let mut pending = self.inner.pending.lock().expect("registry pending Mutex poisoned");
            let Some(entity) = self.get(&path) else {
                pending.entry(path.clone()).or_default().push(Box::new(on_ready));
                tracing::trace!(target_path = %path, "queued work on undefined type");
                sink::record(MetricsEvent::PendingQueued { target_path: &path });

                return;
            };

            entity
        };

        on_ready(self, &entity);
    }

    // ---------------------------------------------------------------------
    // Definition
    // ---------------------------------------------------------------------

    /// Validate, build and register a type, then run everything waiting on
    /// it.
    pub fn define(&self, def: EntityDef) -> Result<Arc<EntityType>, InternalError> {
        let path = def.path(self.label());
        def.validate()
            .map_err(|errors| RegistryError::from(seal_schema::Error::validation(&path, errors)))?;
        if self.get(&path).is_some() {
            return Err(RegistryError::AlreadyDefined(path).into());
        }

        let build::BuiltType { entity, links } = build::build_type(self, &def, &path)?;

        // insert under the pending lock so no operation can be queued
        // against a type that is already defined
        {
            let _pending = self.inner.pending.lock().expect("registry pending Mutex poisoned");
            let mut types = self
                .inner
                .types
                .write()
                .expect("registry types RwLock poisoned");
            if types.contains_key(&path) {
                return Err(RegistryError::AlreadyDefined(path).into());
            }
            types.insert(path.clone(), Arc::clone(&entity));
        }
        if !entity.is_abstract() {
            self.inner.content_types.register(&entity);
        }
        tracing::debug!(entity = %path, "entity type defined");

        for link in links {
            self.resolve_forward_reference(&link.target, link.operation);
        }
        self.emit_defined(&entity);
        self.drain_pending(&entity);

        Ok(entity)
    }

    fn emit_defined(&self, entity: &Arc<EntityType>) {
        let listeners = self
            .inner
            .listeners
            .read()
            .expect("registry listeners RwLock poisoned")
            .clone();

        for listener in listeners {
            listener(self, entity);
        }
    }

    fn drain_pending(&self, entity: &Arc<EntityType>) {
        let operations = self
            .inner
            .pending
            .lock()
            .expect("registry pending Mutex poisoned")
            .remove(entity.path())
            .unwrap_or_default();
        if operations.is_empty() {
            return;
        }

        tracing::trace!(
            target_path = %entity.path(),
            operations = operations.len(),
            "running work queued on type"
        );
        sink::record(MetricsEvent::PendingDrained {
            target_path: entity.path(),
            operations: u64::try_from(operations.len()).unwrap_or(u64::MAX),
        });

        for operation in operations {
            operation(self, entity);
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("label", &self.inner.label)
            .field("types", &self.types().len())
            .finish_non_exhaustive()
    }
}
