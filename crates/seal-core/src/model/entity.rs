use crate::{
    accessor::{Accessor, AccessorTable},
    model::FieldModel,
};
use seal_schema::node::{FieldKind, ManagerDef};
use std::{
    fmt,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

///
/// EntityType
///
/// Runtime form of one registered entity type. Immutable apart from its
/// accessor table and the two sealing flags, both of which are only written
/// during setup.
///

pub struct EntityType {
    pub(crate) path: String,
    pub(crate) ident: String,
    pub(crate) app_label: String,
    pub(crate) is_abstract: bool,
    /// Concrete base, for proxies.
    pub(crate) proxy_for: Option<Arc<Self>>,
    /// Concrete parents (multi-table inheritance), nearest first.
    pub(crate) parents: Vec<Arc<Self>>,
    pub(crate) local_fields: Vec<FieldModel>,
    /// Inherited fields first, then local ones.
    pub(crate) fields: Vec<FieldModel>,
    pub(crate) primary_key: Option<String>,
    pub(crate) managers: Vec<ManagerDef>,
    pub(crate) content_type_id: u64,
    pub(crate) declared_sealable: bool,
    pub(crate) accessors: AccessorTable,
    pub(crate) reverse_accessors: RwLock<Vec<String>>,
    pub(crate) sealable: AtomicBool,
    pub(crate) prepared: AtomicBool,
}

impl EntityType {
    /// Qualified path (`label.Ident`).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn ident(&self) -> &str {
        &self.ident
    }

    #[must_use]
    pub fn app_label(&self) -> &str {
        &self.app_label
    }

    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    #[must_use]
    pub const fn is_proxy(&self) -> bool {
        self.proxy_for.is_some()
    }

    #[must_use]
    pub const fn proxy_for(&self) -> Option<&Arc<Self>> {
        self.proxy_for.as_ref()
    }

    /// The type whose rows back instances of this one.
    #[must_use]
    pub fn concrete(&self) -> &Self {
        self.proxy_for.as_deref().unwrap_or(self)
    }

    #[must_use]
    pub fn parents(&self) -> &[Arc<Self>] {
        &self.parents
    }

    #[must_use]
    pub fn local_fields(&self) -> &[FieldModel] {
        &self.local_fields
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldModel] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, ident: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|f| f.ident() == ident)
    }

    #[must_use]
    pub fn field_by_attname(&self, attname: &str) -> Option<&FieldModel> {
        self.fields
            .iter()
            .find(|f| f.is_concrete() && f.attname == attname)
    }

    /// Stored column names, in field order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.is_concrete())
            .map(|f| f.attname.as_str())
    }

    /// Whether `name` can be held on an instance (stored or transient).
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.fields.iter().any(|f| match f.kind() {
            FieldKind::Transient { .. } => f.ident() == name,
            _ => f.is_concrete() && f.attname == name,
        })
    }

    /// Primary key column; `None` for abstract types.
    #[must_use]
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    #[must_use]
    pub fn managers(&self) -> &[ManagerDef] {
        &self.managers
    }

    #[must_use]
    pub fn manager(&self, ident: &str) -> Option<&ManagerDef> {
        self.managers.iter().find(|m| m.ident == ident)
    }

    #[must_use]
    pub const fn content_type_id(&self) -> u64 {
        self.content_type_id
    }

    /// Content type used by generic relations (proxies share their base's).
    #[must_use]
    pub fn concrete_content_type_id(&self) -> u64 {
        self.concrete().content_type_id
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    /// Resolve an attribute: own table, then the proxy base, then parents.
    #[must_use]
    pub fn accessor(&self, name: &str) -> Option<Arc<dyn Accessor>> {
        if let Some(found) = self.accessors.get(name) {
            return Some(found);
        }
        if let Some(base) = &self.proxy_for
            && let Some(found) = base.accessor(name)
        {
            return Some(found);
        }

        self.parents.iter().find_map(|p| p.accessor(name))
    }

    /// Accessor installed directly on this type.
    #[must_use]
    pub fn local_accessor(&self, name: &str) -> Option<Arc<dyn Accessor>> {
        self.accessors.get(name)
    }

    #[must_use]
    pub fn accessor_names(&self) -> Vec<String> {
        self.accessors.names()
    }

    pub(crate) const fn accessor_table(&self) -> &AccessorTable {
        &self.accessors
    }

    /// Names of accessors other types installed here.
    #[must_use]
    pub fn reverse_accessors(&self) -> Vec<String> {
        self.reverse_accessors
            .read()
            .expect("reverse accessor RwLock poisoned")
            .clone()
    }

    pub(crate) fn record_reverse_accessor(&self, name: &str) {
        let mut names = self
            .reverse_accessors
            .write()
            .expect("reverse accessor RwLock poisoned");
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    // ---------------------------------------------------------------------
    // Sealing flags
    // ---------------------------------------------------------------------

    /// Declared sealable, inherited the marker, or opted in at runtime.
    /// Proxies follow their base.
    #[must_use]
    pub fn is_sealable(&self) -> bool {
        self.declared_sealable
            || self.sealable.load(Ordering::Acquire)
            || self.proxy_for.as_ref().is_some_and(|base| base.is_sealable())
    }

    #[must_use]
    pub const fn is_declared_sealable(&self) -> bool {
        self.declared_sealable
    }

    pub(crate) fn mark_sealable(&self) {
        self.sealable.store(true, Ordering::Release);
    }

    /// Flip the prepared flag; `true` only for the first caller.
    pub(crate) fn mark_prepared(&self) -> bool {
        !self.prepared.swap(true, Ordering::AcqRel)
    }

    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.prepared.load(Ordering::Acquire)
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("path", &self.path)
            .field("abstract", &self.is_abstract)
            .field("proxy", &self.is_proxy())
            .field("sealable", &self.is_sealable())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}
