use crate::{error::InternalError, model::EntityType};
use seal_schema::node::{FieldDef, FieldKind};
use std::sync::{Arc, OnceLock, Weak};

///
/// FieldModel
/// Field declaration resolved against the registry.
///

#[derive(Clone, Debug)]
pub struct FieldModel {
    pub def: FieldDef,
    /// Column name on instances and store rows.
    pub attname: String,
    /// Path of the type that declared the field (differs from the owner for
    /// fields inherited from concrete parents).
    pub declared_on: String,
    /// Qualified target path, for relation kinds.
    pub target: Option<String>,
}

impl FieldModel {
    #[must_use]
    pub fn ident(&self) -> &str {
        &self.def.ident
    }

    #[must_use]
    pub const fn kind(&self) -> &FieldKind {
        &self.def.kind
    }

    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        self.def.is_concrete()
    }

    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.def.is_primary_key()
    }

    #[must_use]
    pub const fn is_parent_link(&self) -> bool {
        self.def.is_parent_link()
    }

    #[must_use]
    pub fn reverse_accessor_name(&self, declaring_ident: &str) -> Option<String> {
        self.def.reverse_accessor_name(declaring_ident)
    }

    /// Name of the link table backing a many-to-many field.
    #[must_use]
    pub fn link_name(&self) -> String {
        format!("{}.{}", self.declared_on, self.def.ident)
    }
}

///
/// RelationTarget
///
/// Late-bound pointer from an accessor to the type on the other side of a
/// relation. Resolved once, when the target is defined; weak so that types
/// pointing at each other do not keep each other alive.
///

#[derive(Debug)]
pub struct RelationTarget {
    path: String,
    slot: OnceLock<Weak<EntityType>>,
}

impl RelationTarget {
    #[must_use]
    pub fn pending(path: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            slot: OnceLock::new(),
        })
    }

    #[must_use]
    pub fn resolved(target: &Arc<EntityType>) -> Arc<Self> {
        let this = Self::pending(target.path());
        this.resolve(target);

        this
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bind the target. Later calls are ignored.
    pub fn resolve(&self, target: &Arc<EntityType>) {
        let _ = self.slot.set(Arc::downgrade(target));
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn get(&self) -> Result<Arc<EntityType>, InternalError> {
        self.slot
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| InternalError::unresolved_target(&self.path))
    }
}
