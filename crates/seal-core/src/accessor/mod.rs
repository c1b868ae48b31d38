//! Attribute accessors.
//!
//! Every readable attribute of an entity type is an [`Accessor`] in that
//! type's [`AccessorTable`]. The implementations in this module are the
//! original, unguarded behaviours; sealing installs a guarded wrapper in front
//! of them without changing what they return.

mod deferred;
mod forward;
mod generic;
mod many;
mod reverse;
mod transient;

pub use deferred::DeferredFieldAccessor;
pub use forward::ForwardSingleAccessor;
pub use generic::{GenericAccessor, GenericReverseAccessor};
pub use many::{ManyRelation, ManyValuedAccessor};
pub use reverse::ReverseSingleAccessor;
pub use transient::TransientAccessor;

pub(crate) use generic::cached_generic_target_matches;

use crate::{
    error::AccessError,
    instance::{Attr, Instance},
};
use derive_more::Display;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

///
/// Accessor
///
/// Read path for one attribute. `get` may load data through the instance's
/// store and cache it on the instance.
///

pub trait Accessor: Send + Sync {
    fn binding(&self) -> &AttributeBinding;

    fn get(&self, instance: &mut Instance) -> Result<Attr, AccessError>;

    fn kind(&self) -> AccessorKind {
        self.binding().kind
    }

    fn is_guarded(&self) -> bool {
        false
    }
}

///
/// AccessorKind
///
/// How an attribute's value may be absent and later fetched. Every kind but
/// `Plain` has a guard strategy.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[remain::sorted]
pub enum AccessorKind {
    DeferredField,
    ForwardSingle,
    Generic,
    GenericReverse,
    ManyValued,
    Plain,
    ReverseSingle,
}

///
/// AttributeBinding
/// What a guard needs to know about an attribute without running it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeBinding {
    pub name: String,
    pub kind: AccessorKind,
    /// Column read by the attribute (own column, or the key column of a
    /// forward relation).
    pub column: Option<String>,
    pub generic: Option<GenericColumns>,
}

impl AttributeBinding {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AccessorKind) -> Self {
        Self {
            name: name.into(),
            kind,
            column: None,
            generic: None,
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_generic(
        mut self,
        type_column: impl Into<String>,
        key_column: impl Into<String>,
    ) -> Self {
        self.generic = Some(GenericColumns {
            type_column: type_column.into(),
            key_column: key_column.into(),
        });
        self
    }
}

///
/// GenericColumns
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GenericColumns {
    pub type_column: String,
    pub key_column: String,
}

///
/// AccessorTable
///
/// Per-type attribute table. Written while types are defined and prepared,
/// read on every attribute access.
///

#[derive(Default)]
pub struct AccessorTable {
    slots: RwLock<BTreeMap<String, Arc<dyn Accessor>>>,
}

impl AccessorTable {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Accessor>> {
        self.slots
            .read()
            .expect("accessor table RwLock poisoned")
            .get(name)
            .cloned()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.slots
            .read()
            .expect("accessor table RwLock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Install an accessor under a free name. Returns `false` on a clash.
    pub fn install(&self, name: &str, accessor: Arc<dyn Accessor>) -> bool {
        let mut slots = self.slots.write().expect("accessor table RwLock poisoned");
        if slots.contains_key(name) {
            return false;
        }
        slots.insert(name.to_string(), accessor);

        true
    }

    /// Check-and-replace under a single write lock; `None` when `name` is
    /// not installed.
    pub fn update<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Arc<dyn Accessor>) -> R,
    ) -> Option<R> {
        let mut slots = self.slots.write().expect("accessor table RwLock poisoned");

        slots.get_mut(name).map(f)
    }
}
