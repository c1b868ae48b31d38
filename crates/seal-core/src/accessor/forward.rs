use crate::{
    accessor::{Accessor, AccessorKind, AttributeBinding},
    error::AccessError,
    instance::{Attr, Instance},
    model::RelationTarget,
};
use std::sync::Arc;

///
/// ForwardSingleAccessor
///
/// Foreign key, one-to-one, or parent link read from the declaring side.
/// With the key column loaded this never queries: the result is a key-only
/// instance of the target. A parent link instead carries the child's loaded
/// parent columns and seal state.
///

pub struct ForwardSingleAccessor {
    binding: AttributeBinding,
    target: Arc<RelationTarget>,
    parent_link: bool,
}

impl ForwardSingleAccessor {
    #[must_use]
    pub fn new(name: &str, column: &str, target: Arc<RelationTarget>, parent_link: bool) -> Self {
        Self {
            binding: AttributeBinding::new(name, AccessorKind::ForwardSingle).with_column(column),
            target,
            parent_link,
        }
    }

    #[must_use]
    pub fn target(&self) -> &RelationTarget {
        &self.target
    }

    #[must_use]
    pub const fn is_parent_link(&self) -> bool {
        self.parent_link
    }
}

impl Accessor for ForwardSingleAccessor {
    fn binding(&self) -> &AttributeBinding {
        &self.binding
    }

    fn get(&self, instance: &mut Instance) -> Result<Attr, AccessError> {
        let name = &self.binding.name;
        if let Some(cached) = instance.cached(name) {
            return Ok(Attr::Related(cached.cloned()));
        }

        let column = self.binding.column.as_deref().unwrap_or(name);
        let key = instance.column_value(column)?;
        if key.is_null() {
            instance.cache_related(name, None);
            return Ok(Attr::Related(None));
        }

        let target = self.target.get()?;
        let related = if self.parent_link {
            Instance::parent_from_child(&target, instance, key)
        } else {
            Instance::deferred(&target, instance.store_handle(), key)
        };

        instance.cache_related(name, Some(related.clone()));

        Ok(Attr::Related(Some(related)))
    }
}
