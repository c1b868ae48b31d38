use crate::{
    accessor::{Accessor, AccessorKind, AttributeBinding, GenericColumns},
    error::{AccessError, InternalError},
    instance::{Attr, Instance, RelatedManager},
    model::RelationTarget,
    registry::ContentTypes,
    store::RelatedQuery,
};
use std::sync::Arc;

/// Whether the instance caches a target matching its loaded type/key pair.
/// Reads loaded state only.
pub(crate) fn cached_generic_target_matches(
    instance: &Instance,
    binding: &AttributeBinding,
) -> bool {
    let Some(GenericColumns {
        type_column,
        key_column,
    }) = &binding.generic
    else {
        return false;
    };
    let (Some(type_id), Some(key)) = (instance.value(type_column), instance.value(key_column))
    else {
        return false;
    };

    match instance.cached(&binding.name) {
        Some(Some(cached)) => {
            type_id.as_uint() == Some(cached.entity().content_type_id())
                && cached.key().is_some_and(|k| k.same_key(key))
        }
        Some(None) => type_id.is_null() || key.is_null(),
        None => false,
    }
}

///
/// GenericAccessor
///
/// Polymorphic forward relation over a (content type, key) column pair.
/// Resolving the content type is a metadata lookup.
///

pub struct GenericAccessor {
    binding: AttributeBinding,
    content_types: Arc<ContentTypes>,
}

impl GenericAccessor {
    #[must_use]
    pub fn new(
        name: &str,
        type_column: &str,
        key_column: &str,
        content_types: Arc<ContentTypes>,
    ) -> Self {
        Self {
            binding: AttributeBinding::new(name, AccessorKind::Generic)
                .with_generic(type_column, key_column),
            content_types,
        }
    }
}

impl Accessor for GenericAccessor {
    fn binding(&self) -> &AttributeBinding {
        &self.binding
    }

    fn get(&self, instance: &mut Instance) -> Result<Attr, AccessError> {
        let name = &self.binding.name;
        let columns = self.binding.generic.as_ref().ok_or_else(|| {
            InternalError::accessor_invariant(format!("generic accessor '{name}' has no columns"))
        })?;

        let type_id = instance.column_value(&columns.type_column)?;
        let key = instance.column_value(&columns.key_column)?;
        if type_id.is_null() || key.is_null() {
            instance.cache_related(name, None);
            return Ok(Attr::Related(None));
        }
        if cached_generic_target_matches(instance, &self.binding) {
            return Ok(Attr::Related(instance.cached(name).flatten().cloned()));
        }

        let type_id = type_id.as_uint().ok_or_else(|| {
            InternalError::accessor_invariant(format!(
                "'{}' holds {type_id}, not a content type id",
                columns.type_column
            ))
        })?;
        let target = self.content_types.get_for_id(type_id)?;
        let store = instance.store()?;
        let related = store
            .fetch_row(target.concrete(), &key)?
            .map(|row| Instance::from_row(&target, Some(Arc::clone(&store)), row));

        instance.cache_related(name, related.clone());

        Ok(Attr::Related(related))
    }
}

///
/// GenericReverseAccessor
/// Rows of the declaring type whose generic relation points at the instance.
///

pub struct GenericReverseAccessor {
    binding: AttributeBinding,
    target: Arc<RelationTarget>,
}

impl GenericReverseAccessor {
    #[must_use]
    pub fn new(
        name: &str,
        target: Arc<RelationTarget>,
        type_column: &str,
        key_column: &str,
    ) -> Self {
        Self {
            binding: AttributeBinding::new(name, AccessorKind::GenericReverse)
                .with_generic(type_column, key_column),
            target,
        }
    }
}

impl Accessor for GenericReverseAccessor {
    fn binding(&self) -> &AttributeBinding {
        &self.binding
    }

    fn get(&self, instance: &mut Instance) -> Result<Attr, AccessError> {
        let name = &self.binding.name;
        let columns = self.binding.generic.as_ref().ok_or_else(|| {
            InternalError::accessor_invariant(format!("generic relation '{name}' has no columns"))
        })?;
        let key = instance.key().cloned().ok_or_else(|| {
            InternalError::instance_unsupported(format!(
                "{instance} needs a primary key before '{name}' can be used"
            ))
        })?;

        let query = RelatedQuery::Generic {
            entity: self.target.get()?,
            type_column: columns.type_column.clone(),
            key_column: columns.key_column.clone(),
            type_id: instance.entity().concrete_content_type_id(),
            key,
        };

        Ok(Attr::Many(RelatedManager::new(name, query, instance.store()?)))
    }
}
