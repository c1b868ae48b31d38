use crate::{
    accessor::{Accessor, AccessorKind, AttributeBinding},
    error::AccessError,
    instance::{Attr, Instance},
    model::RelationTarget,
};
use std::sync::Arc;

///
/// ReverseSingleAccessor
///
/// One-to-one (or parent link) read from the target side. The key lives on
/// the declaring type, so anything not cached is a lookup by remote column.
///

pub struct ReverseSingleAccessor {
    binding: AttributeBinding,
    declaring: Arc<RelationTarget>,
    remote_column: String,
}

impl ReverseSingleAccessor {
    #[must_use]
    pub fn new(name: &str, declaring: Arc<RelationTarget>, remote_column: &str) -> Self {
        Self {
            binding: AttributeBinding::new(name, AccessorKind::ReverseSingle),
            declaring,
            remote_column: remote_column.to_string(),
        }
    }
}

impl Accessor for ReverseSingleAccessor {
    fn binding(&self) -> &AttributeBinding {
        &self.binding
    }

    fn get(&self, instance: &mut Instance) -> Result<Attr, AccessError> {
        let name = &self.binding.name;
        if let Some(cached) = instance.cached(name) {
            return Ok(Attr::Related(cached.cloned()));
        }
        let Some(key) = instance.key().cloned() else {
            return Ok(Attr::Related(None));
        };

        let declaring = self.declaring.get()?;
        let store = instance.store()?;
        let related = store
            .fetch_by_column(declaring.concrete(), &self.remote_column, &key)?
            .map(|row| Instance::from_row(&declaring, Some(Arc::clone(&store)), row));

        instance.cache_related(name, related.clone());

        Ok(Attr::Related(related))
    }
}
