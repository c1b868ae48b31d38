use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::EntityType,
    obs::sink::{self, MetricsEvent},
};
use std::{
    collections::BTreeMap,
    sync::{
        Arc, RwLock, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

///
/// ContentTypes
///
/// Id → type table behind generic relations. Every lookup is a metadata
/// lookup and is recorded as one.
///

#[derive(Debug, Default)]
pub struct ContentTypes {
    last_id: AtomicU64,
    by_id: RwLock<BTreeMap<u64, Weak<EntityType>>>,
}

impl ContentTypes {
    pub(crate) fn allocate(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn register(&self, entity: &Arc<EntityType>) {
        self.by_id
            .write()
            .expect("content type RwLock poisoned")
            .insert(entity.content_type_id(), Arc::downgrade(entity));
    }

    pub fn get_for_id(&self, id: u64) -> Result<Arc<EntityType>, InternalError> {
        sink::record(MetricsEvent::MetadataLookup {
            content_type_id: id,
        });

        self.by_id
            .read()
            .expect("content type RwLock poisoned")
            .get(&id)
            .and_then(Weak::upgrade)
            .ok_or_else(|| {
                InternalError::new(
                    ErrorClass::NotFound,
                    ErrorOrigin::Registry,
                    format!("no content type with id {id}"),
                )
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.read().expect("content type RwLock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
