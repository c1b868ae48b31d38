use crate::{
    error::AccessError,
    instance::Instance,
    seal::EnumerationGuard,
    store::{RelatedQuery, Store},
};
use std::{fmt, sync::Arc};

///
/// RelatedManager
///
/// Handle for a many-valued relation. Creating one never queries; `all` and
/// `count` do, and are where sealing checks many-valued relations.
///

pub struct RelatedManager {
    attribute: String,
    query: RelatedQuery,
    store: Arc<dyn Store>,
    guard: Option<EnumerationGuard>,
}

impl RelatedManager {
    pub(crate) fn new(attribute: &str, query: RelatedQuery, store: Arc<dyn Store>) -> Self {
        Self {
            attribute: attribute.to_string(),
            query,
            store,
            guard: None,
        }
    }

    pub(crate) fn guarded(mut self, guard: EnumerationGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    #[must_use]
    pub const fn query(&self) -> &RelatedQuery {
        &self.query
    }

    #[must_use]
    pub const fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }

    /// Enumerate the related instances.
    pub fn all(&self) -> Result<Vec<Instance>, AccessError> {
        if let Some(guard) = &self.guard {
            guard.enforce()?;
        }

        let rows = self.store.fetch_many(&self.query)?;
        let target = self.query.target();

        Ok(rows
            .into_iter()
            .map(|row| Instance::from_row(target, Some(Arc::clone(&self.store)), row))
            .collect())
    }

    pub fn count(&self) -> Result<usize, AccessError> {
        self.all().map(|rows| rows.len())
    }
}

impl fmt::Debug for RelatedManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelatedManager")
            .field("attribute", &self.attribute)
            .field("target", &self.query.target().path())
            .field("guarded", &self.is_guarded())
            .finish_non_exhaustive()
    }
}
