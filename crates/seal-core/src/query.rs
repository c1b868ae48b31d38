use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    instance::Instance,
    model::EntityType,
    store::{Row, Store},
};
use seal_schema::types::Value;
use std::{collections::BTreeSet, fmt, sync::Arc};

///
/// SealableQuery
///
/// Loads instances of one type from a store. With `seal()` requested every
/// instance it hands out is sealed; instances reached from them later are
/// not.
///

pub struct SealableQuery {
    entity: Arc<EntityType>,
    store: Arc<dyn Store>,
    only: Option<BTreeSet<String>>,
    seal: bool,
}

impl SealableQuery {
    #[must_use]
    pub fn new(entity: &Arc<EntityType>, store: Arc<dyn Store>) -> Self {
        Self {
            entity: Arc::clone(entity),
            store,
            only: None,
            seal: false,
        }
    }

    /// Query through a manager declared on `entity`; the manager must be a
    /// sealable one.
    pub fn for_manager(
        entity: &Arc<EntityType>,
        manager: &str,
        store: Arc<dyn Store>,
    ) -> Result<Self, InternalError> {
        let def = entity.manager(manager).ok_or_else(|| {
            InternalError::new(
                ErrorClass::NotFound,
                ErrorOrigin::Instance,
                format!("'{}' has no manager '{manager}'", entity.path()),
            )
        })?;
        if !def.requires_sealable_type() {
            return Err(InternalError::instance_unsupported(format!(
                "manager '{}.{manager}' is a {}, not a sealable manager",
                entity.path(),
                def.kind
            )));
        }

        Ok(Self::new(entity, store))
    }

    /// Load only these columns (the primary key always comes along).
    #[must_use]
    pub fn only<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut only = columns.into_iter().map(Into::into).collect::<BTreeSet<_>>();
        if let Some(pk) = self.entity.primary_key() {
            only.insert(pk.to_string());
        }

        self.only = Some(only);
        self
    }

    #[must_use]
    pub const fn seal(mut self) -> Self {
        self.seal = true;
        self
    }

    #[must_use]
    pub const fn is_sealing(&self) -> bool {
        self.seal
    }

    pub fn get(&self, key: &Value) -> Result<Option<Instance>, InternalError> {
        let row = self.store.fetch_row(self.entity.concrete(), key)?;

        row.map(|row| self.materialize(row)).transpose()
    }

    pub fn all(&self) -> Result<Vec<Instance>, InternalError> {
        self.store
            .scan(self.entity.concrete())?
            .into_iter()
            .map(|row| self.materialize(row))
            .collect()
    }

    fn materialize(&self, mut row: Row) -> Result<Instance, InternalError> {
        if let Some(only) = &self.only {
            if let Some(unknown) = only.iter().find(|c| !self.entity.has_column(c)) {
                return Err(InternalError::new(
                    ErrorClass::NotFound,
                    ErrorOrigin::Instance,
                    format!("'{}' has no column '{unknown}'", self.entity.path()),
                ));
            }
            row.retain(|column, _| only.contains(column));
        }

        let mut instance = Instance::from_row(&self.entity, Some(Arc::clone(&self.store)), row);
        if self.seal {
            instance.seal();
        }

        Ok(instance)
    }
}

impl fmt::Debug for SealableQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealableQuery")
            .field("entity", &self.entity.path())
            .field("only", &self.only)
            .field("seal", &self.seal)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AccessError, test_fixtures::Fixture};

    #[test]
    fn sealed_query_seals_every_instance() {
        let fx = Fixture::new();
        let query = SealableQuery::for_manager(&fx.entity("SeaLion"), "objects", fx.store())
            .expect("objects is sealable")
            .only(["height"])
            .seal();

        let mut sea_lions = query.all().expect("scan");
        assert_eq!(sea_lions.len(), 1);

        let sea_lion = &mut sea_lions[0];
        assert!(sea_lion.is_sealed());
        assert!(sea_lion.is_loaded("id"));
        assert!(!sea_lion.is_loaded("weight"));
        assert!(matches!(
            sea_lion.get("weight"),
            Err(AccessError::Unsealed(_))
        ));
    }

    #[test]
    fn related_instances_are_not_sealed() {
        let fx = Fixture::new();
        let mut sea_lion = SealableQuery::new(&fx.entity("SeaLion"), fx.store())
            .seal()
            .get(&Value::Int(1))
            .expect("fetch")
            .expect("row exists");

        let location = sea_lion
            .get("location")
            .expect("key is loaded")
            .into_related()
            .expect("single relation")
            .expect("location set");

        assert!(sea_lion.is_sealed());
        assert!(!location.is_sealed());
    }

    #[test]
    fn unsealed_query_fetches_lazily() {
        let fx = Fixture::new();
        let query = SealableQuery::new(&fx.entity("Location"), fx.store()).only(["id"]);
        assert!(!query.is_sealing());

        let mut location = query.get(&Value::Int(1)).expect("fetch").expect("row");

        assert_eq!(
            location.get("name").expect("lazy fetch").into_value().expect("scalar"),
            Value::from("Pool")
        );
        assert_eq!(fx.store.query_count(), 2);
    }

    #[test]
    fn missing_rows_are_none() {
        let fx = Fixture::new();
        let query = SealableQuery::new(&fx.entity("Location"), fx.store());

        assert!(query.get(&Value::Int(9)).expect("fetch").is_none());
    }

    #[test]
    fn plain_and_unknown_managers_are_rejected() {
        let fx = Fixture::new();
        let sea_lion = fx.entity("SeaLion");

        let err = SealableQuery::for_manager(&sea_lion, "nope", fx.store()).expect_err("missing");
        assert!(err.is_not_found());

        let location = fx.entity("Location");
        assert!(SealableQuery::for_manager(&location, "objects", fx.store()).is_err());
    }

    #[test]
    fn unknown_only_column_is_an_error() {
        let fx = Fixture::new();
        let query = SealableQuery::new(&fx.entity("Location"), fx.store()).only(["colour"]);

        assert!(query.all().is_err());
    }
}
