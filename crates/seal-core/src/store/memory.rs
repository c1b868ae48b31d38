use crate::{
    model::EntityType,
    store::{RelatedQuery, Row, Store, StoreError},
};
use seal_schema::types::Value;
use std::{
    collections::BTreeMap,
    sync::{
        RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

type Table = BTreeMap<String, Row>;

///
/// MemoryStore
///
/// Tables keyed by concrete type path, rows keyed by their primary key's
/// textual form. Child types of multi-table inheritance keep full rows
/// (inherited columns included). Every read counts as one query.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, Table>>,
    links: RwLock<BTreeMap<String, Vec<(Value, Value)>>>,
    queries: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row of `entity`.
    pub fn insert<I, K, V>(&self, entity: &EntityType, row: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let entity = entity.concrete();
        let mut stored = Row::new();
        for (column, value) in row {
            let column = column.into();
            if !entity.has_column(&column) {
                return Err(StoreError::UnknownColumn {
                    entity: entity.path().to_string(),
                    column,
                });
            }
            stored.insert(column, value.into());
        }

        let key = entity
            .primary_key()
            .and_then(|pk| stored.get(pk))
            .map(Value::key_repr)
            .ok_or_else(|| StoreError::MissingKey {
                entity: entity.path().to_string(),
            })?;

        self.tables
            .write()
            .expect("memory store RwLock poisoned")
            .entry(entity.path().to_string())
            .or_default()
            .insert(key, stored);

        Ok(())
    }

    /// Link two keys through a many-to-many link table.
    pub fn link(&self, link: &str, from: impl Into<Value>, to: impl Into<Value>) {
        self.links
            .write()
            .expect("memory store RwLock poisoned")
            .entry(link.to_string())
            .or_default()
            .push((from.into(), to.into()));
    }

    #[must_use]
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn reset_query_count(&self) {
        self.queries.store(0, Ordering::Relaxed);
    }

    fn count_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    fn read_table<R>(&self, entity: &EntityType, f: impl FnOnce(Option<&Table>) -> R) -> R {
        let tables = self.tables.read().expect("memory store RwLock poisoned");

        f(tables.get(entity.concrete().path()))
    }

    fn rows_where(&self, entity: &EntityType, pred: impl Fn(&Row) -> bool) -> Vec<Row> {
        self.read_table(entity, |table| {
            table
                .into_iter()
                .flat_map(BTreeMap::values)
                .filter(|row| pred(row))
                .cloned()
                .collect()
        })
    }

    fn rows_by_keys(&self, entity: &EntityType, keys: &[Value]) -> Vec<Row> {
        self.read_table(entity, |table| {
            keys.iter()
                .filter_map(|k| table.and_then(|t| t.get(&k.key_repr())))
                .cloned()
                .collect()
        })
    }
}

impl Store for MemoryStore {
    fn fetch_value(
        &self,
        entity: &EntityType,
        key: &Value,
        column: &str,
    ) -> Result<Value, StoreError> {
        self.count_query();
        if !entity.has_column(column) {
            return Err(StoreError::UnknownColumn {
                entity: entity.path().to_string(),
                column: column.to_string(),
            });
        }

        self.read_table(entity, |table| {
            let row = table
                .and_then(|t| t.get(&key.key_repr()))
                .ok_or_else(|| StoreError::RowNotFound {
                    entity: entity.path().to_string(),
                    key: key.key_repr(),
                })?;

            Ok(row.get(column).cloned().unwrap_or_default())
        })
    }

    fn fetch_row(&self, entity: &EntityType, key: &Value) -> Result<Option<Row>, StoreError> {
        self.count_query();

        Ok(self.read_table(entity, |table| {
            table.and_then(|t| t.get(&key.key_repr())).cloned()
        }))
    }

    fn fetch_by_column(
        &self,
        entity: &EntityType,
        column: &str,
        value: &Value,
    ) -> Result<Option<Row>, StoreError> {
        self.count_query();

        Ok(self
            .rows_where(entity, |row| row.get(column).is_some_and(|v| v.same_key(value)))
            .into_iter()
            .next())
    }

    fn fetch_many(&self, query: &RelatedQuery) -> Result<Vec<Row>, StoreError> {
        self.count_query();

        let rows = match query {
            RelatedQuery::ReverseForeignKey {
                entity,
                column,
                key,
            } => self.rows_where(entity, |row| row.get(column).is_some_and(|v| v.same_key(key))),

            RelatedQuery::ManyToMany {
                link,
                target,
                reverse,
                key,
            } => {
                let keys = self
                    .links
                    .read()
                    .expect("memory store RwLock poisoned")
                    .get(link)
                    .into_iter()
                    .flatten()
                    .filter_map(|(from, to)| {
                        let (near, far) = if *reverse { (to, from) } else { (from, to) };
                        near.same_key(key).then(|| far.clone())
                    })
                    .collect::<Vec<_>>();

                self.rows_by_keys(target, &keys)
            }

            RelatedQuery::Generic {
                entity,
                type_column,
                key_column,
                type_id,
                key,
            } => self.rows_where(entity, |row| {
                row.get(type_column).and_then(Value::as_uint) == Some(*type_id)
                    && row.get(key_column).is_some_and(|v| v.same_key(key))
            }),
        };

        Ok(rows)
    }

    fn scan(&self, entity: &EntityType) -> Result<Vec<Row>, StoreError> {
        self.count_query();

        Ok(self.rows_where(entity, |_| true))
    }
}
