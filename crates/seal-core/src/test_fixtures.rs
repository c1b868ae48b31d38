use crate::{
    config::SealConfig,
    instance::Instance,
    model::EntityType,
    registry::Registry,
    seal::{Sealer, ViolationMode},
    store::{MemoryStore, Store},
};
use seal_schema::{
    node::{EntityDef, FieldDef, ManagerDef},
    types::Value,
};
use std::sync::Arc;

///
/// Fixture
///
/// The sea-lion schema under app label `tests`, defined with a sealer
/// installed, and a store holding one row per type (key 1).
///

pub(crate) struct Fixture {
    pub(crate) registry: Registry,
    pub(crate) sealer: Arc<Sealer>,
    pub(crate) store: Arc<MemoryStore>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_mode(ViolationMode::Error)
    }

    pub(crate) fn with_mode(mode: ViolationMode) -> Self {
        let registry = Registry::new("tests");
        let sealer = Sealer::install(&registry, SealConfig::default().with_violation(mode));
        for def in sea_lion_defs() {
            registry.define(def).expect("fixture type should define");
        }

        let store = Arc::new(MemoryStore::new());
        seed(&registry, &store);

        Self {
            registry,
            sealer,
            store,
        }
    }

    pub(crate) fn entity(&self, name: &str) -> Arc<EntityType> {
        self.registry.get(name).expect("fixture type should exist")
    }

    pub(crate) fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store) as Arc<dyn Store>
    }

    /// Instance loaded with only `columns` (integer values), as a query
    /// deferring everything else would build it.
    pub(crate) fn load(&self, name: &str, columns: &[(&str, i64)]) -> Instance {
        Instance::from_db(
            &self.entity(name),
            self.store(),
            columns.iter().map(|(c, v)| (*c, Value::Int(*v))),
        )
        .expect("fixture row should build")
    }

    pub(crate) fn load_sealed(&self, name: &str, columns: &[(&str, i64)]) -> Instance {
        let mut instance = self.load(name, columns);
        instance.seal();
        instance
    }
}

/// Definitions in an order that leaves relations pending: `SeaLion` before
/// `Location` and `Leak`, `SeaGull` before `Nickname`.
pub(crate) fn sea_lion_defs() -> Vec<EntityDef> {
    vec![
        EntityDef::new("SeaLion")
            .sealable()
            .field(FieldDef::value("height"))
            .field(FieldDef::value("weight"))
            .field(FieldDef::foreign_key("location", "Location").related_name("visitors"))
            .field(
                FieldDef::many_to_many("previous_locations", "Location")
                    .related_name("previous_visitors"),
            )
            .field(FieldDef::foreign_key("leak", "Leak").related_name("+"))
            .field(FieldDef::one_to_one("leak_o2o", "Leak").related_name("leaks+"))
            .manager(ManagerDef::sealable("objects")),
        EntityDef::new("Location")
            .sealable()
            .field(FieldDef::value("name")),
        EntityDef::new("Leak"),
        EntityDef::new("GreatSeaLion").parent("SeaLion"),
        EntityDef::new("SeaGull")
            .sealable()
            .field(FieldDef::one_to_one("sealion", "SeaLion").related_name("gull"))
            .field(FieldDef::generic_relation(
                "nicknames",
                "Nickname",
                "content_type",
                "object_id",
            )),
        EntityDef::new("Nickname")
            .sealable()
            .field(FieldDef::value("name"))
            .field(FieldDef::value("content_type"))
            .field(FieldDef::value("object_id"))
            .field(FieldDef::generic_foreign_key(
                "content_object",
                "content_type",
                "object_id",
            )),
    ]
}

fn seed(registry: &Registry, store: &MemoryStore) {
    let get = |name: &str| registry.get(name).expect("fixture type should exist");
    let gull_type = get("SeaGull").content_type_id();
    let one = Value::Int(1);
    let sea_lion = [
        ("height", Value::Int(1)),
        ("weight", Value::Int(100)),
        ("location_id", one.clone()),
        ("leak_id", one.clone()),
        ("leak_o2o_id", one.clone()),
    ];

    let rows: Vec<(&str, Vec<(&str, Value)>)> = vec![
        ("Location", vec![("id", one.clone()), ("name", "Pool".into())]),
        ("Leak", vec![("id", one.clone())]),
        (
            "SeaLion",
            [("id", one.clone())].into_iter().chain(sea_lion.clone()).collect(),
        ),
        (
            "GreatSeaLion",
            [("id", one.clone()), ("sealion_ptr_id", one.clone())]
                .into_iter()
                .chain(sea_lion)
                .collect(),
        ),
        ("SeaGull", vec![("id", one.clone()), ("sealion_id", one.clone())]),
        (
            "Nickname",
            vec![
                ("id", one.clone()),
                ("name", "Gully".into()),
                ("content_type", Value::Uint(gull_type)),
                ("object_id", one.clone()),
            ],
        ),
    ];
    for (name, row) in rows {
        store.insert(&get(name), row).expect("fixture row should insert");
    }

    store.link("tests.SeaLion.previous_locations", one.clone(), one);
}
