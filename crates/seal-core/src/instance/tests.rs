use crate::{
    error::{AccessError, ErrorClass},
    instance::{Attr, Instance},
    registry::Registry,
    test_fixtures::Fixture,
};
use seal_schema::{node::EntityDef, types::Value};

fn internal(result: Result<Attr, AccessError>) -> ErrorClass {
    match result {
        Err(AccessError::Internal(err)) => err.class,
        other => panic!("expected an internal error, got {other:?}"),
    }
}

#[test]
fn deferred_field_is_fetched_once() {
    let fx = Fixture::new();
    let mut sea_lion = fx.load("SeaLion", &[("id", 1)]);

    for _ in 0..2 {
        let weight = sea_lion.get("weight").expect("fetch");
        assert_eq!(weight.into_value().expect("scalar"), Value::Int(100));
    }

    assert!(sea_lion.is_loaded("weight"));
    assert_eq!(fx.store.query_count(), 1);
}

#[test]
fn forward_relation_fetches_missing_key() {
    let fx = Fixture::new();
    let mut sea_lion = fx.load("SeaLion", &[("id", 1)]);

    let location = sea_lion
        .get("location")
        .expect("fetch")
        .into_related()
        .expect("single relation")
        .expect("location set");

    assert_eq!(location.type_name(), "Location");
    assert!(sea_lion.is_cached("location"));
    assert_eq!(fx.store.query_count(), 1);
}

#[test]
fn null_forward_key_is_cached_as_empty() {
    let fx = Fixture::new();
    let mut gull = Instance::from_db(
        &fx.entity("SeaGull"),
        fx.store(),
        [("id", Value::Int(1)), ("sealion_id", Value::Null)],
    )
    .expect("row should build");

    let sealion = gull.get("sealion").expect("null key");

    assert!(sealion.into_related().expect("single relation").is_none());
    assert!(matches!(gull.cached("sealion"), Some(None)));
}

#[test]
fn setting_the_key_drops_the_cached_relation() {
    let fx = Fixture::new();
    let mut sea_lion = fx.load("SeaLion", &[("id", 1), ("location_id", 1)]);
    sea_lion.get("location").expect("key-only instance");
    assert!(sea_lion.is_cached("location"));

    sea_lion.set("location_id", 2).expect("column exists");

    assert!(!sea_lion.is_cached("location"));
    assert_eq!(sea_lion.value("location_id"), Some(&Value::Int(2)));
}

#[test]
fn reverse_one_to_one_looks_up_the_remote_column() {
    let fx = Fixture::new();
    let mut sea_lion = fx.load("SeaLion", &[("id", 1)]);

    let gull = sea_lion
        .get("gull")
        .expect("lookup")
        .into_related()
        .expect("single relation")
        .expect("gull exists");

    assert_eq!(gull.type_name(), "SeaGull");
    assert_eq!(gull.value("sealion_id"), Some(&Value::Int(1)));
    assert_eq!(fx.store.query_count(), 1);
}

#[test]
fn many_valued_handles_are_lazy() {
    let fx = Fixture::new();
    let mut location = fx.load("Location", &[("id", 1)]);

    let visitors = location
        .get("visitors")
        .expect("manager")
        .into_many()
        .expect("many-valued");
    assert_eq!(fx.store.query_count(), 0);

    assert_eq!(visitors.attribute(), "visitors");
    assert_eq!(visitors.count().expect("count"), 1);
    assert_eq!(fx.store.query_count(), 1);
}

#[test]
fn inherited_attributes_resolve_through_the_parent() {
    let fx = Fixture::new();
    let mut great = fx.load("GreatSeaLion", &[("sealion_ptr_id", 1)]);

    let height = great.get("height").expect("inherited field");

    assert_eq!(height.into_value().expect("scalar"), Value::Int(1));
    assert_eq!(great.key(), Some(&Value::Int(1)));
}

#[test]
fn unknown_attribute_is_not_found() {
    let fx = Fixture::new();
    let mut sea_lion = fx.load("SeaLion", &[("id", 1)]);

    assert_eq!(internal(sea_lion.get("wings")), ErrorClass::NotFound);
    assert!(sea_lion.set("wings", 2).is_err());
}

#[test]
fn unknown_columns_are_rejected() {
    let fx = Fixture::new();

    let err = Instance::from_db(&fx.entity("SeaLion"), fx.store(), [("wings", Value::Int(2))])
        .expect_err("no such column");

    assert!(err.is_not_found());
}

#[test]
fn abstract_types_cannot_be_instantiated() {
    let fx = Fixture::new();
    let animal = Registry::new("tests")
        .define(EntityDef::new("Animal").abstract_type())
        .expect("abstract type should define");

    let err = Instance::from_db(&animal, fx.store(), [("id", Value::Int(1))])
        .expect_err("abstract");

    assert_eq!(err.class, ErrorClass::Unsupported);
}

#[test]
fn unbound_instance_cannot_fetch() {
    let fx = Fixture::new();
    let mut sea_lion = Instance::deferred(&fx.entity("SeaLion"), None, Value::Int(1));

    assert_eq!(internal(sea_lion.get("weight")), ErrorClass::Unsupported);
}

#[test]
fn attr_shape_mismatch_is_an_error() {
    let fx = Fixture::new();
    let mut sea_lion = fx.load("SeaLion", &[("id", 1)]);

    let attr = sea_lion.get("id").expect("loaded");

    assert!(attr.into_many().is_err());
}

#[test]
fn display_names_the_type_only() {
    let fx = Fixture::new();
    let sea_lion = fx.load("SeaLion", &[("id", 1), ("weight", 3)]);

    assert_eq!(sea_lion.to_string(), "<SeaLion instance>");
}
