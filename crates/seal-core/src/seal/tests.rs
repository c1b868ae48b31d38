use crate::{
    config::SealConfig,
    error::AccessError,
    instance::{Attr, Instance},
    model::EntityType,
    obs::{metrics_report, metrics_reset_all},
    registry::Registry,
    seal::{AttributeCategory, Sealer, ViolationMode, WrapOutcome, seal_instance, wrap_attribute},
    store::{MemoryStore, Store},
    test_fixtures::{Fixture, sea_lion_defs},
};
use proptest::prelude::*;
use seal_schema::{
    node::{EntityDef, FieldDef},
    types::Value,
};
use std::{collections::BTreeMap, sync::Arc};

fn violation(result: Result<Attr, AccessError>) -> String {
    match result {
        Err(AccessError::Unsealed(err)) => err.to_string(),
        other => panic!("expected a sealing violation, got {other:?}"),
    }
}

fn enumeration_violation(instance: &mut Instance, name: &str) -> String {
    let manager = instance
        .get(name)
        .expect("handing out a manager never fetches")
        .into_many()
        .expect("attribute should be many-valued");

    match manager.all() {
        Err(AccessError::Unsealed(err)) => err.to_string(),
        other => panic!("expected a sealing violation, got {other:?}"),
    }
}

fn guarded_names(entity: &EntityType) -> Vec<String> {
    entity
        .accessor_names()
        .into_iter()
        .filter(|name| entity.local_accessor(name).is_some_and(|a| a.is_guarded()))
        .collect()
}

// ---------------------------------------------------------------------
// Guarded kinds
// ---------------------------------------------------------------------

#[test]
fn sealed_deferred_field_raises() {
    let fx = Fixture::new();
    let mut sea_lion = fx.load_sealed("SeaLion", &[("id", 1)]);

    assert_eq!(
        violation(sea_lion.get("weight")),
        "Cannot fetch deferred field weight on sealed <SeaLion instance>"
    );
    assert_eq!(fx.store.query_count(), 0);
}

#[test]
fn loaded_deferred_field_is_safe() {
    let fx = Fixture::new();
    let mut sea_lion = fx.load_sealed("SeaLion", &[("id", 1), ("weight", 7)]);

    let weight = sea_lion.get("weight").expect("weight is loaded");

    assert_eq!(weight.into_value().expect("scalar"), Value::Int(7));
    assert_eq!(fx.store.query_count(), 0);
}

#[test]
fn forward_relation_with_loaded_key_returns_key_only_instance() {
    let fx = Fixture::new();
    let mut sea_lion = fx.load_sealed("SeaLion", &[("id", 1), ("location_id", 1)]);

    let mut location = sea_lion
        .get("location")
        .expect("key is loaded")
        .into_related()
        .expect("single relation")
        .expect("key is not null");
    assert_eq!(fx.store.query_count(), 0);
    assert!(!location.is_sealed());
    assert!(location.key().is_some_and(|k| k.same_key(&Value::Int(1))));

    seal_instance(&mut location);
    assert_eq!(
        violation(location.get("name")),
        "Cannot fetch deferred field name on sealed <Location instance>"
    );
}

#[test]
fn forward_relation_without_key_raises() {
    let fx = Fixture::new();
    let mut gull = fx.load_sealed("SeaGull", &[("id", 1)]);

    assert_eq!(
        violation(gull.get("sealion")),
        "Cannot fetch related field sealion on sealed <SeaGull instance>"
    );
    assert_eq!(
        violation(gull.get("sealion_id")),
        "Cannot fetch deferred field sealion_id on sealed <SeaGull instance>"
    );
    assert_eq!(fx.store.query_count(), 0);
}

#[test]
fn reverse_foreign_key_raises_on_enumeration() {
    let fx = Fixture::new();
    let mut location = fx.load_sealed("Location", &[("id", 1)]);

    assert_eq!(
        enumeration_violation(&mut location, "visitors"),
        "Cannot fetch many-to-many field visitors on sealed <Location instance>"
    );
    assert_eq!(fx.store.query_count(), 0);
}

#[test]
fn reverse_one_to_one_raises() {
    let fx = Fixture::new();
    let mut sea_lion = fx.load_sealed("SeaLion", &[("id", 1)]);

    assert_eq!(
        violation(sea_lion.get("gull")),
        "Cannot fetch related field gull on sealed <SeaLion instance>"
    );
}

#[test]
fn reverse_parent_link_raises() {
    let fx = Fixture::new();
    let mut sea_lion = fx.load_sealed("SeaLion", &[("id", 1)]);

    assert_eq!(
        violation(sea_lion.get("greatsealion")),
        "Cannot fetch related field greatsealion on sealed <SeaLion instance>"
    );
}

#[test]
fn parent_link_without_key_raises() {
    let fx = Fixture::new();
    let mut great = fx.load_sealed("GreatSeaLion", &[("id", 1)]);

    assert_eq!(
        violation(great.get("sealion_ptr")),
        "Cannot fetch related field sealion_ptr on sealed <GreatSeaLion instance>"
    );
}

#[test]
fn parent_built_from_child_shares_seal_state() {
    let fx = Fixture::new();
    let columns = [
        ("id", 1),
        ("sealion_ptr_id", 1),
        ("height", 1),
        ("weight", 1),
        ("location_id", 1),
        ("leak_id", 1),
        ("leak_o2o_id", 1),
    ];
    let mut great = fx.load_sealed("GreatSeaLion", &columns);

    let mut parent = great
        .get("sealion_ptr")
        .expect("parent columns are loaded")
        .into_related()
        .expect("single relation")
        .expect("parent link is set");

    assert_eq!(parent.type_name(), "SeaLion");
    assert!(parent.is_sealed());
    assert!(parent.get("weight").is_ok());
    assert_eq!(
        violation(parent.get("gull")),
        "Cannot fetch related field gull on sealed <SeaLion instance>"
    );
    assert_eq!(fx.store.query_count(), 0);
}

#[test]
fn key_only_parent_is_sealed_with_the_child() {
    let fx = Fixture::new();
    let mut great = fx.load_sealed("GreatSeaLion", &[("id", 1), ("sealion_ptr_id", 1)]);

    let mut parent = great
        .get("sealion_ptr")
        .expect("link key is loaded")
        .into_related()
        .expect("single relation")
        .expect("parent link is set");

    assert!(parent.is_sealed());
    assert_eq!(parent.key(), Some(&Value::Int(1)));
    assert_eq!(
        violation(great.get("weight")),
        "Cannot fetch deferred field weight on sealed <GreatSeaLion instance>"
    );
    assert_eq!(
        violation(parent.get("weight")),
        "Cannot fetch deferred field weight on sealed <SeaLion instance>"
    );
    assert_eq!(fx.store.query_count(), 0);
}

#[test]
fn many_to_many_raises_on_enumeration_both_ways() {
    let fx = Fixture::new();
    let mut sea_lion = fx.load_sealed("SeaLion", &[("id", 1)]);
    let mut location = fx.load_sealed("Location", &[("id", 1)]);

    assert_eq!(
        enumeration_violation(&mut sea_lion, "previous_locations"),
        "Cannot fetch many-to-many field previous_locations on sealed <SeaLion instance>"
    );
    assert_eq!(
        enumeration_violation(&mut location, "previous_visitors"),
        "Cannot fetch many-to-many field previous_visitors on sealed <Location instance>"
    );
}

#[test]
fn many_to_many_raises_even_when_fully_loaded() {
    let fx = Fixture::new();
    let columns = [
        ("id", 1),
        ("height", 1),
        ("weight", 1),
        ("location_id", 1),
        ("leak_id", 1),
        ("leak_o2o_id", 1),
    ];
    let mut sea_lion = fx.load_sealed("SeaLion", &columns);

    let manager = sea_lion
        .get("previous_locations")
        .expect("handing out a manager never fetches")
        .into_many()
        .expect("many-valued");

    assert!(manager.is_guarded());
    assert!(manager.count().is_err());
}

#[test]
fn many_valued_without_store_still_reports_the_violation() {
    let fx = Fixture::new();
    let mut location = Instance::deferred(&fx.entity("Location"), None, Value::Int(1));
    seal_instance(&mut location);

    assert_eq!(
        violation(location.get("visitors")),
        "Cannot fetch many-to-many field visitors on sealed <Location instance>"
    );
}

#[test]
fn generic_foreign_key_raises_without_any_lookup() {
    let fx = Fixture::new();
    let gull_type = fx.entity("SeaGull").content_type_id();
    let gull_type = i64::try_from(gull_type).expect("content type ids are small");
    let mut nickname = fx.load_sealed(
        "Nickname",
        &[("id", 1), ("content_type", gull_type), ("object_id", 1)],
    );
    metrics_reset_all();

    assert_eq!(
        violation(nickname.get("content_object")),
        "Cannot fetch related field content_object on sealed <Nickname instance>"
    );
    assert_eq!(fx.store.query_count(), 0);
    assert_eq!(metrics_report().counters.ops.metadata_lookups, 0);
}

#[test]
fn generic_foreign_key_with_null_pair_is_safe() {
    let fx = Fixture::new();
    let mut nickname = Instance::from_db(
        &fx.entity("Nickname"),
        fx.store(),
        [
            ("id", Value::Int(1)),
            ("content_type", Value::Null),
            ("object_id", Value::Int(1)),
        ],
    )
    .expect("row should build");
    nickname.seal();

    let target = nickname.get("content_object").expect("empty pair is safe");

    assert!(target.into_related().expect("single relation").is_none());
}

#[test]
fn generic_foreign_key_cache_must_match_loaded_pair() {
    let fx = Fixture::new();
    let gull_type = fx.entity("SeaGull").content_type_id();
    let mut nickname = Instance::from_db(
        &fx.entity("Nickname"),
        fx.store(),
        [
            ("id", Value::Int(1)),
            ("content_type", Value::Uint(gull_type)),
            ("object_id", Value::Int(1)),
        ],
    )
    .expect("row should build");

    let target = nickname
        .get("content_object")
        .expect("unsealed fetch")
        .into_related()
        .expect("single relation")
        .expect("target row exists");
    assert_eq!(target.type_name(), "SeaGull");

    nickname.seal();
    assert!(nickname.get("content_object").is_ok());

    nickname.set("object_id", 2).expect("column exists");
    assert_eq!(
        violation(nickname.get("content_object")),
        "Cannot fetch related field content_object on sealed <Nickname instance>"
    );
}

#[test]
fn generic_relation_raises_on_enumeration() {
    let fx = Fixture::new();
    let mut gull = fx.load_sealed("SeaGull", &[("id", 1)]);

    assert_eq!(
        enumeration_violation(&mut gull, "nicknames"),
        "Cannot fetch many-to-many field nicknames on sealed <SeaGull instance>"
    );
    assert_eq!(fx.store.query_count(), 0);
}

// ---------------------------------------------------------------------
// Unsealed behaviour
// ---------------------------------------------------------------------

#[test]
fn unsealed_instances_never_raise() {
    let fx = Fixture::new();
    let sea_lion = fx.entity("SeaLion");

    for name in sea_lion.accessor_names() {
        let mut instance = fx.load("SeaLion", &[("id", 1)]);
        let attr = instance.get(&name);
        assert!(attr.is_ok(), "{name}: {attr:?}");

        if let Ok(Attr::Many(manager)) = attr {
            assert!(!manager.is_guarded());
            assert!(manager.all().is_ok(), "{name}");
        }
    }
}

#[test]
fn unsealed_enumeration_queries_the_store() {
    let fx = Fixture::new();
    let mut gull = fx.load("SeaGull", &[("id", 1)]);

    let nicknames = gull
        .get("nicknames")
        .expect("manager")
        .into_many()
        .expect("many-valued")
        .all()
        .expect("unsealed enumeration");

    assert_eq!(nicknames.len(), 1);
    assert_eq!(fx.store.query_count(), 1);
}

#[test]
fn seal_is_idempotent() {
    let fx = Fixture::new();
    let mut once = fx.load("SeaLion", &[("id", 1)]);
    let mut twice = fx.load("SeaLion", &[("id", 1)]);

    seal_instance(&mut once);
    seal_instance(&mut twice);
    seal_instance(&mut twice);

    assert_eq!(once.state(), twice.state());
    assert_eq!(violation(once.get("weight")), violation(twice.get("weight")));
}

#[test]
fn sealing_unprepared_type_has_no_effect() {
    let fx = Fixture::new();
    let mut leak = fx.load_sealed("Leak", &[("id", 1)]);

    assert!(!fx.entity("Leak").is_prepared());
    assert!(leak.get("id").is_ok());
}

#[test]
fn hidden_reverse_accessors_are_not_installed() {
    let fx = Fixture::new();
    let leak = fx.entity("Leak");

    assert!(leak.accessor("leaks").is_none());
    assert!(leak.accessor("sealion_set").is_none());
    assert!(leak.reverse_accessors().is_empty());
    assert_eq!(wrap_attribute(&leak, "leaks", ViolationMode::Error), WrapOutcome::Missing);
}

// ---------------------------------------------------------------------
// Warn mode
// ---------------------------------------------------------------------

#[test]
fn warn_mode_logs_and_fetches() {
    let fx = Fixture::with_mode(ViolationMode::Warn);
    let mut sea_lion = fx.load_sealed("SeaLion", &[("id", 1)]);
    metrics_reset_all();

    let weight = sea_lion.get("weight").expect("warn mode fetches");

    assert_eq!(weight.into_value().expect("scalar"), Value::Int(100));
    assert_eq!(fx.store.query_count(), 1);

    let report = metrics_report();
    assert_eq!(report.counters.ops.violations_warned, 1);
    assert_eq!(report.counters.ops.violations_raised, 0);
    assert_eq!(report.noisiest, vec![("tests.SeaLion".to_string(), 1)]);
}

#[test]
fn warn_mode_enumerates() {
    let fx = Fixture::with_mode(ViolationMode::Warn);
    let mut location = fx.load_sealed("Location", &[("id", 1)]);

    let visitors = location
        .get("visitors")
        .expect("manager")
        .into_many()
        .expect("many-valued")
        .all()
        .expect("warn mode enumerates");

    assert_eq!(visitors.len(), 1);
}

// ---------------------------------------------------------------------
// Preparation
// ---------------------------------------------------------------------

#[test]
fn only_sealable_concrete_types_are_prepared() {
    let fx = Fixture::new();

    for name in ["SeaLion", "GreatSeaLion", "Location", "SeaGull", "Nickname"] {
        assert!(fx.entity(name).is_prepared(), "{name}");
    }
    assert!(!fx.entity("Leak").is_prepared());
    assert!(fx.registry.pending_targets().is_empty());
}

#[test]
fn foreign_key_column_is_guarded_too() {
    let fx = Fixture::new();
    let guarded = guarded_names(&fx.entity("SeaLion"));

    for name in ["location", "location_id", "weight", "gull", "greatsealion"] {
        assert!(guarded.contains(&name.to_string()), "{name}");
    }
}

#[test]
fn wrapping_twice_is_a_no_op() {
    let fx = Fixture::new();
    let sea_lion = fx.entity("SeaLion");

    assert_eq!(
        wrap_attribute(&sea_lion, "weight", ViolationMode::Warn),
        WrapOutcome::AlreadyGuarded
    );
    assert_eq!(
        violation(fx.load_sealed("SeaLion", &[("id", 1)]).get("weight")),
        "Cannot fetch deferred field weight on sealed <SeaLion instance>"
    );
}

#[test]
fn transient_attributes_are_never_guarded() {
    let registry = Registry::new("tests");
    Sealer::install(&registry, SealConfig::default());
    let walrus = registry
        .define(
            EntityDef::new("Walrus")
                .sealable()
                .field(FieldDef::transient("mood", "calm")),
        )
        .expect("type should define");

    assert_eq!(
        wrap_attribute(&walrus, "mood", ViolationMode::Error),
        WrapOutcome::Unguarded
    );

    let mut instance = Instance::deferred(&walrus, None, Value::Int(1));
    instance.seal();
    assert_eq!(
        instance.get("mood").expect("transient").into_value().expect("scalar"),
        Value::from("calm")
    );
}

// ---------------------------------------------------------------------
// make_sealable
// ---------------------------------------------------------------------

fn foo_bar() -> (Registry, Arc<Sealer>, Arc<EntityType>, Arc<EntityType>) {
    let registry = Registry::new("tests");
    let sealer = Sealer::install(&registry, SealConfig::default());
    let foo = registry.define(EntityDef::new("Foo")).expect("Foo");
    let bar = registry
        .define(
            EntityDef::new("Bar")
                .field(FieldDef::value("foo"))
                .field(FieldDef::foreign_key("fk", "Foo").related_name("fk_bar"))
                .field(FieldDef::one_to_one("o2o", "Foo").related_name("o2o_bar"))
                .field(FieldDef::many_to_many("m2m", "Foo").related_name("m2m_bar")),
        )
        .expect("Bar");

    (registry, sealer, foo, bar)
}

#[test]
fn make_sealable_guards_both_sides() {
    let (registry, sealer, foo, bar) = foo_bar();
    assert!(guarded_names(&bar).is_empty());

    sealer.make_sealable(&registry, &bar).expect("Bar is eligible");

    assert!(bar.is_sealable() && bar.is_prepared());
    assert!(foo.is_sealable() && foo.is_prepared());
    assert_eq!(
        guarded_names(&bar),
        ["fk", "fk_id", "foo", "id", "m2m", "o2o", "o2o_id"]
    );
    assert_eq!(guarded_names(&foo), ["fk_bar", "id", "m2m_bar", "o2o_bar"]);

    let mut instance = Instance::deferred(&foo, None, Value::Int(1));
    instance.seal();
    assert_eq!(
        violation(instance.get("o2o_bar")),
        "Cannot fetch related field o2o_bar on sealed <Foo instance>"
    );
}

#[test]
fn make_sealable_twice_is_a_no_op() {
    let (registry, sealer, foo, bar) = foo_bar();
    sealer.make_sealable(&registry, &bar).expect("first call");
    metrics_reset_all();

    sealer.make_sealable(&registry, &bar).expect("second call");
    sealer.make_sealable(&registry, &foo).expect("target too");

    let report = metrics_report();
    assert_eq!(report.counters.ops.accessors_wrapped, 0);
    assert_eq!(report.counters.ops.types_prepared, 0);
}

#[test]
fn make_sealable_queues_undefined_targets() {
    let registry = Registry::new("tests");
    let sealer = Sealer::install(&registry, SealConfig::default());
    let baz = registry
        .define(EntityDef::new("Baz").field(FieldDef::foreign_key("qux", "Qux")))
        .expect("Baz");

    sealer.make_sealable(&registry, &baz).expect("Baz is eligible");
    assert!(guarded_names(&baz).contains(&"qux".to_string()));

    let qux = registry
        .define(EntityDef::new("Qux").sealable())
        .expect("Qux");
    assert!(guarded_names(&qux).contains(&"baz_set".to_string()));
    assert!(registry.pending_targets().is_empty());
}

#[test]
fn make_sealable_rejects_ineligible_types() {
    let registry = Registry::new("tests");
    let sealer = Sealer::install(&registry, SealConfig::default());
    let base = registry
        .define(EntityDef::new("Base").abstract_type())
        .expect("Base");
    let plain = registry.define(EntityDef::new("Plain")).expect("Plain");
    let proxy = registry
        .define(EntityDef::new("Shadow").proxy_of("Plain"))
        .expect("Shadow");
    let stranger = Registry::new("other")
        .define(EntityDef::new("Plain"))
        .expect("foreign Plain");

    for entity in [&base, &proxy, &stranger] {
        let diagnostic = sealer
            .make_sealable(&registry, entity)
            .expect_err("type is ineligible");
        assert_eq!(diagnostic.id, crate::check::E002);
        assert_eq!(diagnostic.object, entity.path());
    }
    let proxy_hint = sealer
        .make_sealable(&registry, &proxy)
        .expect_err("proxy")
        .hint;
    assert_eq!(proxy_hint.as_deref(), Some("Make tests.Plain sealable instead."));
    assert!(!plain.is_sealable());
}

fn plain_shadow_owner() -> (Registry, Arc<Sealer>, [Arc<EntityType>; 3]) {
    let registry = Registry::new("tests");
    let sealer = Sealer::install(&registry, SealConfig::default());
    let plain = registry.define(EntityDef::new("Plain")).expect("Plain");
    let shadow = registry
        .define(EntityDef::new("Shadow").proxy_of("Plain"))
        .expect("Shadow");
    let owner = registry
        .define(EntityDef::new("Owner").field(FieldDef::foreign_key("shadow", "Shadow")))
        .expect("Owner");

    (registry, sealer, [plain, shadow, owner])
}

fn assert_owner_set_guarded(shadow: &Arc<EntityType>) {
    assert!(shadow.is_sealable());
    assert_eq!(guarded_names(shadow), ["owner_set"]);

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut instance = Instance::deferred(shadow, Some(store), Value::Int(1));
    seal_instance(&mut instance);
    assert_eq!(
        enumeration_violation(&mut instance, "owner_set"),
        "Cannot fetch many-to-many field owner_set on sealed <Shadow instance>"
    );
}

#[test]
fn make_sealable_through_a_proxy_target_reaches_its_base() {
    let (registry, sealer, [plain, shadow, owner]) = plain_shadow_owner();

    sealer.make_sealable(&registry, &owner).expect("Owner is eligible");

    assert!(plain.is_sealable() && plain.is_prepared());
    assert!(!shadow.is_prepared());
    assert_owner_set_guarded(&shadow);
}

#[test]
fn make_sealable_on_a_base_guards_its_proxies() {
    let (registry, sealer, [plain, shadow, _]) = plain_shadow_owner();
    assert!(!shadow.is_sealable());

    sealer.make_sealable(&registry, &plain).expect("Plain is eligible");

    assert_owner_set_guarded(&shadow);
}

// ---------------------------------------------------------------------
// Order independence
// ---------------------------------------------------------------------

fn guarded_by_type(defs: Vec<EntityDef>) -> BTreeMap<String, Vec<String>> {
    let registry = Registry::new("tests");
    Sealer::install(&registry, SealConfig::default());
    for def in defs {
        registry.define(def).expect("type should define");
    }

    registry
        .types()
        .iter()
        .map(|entity| (entity.path().to_string(), guarded_names(entity)))
        .collect()
}

// GreatSeaLion's parent must exist before it.
fn parents_first(mut defs: Vec<EntityDef>) -> Vec<EntityDef> {
    let position = |defs: &[EntityDef], ident: &str| defs.iter().position(|d| d.ident == ident);

    if let (Some(child), Some(parent)) = (
        position(&defs, "GreatSeaLion"),
        position(&defs, "SeaLion"),
    ) && child < parent
    {
        let def = defs.remove(child);
        defs.insert(parent, def);
    }

    defs
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn definition_order_does_not_change_guards(
        defs in Just(sea_lion_defs()).prop_shuffle()
    ) {
        let expected = guarded_by_type(sea_lion_defs());

        prop_assert_eq!(guarded_by_type(parents_first(defs)), expected);
    }

    #[test]
    fn sealing_any_number_of_times_equals_once(times in 1_usize..5) {
        let fx = Fixture::new();
        let mut instance = fx.load("SeaLion", &[("id", 1)]);
        for _ in 0..times {
            seal_instance(&mut instance);
        }

        prop_assert!(instance.is_sealed());
        let err = instance.get("weight").expect_err("sealed");
        prop_assert_eq!(
            err.as_unsealed().map(|v| v.category),
            Some(AttributeCategory::Deferred)
        );
    }
}
