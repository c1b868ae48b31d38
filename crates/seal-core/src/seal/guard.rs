use crate::{
    accessor::{AccessorKind, AttributeBinding, cached_generic_target_matches},
    instance::Instance,
    seal::AttributeCategory,
};
use std::{collections::BTreeMap, sync::LazyLock};

///
/// GuardCheck
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GuardCheck {
    /// Answerable from loaded state.
    Safe,
    /// Would load data.
    Unsafe,
    /// Safe to hand out, violation on enumeration.
    OnEnumerate,
}

///
/// GuardStrategy
///
/// Safe-value rule for one accessor kind. `check` must only read state
/// already on the instance.
///

pub trait GuardStrategy: Send + Sync {
    fn category(&self) -> AttributeCategory;

    fn check(&self, instance: &Instance, binding: &AttributeBinding) -> GuardCheck;
}

struct DeferredFieldGuard;

impl GuardStrategy for DeferredFieldGuard {
    fn category(&self) -> AttributeCategory {
        AttributeCategory::Deferred
    }

    fn check(&self, instance: &Instance, binding: &AttributeBinding) -> GuardCheck {
        let column = binding.column.as_deref().unwrap_or(&binding.name);

        loaded(instance.is_loaded(column))
    }
}

// Key loaded is enough: the original accessor answers with a key-only
// instance.
struct ForwardSingleGuard;

impl GuardStrategy for ForwardSingleGuard {
    fn category(&self) -> AttributeCategory {
        AttributeCategory::Related
    }

    fn check(&self, instance: &Instance, binding: &AttributeBinding) -> GuardCheck {
        let column = binding.column.as_deref().unwrap_or(&binding.name);

        loaded(instance.is_cached(&binding.name) || instance.is_loaded(column))
    }
}

struct ReverseSingleGuard;

impl GuardStrategy for ReverseSingleGuard {
    fn category(&self) -> AttributeCategory {
        AttributeCategory::Related
    }

    fn check(&self, instance: &Instance, binding: &AttributeBinding) -> GuardCheck {
        loaded(instance.is_cached(&binding.name))
    }
}

struct ManyValuedGuard;

impl GuardStrategy for ManyValuedGuard {
    fn category(&self) -> AttributeCategory {
        AttributeCategory::ManyToMany
    }

    fn check(&self, _: &Instance, _: &AttributeBinding) -> GuardCheck {
        GuardCheck::OnEnumerate
    }
}

// No content type lookup here; only the loaded pair and the cache decide.
struct GenericGuard;

impl GuardStrategy for GenericGuard {
    fn category(&self) -> AttributeCategory {
        AttributeCategory::Related
    }

    fn check(&self, instance: &Instance, binding: &AttributeBinding) -> GuardCheck {
        let Some(columns) = &binding.generic else {
            return GuardCheck::Unsafe;
        };
        let empty_pair = match (
            instance.value(&columns.type_column),
            instance.value(&columns.key_column),
        ) {
            (Some(type_id), Some(key)) => type_id.is_null() || key.is_null(),
            _ => false,
        };

        loaded(empty_pair || cached_generic_target_matches(instance, binding))
    }
}

const fn loaded(safe: bool) -> GuardCheck {
    if safe {
        GuardCheck::Safe
    } else {
        GuardCheck::Unsafe
    }
}

static DEFERRED_FIELD: DeferredFieldGuard = DeferredFieldGuard;
static FORWARD_SINGLE: ForwardSingleGuard = ForwardSingleGuard;
static REVERSE_SINGLE: ReverseSingleGuard = ReverseSingleGuard;
static MANY_VALUED: ManyValuedGuard = ManyValuedGuard;
static GENERIC: GenericGuard = GenericGuard;

///
/// GuardRegistry
///
/// Accessor kind → guard strategy. Filled once; a kind missing here is never
/// guarded.
///

#[derive(Default)]
pub struct GuardRegistry {
    guards: BTreeMap<AccessorKind, &'static dyn GuardStrategy>,
}

impl GuardRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            guards: BTreeMap::new(),
        }
    }

    /// The six built-in strategies.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(AccessorKind::DeferredField, &DEFERRED_FIELD);
        registry.register(AccessorKind::ForwardSingle, &FORWARD_SINGLE);
        registry.register(AccessorKind::ReverseSingle, &REVERSE_SINGLE);
        registry.register(AccessorKind::ManyValued, &MANY_VALUED);
        registry.register(AccessorKind::Generic, &GENERIC);
        registry.register(AccessorKind::GenericReverse, &MANY_VALUED);

        registry
    }

    /// Register the strategy for `kind`.
    ///
    /// # Panics
    ///
    /// Panics when `kind` already has a strategy.
    pub fn register(&mut self, kind: AccessorKind, strategy: &'static dyn GuardStrategy) {
        let previous = self.guards.insert(kind, strategy);
        assert!(
            previous.is_none(),
            "guard strategy for {kind} registered twice"
        );
    }

    #[must_use]
    pub fn lookup(&self, kind: AccessorKind) -> Option<&'static dyn GuardStrategy> {
        self.guards.get(&kind).copied()
    }

    pub fn kinds(&self) -> impl Iterator<Item = AccessorKind> + '_ {
        self.guards.keys().copied()
    }
}

static GUARDS: LazyLock<GuardRegistry> = LazyLock::new(GuardRegistry::builtin);

/// Process-wide guard table.
#[must_use]
pub fn guards() -> &'static GuardRegistry {
    &GUARDS
}

#[must_use]
pub fn lookup_guard(kind: AccessorKind) -> Option<&'static dyn GuardStrategy> {
    GUARDS.lookup(kind)
}
