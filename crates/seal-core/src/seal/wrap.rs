use crate::{
    model::EntityType,
    obs::sink::{self, MetricsEvent},
    seal::{GuardedAccessor, ViolationMode, lookup_guard},
};
use std::sync::Arc;

///
/// WrapOutcome
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WrapOutcome {
    Wrapped,
    AlreadyGuarded,
    /// The accessor kind has no guard strategy.
    Unguarded,
    /// Nothing installed under the name on this type.
    Missing,
}

/// Replace the accessor `name` installed on `entity` itself with its guarded
/// form. Safe to call any number of times.
pub fn wrap_attribute(entity: &EntityType, name: &str, mode: ViolationMode) -> WrapOutcome {
    let outcome = entity
        .accessor_table()
        .update(name, |slot| {
            if slot.is_guarded() {
                return WrapOutcome::AlreadyGuarded;
            }
            let Some(strategy) = lookup_guard(slot.kind()) else {
                return WrapOutcome::Unguarded;
            };

            *slot = Arc::new(GuardedAccessor::new(Arc::clone(slot), strategy, mode));
            WrapOutcome::Wrapped
        })
        .unwrap_or(WrapOutcome::Missing);

    if outcome == WrapOutcome::Wrapped {
        tracing::debug!(entity = %entity.path(), attribute = name, "accessor guarded");
        sink::record(MetricsEvent::AccessorWrapped {
            entity_path: entity.path(),
            attribute: name,
        });
    }

    outcome
}
