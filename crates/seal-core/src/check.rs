//! Startup checks.
//!
//! Configuration problems are reported as [`Diagnostic`]s and aggregated,
//! never raised one at a time.

use crate::{config::CheckConfig, model::EntityType, registry::Registry};
use derive_more::Display;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error as ThisError;

/// Sealable manager or query builder bound to a type that is not sealable.
pub const E001: &str = "seal.E001";

/// `make_sealable` called on a type that can never be sealable.
pub const E002: &str = "seal.E002";

///
/// Level
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum Level {
    #[display("error")]
    Error,
    #[display("warning")]
    Warning,
}

///
/// Diagnostic
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, ThisError)]
#[error("{object}: ({id}) {message}")]
pub struct Diagnostic {
    pub level: Level,
    pub id: String,
    pub message: String,
    pub hint: Option<String>,
    /// Path of the offending type, or `type.manager` for managers.
    pub object: String,
}

impl Diagnostic {
    #[must_use]
    pub fn error(id: &str, message: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            id: id.to_string(),
            message: message.into(),
            hint: None,
            object: object.into(),
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Every check, minus the ids `config` silences.
#[must_use]
pub fn run_checks(registry: &Registry, config: &CheckConfig) -> Vec<Diagnostic> {
    check_managers(registry)
        .into_iter()
        .filter(|d| !config.is_silenced(&d.id))
        .collect()
}

/// One `seal.E001` per sealable manager on a concrete type without the
/// opt-in marker.
#[must_use]
pub fn check_managers(registry: &Registry) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for entity in registry.types() {
        if entity.is_abstract() || entity.is_sealable() {
            continue;
        }

        for manager in entity.managers() {
            if !manager.requires_sealable_type() {
                continue;
            }

            diagnostics.push(
                Diagnostic::error(
                    E001,
                    format!("{} can only be used on sealable entity types.", manager.kind),
                    format!("{}.{}", entity.path(), manager.ident),
                )
                .with_hint(format!(
                    "Declare {} sealable or call make_sealable on it.",
                    entity.path()
                )),
            );
        }
    }

    diagnostics
}

/// Types `make_sealable` accepts: registered here, concrete, not a proxy.
pub(crate) fn check_sealable_target(
    registry: &Registry,
    entity: &Arc<EntityType>,
) -> Result<(), Diagnostic> {
    let problem = if !registry.contains(entity) {
        Some(("is not registered with this registry", None))
    } else if entity.is_abstract() {
        Some(("is abstract", None))
    } else if let Some(base) = entity.proxy_for() {
        Some((
            "is a proxy",
            Some(format!("Make {} sealable instead.", base.path())),
        ))
    } else {
        None
    };

    match problem {
        None => Ok(()),
        Some((reason, hint)) => {
            let mut diagnostic = Diagnostic::error(
                E002,
                format!("{} {reason} and cannot be made sealable.", entity.path()),
                entity.path(),
            );
            diagnostic.hint = hint;

            Err(diagnostic)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SealConfig, seal::Sealer, test_fixtures::Fixture};
    use seal_schema::node::{EntityDef, ManagerDef};

    fn foo_registry() -> (Registry, Arc<Sealer>) {
        let registry = Registry::new("tests");
        let sealer = Sealer::install(&registry, SealConfig::default());
        registry
            .define(
                EntityDef::new("Foo")
                    .manager(ManagerDef::sealable("manager"))
                    .manager(ManagerDef::sealable_queryset("as_manager"))
                    .manager(ManagerDef::plain("objects")),
            )
            .expect("Foo should define");

        (registry, sealer)
    }

    #[test]
    fn sealable_managers_on_unsealable_type_are_reported() {
        let (registry, _) = foo_registry();

        assert_eq!(
            check_managers(&registry),
            vec![
                Diagnostic::error(
                    E001,
                    "SealableManager can only be used on sealable entity types.",
                    "tests.Foo.manager",
                )
                .with_hint("Declare tests.Foo sealable or call make_sealable on it."),
                Diagnostic::error(
                    E001,
                    "SealableQuerySet.as_manager() can only be used on sealable entity types.",
                    "tests.Foo.as_manager",
                )
                .with_hint("Declare tests.Foo sealable or call make_sealable on it."),
            ]
        );
    }

    #[test]
    fn make_sealable_clears_the_diagnostic() {
        let (registry, sealer) = foo_registry();
        let foo = registry.get("Foo").expect("Foo");

        sealer.make_sealable(&registry, &foo).expect("Foo is eligible");

        assert!(sealer.check(&registry).is_empty());
    }

    #[test]
    fn silenced_ids_are_dropped() {
        let (registry, _) = foo_registry();
        let config = CheckConfig {
            silenced: vec![E001.to_string()],
        };

        assert!(run_checks(&registry, &config).is_empty());
    }

    #[test]
    fn fixture_schema_is_clean() {
        let fx = Fixture::new();

        assert!(fx.sealer.check(&fx.registry).is_empty());
    }

    #[test]
    fn diagnostic_display_names_object_and_id() {
        let diagnostic = Diagnostic::error(E002, "tests.Base is abstract", "tests.Base");

        assert_eq!(
            diagnostic.to_string(),
            "tests.Base: (seal.E002) tests.Base is abstract"
        );
        assert_eq!(diagnostic.level.to_string(), "error");
    }
}
