use crate::{
    check::{self, Diagnostic},
    config::SealConfig,
    model::{EntityType, FieldModel},
    obs::sink::{self, MetricsEvent},
    registry::Registry,
    seal::{ViolationMode, wrap_attribute},
};
use std::{collections::BTreeSet, sync::Arc};

///
/// Sealer
///
/// Prepares sealable types as they are defined. Installed once per registry;
/// every type defined after `install` is seen by the preparation hook.
///

#[derive(Debug)]
pub struct Sealer {
    config: SealConfig,
}

impl Sealer {
    /// Subscribe a sealer to `registry`'s type-defined event.
    pub fn install(registry: &Registry, config: SealConfig) -> Arc<Self> {
        let sealer = Arc::new(Self { config });
        let hook = Arc::clone(&sealer);
        registry.on_type_defined(move |registry, entity| hook.prepare(registry, entity));

        tracing::debug!(
            registry = registry.label(),
            violation = %sealer.violation_mode(),
            "sealer installed"
        );

        sealer
    }

    #[must_use]
    pub const fn config(&self) -> &SealConfig {
        &self.config
    }

    #[must_use]
    pub const fn violation_mode(&self) -> ViolationMode {
        self.config.violation
    }

    /// Startup checks, minus the silenced ones.
    #[must_use]
    pub fn check(&self, registry: &Registry) -> Vec<Diagnostic> {
        check::run_checks(registry, &self.config.checks)
    }

    // ---------------------------------------------------------------------
    // Preparation
    // ---------------------------------------------------------------------

    fn prepare(&self, registry: &Registry, entity: &Arc<EntityType>) {
        if !entity.is_sealable() || entity.is_abstract() || entity.is_proxy() {
            return;
        }
        if !entity.mark_prepared() {
            return;
        }

        self.wrap_local(entity);
        for field in entity.local_fields() {
            self.queue_remote_wrap(registry, entity, field);
        }

        tracing::debug!(entity = %entity.path(), "sealable type prepared");
        sink::record(MetricsEvent::TypePrepared {
            entity_path: entity.path(),
        });
    }

    // Guard every accessor installed for the type's own fields.
    fn wrap_local(&self, entity: &EntityType) {
        let mode = self.violation_mode();

        for field in entity.local_fields() {
            wrap_attribute(entity, field.ident(), mode);
            if field.attname != field.ident() {
                wrap_attribute(entity, &field.attname, mode);
            }
        }
    }

    // The reverse accessor lives on the target, which may not be defined yet.
    fn queue_remote_wrap(&self, registry: &Registry, entity: &EntityType, field: &FieldModel) {
        let (Some(target), Some(accessor)) = (
            field.target.as_deref(),
            field.reverse_accessor_name(entity.ident()),
        ) else {
            return;
        };
        let mode = self.violation_mode();

        registry.resolve_forward_reference(target, move |_, related| {
            if related.is_sealable() {
                wrap_attribute(related, &accessor, mode);
            }
        });
    }

    // ---------------------------------------------------------------------
    // Retrofit
    // ---------------------------------------------------------------------

    /// Make an already defined type sealable, along with every type its
    /// relations reach that is not prepared yet.
    pub fn make_sealable(
        &self,
        registry: &Registry,
        entity: &Arc<EntityType>,
    ) -> Result<(), Diagnostic> {
        check::check_sealable_target(registry, entity)?;

        let mut visited = BTreeSet::new();
        self.retrofit(registry, entity, &mut visited);

        Ok(())
    }

    fn retrofit(
        &self,
        registry: &Registry,
        entity: &Arc<EntityType>,
        visited: &mut BTreeSet<String>,
    ) {
        if !visited.insert(entity.path().to_string()) {
            return;
        }
        let mode = self.violation_mode();

        entity.mark_sealable();
        if entity.mark_prepared() {
            sink::record(MetricsEvent::TypePrepared {
                entity_path: entity.path(),
            });
        }
        self.wrap_local(entity);
        for name in entity.reverse_accessors() {
            wrap_attribute(entity, &name, mode);
        }
        // proxies carry their own reverse accessors
        for proxy in registry
            .types()
            .into_iter()
            .filter(|t| t.proxy_for().is_some_and(|base| Arc::ptr_eq(base, entity)))
        {
            for name in proxy.reverse_accessors() {
                wrap_attribute(&proxy, &name, mode);
            }
        }

        for field in entity.local_fields() {
            let Some(target) = field.target.as_deref() else {
                continue;
            };
            let Some(related) = registry.get(target) else {
                self.queue_remote_wrap(registry, entity, field);
                continue;
            };

            if let Some(base) = related.proxy_for() {
                if !base.is_prepared() {
                    self.retrofit(registry, base, visited);
                }
            } else if !related.is_prepared() && !related.is_abstract() {
                self.retrofit(registry, &related, visited);
            }
            if related.is_sealable()
                && let Some(accessor) = field.reverse_accessor_name(entity.ident())
            {
                wrap_attribute(&related, &accessor, mode);
            }
        }

        tracing::debug!(entity = %entity.path(), "type made sealable");
    }
}
