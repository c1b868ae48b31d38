use crate::{
    accessor::{
        Accessor, AccessorTable, DeferredFieldAccessor, ForwardSingleAccessor, GenericAccessor,
        GenericReverseAccessor, ManyRelation, ManyValuedAccessor, ReverseSingleAccessor,
        TransientAccessor,
    },
    model::{EntityType, FieldModel, RelationTarget},
    registry::{PendingOperation, Registry, RegistryError},
};
use seal_schema::node::{EntityDef, FieldDef, FieldKind, resolve_reference};
use std::{
    collections::BTreeSet,
    sync::{Arc, RwLock, atomic::AtomicBool},
};

///
/// BuiltType
/// A type ready to register, plus the work it needs done on its targets.
///

pub(super) struct BuiltType {
    pub(super) entity: Arc<EntityType>,
    pub(super) links: Vec<PendingLink>,
}

pub(super) struct PendingLink {
    pub(super) target: String,
    pub(super) operation: PendingOperation,
}

// How the reverse side of a relation reads.
enum ReverseSide {
    ForeignKey,
    OneToOne,
    ManyToMany { link: String },
}

pub(super) fn build_type(
    registry: &Registry,
    def: &EntityDef,
    path: &str,
) -> Result<BuiltType, RegistryError> {
    let app_label = def
        .app_label
        .clone()
        .unwrap_or_else(|| registry.label().to_string());
    let qualify = |reference: &str| resolve_reference(reference, &app_label, path);

    // proxy base, always concrete
    let proxy_for = match def.proxy_of.as_deref() {
        Some(reference) => Some(resolve_proxy_base(registry, path, &qualify(reference))?),
        None => None,
    };

    let mut abstract_parents = Vec::new();
    let mut parents = Vec::new();
    for reference in &def.parents {
        let parent_path = qualify(reference);
        let parent = registry
            .get(&parent_path)
            .ok_or_else(|| RegistryError::UnknownParent {
                path: path.to_string(),
                parent: parent_path,
            })?;
        if parent.is_abstract() {
            abstract_parents.push(parent);
        } else {
            parents.push(parent);
        }
    }

    let declared_sealable = def.sealable
        || abstract_parents
            .iter()
            .chain(&parents)
            .chain(&proxy_for)
            .any(|p| p.is_declared_sealable());

    // fields
    let local_fields = if proxy_for.is_some() {
        Vec::new()
    } else {
        let defs = local_field_defs(def, &abstract_parents, &parents, &qualify);
        check_clashes(path, &parents, &defs)?;

        defs.into_iter()
            .map(|field| FieldModel {
                attname: field.attname(),
                declared_on: path.to_string(),
                target: field.target().map(|t| qualify(t)),
                def: field,
            })
            .collect::<Vec<_>>()
    };
    let fields = match &proxy_for {
        Some(base) => base.fields().to_vec(),
        None => {
            let mut seen = BTreeSet::new();
            parents
                .iter()
                .flat_map(|p| p.fields())
                .chain(&local_fields)
                .filter(|f| seen.insert(f.ident().to_string()))
                .cloned()
                .collect()
        }
    };
    let primary_key = match &proxy_for {
        Some(base) => base.primary_key().map(str::to_string),
        None => local_fields
            .iter()
            .find(|f| f.is_primary_key())
            .or_else(|| local_fields.iter().find(|f| f.is_parent_link()))
            .map(|f| f.attname.clone()),
    };

    // managers declared on abstract parents and proxy bases carry over
    let mut managers = def.managers.clone();
    for inherited in abstract_parents
        .iter()
        .chain(&proxy_for)
        .flat_map(|p| p.managers())
    {
        if !managers.iter().any(|m| m.ident == inherited.ident) {
            managers.push(inherited.clone());
        }
    }

    let entity = Arc::new(EntityType {
        path: path.to_string(),
        ident: def.ident.clone(),
        app_label: app_label.clone(),
        is_abstract: def.is_abstract,
        proxy_for,
        parents,
        local_fields,
        fields,
        primary_key,
        managers,
        content_type_id: registry.content_types().allocate(),
        declared_sealable,
        accessors: AccessorTable::default(),
        reverse_accessors: RwLock::new(Vec::new()),
        sealable: AtomicBool::new(false),
        prepared: AtomicBool::new(false),
    });

    // abstract types are templates: no accessors, nothing installed remotely
    let mut links = Vec::new();
    if !entity.is_abstract() {
        for field in entity.local_fields() {
            install_local(registry, &entity, field, &mut links)?;
        }
    }

    Ok(BuiltType { entity, links })
}

fn resolve_proxy_base(
    registry: &Registry,
    path: &str,
    base_path: &str,
) -> Result<Arc<EntityType>, RegistryError> {
    let base = registry
        .get(base_path)
        .ok_or_else(|| RegistryError::UnknownProxyBase {
            path: path.to_string(),
            base: base_path.to_string(),
        })?;
    if base.is_abstract() {
        return Err(RegistryError::AbstractProxyBase {
            path: path.to_string(),
            base: base_path.to_string(),
        });
    }

    Ok(base.proxy_for().cloned().unwrap_or(base))
}

// Implicit primary key and parent links first, then fields copied from
// abstract parents, then the declared ones.
fn local_field_defs(
    def: &EntityDef,
    abstract_parents: &[Arc<EntityType>],
    parents: &[Arc<EntityType>],
    qualify: &impl Fn(&str) -> String,
) -> Vec<FieldDef> {
    let mut defs = Vec::new();

    for parent in parents {
        let linked = def.fields.iter().any(|f| {
            f.is_parent_link() && f.target().is_some_and(|t| qualify(t) == parent.path())
        });
        if !linked {
            let ident = format!("{}_ptr", parent.ident().to_lowercase());
            defs.push(FieldDef::one_to_one(ident, parent.path()).parent_link());
        }
    }
    for parent in abstract_parents {
        defs.extend(parent.local_fields().iter().map(|f| f.def.clone()));
    }
    defs.extend(def.fields.iter().cloned());

    if !def.is_abstract && parents.is_empty() && !defs.iter().any(FieldDef::is_primary_key) {
        defs.insert(0, FieldDef::primary_key("id"));
    }

    defs
}

fn check_clashes(
    path: &str,
    parents: &[Arc<EntityType>],
    defs: &[FieldDef],
) -> Result<(), RegistryError> {
    let mut seen = parents
        .iter()
        .flat_map(|p| p.fields())
        .map(|f| f.ident().to_string())
        .collect::<BTreeSet<_>>();

    for field in defs {
        if !seen.insert(field.ident.clone()) {
            return Err(RegistryError::FieldClash {
                path: path.to_string(),
                field: field.ident.clone(),
            });
        }
    }

    Ok(())
}

// Install the original accessors for one local field and collect the work
// its relation needs done on the target type.
fn install_local(
    registry: &Registry,
    entity: &Arc<EntityType>,
    field: &FieldModel,
    links: &mut Vec<PendingLink>,
) -> Result<(), RegistryError> {
    let ident = field.ident();
    let install = |name: &str, accessor: Arc<dyn Accessor>| {
        if entity.accessor_table().install(name, accessor) {
            Ok(())
        } else {
            Err(RegistryError::FieldClash {
                path: entity.path().to_string(),
                field: name.to_string(),
            })
        }
    };

    match (field.kind(), field.target.as_deref()) {
        (FieldKind::Value { .. }, _) => {
            install(ident, Arc::new(DeferredFieldAccessor::new(ident)))?;
        }

        (FieldKind::Transient { default }, _) => {
            install(ident, Arc::new(TransientAccessor::new(ident, default.clone())))?;
        }

        (
            FieldKind::ForeignKey {
                unique,
                parent_link,
                ..
            },
            Some(target_path),
        ) => {
            let target = RelationTarget::pending(target_path);
            install(
                ident,
                Arc::new(ForwardSingleAccessor::new(
                    ident,
                    &field.attname,
                    Arc::clone(&target),
                    *parent_link,
                )),
            )?;
            install(&field.attname, Arc::new(DeferredFieldAccessor::new(&field.attname)))?;

            let side = if *unique {
                ReverseSide::OneToOne
            } else {
                ReverseSide::ForeignKey
            };
            links.push(PendingLink {
                target: target_path.to_string(),
                operation: reverse_link(entity, field, target, side),
            });
        }

        (FieldKind::ManyToMany { .. }, Some(target_path)) => {
            let target = RelationTarget::pending(target_path);
            let link = field.link_name();
            install(
                ident,
                Arc::new(ManyValuedAccessor::new(
                    ident,
                    ManyRelation::ManyToMany {
                        link: link.clone(),
                        target: Arc::clone(&target),
                        reverse: false,
                    },
                )),
            )?;

            links.push(PendingLink {
                target: target_path.to_string(),
                operation: reverse_link(entity, field, target, ReverseSide::ManyToMany { link }),
            });
        }

        (
            FieldKind::GenericForeignKey {
                type_field,
                key_field,
            },
            _,
        ) => {
            let content_types = Arc::clone(registry.content_types());
            install(
                ident,
                Arc::new(GenericAccessor::new(ident, type_field, key_field, content_types)),
            )?;
        }

        (
            FieldKind::GenericRelation {
                type_field,
                key_field,
                ..
            },
            Some(target_path),
        ) => {
            let target = RelationTarget::pending(target_path);
            install(
                ident,
                Arc::new(GenericReverseAccessor::new(
                    ident,
                    Arc::clone(&target),
                    type_field,
                    key_field,
                )),
            )?;

            links.push(PendingLink {
                target: target_path.to_string(),
                operation: Box::new(move |_, related| target.resolve(related)),
            });
        }

        // relation kinds always carry a resolved target
        (
            FieldKind::ForeignKey { .. }
            | FieldKind::ManyToMany { .. }
            | FieldKind::GenericRelation { .. },
            None,
        ) => {}
    }

    Ok(())
}

// Resolve the forward accessor's target and install the reverse accessor on
// it, unless the relation hides it.
fn reverse_link(
    entity: &Arc<EntityType>,
    field: &FieldModel,
    relation: Arc<RelationTarget>,
    side: ReverseSide,
) -> PendingOperation {
    let declaring = Arc::downgrade(entity);
    let reverse_name = field.reverse_accessor_name(entity.ident());
    let remote_column = field.attname.clone();

    Box::new(move |_, target| {
        relation.resolve(target);

        let (Some(name), Some(declaring)) = (reverse_name, declaring.upgrade()) else {
            return;
        };
        if target.is_abstract() {
            tracing::warn!(
                target_path = %target.path(),
                accessor = %name,
                "relation targets an abstract type; no reverse accessor installed"
            );
            return;
        }

        let declaring = RelationTarget::resolved(&declaring);
        let accessor: Arc<dyn Accessor> = match side {
            ReverseSide::ForeignKey => Arc::new(ManyValuedAccessor::new(
                &name,
                ManyRelation::ReverseForeignKey {
                    declaring,
                    column: remote_column,
                },
            )),
            ReverseSide::OneToOne => {
                Arc::new(ReverseSingleAccessor::new(&name, declaring, &remote_column))
            }
            ReverseSide::ManyToMany { link } => Arc::new(ManyValuedAccessor::new(
                &name,
                ManyRelation::ManyToMany {
                    link,
                    target: declaring,
                    reverse: true,
                },
            )),
        };

        if target.accessor_table().install(&name, accessor) {
            target.record_reverse_accessor(&name);
            tracing::trace!(
                target_path = %target.path(),
                accessor = %name,
                "reverse accessor installed"
            );
        } else {
            tracing::warn!(
                target_path = %target.path(),
                accessor = %name,
                "reverse accessor clashes with an existing attribute"
            );
        }
    })
}
