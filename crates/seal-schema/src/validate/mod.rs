//! Definition validation orchestration and shared helpers.

pub mod naming;
pub mod relation;

use crate::{
    err,
    error::ErrorTree,
    node::{EntityDef, FieldDef, FieldKind, ManagerDef},
};
use std::collections::BTreeSet;

///
/// ValidateNode
/// Local (single-node) validation; cross-type checks live in the registry.
///

pub trait ValidateNode {
    fn validate(&self) -> Result<(), ErrorTree> {
        Ok(())
    }
}

impl ValidateNode for FieldDef {
    fn validate(&self) -> Result<(), ErrorTree> {
        let mut errs = ErrorTree::new();

        if let Err(e) = naming::validate_ident(&self.ident) {
            errs.add(e);
        }
        relation::validate_field_relation(self, &mut errs);

        errs.result()
    }
}

impl ValidateNode for ManagerDef {
    fn validate(&self) -> Result<(), ErrorTree> {
        let mut errs = ErrorTree::new();
        if let Err(e) = naming::validate_ident(&self.ident) {
            errs.add(e);
        }

        errs.result()
    }
}

impl ValidateNode for EntityDef {
    fn validate(&self) -> Result<(), ErrorTree> {
        validate_entity(self)
    }
}

/// Run full definition validation in a staged, deterministic order.
pub fn validate_entity(def: &EntityDef) -> Result<(), ErrorTree> {
    // Phase 1: validate each node (structural + local invariants).
    let mut errors = validate_nodes(def);

    // Phase 2: enforce definition-wide invariants.
    validate_global(def, &mut errors);

    errors.result()
}

// Validate fields and managers, keyed by their own ident.
fn validate_nodes(def: &EntityDef) -> ErrorTree {
    let mut errs = ErrorTree::new();

    if let Err(e) = naming::validate_entity_name(&def.ident) {
        errs.add(e);
    }
    if let Some(label) = &def.app_label
        && let Err(e) = naming::validate_app_label(label)
    {
        errs.add(e);
    }

    for field in &def.fields {
        if let Err(tree) = field.validate() {
            errs.add_route(field.ident.clone(), tree);
        }
    }
    for manager in &def.managers {
        if let Err(tree) = manager.validate() {
            errs.add_route(manager.ident.clone(), tree);
        }
    }

    errs
}

// Checks that need the whole definition in view.
fn validate_global(def: &EntityDef, errs: &mut ErrorTree) {
    let mut seen = BTreeSet::new();
    for ident in def
        .fields
        .iter()
        .map(|f| f.ident.as_str())
        .chain(def.managers.iter().map(|m| m.ident.as_str()))
    {
        if !seen.insert(ident) {
            err!(errs, "duplicate attribute '{ident}' on '{}'", def.ident);
        }
    }

    let primary_keys = def.fields.iter().filter(|f| f.is_primary_key()).count();
    if primary_keys > 1 {
        err!(
            errs,
            "'{}' declares {primary_keys} primary keys, at most one is allowed",
            def.ident
        );
    }

    if def.proxy_of.is_some() {
        if def.is_abstract {
            err!(errs, "proxy '{}' cannot be abstract", def.ident);
        }
        if !def.fields.is_empty() {
            err!(errs, "proxy '{}' cannot declare fields", def.ident);
        }
        if !def.parents.is_empty() {
            err!(errs, "proxy '{}' cannot declare parents", def.ident);
        }
    }

    relation::validate_generic_fields(def, errs);
    relation::validate_parent_links(def, errs);

    if def.is_abstract
        && def
            .fields
            .iter()
            .any(|f| matches!(f.kind, FieldKind::ForeignKey { parent_link: true, .. }))
    {
        err!(errs, "abstract '{}' cannot declare a parent link", def.ident);
    }
}
