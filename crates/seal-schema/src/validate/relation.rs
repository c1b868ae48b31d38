use crate::{
    HIDDEN_RELATED_NAME, RECURSIVE_RELATIONSHIP, err,
    error::ErrorTree,
    node::{EntityDef, FieldDef, FieldKind},
    validate::naming,
};
use std::collections::BTreeSet;

// Validate the target reference and related name of one relation field.
pub fn validate_field_relation(field: &FieldDef, errs: &mut ErrorTree) {
    if let Some(target) = field.target()
        && let Err(e) = validate_reference(target)
    {
        err!(errs, "relation '{}': {e}", field.ident);
    }

    if let Some(name) = field.declared_related_name() {
        let visible = name.strip_suffix(HIDDEN_RELATED_NAME).unwrap_or(name);
        if !visible.is_empty()
            && let Err(e) = naming::validate_ident(visible)
        {
            err!(errs, "related name '{name}': {e}");
        }
    }
}

// A reference is `self`, `Name`, or `label.Name`.
fn validate_reference(reference: &str) -> Result<(), String> {
    if reference.is_empty() {
        return Err("target is empty".to_string());
    }
    if reference == RECURSIVE_RELATIONSHIP {
        return Ok(());
    }

    match reference.split_once('.') {
        Some((label, name)) => {
            naming::validate_app_label(label)?;
            naming::validate_entity_name(name)
        }
        None => naming::validate_entity_name(reference),
    }
}

// Generic fields must point at local stored columns.
pub fn validate_generic_fields(def: &EntityDef, errs: &mut ErrorTree) {
    let local_values = def
        .fields
        .iter()
        .filter(|f| matches!(f.kind, FieldKind::Value { .. }))
        .map(|f| f.ident.as_str())
        .collect::<BTreeSet<_>>();

    for field in &def.fields {
        let FieldKind::GenericForeignKey {
            type_field,
            key_field,
        } = &field.kind
        else {
            continue;
        };

        for column in [type_field, key_field] {
            if !local_values.contains(column.as_str()) {
                err!(
                    errs,
                    "generic relation '{}' refers to missing field '{column}' on '{}'",
                    field.ident,
                    def.ident
                );
            }
        }
        if type_field == key_field {
            err!(
                errs,
                "generic relation '{}' uses '{type_field}' for both type and key",
                field.ident
            );
        }
    }
}

// At most one explicit parent link per declared parent, and only to parents.
pub fn validate_parent_links(def: &EntityDef, errs: &mut ErrorTree) {
    let mut linked = BTreeSet::new();

    for field in def.fields.iter().filter(|f| f.is_parent_link()) {
        let Some(target) = field.target() else {
            continue;
        };
        if !def.parents.iter().any(|p| p == target) {
            err!(
                errs,
                "parent link '{}' targets '{target}', which is not a parent of '{}'",
                field.ident,
                def.ident
            );
        }
        if !linked.insert(target.clone()) {
            err!(errs, "more than one parent link to '{target}' on '{}'", def.ident);
        }
    }
}
