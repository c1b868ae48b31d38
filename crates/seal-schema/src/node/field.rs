use crate::{HIDDEN_RELATED_NAME, types::Value};
use serde::Serialize;

///
/// FieldDef
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldDef {
    pub ident: String,
    pub kind: FieldKind,
}

///
/// FieldKind
///
/// Declared shape of one attribute. Relation targets are references
/// (`"Name"`, `"app.Name"` or `"self"`) and may name types that are not
/// defined yet.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[remain::sorted]
pub enum FieldKind {
    ForeignKey {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        related_name: Option<String>,
        unique: bool,
        parent_link: bool,
    },
    GenericForeignKey {
        type_field: String,
        key_field: String,
    },
    GenericRelation {
        target: String,
        type_field: String,
        key_field: String,
    },
    ManyToMany {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        related_name: Option<String>,
    },
    Transient {
        default: Value,
    },
    Value {
        primary_key: bool,
    },
}

impl FieldDef {
    fn new(ident: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            ident: ident.into(),
            kind,
        }
    }

    /// Stored column.
    #[must_use]
    pub fn value(ident: impl Into<String>) -> Self {
        Self::new(ident, FieldKind::Value { primary_key: false })
    }

    /// Stored column that identifies the row.
    #[must_use]
    pub fn primary_key(ident: impl Into<String>) -> Self {
        Self::new(ident, FieldKind::Value { primary_key: true })
    }

    /// In-memory attribute that is never fetched.
    #[must_use]
    pub fn transient(ident: impl Into<String>, default: impl Into<Value>) -> Self {
        Self::new(
            ident,
            FieldKind::Transient {
                default: default.into(),
            },
        )
    }

    #[must_use]
    pub fn foreign_key(ident: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            ident,
            FieldKind::ForeignKey {
                target: target.into(),
                related_name: None,
                unique: false,
                parent_link: false,
            },
        )
    }

    #[must_use]
    pub fn one_to_one(ident: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            ident,
            FieldKind::ForeignKey {
                target: target.into(),
                related_name: None,
                unique: true,
                parent_link: false,
            },
        )
    }

    #[must_use]
    pub fn many_to_many(ident: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            ident,
            FieldKind::ManyToMany {
                target: target.into(),
                related_name: None,
            },
        )
    }

    #[must_use]
    pub fn generic_foreign_key(
        ident: impl Into<String>,
        type_field: impl Into<String>,
        key_field: impl Into<String>,
    ) -> Self {
        Self::new(
            ident,
            FieldKind::GenericForeignKey {
                type_field: type_field.into(),
                key_field: key_field.into(),
            },
        )
    }

    #[must_use]
    pub fn generic_relation(
        ident: impl Into<String>,
        target: impl Into<String>,
        type_field: impl Into<String>,
        key_field: impl Into<String>,
    ) -> Self {
        Self::new(
            ident,
            FieldKind::GenericRelation {
                target: target.into(),
                type_field: type_field.into(),
                key_field: key_field.into(),
            },
        )
    }

    /// Set the reverse accessor name; `"+"` hides it.
    #[must_use]
    pub fn related_name(mut self, name: impl Into<String>) -> Self {
        match &mut self.kind {
            FieldKind::ForeignKey { related_name, .. }
            | FieldKind::ManyToMany { related_name, .. } => *related_name = Some(name.into()),
            _ => {}
        }

        self
    }

    /// Mark a one-to-one as the multi-table inheritance link to its target.
    #[must_use]
    pub fn parent_link(mut self) -> Self {
        if let FieldKind::ForeignKey {
            unique,
            parent_link,
            ..
        } = &mut self.kind
        {
            *unique = true;
            *parent_link = true;
        }

        self
    }

    /// Column name holding this field's value (`<ident>_id` for foreign keys).
    #[must_use]
    pub fn attname(&self) -> String {
        match self.kind {
            FieldKind::ForeignKey { .. } => format!("{}_id", self.ident),
            _ => self.ident.clone(),
        }
    }

    /// Whether the field is backed by a column of its own.
    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Value { .. } | FieldKind::ForeignKey { .. }
        )
    }

    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        matches!(self.kind, FieldKind::Value { primary_key: true })
    }

    #[must_use]
    pub const fn is_parent_link(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::ForeignKey {
                parent_link: true,
                ..
            }
        )
    }

    #[must_use]
    pub const fn is_relation(&self) -> bool {
        self.target().is_some()
    }

    /// Unresolved target reference, for relation kinds.
    #[must_use]
    pub const fn target(&self) -> Option<&String> {
        match &self.kind {
            FieldKind::ForeignKey { target, .. }
            | FieldKind::ManyToMany { target, .. }
            | FieldKind::GenericRelation { target, .. } => Some(target),
            _ => None,
        }
    }

    #[must_use]
    pub fn declared_related_name(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::ForeignKey { related_name, .. }
            | FieldKind::ManyToMany { related_name, .. } => related_name.as_deref(),
            _ => None,
        }
    }

    /// Name of the accessor installed on the target type, if any.
    ///
    /// Foreign keys and many-to-many fields default to `<declaring>_set`,
    /// one-to-one fields to `<declaring>`. Generic relations never install
    /// one, and a related name ending in `+` hides it.
    #[must_use]
    pub fn reverse_accessor_name(&self, declaring_ident: &str) -> Option<String> {
        let default = match &self.kind {
            FieldKind::ForeignKey { unique: true, .. } => declaring_ident.to_lowercase(),
            FieldKind::ForeignKey { .. } | FieldKind::ManyToMany { .. } => {
                format!("{}_set", declaring_ident.to_lowercase())
            }
            _ => return None,
        };

        match self.declared_related_name() {
            Some(name) if name.ends_with(HIDDEN_RELATED_NAME) => None,
            Some(name) => Some(name.to_string()),
            None => Some(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_key_columns_use_id_suffix() {
        let field = FieldDef::foreign_key("location", "Location");
        assert_eq!(field.attname(), "location_id");
        assert_eq!(FieldDef::value("weight").attname(), "weight");
    }

    #[test]
    fn reverse_accessor_defaults() {
        assert_eq!(
            FieldDef::foreign_key("location", "Location").reverse_accessor_name("SeaLion"),
            Some("sealion_set".to_string())
        );
        assert_eq!(
            FieldDef::one_to_one("sealion", "SeaLion").reverse_accessor_name("SeaGull"),
            Some("seagull".to_string())
        );
        assert_eq!(
            FieldDef::many_to_many("previous_locations", "Location")
                .related_name("previous_visitors")
                .reverse_accessor_name("SeaLion"),
            Some("previous_visitors".to_string())
        );
    }

    #[test]
    fn hidden_related_name_suppresses_reverse_accessor() {
        let field = FieldDef::foreign_key("leak", "Leak").related_name("+");
        assert_eq!(field.reverse_accessor_name("SeaLion"), None);

        let field = FieldDef::foreign_key("leak", "Leak").related_name("leaks+");
        assert_eq!(field.reverse_accessor_name("SeaLion"), None);
    }

    #[test]
    fn generic_fields_have_no_reverse_accessor() {
        let field =
            FieldDef::generic_relation("nicknames", "Nickname", "content_type", "object_id");
        assert_eq!(field.reverse_accessor_name("SeaGull"), None);
        assert!(field.is_relation());
        assert!(!field.is_concrete());
    }

    #[test]
    fn parent_link_implies_one_to_one() {
        let field = FieldDef::foreign_key("sealion_ptr", "SeaLion").parent_link();
        assert!(field.is_parent_link());
        assert_eq!(field.reverse_accessor_name("GreatSeaLion"), Some("greatsealion".into()));
    }
}
