use crate::node::{FieldDef, ManagerDef};
use serde::Serialize;

///
/// EntityDef
///
/// Declaration of one entity type as handed to the runtime registry.
/// `parents` and relation targets are references resolved by the registry;
/// `sealable` is the opt-in marker and is inherited by subtypes.
///

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EntityDef {
    pub ident: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_label: Option<String>,

    #[serde(rename = "abstract")]
    pub is_abstract: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_of: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managers: Vec<ManagerDef>,

    pub sealable: bool,
}

impl EntityDef {
    #[must_use]
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn app_label(mut self, label: impl Into<String>) -> Self {
        self.app_label = Some(label.into());
        self
    }

    /// Template-only type; never registered for instances, never guarded.
    #[must_use]
    pub const fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    #[must_use]
    pub fn proxy_of(mut self, base: impl Into<String>) -> Self {
        self.proxy_of = Some(base.into());
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn manager(mut self, manager: ManagerDef) -> Self {
        self.managers.push(manager);
        self
    }

    /// Opt this type (and its subtypes) into sealing.
    #[must_use]
    pub const fn sealable(mut self) -> Self {
        self.sealable = true;
        self
    }

    #[must_use]
    pub fn get_field(&self, ident: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.ident == ident)
    }

    #[must_use]
    pub fn get_pk_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.is_primary_key())
    }

    /// Path under `default_label` unless the definition carries its own label.
    #[must_use]
    pub fn path(&self, default_label: &str) -> String {
        let label = self.app_label.as_deref().unwrap_or(default_label);

        format!("{label}.{}", self.ident)
    }
}
