use derive_more::Display;
use serde::Serialize;

///
/// ManagerDef
/// Named query entry point bound to an entity type.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ManagerDef {
    pub ident: String,
    pub kind: ManagerKind,
}

impl ManagerDef {
    #[must_use]
    pub fn plain(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            kind: ManagerKind::Plain,
        }
    }

    /// Manager whose queries can hand out sealed instances.
    #[must_use]
    pub fn sealable(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            kind: ManagerKind::Sealable,
        }
    }

    /// Sealable query builder exposed through `as_manager()`.
    #[must_use]
    pub fn sealable_queryset(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            kind: ManagerKind::SealableQuerySet,
        }
    }

    #[must_use]
    pub const fn requires_sealable_type(&self) -> bool {
        matches!(
            self.kind,
            ManagerKind::Sealable | ManagerKind::SealableQuerySet
        )
    }
}

///
/// ManagerKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum ManagerKind {
    #[display("Manager")]
    Plain,
    #[display("SealableManager")]
    Sealable,
    #[display("SealableQuerySet.as_manager()")]
    SealableQuerySet,
}
