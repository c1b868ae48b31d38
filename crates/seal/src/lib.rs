//! ## Crate layout
//! - `core`: registry, instances, stores, accessors, and the sealing
//!   mechanism itself.
//! - `schema`: declarative entity definitions and their validation.
//!
//! Sealing an instance makes every read that would go to the store fail
//! with [`UnsealedAttributeAccess`](core::seal::UnsealedAttributeAccess)
//! (or log it, in warn mode). Types opt in with `EntityDef::sealable()` or
//! `Sealer::make_sealable`.

pub use seal_core as core;
pub use seal_schema as schema;

mod error;

pub use error::{Error, ErrorKind, ErrorOrigin};

use seal_core::{config::SealConfig, registry::Registry, seal::Sealer};
use std::sync::Arc;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// New registry with a sealer already subscribed to it.
#[must_use]
pub fn sealed_registry(label: impl Into<String>, config: SealConfig) -> (Registry, Arc<Sealer>) {
    let registry = Registry::new(label);
    let sealer = Sealer::install(&registry, config);

    (registry, sealer)
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Error, ErrorKind,
        core::{
            config::SealConfig,
            instance::{Attr, Instance, RelatedManager},
            model::EntityType,
            query::SealableQuery,
            registry::Registry,
            seal::{
                AttributeCategory, Sealer, UnsealedAttributeAccess, ViolationMode, is_sealed,
                seal_instance,
            },
            store::{MemoryStore, Store},
        },
        schema::{
            node::{EntityDef, FieldDef, ManagerDef},
            types::Value,
        },
        sealed_registry,
    };
}
