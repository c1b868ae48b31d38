//! Core runtime for sealable entities: the type registry, instances,
//! accessors, the persistence boundary, and the sealing mechanism that turns
//! implicit fetches on sealed instances into violations.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod accessor;
pub mod check;
pub mod config;
pub mod error;
pub mod instance;
pub mod model;
pub mod obs;
pub mod query;
pub mod registry;
pub mod seal;
pub mod store;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

pub use error::{AccessError, InternalError};

///
/// Prelude
///
/// Domain vocabulary only; errors, stores and checks are imported by path.
///

pub mod prelude {
    pub use crate::{
        instance::{Attr, Instance, RelatedManager},
        model::EntityType,
        registry::Registry,
        seal::{AttributeCategory, Sealer, UnsealedAttributeAccess, ViolationMode, seal_instance},
    };
    pub use seal_schema::{
        node::{EntityDef, FieldDef, ManagerDef},
        types::Value,
    };
}
