//! Runtime data model definitions.
//!
//! Types here are what the registry builds out of schema declarations:
//! resolved fields, entity types with their accessor tables, and the
//! late-bound relation targets accessors follow.
//!
//! In general:
//! - `seal-schema` defines *what is declared*
//! - `model` defines *what runs*
pub mod entity;
pub mod field;

pub use entity::EntityType;
pub use field::{FieldModel, RelationTarget};
