use crate::obs::sink::{self, MetricsEvent};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// AttributeCategory
/// The three ways a violation is described to the caller.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum AttributeCategory {
    #[display("deferred field")]
    Deferred,
    #[display("many-to-many field")]
    ManyToMany,
    #[display("related field")]
    Related,
}

///
/// ViolationMode
/// Whether a violation fails the access or is only logged.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationMode {
    #[default]
    #[display("error")]
    Error,
    #[display("warn")]
    Warn,
}

///
/// UnsealedAttributeAccess
///
/// A sealed instance tried to load data. Carries the type name only; the
/// message is built without touching the instance's values.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, ThisError)]
#[error("Cannot fetch {category} {attribute} on sealed <{entity} instance>")]
pub struct UnsealedAttributeAccess {
    pub attribute: String,
    pub category: AttributeCategory,
    pub entity: String,
}

impl UnsealedAttributeAccess {
    #[must_use]
    pub fn new(
        attribute: impl Into<String>,
        category: AttributeCategory,
        entity: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            category,
            entity: entity.into(),
        }
    }

    /// Surface the violation: an error in `Error` mode, a warning otherwise.
    pub(crate) fn raise(self, mode: ViolationMode, entity_path: &str) -> Result<(), Self> {
        sink::record(MetricsEvent::Violation { entity_path, mode });

        match mode {
            ViolationMode::Error => Err(self),
            ViolationMode::Warn => {
                tracing::warn!(
                    entity = %self.entity,
                    attribute = %self.attribute,
                    category = %self.category,
                    "{self}"
                );
                Ok(())
            }
        }
    }
}
