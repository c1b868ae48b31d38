use crate::{
    accessor::{Accessor, AccessorKind, AttributeBinding},
    error::{AccessError, InternalError},
    instance::{Attr, Instance, RelatedManager},
    model::RelationTarget,
    store::RelatedQuery,
};
use std::sync::Arc;

///
/// ManyRelation
///

#[derive(Debug)]
pub enum ManyRelation {
    /// Reverse side of a foreign key: rows of the declaring type.
    ReverseForeignKey {
        declaring: Arc<RelationTarget>,
        column: String,
    },

    /// Either side of a many-to-many link table.
    ManyToMany {
        link: String,
        target: Arc<RelationTarget>,
        reverse: bool,
    },
}

///
/// ManyValuedAccessor
///

pub struct ManyValuedAccessor {
    binding: AttributeBinding,
    relation: ManyRelation,
}

impl ManyValuedAccessor {
    #[must_use]
    pub fn new(name: &str, relation: ManyRelation) -> Self {
        Self {
            binding: AttributeBinding::new(name, AccessorKind::ManyValued),
            relation,
        }
    }

    #[must_use]
    pub const fn relation(&self) -> &ManyRelation {
        &self.relation
    }
}

impl Accessor for ManyValuedAccessor {
    fn binding(&self) -> &AttributeBinding {
        &self.binding
    }

    fn get(&self, instance: &mut Instance) -> Result<Attr, AccessError> {
        let key = instance.key().cloned().ok_or_else(|| {
            InternalError::instance_unsupported(format!(
                "{instance} needs a primary key before '{}' can be used",
                self.binding.name
            ))
        })?;

        let query = match &self.relation {
            ManyRelation::ReverseForeignKey { declaring, column } => {
                RelatedQuery::ReverseForeignKey {
                    entity: declaring.get()?,
                    column: column.clone(),
                    key,
                }
            }
            ManyRelation::ManyToMany {
                link,
                target,
                reverse,
            } => RelatedQuery::ManyToMany {
                link: link.clone(),
                target: target.get()?,
                reverse: *reverse,
                key,
            },
        };

        Ok(Attr::Many(RelatedManager::new(
            &self.binding.name,
            query,
            instance.store()?,
        )))
    }
}
