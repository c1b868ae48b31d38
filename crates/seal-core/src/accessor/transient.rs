use crate::{
    accessor::{Accessor, AccessorKind, AttributeBinding},
    error::AccessError,
    instance::{Attr, Instance},
};
use seal_schema::types::Value;

///
/// TransientAccessor
/// In-memory attribute; never loads, never guarded.
///

pub struct TransientAccessor {
    binding: AttributeBinding,
    default: Value,
}

impl TransientAccessor {
    #[must_use]
    pub fn new(name: &str, default: Value) -> Self {
        Self {
            binding: AttributeBinding::new(name, AccessorKind::Plain),
            default,
        }
    }
}

impl Accessor for TransientAccessor {
    fn binding(&self) -> &AttributeBinding {
        &self.binding
    }

    fn get(&self, instance: &mut Instance) -> Result<Attr, AccessError> {
        let value = instance
            .value(&self.binding.name)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        Ok(Attr::Value(value))
    }
}
