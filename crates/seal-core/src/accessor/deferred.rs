use crate::{
    accessor::{Accessor, AccessorKind, AttributeBinding},
    error::AccessError,
    instance::{Attr, Instance},
};

///
/// DeferredFieldAccessor
/// Stored column: the loaded value, or one fetch by primary key.
///

pub struct DeferredFieldAccessor {
    binding: AttributeBinding,
}

impl DeferredFieldAccessor {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            binding: AttributeBinding::new(name, AccessorKind::DeferredField).with_column(name),
        }
    }
}

impl Accessor for DeferredFieldAccessor {
    fn binding(&self) -> &AttributeBinding {
        &self.binding
    }

    fn get(&self, instance: &mut Instance) -> Result<Attr, AccessError> {
        let column = self.binding.column.as_deref().unwrap_or(&self.binding.name);

        instance.column_value(column).map(Attr::Value)
    }
}
