use crate::{
    accessor::{Accessor, AttributeBinding},
    error::AccessError,
    instance::{Attr, Instance},
    seal::{GuardCheck, GuardStrategy, UnsealedAttributeAccess, ViolationMode},
};
use std::{fmt, sync::Arc};

///
/// GuardedAccessor
///
/// Wraps an original accessor. Unsealed instances go straight through;
/// sealed ones are checked against the strategy first.
///

pub struct GuardedAccessor {
    inner: Arc<dyn Accessor>,
    strategy: &'static dyn GuardStrategy,
    mode: ViolationMode,
}

impl GuardedAccessor {
    #[must_use]
    pub fn new(
        inner: Arc<dyn Accessor>,
        strategy: &'static dyn GuardStrategy,
        mode: ViolationMode,
    ) -> Self {
        Self {
            inner,
            strategy,
            mode,
        }
    }

    #[must_use]
    pub fn inner(&self) -> &Arc<dyn Accessor> {
        &self.inner
    }

    #[must_use]
    pub const fn mode(&self) -> ViolationMode {
        self.mode
    }

    fn violation(&self, instance: &Instance) -> UnsealedAttributeAccess {
        UnsealedAttributeAccess::new(
            &self.inner.binding().name,
            self.strategy.category(),
            instance.type_name(),
        )
    }
}

impl Accessor for GuardedAccessor {
    fn binding(&self) -> &AttributeBinding {
        self.inner.binding()
    }

    fn get(&self, instance: &mut Instance) -> Result<Attr, AccessError> {
        if !instance.is_sealed() {
            return self.inner.get(instance);
        }

        match self.strategy.check(instance, self.inner.binding()) {
            GuardCheck::Safe => self.inner.get(instance),

            GuardCheck::Unsafe => {
                self.violation(instance)
                    .raise(self.mode, instance.entity().path())?;

                self.inner.get(instance)
            }

            GuardCheck::OnEnumerate => {
                let guard = EnumerationGuard {
                    violation: self.violation(instance),
                    entity_path: instance.entity().path().to_string(),
                    mode: self.mode,
                };

                // no handle to guard (no key, no store): the violation wins
                match self.inner.get(instance) {
                    Ok(Attr::Many(manager)) => Ok(Attr::Many(manager.guarded(guard))),
                    Ok(other) => Ok(other),
                    Err(err) => {
                        guard.enforce()?;
                        Err(err)
                    }
                }
            }
        }
    }

    fn is_guarded(&self) -> bool {
        true
    }
}

impl fmt::Debug for GuardedAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedAccessor")
            .field("binding", self.inner.binding())
            .field("category", &self.strategy.category())
            .field("mode", &self.mode)
            .finish()
    }
}

///
/// EnumerationGuard
/// Carried by a related manager handed out from a sealed instance.
///

#[derive(Clone, Debug)]
pub struct EnumerationGuard {
    violation: UnsealedAttributeAccess,
    entity_path: String,
    mode: ViolationMode,
}

impl EnumerationGuard {
    pub(crate) fn enforce(&self) -> Result<(), UnsealedAttributeAccess> {
        self.violation.clone().raise(self.mode, &self.entity_path)
    }
}
