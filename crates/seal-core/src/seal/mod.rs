//! Sealing.
//!
//! A sealed instance answers reads from what is already loaded on it. Any
//! read that would go to the store raises [`UnsealedAttributeAccess`] (or
//! logs it, in warn mode). Guards are installed by wrapping the original
//! accessors of sealable types; unsealed instances are unaffected.

mod guard;
mod guarded;
mod sealer;
mod violation;
mod wrap;

#[cfg(test)]
mod tests;

pub use guard::{GuardCheck, GuardRegistry, GuardStrategy, guards, lookup_guard};
pub use guarded::{EnumerationGuard, GuardedAccessor};
pub use sealer::Sealer;
pub use violation::{AttributeCategory, UnsealedAttributeAccess, ViolationMode};
pub use wrap::{WrapOutcome, wrap_attribute};

use crate::instance::Instance;

/// Seal one instance. Idempotent; there is no unseal.
pub const fn seal_instance(instance: &mut Instance) {
    instance.seal();
}

#[must_use]
pub const fn is_sealed(instance: &Instance) -> bool {
    instance.is_sealed()
}
