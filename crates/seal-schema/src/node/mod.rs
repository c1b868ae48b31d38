mod entity;
mod field;
mod manager;

pub use entity::*;
pub use field::*;
pub use manager::*;

use crate::RECURSIVE_RELATIONSHIP;

/// Qualify a type reference with `app_label`, mapping `"self"` to `self_path`.
///
/// `"Location"` becomes `"<app_label>.Location"`; already-qualified references
/// pass through unchanged.
#[must_use]
pub fn resolve_reference(reference: &str, app_label: &str, self_path: &str) -> String {
    if reference == RECURSIVE_RELATIONSHIP {
        return self_path.to_string();
    }
    if reference.contains('.') {
        return reference.to_string();
    }

    format!("{app_label}.{reference}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_resolve_against_label() {
        assert_eq!(
            resolve_reference("Location", "tests", "tests.SeaLion"),
            "tests.Location"
        );
        assert_eq!(
            resolve_reference("other.Location", "tests", "tests.SeaLion"),
            "other.Location"
        );
        assert_eq!(
            resolve_reference("self", "tests", "tests.SeaLion"),
            "tests.SeaLion"
        );
    }
}
