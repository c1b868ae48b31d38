use serde::Serialize;
use std::{collections::BTreeMap, fmt};

///
/// ErrorTree
///
/// Route-aware collection of validation messages. Messages at this level live
/// in `messages`; nested nodes (fields, managers) get their own subtree keyed
/// by route.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ErrorTree {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Self>,
}

impl ErrorTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message at this level.
    pub fn add(&mut self, message: impl fmt::Display) {
        self.messages.push(message.to_string());
    }

    /// Merge another tree under `route`, dropping it when empty.
    pub fn add_route(&mut self, route: impl Into<String>, tree: Self) {
        if tree.is_empty() {
            return;
        }

        let entry = self.children.entry(route.into()).or_default();
        entry.merge(tree);
    }

    /// Merge another tree into this one at the same level.
    pub fn merge(&mut self, other: Self) {
        self.messages.extend(other.messages);
        for (route, child) in other.children {
            self.add_route(route, child);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.children.values().all(Self::is_empty)
    }

    /// Total number of messages in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len() + self.children.values().map(Self::len).sum::<usize>()
    }

    /// Flatten into `(route, message)` pairs, routes joined with `.`.
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into(String::new(), &mut out);

        out
    }

    fn flatten_into(&self, prefix: String, out: &mut Vec<(String, String)>) {
        for message in &self.messages {
            out.push((prefix.clone(), message.clone()));
        }
        for (route, child) in &self.children {
            let next = if prefix.is_empty() {
                route.clone()
            } else {
                format!("{prefix}.{route}")
            };
            child.flatten_into(next, out);
        }
    }

    /// Ok when empty, otherwise the tree itself.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self
            .flatten()
            .into_iter()
            .map(|(route, message)| {
                if route.is_empty() {
                    message
                } else {
                    format!("{route}: {message}")
                }
            })
            .collect::<Vec<_>>();

        write!(f, "{}", lines.join("; "))
    }
}

impl std::error::Error for ErrorTree {}

/// Push a formatted message onto an [`ErrorTree`].
#[macro_export]
macro_rules! err {
    ($errs:expr, $($arg:tt)*) => {
        $errs.add(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_is_ok() {
        assert!(ErrorTree::new().result().is_ok());
    }

    #[test]
    fn empty_children_are_dropped() {
        let mut errs = ErrorTree::new();
        errs.add_route("weight", ErrorTree::new());

        assert!(errs.children.is_empty());
        assert!(errs.is_empty());
    }

    #[test]
    fn flatten_joins_routes() {
        let mut field = ErrorTree::new();
        err!(field, "ident '{}' is reserved", "pk");

        let mut errs = ErrorTree::new();
        err!(errs, "entity is broken");
        errs.add_route("pk", field);

        assert_eq!(errs.len(), 2);
        assert_eq!(
            errs.flatten(),
            vec![
                (String::new(), "entity is broken".to_string()),
                ("pk".to_string(), "ident 'pk' is reserved".to_string()),
            ]
        );
        assert_eq!(
            errs.to_string(),
            "entity is broken; pk: ident 'pk' is reserved"
        );
    }
}
