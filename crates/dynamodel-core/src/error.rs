//! Crate-level error type.

use crate::coerce::CoercionError;
use crate::expression::CompileError;
use crate::schema::SchemaError;
use crate::validate::ValidationError;

/// A required hash or range attribute is missing from a key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing key attribute '{attribute}'")]
pub struct MissingKeyError {
    /// The absent attribute.
    pub attribute: String,
}

/// Any error a [`Model`](crate::model::Model) operation can return.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Model definition is invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A document failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A query or update document is malformed.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// A value could not be coerced.
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    /// A key lookup is missing an attribute.
    #[error(transparent)]
    MissingKey(#[from] MissingKeyError),
}

/// Join a parent path and a child segment: `a` + `b` is `a.b`, `a` + `[0]`
/// is `a[0]`, and an empty side yields the other.
#[must_use]
pub fn join_path(prefix: &str, path: &str) -> String {
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => path.to_owned(),
        (false, true) => prefix.to_owned(),
        (false, false) if path.starts_with('[') => format!("{prefix}{path}"),
        (false, false) => format!("{prefix}.{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_join_paths() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a", ""), "a");
        assert_eq!(join_path("a", "b"), "a.b");
        assert_eq!(join_path("a", "[2].b"), "a[2].b");
        assert_eq!(join_path("tags[]", "label"), "tags[].label");
    }
}
