//! Expression compilers.
//!
//! Each compiler turns a declarative document into an
//! [`ExpressionFragment`](dynamodel_model::ExpressionFragment). Placeholders
//! come from one [`Placeholders`](placeholder::Placeholders) allocator per
//! compile call, so they never repeat within a fragment. Prefixes:
//!
//! | Prefix | Compiler |
//! |--------|----------|
//! | `f`, `fa`, `fo`, `fn`, `faa`, ... | filter, root and nested `AND`/`OR`/`NOT` groups |
//! | `k` | key condition |
//! | `u` | update / upsert `SET` clauses |
//! | `p` | projection |
//!
//! Existence conditions bind the fixed names `#_hash_key` and `#_range_key`.

pub mod condition;
pub mod filter;
pub mod key;
pub mod placeholder;
pub mod projection;
pub mod update;

use dynamodel_model::Operator;

pub use condition::{create_condition, exists_condition};
pub use filter::build_filter_expression;
pub use key::build_key_expression;
pub use projection::build_projection_expression;
pub use update::{stringify_update_statement, stringify_upsert_statement};

use crate::coerce::CoercionError;

/// A query, key or projection document is malformed.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Attribute is not declared in the schema.
    #[error("unknown property '{0}'")]
    UnknownProperty(String),
    /// Two operators of the same direction, e.g. `GT` and `GTE`.
    #[error("'{attribute}': {first} and {second} cannot be combined")]
    ConflictingOperators {
        /// Attribute name.
        attribute: String,
        /// First operator seen.
        first: Operator,
        /// Conflicting operator.
        second: Operator,
    },
    /// Operators from different families, e.g. `EQ` with `GT`.
    #[error("'{attribute}': {operator} cannot be combined with other operators")]
    MixedOperators {
        /// Attribute name.
        attribute: String,
        /// Operator that must stand alone.
        operator: Operator,
    },
    /// An operator object with no entries.
    #[error("'{0}': empty operator set")]
    EmptyOperators(String),
    /// `IN` with an empty list.
    #[error("'{0}': IN requires a non-empty list")]
    EmptyIn(String),
    /// `IN` operand is not a list.
    #[error("'{0}': IN requires a list")]
    InvalidInOperand(String),
    /// Operand is not a string, number, boolean or date.
    #[error("'{attribute}': cannot compare against a {found} value")]
    InvalidValueType {
        /// Attribute name.
        attribute: String,
        /// Shape found.
        found: &'static str,
    },
    /// A grouping operator used where only comparisons are allowed.
    #[error("'{attribute}': {operator} is not a comparison operator")]
    MisplacedOperator {
        /// Attribute name.
        attribute: String,
        /// The grouping operator.
        operator: Operator,
    },
    /// A comparison operator used as a group.
    #[error("{0} cannot group documents")]
    NotAGroupOperator(Operator),
    /// `AND`/`OR`/`NOT` inside a key condition.
    #[error("key conditions cannot use {0}")]
    BooleanInKeyCondition(Operator),
    /// A key attribute needs exactly one comparison.
    #[error("'{attribute}': key conditions need exactly one operator, found {count}")]
    KeyConditionOperatorCount {
        /// Attribute name.
        attribute: String,
        /// Operators given.
        count: usize,
    },
    /// `NE` or `IN` in a key condition.
    #[error("'{attribute}': {operator} is not allowed in key conditions")]
    UnsupportedKeyOperator {
        /// Attribute name.
        attribute: String,
        /// Offending operator.
        operator: Operator,
    },
    /// Attribute is not part of the index key.
    #[error("'{attribute}' is not a key attribute of {index}")]
    NotAKeyAttribute {
        /// Attribute name.
        attribute: String,
        /// Index name.
        index: String,
    },
    /// The hash key needs an equality condition.
    #[error("key condition must test hash key '{0}' with EQ")]
    MissingHashCondition(String),
    /// No index matches the key condition.
    #[error("no index can serve a key condition on {0:?}")]
    NoMatchingIndex(Vec<String>),
    /// Named index does not exist.
    #[error("unknown index '{0}'")]
    UnknownIndex(String),
    /// Update has nothing to set.
    #[error("update document has no attributes to set")]
    EmptyUpdate,
    /// Operand failed coercion.
    #[error(transparent)]
    Coercion(#[from] CoercionError),
}
