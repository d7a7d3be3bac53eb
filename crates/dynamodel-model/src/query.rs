//! Typed where-documents.
//!
//! A [`Where`] is an ordered list of clauses. A clause is either an operator
//! group (`AND`/`OR`/`NOT` over nested documents) or a condition on a named
//! attribute. Operators are enum values, never strings, so an attribute
//! literally called `"AND"` cannot be mistaken for a group.

use std::fmt;

use crate::value::Value;

/// Query operator tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Conjunction group.
    And,
    /// Disjunction group.
    Or,
    /// Negation group.
    Not,
    /// Equal (`=`).
    Eq,
    /// Not equal (`<>`).
    Ne,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Gte,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Lte,
    /// Membership in a list.
    In,
}

impl Operator {
    /// Operator name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Gt => "GT",
            Self::Gte => "GTE",
            Self::Lt => "LT",
            Self::Lte => "LTE",
            Self::In => "IN",
        }
    }

    /// Whether this is a structural grouping operator.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Not)
    }

    /// Expression symbol for binary comparisons.
    #[must_use]
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            Self::Eq => Some("="),
            Self::Ne => Some("<>"),
            Self::Gt => Some(">"),
            Self::Gte => Some(">="),
            Self::Lt => Some("<"),
            Self::Lte => Some("<="),
            _ => None,
        }
    }

    /// Letter appended to the placeholder prefix of a nested group.
    #[must_use]
    pub fn group_letter(&self) -> Option<char> {
        match self {
            Self::And => Some('a'),
            Self::Or => Some('o'),
            Self::Not => Some('n'),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition on a single attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Bare value, implying equality.
    Value(Value),
    /// Operator object, e.g. `{GT: 1, LT: 5}`.
    Operators(Vec<(Operator, Value)>),
}

impl Condition {
    /// Single-operator condition.
    #[must_use]
    pub fn op(op: Operator, value: impl Into<Value>) -> Self {
        Self::Operators(vec![(op, value.into())])
    }

    /// Condition from operator/value pairs, kept in the given order.
    #[must_use]
    pub fn ops<I, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Operator, V)>,
        V: Into<Value>,
    {
        Self::Operators(pairs.into_iter().map(|(op, v)| (op, v.into())).collect())
    }

    /// Add another operator to this condition.
    #[must_use]
    pub fn and_op(self, op: Operator, value: impl Into<Value>) -> Self {
        let mut pairs = match self {
            Self::Value(v) => vec![(Operator::Eq, v)],
            Self::Operators(pairs) => pairs,
        };
        pairs.push((op, value.into()));
        Self::Operators(pairs)
    }
}

impl<T: Into<Value>> From<T> for Condition {
    fn from(value: T) -> Self {
        Self::Value(value.into())
    }
}

/// One entry of a where-document.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Operator group over nested documents.
    Group {
        /// Grouping operator; only `And`, `Or` and `Not` compile.
        op: Operator,
        /// Nested documents.
        docs: Vec<Where>,
    },
    /// Condition on a named attribute.
    Attribute {
        /// Attribute name.
        name: String,
        /// Condition on it.
        condition: Condition,
    },
}

/// A where-document: clauses in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Where {
    clauses: Vec<Clause>,
}

impl Where {
    /// Empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clauses in declaration order.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Whether the document has no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Append a raw clause.
    #[must_use]
    pub fn clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Condition on an attribute.
    #[must_use]
    pub fn attr(self, name: impl Into<String>, condition: impl Into<Condition>) -> Self {
        self.clause(Clause::Attribute {
            name: name.into(),
            condition: condition.into(),
        })
    }

    /// Bare-value equality on an attribute.
    #[must_use]
    pub fn eq(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attr(name, Condition::Value(value.into()))
    }

    /// Single-operator condition on an attribute.
    #[must_use]
    pub fn op(self, name: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.attr(name, Condition::op(op, value))
    }

    /// Operator group over the given documents.
    #[must_use]
    pub fn group(self, op: Operator, docs: impl IntoIterator<Item = Where>) -> Self {
        self.clause(Clause::Group {
            op,
            docs: docs.into_iter().collect(),
        })
    }

    /// `AND` group.
    #[must_use]
    pub fn and(self, docs: impl IntoIterator<Item = Where>) -> Self {
        self.group(Operator::And, docs)
    }

    /// `OR` group.
    #[must_use]
    pub fn or(self, docs: impl IntoIterator<Item = Where>) -> Self {
        self.group(Operator::Or, docs)
    }

    /// `NOT` over a single document.
    #[must_use]
    pub fn not(self, doc: Where) -> Self {
        self.group(Operator::Not, [doc])
    }

    /// Names of attributes referenced at the top level, in order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().filter_map(|c| match c {
            Clause::Attribute { name, .. } => Some(name.as_str()),
            Clause::Group { .. } => None,
        })
    }
}
