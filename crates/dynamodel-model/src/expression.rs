//! Compiled expression fragments.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// An `(expression, names, values)` triple ready for a DynamoDB-style API.
///
/// `names` maps `#placeholder` to an attribute name, `values` maps
/// `:placeholder` to a stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionFragment {
    /// Expression text.
    pub expression: String,
    /// Attribute-name placeholders.
    #[serde(default)]
    pub names: HashMap<String, String>,
    /// Attribute-value placeholders.
    #[serde(default)]
    pub values: HashMap<String, Value>,
}

impl ExpressionFragment {
    /// Fragment with the given expression and no placeholders.
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            names: HashMap::new(),
            values: HashMap::new(),
        }
    }

    /// Bind a name placeholder.
    #[must_use]
    pub fn with_name(mut self, placeholder: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(placeholder.into(), name.into());
        self
    }

    /// Bind a value placeholder.
    #[must_use]
    pub fn with_value(mut self, placeholder: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(placeholder.into(), value.into());
        self
    }

    /// AND-join two fragments.
    ///
    /// Placeholders are merged; an existing binding wins over a duplicate
    /// from `other`. A side containing a top-level `OR` is parenthesized.
    #[must_use]
    pub fn and(mut self, other: ExpressionFragment) -> Self {
        if other.expression.is_empty() {
            return self;
        }
        if self.expression.is_empty() {
            return other;
        }
        self.expression = format!(
            "{} AND {}",
            wrap_disjunction(&self.expression),
            wrap_disjunction(&other.expression)
        );
        for (k, v) in other.names {
            self.names.entry(k).or_insert(v);
        }
        for (k, v) in other.values {
            self.values.entry(k).or_insert(v);
        }
        self
    }

    /// `#placeholders` referenced by the expression text.
    #[must_use]
    pub fn referenced_names(&self) -> BTreeSet<&str> {
        scan_placeholders(&self.expression, '#')
    }

    /// `:placeholders` referenced by the expression text.
    #[must_use]
    pub fn referenced_values(&self) -> BTreeSet<&str> {
        scan_placeholders(&self.expression, ':')
    }

    /// Placeholders referenced by the expression with no binding.
    #[must_use]
    pub fn unresolved(&self) -> Vec<&str> {
        let mut missing: Vec<&str> = self
            .referenced_names()
            .into_iter()
            .filter(|p| !self.names.contains_key(*p))
            .collect();
        missing.extend(
            self.referenced_values()
                .into_iter()
                .filter(|p| !self.values.contains_key(*p)),
        );
        missing
    }

    /// Whether every referenced placeholder is bound.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.unresolved().is_empty()
    }
}

fn wrap_disjunction(expr: &str) -> String {
    if expr.contains(" OR ") && !is_wrapped(expr) {
        format!("({expr})")
    } else {
        expr.to_owned()
    }
}

/// Whether the outermost parentheses enclose the whole expression.
fn is_wrapped(expr: &str) -> bool {
    if !expr.starts_with('(') || !expr.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in expr.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != expr.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

fn scan_placeholders(expr: &str, sigil: char) -> BTreeSet<&str> {
    let mut out = BTreeSet::new();
    let mut rest = expr;
    while let Some(start) = rest.find(sigil) {
        let tail = &rest[start..];
        let end = tail[1..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .map_or(tail.len(), |i| i + 1);
        if end > 1 {
            out.insert(&tail[..end]);
        }
        rest = &tail[end.max(1)..];
    }
    out
}
