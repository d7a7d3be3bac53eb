//! Compiled request shapes.
//!
//! These mirror the item-level DynamoDB inputs: every expression is a plain
//! string and all placeholders of all fragments are merged into a single
//! pair of `expression_attribute_names` / `expression_attribute_values`
//! maps. Field naming is `PascalCase` to match the wire protocol; optional
//! fields and empty maps are omitted. The transport that sends them (and
//! the attribute-value encoding it uses) lives elsewhere.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::expression::ExpressionFragment;
use crate::value::{Document, Value};

/// Merge a fragment's placeholders into request maps, returning its text.
///
/// Existing bindings are kept; compilers use disjoint prefixes so a clash
/// only happens for identical bindings such as `#_hash_key`.
fn absorb(
    names: &mut HashMap<String, String>,
    values: &mut HashMap<String, Value>,
    fragment: ExpressionFragment,
) -> String {
    for (k, v) in fragment.names {
        names.entry(k).or_insert(v);
    }
    for (k, v) in fragment.values {
        values.entry(k).or_insert(v);
    }
    fragment.expression
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// A compiled `PutItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRequest {
    /// Table name.
    pub table_name: String,
    /// Coerced item to store.
    pub item: Document,
    /// Condition expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Name placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// Value placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, Value>,
}

impl PutRequest {
    /// Put without a condition.
    #[must_use]
    pub fn new(table_name: impl Into<String>, item: Document) -> Self {
        Self {
            table_name: table_name.into(),
            item,
            ..Self::default()
        }
    }

    /// Attach a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: ExpressionFragment) -> Self {
        self.condition_expression = Some(absorb(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
            condition,
        ));
        self
    }
}

/// A compiled `UpdateItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateRequest {
    /// Table name.
    pub table_name: String,
    /// Primary key of the item.
    pub key: Document,
    /// `SET` expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,
    /// Condition expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Name placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// Value placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, Value>,
}

impl UpdateRequest {
    /// Update with no expressions yet.
    #[must_use]
    pub fn new(table_name: impl Into<String>, key: Document) -> Self {
        Self {
            table_name: table_name.into(),
            key,
            ..Self::default()
        }
    }

    /// Attach the `SET` statement.
    #[must_use]
    pub fn with_update(mut self, update: ExpressionFragment) -> Self {
        self.update_expression = Some(absorb(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
            update,
        ));
        self
    }

    /// Attach a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: ExpressionFragment) -> Self {
        self.condition_expression = Some(absorb(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
            condition,
        ));
        self
    }
}

/// A compiled `DeleteItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteRequest {
    /// Table name.
    pub table_name: String,
    /// Primary key of the item.
    pub key: Document,
    /// Condition expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    /// Name placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// Value placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, Value>,
}

impl DeleteRequest {
    /// Unconditional delete.
    #[must_use]
    pub fn new(table_name: impl Into<String>, key: Document) -> Self {
        Self {
            table_name: table_name.into(),
            key,
            ..Self::default()
        }
    }

    /// Attach a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: ExpressionFragment) -> Self {
        self.condition_expression = Some(absorb(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
            condition,
        ));
        self
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// A compiled `GetItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetRequest {
    /// Table name.
    pub table_name: String,
    /// Primary key of the item.
    pub key: Document,
    /// Projection expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// Name placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
}

impl GetRequest {
    /// Get the whole item.
    #[must_use]
    pub fn new(table_name: impl Into<String>, key: Document) -> Self {
        Self {
            table_name: table_name.into(),
            key,
            ..Self::default()
        }
    }

    /// Restrict the returned attributes.
    #[must_use]
    pub fn with_projection(mut self, projection: ExpressionFragment) -> Self {
        let mut discarded = HashMap::new();
        self.projection_expression = Some(absorb(
            &mut self.expression_attribute_names,
            &mut discarded,
            projection,
        ));
        self
    }
}

/// A compiled `Query`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryRequest {
    /// Table name.
    pub table_name: String,
    /// Secondary index to query, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Key condition expression.
    pub key_condition_expression: String,
    /// Filter expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    /// Projection expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// Name placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// Value placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, Value>,
    /// Ascending (`true`) or descending traversal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,
    /// Maximum items to evaluate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl QueryRequest {
    /// Query over the given key condition.
    #[must_use]
    pub fn new(table_name: impl Into<String>, key_condition: ExpressionFragment) -> Self {
        let mut req = Self {
            table_name: table_name.into(),
            ..Self::default()
        };
        req.key_condition_expression = absorb(
            &mut req.expression_attribute_names,
            &mut req.expression_attribute_values,
            key_condition,
        );
        req
    }

    /// Attach a filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ExpressionFragment) -> Self {
        self.filter_expression = Some(absorb(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
            filter,
        ));
        self
    }

    /// Restrict the returned attributes.
    #[must_use]
    pub fn with_projection(mut self, projection: ExpressionFragment) -> Self {
        self.projection_expression = Some(absorb(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
            projection,
        ));
        self
    }
}

/// A compiled `Scan`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanRequest {
    /// Table name.
    pub table_name: String,
    /// Secondary index to scan, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Filter expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    /// Projection expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// Name placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,
    /// Value placeholders.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, Value>,
    /// Maximum items to evaluate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ScanRequest {
    /// Full-table scan.
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    /// Attach a filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ExpressionFragment) -> Self {
        self.filter_expression = Some(absorb(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
            filter,
        ));
        self
    }

    /// Restrict the returned attributes.
    #[must_use]
    pub fn with_projection(mut self, projection: ExpressionFragment) -> Self {
        self.projection_expression = Some(absorb(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
            projection,
        ));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_should_merge_placeholders_across_fragments() {
        let key = ExpressionFragment::new("#k1 = :k1")
            .with_name("#k1", "pk")
            .with_value(":k1", "USER#1");
        let filter = ExpressionFragment::new("#f1 > :f1")
            .with_name("#f1", "age")
            .with_value(":f1", 18);
        let req = QueryRequest::new("users", key).with_filter(filter);
        assert_eq!(req.key_condition_expression, "#k1 = :k1");
        assert_eq!(req.filter_expression.as_deref(), Some("#f1 > :f1"));
        assert_eq!(req.expression_attribute_names.len(), 2);
        assert_eq!(req.expression_attribute_values.len(), 2);
    }

    #[test]
    fn test_should_serialize_pascal_case_and_omit_empty() {
        let req = PutRequest::new("users", doc! { "id" => "1" });
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"TableName": "users", "Item": {"id": "1"}}));
    }
}
