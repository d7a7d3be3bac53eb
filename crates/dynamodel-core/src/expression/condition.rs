//! Existence conditions for writes.

use dynamodel_model::{ExpressionFragment, KeySchema};

const HASH_PLACEHOLDER: &str = "#_hash_key";
const RANGE_PLACEHOLDER: &str = "#_range_key";

/// `attribute_not_exists(#_hash_key)[ AND attribute_not_exists(#_range_key)]`,
/// guarding a create against overwriting an existing item.
#[must_use]
pub fn create_condition(key: &KeySchema) -> ExpressionFragment {
    existence(key, "attribute_not_exists")
}

/// `attribute_exists(#_hash_key)[ AND attribute_exists(#_range_key)]`,
/// guarding an in-place update against creating a new item.
#[must_use]
pub fn exists_condition(key: &KeySchema) -> ExpressionFragment {
    existence(key, "attribute_exists")
}

fn existence(key: &KeySchema, function: &str) -> ExpressionFragment {
    let mut fragment = ExpressionFragment::new(format!("{function}({HASH_PLACEHOLDER})"))
        .with_name(HASH_PLACEHOLDER, key.hash.as_str());
    if let Some(range) = &key.range {
        fragment.expression = format!(
            "{} AND {function}({RANGE_PLACEHOLDER})",
            fragment.expression
        );
        fragment = fragment.with_name(RANGE_PLACEHOLDER, range.as_str());
    }
    fragment
}
