//! Update and upsert `SET` statements.

use std::collections::HashSet;

use dynamodel_model::{Document, ExpressionFragment};

use super::placeholder::Placeholders;

/// `SET #u1 = :u1, #u2 = :u2, ...` over every key of `doc`, in key order.
/// Returns `None` for an empty document.
#[must_use]
pub fn stringify_update_statement(doc: &Document) -> Option<ExpressionFragment> {
    set_statement(doc, |_| true)
}

/// Like [`stringify_update_statement`], but keys not in `exact_keys` (fields
/// filled in by defaults or hooks rather than supplied by the caller) only
/// take effect when the stored item lacks them:
/// `#u2 = if_not_exists(#u2, :u2)`.
#[must_use]
pub fn stringify_upsert_statement(
    doc: &Document,
    exact_keys: &HashSet<String>,
) -> Option<ExpressionFragment> {
    set_statement(doc, |key| exact_keys.contains(key))
}

fn set_statement(doc: &Document, is_exact: impl Fn(&str) -> bool) -> Option<ExpressionFragment> {
    if doc.is_empty() {
        return None;
    }
    let mut placeholders = Placeholders::new();
    let mut clauses = Vec::with_capacity(doc.len());
    for (key, value) in doc.iter() {
        let (name, val) = placeholders.allocate("u");
        placeholders.bind_name(&name, key);
        clauses.push(if is_exact(key) {
            format!("{name} = {val}")
        } else {
            format!("{name} = if_not_exists({name}, {val})")
        });
        placeholders.bind_value(val, value.clone());
    }
    Some(placeholders.finish(format!("SET {}", clauses.join(", "))))
}
