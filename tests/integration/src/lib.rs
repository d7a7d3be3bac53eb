//! End-to-end tests for dynamodel models.
//!
//! Every test drives a [`Model`] through its `prepare_*` and `read`
//! operations and inspects the compiled request shapes. Nothing here talks
//! to a store, so the suite runs as part of a normal `cargo test`.
//!
//! Set `RUST_LOG=dynamodel_core=debug` to see what the pipelines do.

use std::sync::Once;

use chrono::{DateTime, TimeZone, Utc};
use dynamodel_core::schema::{Hook, Predicate, RawProperty, RawSchema, Transform};
use dynamodel_core::{Model, ModelConfig};
use dynamodel_model::{DateFormat, IndexDefinition, KeySchema, Value};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Timestamp every clock hook in the sample model returns.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
        .single()
        .unwrap_or_else(|| panic!("fixed timestamp must be valid"))
}

/// Schema of the sample `orders` table.
#[must_use]
pub fn order_schema() -> RawSchema {
    let lines = RawSchema::new()
        .property("sku", RawProperty::new("STRING").required())
        .property("qty", RawProperty::new("NUMBER").validate("isUnsigned", true));
    let shipping = RawSchema::new()
        .property("city", RawProperty::new("STRING"))
        .property("zip", RawProperty::new("STRING").validate("notEmpty", true));

    RawSchema::new()
        .property("tenant", RawProperty::new("STRING").required())
        .property("orderId", RawProperty::new("STRING").required())
        .property("pk", RawProperty::new("STRING").composite("{tenant}#{orderId}"))
        .property(
            "status",
            RawProperty::new("STRING")
                .enum_values(["pending", "shipped", "cancelled"])
                .default_value("pending"),
        )
        .property("total", RawProperty::new("NUMBER").validate("isUnsigned", true))
        .property(
            "email",
            RawProperty::new("STRING")
                .set(Transform::sync(|value| {
                    Ok(match value {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    })
                }))
                .validate(
                    "isEmail",
                    Predicate::sync(|value| value.as_str().is_some_and(|s| s.contains('@'))),
                ),
        )
        .property(
            "createdAt",
            RawProperty::new("DATE").on_create(Hook::sync(|current, _| {
                Ok(Some(current.unwrap_or_else(|| Value::Date(fixed_now()))))
            })),
        )
        .property(
            "updatedAt",
            RawProperty::new("DATE")
                .format(DateFormat::Number)
                .on_update(Hook::sync(|_, _| Ok(Some(Value::Date(fixed_now())))))
                .on_upsert(Hook::sync(|_, _| Ok(Some(Value::Date(fixed_now()))))),
        )
        .property("lines", RawProperty::new("LIST").properties(lines))
        .property("shipping", RawProperty::new("OBJECT").properties(shipping))
}

/// The sample `orders` model with the given configuration.
#[must_use]
pub fn order_model_with(config: ModelConfig) -> Model {
    init_tracing();
    Model::new(
        "orders",
        &order_schema(),
        KeySchema::new("pk").with_range("orderId"),
        vec![
            IndexDefinition::global("byStatus", KeySchema::new("status").with_range("createdAt")),
            IndexDefinition::local("byTotal", KeySchema::new("pk").with_range("total")),
        ],
        config,
    )
    .unwrap_or_else(|e| panic!("sample model must be valid: {e}"))
}

/// The sample `orders` model with default configuration.
#[must_use]
pub fn order_model() -> Model {
    order_model_with(ModelConfig::default())
}

/// Placeholder bound to `attribute` in a names map.
#[must_use]
pub fn placeholder_for<'a>(
    names: &'a std::collections::HashMap<String, String>,
    attribute: &str,
) -> Option<&'a str> {
    names
        .iter()
        .find(|(_, name)| name.as_str() == attribute)
        .map(|(placeholder, _)| placeholder.as_str())
}

mod test_create;
mod test_query;
mod test_read;
mod test_schema_json;
mod test_update;
