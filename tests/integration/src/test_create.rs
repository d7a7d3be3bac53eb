//! Create pipeline: defaults, composites, validation and create coercion.

#[cfg(test)]
mod tests {
    use dynamodel_core::{ModelConfig, ModelError, ValidationError};
    use dynamodel_model::{Document, Value, doc};

    use crate::{order_model, order_model_with};

    fn order(tenant: &str, id: &str) -> Document {
        doc! {
            "tenant" => tenant,
            "orderId" => id,
            "total" => 42,
            "email" => "Buyer@Example.COM",
        }
    }

    #[tokio::test]
    async fn test_should_fill_defaults_composites_and_hooks() {
        let req = order_model().prepare_create(&order("acme", "o-1")).await.unwrap();

        assert_eq!(req.table_name, "orders");
        assert_eq!(req.item.get("pk"), Some(&Value::from("acme#o-1")));
        assert_eq!(req.item.get("status"), Some(&Value::from("pending")));
        assert_eq!(
            req.item.get("createdAt"),
            Some(&Value::from("2024-01-02T03:04:05.000Z"))
        );
        assert!(req.item.get("updatedAt").is_none());
        assert_eq!(req.item.get("email"), Some(&Value::from("buyer@example.com")));
    }

    #[tokio::test]
    async fn test_should_guard_create_with_not_exists_condition() {
        let req = order_model().prepare_create(&order("acme", "o-1")).await.unwrap();
        assert_eq!(
            req.condition_expression.as_deref(),
            Some("attribute_not_exists(#_hash_key) AND attribute_not_exists(#_range_key)")
        );
        assert_eq!(
            req.expression_attribute_names.get("#_hash_key").map(String::as_str),
            Some("pk")
        );
        assert_eq!(
            req.expression_attribute_names.get("#_range_key").map(String::as_str),
            Some("orderId")
        );
    }

    #[tokio::test]
    async fn test_should_skip_condition_when_disabled() {
        let model = order_model_with(ModelConfig {
            create_condition: false,
            ..ModelConfig::default()
        });
        let req = model.prepare_create(&order("acme", "o-1")).await.unwrap();
        assert!(req.condition_expression.is_none());
        assert!(req.expression_attribute_names.is_empty());
    }

    #[tokio::test]
    async fn test_should_reject_value_outside_enum() {
        let mut doc = order("acme", "o-1");
        doc.insert("status", "lost");
        let err = order_model().prepare_create(&doc).await.unwrap_err();
        match err {
            ModelError::Validation(ValidationError::Field { path, code, .. }) => {
                assert_eq!(path, "status");
                assert_eq!(code, "enum");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_should_run_custom_validator() {
        let mut doc = order("acme", "o-1");
        doc.insert("email", "nobody");
        let err = order_model().prepare_create(&doc).await.unwrap_err();
        match err {
            ModelError::Validation(e) => assert_eq!(e.code(), Some("isEmail")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_should_report_nested_paths() {
        let mut doc = order("acme", "o-1");
        doc.insert(
            "lines",
            vec![
                Value::from(doc! { "sku" => "a", "qty" => 1 }),
                Value::from(doc! { "sku" => "b", "qty" => -2 }),
            ],
        );
        let err = order_model().prepare_create(&doc).await.unwrap_err();
        match err {
            ModelError::Validation(ValidationError::Field { path, code, .. }) => {
                assert_eq!(path, "lines[1].qty");
                assert_eq!(code, "isUnsigned");
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut doc = order("acme", "o-1");
        doc.insert("shipping", doc! { "city" => "Oslo", "zip" => "" });
        let err = order_model().prepare_create(&doc).await.unwrap_err();
        assert!(matches!(
            err,
            ModelError::Validation(ValidationError::Field { ref path, .. }) if path == "shipping.zip"
        ));
    }

    #[tokio::test]
    async fn test_should_aggregate_missing_required_fields() {
        let mut doc = Document::new();
        doc.insert("lines", vec![Value::from(doc! { "qty" => 1 })]);
        let err = order_model().prepare_create(&doc).await.unwrap_err();
        match err {
            ModelError::Validation(ValidationError::MissingRequired { fields }) => {
                assert_eq!(fields, ["tenant", "orderId", "lines[0].sku"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_should_reject_unexpected_fields_when_strict() {
        let model = order_model_with(ModelConfig {
            strict_fields: true,
            ..ModelConfig::default()
        });
        let mut doc = order("acme", "o-1");
        doc.insert("bogus", 1);
        doc.insert("shipping", doc! { "planet" => "Mars" });
        let err = model.prepare_create(&doc).await.unwrap_err();
        match err {
            ModelError::Validation(ValidationError::UnexpectedFields { fields }) => {
                assert_eq!(fields, ["bogus", "shipping.planet"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let lenient = order_model().prepare_create(&doc).await.unwrap();
        assert_eq!(lenient.item.get("bogus"), Some(&Value::from(1)));
    }

    #[tokio::test]
    async fn test_should_prepare_many_creates() {
        let docs = [order("acme", "o-1"), order("acme", "o-2"), order("globex", "o-1")];
        let reqs = order_model().prepare_create_many(&docs).await.unwrap();
        let keys: Vec<_> = reqs.iter().map(|r| r.item.get("pk").cloned()).collect();
        assert_eq!(
            keys,
            [
                Some(Value::from("acme#o-1")),
                Some(Value::from("acme#o-2")),
                Some(Value::from("globex#o-1")),
            ]
        );
    }

    #[tokio::test]
    async fn test_should_fail_whole_batch_on_one_invalid_document() {
        let mut bad = order("acme", "o-2");
        bad.insert("total", -1);
        let err = order_model()
            .prepare_create_many(&[order("acme", "o-1"), bad])
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Validation(_)));
    }

    #[tokio::test]
    async fn test_should_match_created_items_with_lookup_keys() -> anyhow::Result<()> {
        let model = order_model();
        let docs = [order("acme", "o-1"), order("acme", "o-2"), order("globex", "o-9")];

        let puts = futures::future::try_join_all(docs.iter().map(|d| model.prepare_create(d)));
        let keys = futures::future::try_join_all(docs.iter().map(|d| model.key(d)));
        let (puts, keys) = futures::try_join!(puts, keys)?;

        for (put, key) in puts.iter().zip(&keys) {
            tracing::info!(?key, "created item key");
            for (attribute, value) in key.iter() {
                assert_eq!(put.item.get(attribute), Some(value));
            }
        }
        let get = model.prepare_get::<&str>(&keys[2], &[]).await?;
        assert_eq!(get.key.get("pk"), Some(&Value::from("globex#o-9")));
        Ok(())
    }
}
