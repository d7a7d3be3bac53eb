//! Update, upsert and delete pipelines.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dynamodel_core::coerce::refresh_composites;
    use dynamodel_core::{CompileError, ModelError};
    use dynamodel_model::{Operator, Value, Where, doc};

    use crate::{fixed_now, order_model, placeholder_for};

    /// Whether the `SET` clause binds `attribute`.
    fn sets(names: &HashMap<String, String>, attribute: &str) -> bool {
        names
            .iter()
            .any(|(placeholder, name)| placeholder.starts_with("#u") && name == attribute)
    }

    fn fixed_millis() -> Value {
        #[allow(clippy::cast_precision_loss)]
        Value::Number(fixed_now().timestamp_millis() as f64)
    }

    #[tokio::test]
    async fn test_should_set_changes_and_update_hooks() {
        let req = order_model()
            .prepare_update(
                &doc! { "tenant" => "acme", "orderId" => "o-1" },
                &doc! { "status" => "shipped" },
                None,
            )
            .await
            .unwrap();

        assert_eq!(req.key, doc! { "pk" => "acme#o-1", "orderId" => "o-1" });
        assert_eq!(req.update_expression.as_deref(), Some("SET #u1 = :u1, #u2 = :u2"));
        let names = &req.expression_attribute_names;
        let values = &req.expression_attribute_values;
        assert_eq!(names.get("#u1").map(String::as_str), Some("status"));
        assert_eq!(names.get("#u2").map(String::as_str), Some("updatedAt"));
        assert_eq!(values.get(":u1"), Some(&Value::from("shipped")));
        assert_eq!(values.get(":u2"), Some(&fixed_millis()));
        assert_eq!(
            req.condition_expression.as_deref(),
            Some("attribute_exists(#_hash_key) AND attribute_exists(#_range_key)")
        );
    }

    #[tokio::test]
    async fn test_should_and_user_condition_with_existence_guard() {
        let condition = Where::new()
            .eq("status", "pending")
            .or([Where::new().op("total", Operator::Lt, 10), Where::new().eq("email", "a@b")]);
        let req = order_model()
            .prepare_update(
                &doc! { "pk" => "acme#o-1", "orderId" => "o-1" },
                &doc! { "status" => "shipped" },
                Some(&condition),
            )
            .await
            .unwrap();

        let expression = req.condition_expression.unwrap();
        assert!(expression.starts_with(
            "attribute_exists(#_hash_key) AND attribute_exists(#_range_key) AND "
        ));
        assert!(expression.contains(" OR "));
        let names = &req.expression_attribute_names;
        assert!(placeholder_for(names, "status").is_some());
        assert!(placeholder_for(names, "total").is_some());
        assert!(names.contains_key("#u1"));
        assert_eq!(req.expression_attribute_values.len(), 5);
    }

    #[tokio::test]
    async fn test_should_drop_key_attributes_from_changes() {
        let req = order_model()
            .prepare_update(
                &doc! { "pk" => "acme#o-1", "orderId" => "o-1" },
                &doc! { "orderId" => "o-2", "pk" => "x", "total" => 3 },
                None,
            )
            .await
            .unwrap();
        let names = &req.expression_attribute_names;
        assert!(!sets(names, "orderId"));
        assert!(!sets(names, "pk"));
        assert!(sets(names, "total"));
    }

    #[tokio::test]
    async fn test_should_reject_update_with_unknown_condition_attribute() {
        let condition = Where::new().eq("nope", 1);
        let err = order_model()
            .prepare_update(
                &doc! { "pk" => "acme#o-1", "orderId" => "o-1" },
                &doc! { "total" => 3 },
                Some(&condition),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Compile(CompileError::UnknownProperty(_))));
    }

    #[tokio::test]
    async fn test_should_keep_defaults_behind_if_not_exists_on_upsert() {
        let req = order_model()
            .prepare_upsert(&doc! { "tenant" => "acme", "orderId" => "o-1", "total" => 5 })
            .await
            .unwrap();

        assert_eq!(req.key, doc! { "pk" => "acme#o-1", "orderId" => "o-1" });
        assert!(req.condition_expression.is_none());
        let expression = req.update_expression.unwrap();
        let names = &req.expression_attribute_names;

        let status = placeholder_for(names, "status").unwrap();
        assert!(expression.contains(&format!("{status} = if_not_exists({status}, ")));
        for exact in ["tenant", "total", "updatedAt"] {
            let ph = placeholder_for(names, exact).unwrap();
            let value_ph = ph.replacen('#', ":", 1);
            assert!(expression.contains(&format!("{ph} = {value_ph}")), "{exact}: {expression}");
        }
        assert!(placeholder_for(names, "createdAt").is_none());
        assert!(placeholder_for(names, "pk").is_none());
    }

    #[tokio::test]
    async fn test_should_require_derivable_key_on_upsert() {
        let err = order_model()
            .prepare_upsert(&doc! { "orderId" => "o-1", "total" => 5 })
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingKey(ref e) if e.attribute == "pk"));
    }

    #[tokio::test]
    async fn test_should_prepare_conditional_delete() {
        let req = order_model()
            .prepare_delete(
                &doc! { "tenant" => "acme", "orderId" => "o-1" },
                Some(&Where::new().eq("status", "cancelled")),
            )
            .await
            .unwrap();
        assert_eq!(req.key, doc! { "pk" => "acme#o-1", "orderId" => "o-1" });
        assert_eq!(req.condition_expression.as_deref(), Some("#f1 = :f1"));
        assert_eq!(
            req.expression_attribute_values.get(":f1"),
            Some(&Value::from("cancelled"))
        );
    }

    #[tokio::test]
    async fn test_should_refresh_composites_only_on_request() {
        let model = order_model();
        let changes = doc! { "tenant" => "globex", "orderId" => "o-9" };
        let req = model
            .prepare_update(&doc! { "pk" => "acme#o-1", "orderId" => "o-1" }, &changes, None)
            .await
            .unwrap();
        assert!(!sets(&req.expression_attribute_names, "pk"));

        let refreshed = refresh_composites(model.schema(), &changes);
        assert_eq!(refreshed.get("pk"), Some(&Value::from("globex#o-9")));
        let partial = refresh_composites(model.schema(), &doc! { "tenant" => "globex" });
        assert!(partial.get("pk").is_none());
    }
}
