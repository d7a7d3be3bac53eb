//! Query and scan compilation, including index selection.

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use dynamodel_core::{CompileError, ModelError, QueryOptions, ScanOptions};
    use dynamodel_model::{Condition, Operator, Value, Where};

    use crate::order_model;

    #[tokio::test]
    async fn test_should_query_primary_key() {
        let options = QueryOptions::new(
            Where::new()
                .eq("pk", "acme#o-1")
                .op("orderId", Operator::Gte, "o-"),
        );
        let req = order_model().prepare_query(&options).await.unwrap();

        assert!(req.index_name.is_none());
        assert_eq!(req.key_condition_expression, "#k1 = :k1 AND #k2 >= :k2");
        assert_eq!(
            req.expression_attribute_names.get("#k2").map(String::as_str),
            Some("orderId")
        );
        assert_eq!(
            req.expression_attribute_values.get(":k1"),
            Some(&Value::from("acme#o-1"))
        );
    }

    #[tokio::test]
    async fn test_should_pick_global_index_and_coerce_dates() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let options = QueryOptions::new(
            Where::new()
                .eq("status", "pending")
                .op("createdAt", Operator::Gte, since),
        );
        let req = order_model().prepare_query(&options).await.unwrap();

        assert_eq!(req.index_name.as_deref(), Some("byStatus"));
        assert_eq!(
            req.expression_attribute_values.get(":k2"),
            Some(&Value::from("2024-01-01T00:00:00.000Z"))
        );
    }

    #[tokio::test]
    async fn test_should_combine_key_filter_and_projection() {
        let options = QueryOptions::new(Where::new().eq("pk", "acme#o-1"))
            .index("byTotal")
            .filter(Where::new().attr(
                "total",
                Condition::ops([(Operator::Gt, 10), (Operator::Lte, 100)]),
            ))
            .attributes(["orderId", "total"])
            .limit(25)
            .descending();
        let req = order_model().prepare_query(&options).await.unwrap();

        assert_eq!(req.index_name.as_deref(), Some("byTotal"));
        assert_eq!(req.key_condition_expression, "#k1 = :k1");
        assert_eq!(req.filter_expression.as_deref(), Some("#f1 <= :f1l AND #f1 > :f1r"));
        assert_eq!(req.projection_expression.as_deref(), Some("#p1, #p2"));
        assert_eq!(req.limit, Some(25));
        assert_eq!(req.scan_index_forward, Some(false));

        let names = &req.expression_attribute_names;
        assert_eq!(names.len(), 4);
        assert_eq!(names.get("#f1").map(String::as_str), Some("total"));
        assert_eq!(names.get("#p1").map(String::as_str), Some("orderId"));
        let values = &req.expression_attribute_values;
        assert_eq!(values.get(":f1l"), Some(&Value::from(100)));
        assert_eq!(values.get(":f1r"), Some(&Value::from(10)));
    }

    #[tokio::test]
    async fn test_should_fail_without_matching_index() {
        let options = QueryOptions::new(Where::new().eq("email", "a@b"));
        let err = order_model().prepare_query(&options).await.unwrap_err();
        assert!(matches!(
            err,
            ModelError::Compile(CompileError::NoMatchingIndex(ref attrs)) if attrs == &["email"]
        ));

        let options = QueryOptions::new(Where::new().eq("pk", "x")).index("byNothing");
        let err = order_model().prepare_query(&options).await.unwrap_err();
        assert!(matches!(err, ModelError::Compile(CompileError::UnknownIndex(_))));
    }

    #[tokio::test]
    async fn test_should_reject_range_only_and_grouped_key_conditions() {
        let options =
            QueryOptions::new(Where::new().op("orderId", Operator::Gt, "a")).index("byTotal");
        let err = order_model().prepare_query(&options).await.unwrap_err();
        assert!(matches!(err, ModelError::Compile(CompileError::NotAKeyAttribute { .. })));

        let options = QueryOptions::new(
            Where::new()
                .eq("pk", "x")
                .or([Where::new().eq("orderId", "a"), Where::new().eq("orderId", "b")]),
        );
        let err = order_model().prepare_query(&options).await.unwrap_err();
        assert!(matches!(
            err,
            ModelError::Compile(CompileError::BooleanInKeyCondition(Operator::Or))
        ));
    }

    #[tokio::test]
    async fn test_should_scan_with_in_filter() {
        let options = ScanOptions {
            filter: Some(Where::new().op(
                "status",
                Operator::In,
                vec![Value::from("pending"), Value::from("shipped")],
            )),
            index: Some("byStatus".to_owned()),
            ..ScanOptions::default()
        };
        let req = order_model().prepare_scan(&options).await.unwrap();

        assert_eq!(req.table_name, "orders");
        assert_eq!(req.index_name.as_deref(), Some("byStatus"));
        assert_eq!(req.filter_expression.as_deref(), Some("#f1 IN (:f1l0, :f1l1)"));
        assert!(req.projection_expression.is_none());
        assert_eq!(req.expression_attribute_values.len(), 2);
    }

    #[tokio::test]
    async fn test_should_serialize_requests_in_wire_casing() {
        let options = QueryOptions::new(Where::new().eq("pk", "acme#o-1"));
        let req = order_model().prepare_query(&options).await.unwrap();
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["TableName"], "orders");
        assert_eq!(json["KeyConditionExpression"], "#k1 = :k1");
        assert_eq!(json["ExpressionAttributeNames"]["#k1"], "pk");
        assert_eq!(json["ExpressionAttributeValues"][":k1"], "acme#o-1");
        assert!(json.get("FilterExpression").is_none());
        assert!(json.get("IndexName").is_none());
    }
}
