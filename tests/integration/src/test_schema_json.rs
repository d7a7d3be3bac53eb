//! Schemas, keys and indexes loaded from JSON.

#[cfg(test)]
mod tests {
    use dynamodel_core::{Model, ModelConfig, RawSchema, SchemaErrorKind};
    use dynamodel_model::{AttributeType, IndexDefinition, IndexKind, KeySchema, Value, doc};
    use serde_json::json;

    use crate::fixed_now;

    fn raw() -> RawSchema {
        serde_json::from_str(
            r#"{
                "id": { "type": "str", "required": true },
                "kind": { "type": "string", "enum": ["a", "b"], "default": "a" },
                "slug": { "type": "String", "composite": "{kind}-{id}" },
                "score": { "type": "f64", "validate": { "isUnsigned": true } },
                "seen": { "type": "DateTime", "format": "number" },
                "tags": { "type": "Vec", "properties": { "label": { "type": "text" } } }
            }"#,
        )
        .unwrap()
    }

    fn indexes() -> Vec<IndexDefinition> {
        serde_json::from_value(json!([
            { "name": "byKind", "kind": "global", "hash": "kind", "range": "seen" }
        ]))
        .unwrap()
    }

    #[test]
    fn test_should_keep_declaration_order_and_resolve_aliases() {
        let model = Model::new(
            "items",
            &raw(),
            KeySchema::new("id"),
            indexes(),
            ModelConfig::default(),
        )
        .unwrap();

        let schema = model.schema();
        assert_eq!(
            schema.names().collect::<Vec<_>>(),
            ["id", "kind", "slug", "score", "seen", "tags"]
        );
        assert_eq!(schema.get("score").map(|p| p.ty()), Some(AttributeType::Number));
        assert_eq!(schema.get("seen").map(|p| p.ty()), Some(AttributeType::Date));
        assert_eq!(schema.get("tags").map(|p| p.ty()), Some(AttributeType::List));
        assert_eq!(model.indexes()[0].kind, IndexKind::Global);
        assert_eq!(model.indexes()[0].key.range.as_deref(), Some("seen"));
    }

    #[tokio::test]
    async fn test_should_create_from_json_schema() {
        let model = Model::new(
            "items",
            &raw(),
            KeySchema::new("id"),
            indexes(),
            ModelConfig {
                table_prefix: "test-".to_owned(),
                ..ModelConfig::default()
            },
        )
        .unwrap();
        let req = model
            .prepare_create(&doc! { "id" => "x1", "score" => 3, "seen" => fixed_now() })
            .await
            .unwrap();

        assert_eq!(req.table_name, "test-items");
        assert_eq!(req.item.get("slug"), Some(&Value::from("a-x1")));
        #[allow(clippy::cast_precision_loss)]
        let millis = Value::Number(fixed_now().timestamp_millis() as f64);
        assert_eq!(req.item.get("seen"), Some(&millis));
    }

    #[test]
    fn test_should_report_schema_errors_with_paths() {
        let cases = [
            (
                json!({ "id": { "type": "uuid" } }),
                "id",
                SchemaErrorKind::UnknownType("uuid".to_owned()),
            ),
            (
                json!({
                    "tags": { "type": "list", "properties": { "a.b": { "type": "string" } } }
                }),
                "tags[].a.b",
                SchemaErrorKind::DottedName,
            ),
            (
                json!({ "n": { "type": "number", "composite": "{n}" } }),
                "n",
                SchemaErrorKind::CompositeNotString(AttributeType::Number),
            ),
        ];
        for (schema, path, kind) in cases {
            let raw: RawSchema = serde_json::from_value(schema).unwrap();
            let err = Model::new("t", &raw, KeySchema::new("id"), vec![], ModelConfig::default())
                .unwrap_err();
            assert_eq!(err.path, path);
            assert_eq!(err.kind, kind);
        }
    }

    #[test]
    fn test_should_reject_key_on_optional_composite_variable() {
        let err = Model::new(
            "items",
            &raw(),
            KeySchema::new("slug"),
            vec![],
            ModelConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.path, "slug");
        assert_eq!(
            err.kind,
            SchemaErrorKind::CompositeVariableNotRequired {
                index: "primary".to_owned(),
                variable: "kind".to_owned(),
            }
        );
    }
}
