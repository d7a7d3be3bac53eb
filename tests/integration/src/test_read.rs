//! Read coercion of stored items.

#[cfg(test)]
mod tests {
    use dynamodel_core::{CoercionError, ModelError};
    use dynamodel_model::{Value, doc};

    use crate::{fixed_now, order_model};

    #[tokio::test]
    async fn test_should_turn_stored_dates_back_into_dates() {
        #[allow(clippy::cast_precision_loss)]
        let millis = fixed_now().timestamp_millis() as f64;
        let item = doc! {
            "pk" => "acme#o-1",
            "orderId" => "o-1",
            "createdAt" => "2024-01-02T03:04:05.000Z",
            "updatedAt" => millis,
            "legacy" => "kept",
        };
        let read = order_model().read(&item).await.unwrap();

        assert_eq!(read.get("createdAt"), Some(&Value::Date(fixed_now())));
        assert_eq!(read.get("updatedAt"), Some(&Value::Date(fixed_now())));
        assert_eq!(read.get("legacy"), Some(&Value::from("kept")));
        assert_eq!(
            read.keys().collect::<Vec<_>>(),
            ["pk", "orderId", "createdAt", "updatedAt", "legacy"]
        );
    }

    #[tokio::test]
    async fn test_should_read_back_what_create_wrote() {
        let model = order_model();
        let put = model
            .prepare_create(&doc! {
                "tenant" => "acme",
                "orderId" => "o-1",
                "lines" => vec![Value::from(doc! { "sku" => "a", "qty" => 2 })],
            })
            .await
            .unwrap();
        let read = model.read(&put.item).await.unwrap();

        assert_eq!(read.get("createdAt"), Some(&Value::Date(fixed_now())));
        assert_eq!(read.get("pk"), Some(&Value::from("acme#o-1")));
        assert_eq!(read.get("lines"), put.item.get("lines"));
    }

    #[tokio::test]
    async fn test_should_read_many_items() {
        let items = [
            doc! { "pk" => "a#1", "orderId" => "1", "createdAt" => 0 },
            doc! { "pk" => "a#2", "orderId" => "2" },
        ];
        let read = order_model().read_many(&items).await.unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(
            read[0].get("createdAt").and_then(Value::as_date).map(chrono::DateTime::timestamp),
            Some(0)
        );
        assert!(read[1].get("createdAt").is_none());
    }

    #[tokio::test]
    async fn test_should_report_unparseable_dates_with_path() {
        let item = doc! { "pk" => "a#1", "orderId" => "1", "createdAt" => "yesterday" };
        let err = order_model().read(&item).await.unwrap_err();
        match err {
            ModelError::Coercion(CoercionError::InvalidDate { path, value }) => {
                assert_eq!(path, "createdAt");
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
