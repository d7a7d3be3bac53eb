//! Key condition compiler.

use dynamodel_model::{Clause, Condition, ExpressionFragment, Operator, Where};
use tracing::debug;

use super::CompileError;
use super::filter::operand;
use super::placeholder::Placeholders;
use crate::schema::Schema;

/// Compile a key condition.
///
/// Key conditions are flat: `AND`/`OR`/`NOT` are rejected, and every
/// attribute carries exactly one of `EQ`, `LT`, `LTE`, `GT`, `GTE` (a bare
/// value is `EQ`). Comparisons are joined with `AND`. Returns `None` for an
/// empty document.
pub async fn build_key_expression(
    schema: &Schema,
    key: &Where,
) -> Result<Option<ExpressionFragment>, CompileError> {
    let mut placeholders = Placeholders::new();
    let mut parts = Vec::with_capacity(key.clauses().len());

    for clause in key.clauses() {
        let (attribute, condition) = match clause {
            Clause::Group { op, .. } => return Err(CompileError::BooleanInKeyCondition(*op)),
            Clause::Attribute { name, condition } => (name.as_str(), condition),
        };
        let prop = schema
            .get(attribute)
            .ok_or_else(|| CompileError::UnknownProperty(attribute.to_owned()))?;

        let (op, value) = match condition {
            Condition::Value(value) => (Operator::Eq, value),
            Condition::Operators(pairs) => match pairs.as_slice() {
                [(op, value)] => (*op, value),
                _ => {
                    return Err(CompileError::KeyConditionOperatorCount {
                        attribute: attribute.to_owned(),
                        count: pairs.len(),
                    });
                }
            },
        };

        let symbol = match op {
            Operator::Eq | Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
                op.symbol().unwrap_or("=")
            }
            Operator::And | Operator::Or | Operator::Not => {
                return Err(CompileError::BooleanInKeyCondition(op));
            }
            Operator::Ne | Operator::In => {
                return Err(CompileError::UnsupportedKeyOperator {
                    attribute: attribute.to_owned(),
                    operator: op,
                });
            }
        };

        let stored = operand(prop, attribute, value).await?;
        let (name_ph, value_ph) = placeholders.allocate("k");
        placeholders.bind_name(&name_ph, attribute);
        parts.push(format!("{name_ph} {symbol} {value_ph}"));
        placeholders.bind_value(value_ph, stored);
    }

    if parts.is_empty() {
        return Ok(None);
    }
    let expression = parts.join(" AND ");
    debug!(%expression, "compiled key condition");
    Ok(Some(placeholders.finish(expression)))
}

#[cfg(test)]
mod tests {
    use dynamodel_model::Value;

    use super::*;
    use crate::schema::{RawProperty, RawSchema, normalize};

    fn schema() -> Schema {
        normalize(
            &RawSchema::new()
                .property("a", RawProperty::new("NUMBER").required())
                .property("b", RawProperty::new("STRING")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_should_compile_bare_value_as_eq() {
        let f = build_key_expression(&schema(), &Where::new().eq("a", 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(f.expression, "#k1 = :k1");
        assert_eq!(f.names.get("#k1").map(String::as_str), Some("a"));
        assert_eq!(f.values.get(":k1"), Some(&Value::from(1)));
    }

    #[tokio::test]
    async fn test_should_join_hash_and_range_conditions() {
        let key = Where::new().eq("a", 1).op("b", Operator::Gte, "m");
        let f = build_key_expression(&schema(), &key).await.unwrap().unwrap();
        assert_eq!(f.expression, "#k1 = :k1 AND #k2 >= :k2");
    }

    #[tokio::test]
    async fn test_should_reject_boolean_groups() {
        for key in [
            Where::new().and([Where::new().eq("a", 1)]),
            Where::new().or([Where::new().eq("a", 1)]),
            Where::new().not(Where::new().eq("a", 1)),
        ] {
            let err = build_key_expression(&schema(), &key).await.unwrap_err();
            assert!(matches!(err, CompileError::BooleanInKeyCondition(_)));
        }
    }

    #[tokio::test]
    async fn test_should_require_exactly_one_operator() {
        let key = Where::new().attr("a", Condition::ops([(Operator::Gt, 1), (Operator::Gte, 2)]));
        let err = build_key_expression(&schema(), &key).await.unwrap_err();
        assert!(matches!(err, CompileError::KeyConditionOperatorCount { count: 2, .. }));

        let key = Where::new().attr("a", Condition::Operators(vec![]));
        let err = build_key_expression(&schema(), &key).await.unwrap_err();
        assert!(matches!(err, CompileError::KeyConditionOperatorCount { count: 0, .. }));
    }

    #[tokio::test]
    async fn test_should_reject_ne_and_in() {
        let key = Where::new().op("a", Operator::Ne, 1);
        let err = build_key_expression(&schema(), &key).await.unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnsupportedKeyOperator { operator: Operator::Ne, .. }
        ));
        let key = Where::new().op("a", Operator::In, vec![Value::from(1)]);
        assert!(build_key_expression(&schema(), &key).await.is_err());
    }
}
