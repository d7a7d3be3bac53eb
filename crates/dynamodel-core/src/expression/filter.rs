//! Filter expression compiler.
//!
//! Compiles a [`Where`] document into a boolean filter expression. Top-level
//! clauses are `AND`-joined without parentheses. `AND`/`OR` groups are
//! parenthesized and `NOT` renders as `NOT (...)`; each group extends the
//! placeholder prefix with `a`, `o` or `n`.
//!
//! A leaf is one attribute and either a bare value (equality) or an operator
//! set. The operator set selects exactly one family: `EQ`, `NE`, `IN`, or a
//! range made of at most one of `LT`/`LTE` and at most one of `GT`/`GTE`.
//! A two-sided range shares the name placeholder and suffixes the values
//! with `l` (the `LT`/`LTE` side) and `r` (the `GT`/`GTE` side). `IN`
//! suffixes each element with `l` and its index.

use dynamodel_model::{Clause, Condition, ExpressionFragment, Operator, Value, Where};
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use super::CompileError;
use super::placeholder::Placeholders;
use crate::coerce::coerce_value;
use crate::schema::{PropertyDefinition, Schema};

/// Compile a filter document. Returns `None` when it has no leaves.
pub async fn build_filter_expression(
    schema: &Schema,
    filter: &Where,
) -> Result<Option<ExpressionFragment>, CompileError> {
    let mut compiler = FilterCompiler {
        schema,
        placeholders: Placeholders::new(),
    };
    let parts = compiler.compile(filter, "f".to_owned()).await?;
    if parts.is_empty() {
        return Ok(None);
    }
    let expression = join(parts, " AND ");
    debug!(%expression, "compiled filter expression");
    Ok(Some(compiler.placeholders.finish(expression)))
}

/// Compiled piece of an expression. `compound` marks an unparenthesized
/// conjunction: a two-sided range or a multi-clause document inside a group.
struct Part {
    text: String,
    compound: bool,
}

impl Part {
    fn simple(text: String) -> Self {
        Self {
            text,
            compound: false,
        }
    }

    fn wrapped(self) -> String {
        if self.compound {
            format!("({})", self.text)
        } else {
            self.text
        }
    }
}

fn join(parts: Vec<Part>, separator: &str) -> String {
    parts
        .into_iter()
        .map(|p| p.text)
        .collect::<Vec<_>>()
        .join(separator)
}

struct FilterCompiler<'a> {
    schema: &'a Schema,
    placeholders: Placeholders,
}

impl FilterCompiler<'_> {
    fn compile<'b>(
        &'b mut self,
        doc: &'b Where,
        prefix: String,
    ) -> BoxFuture<'b, Result<Vec<Part>, CompileError>> {
        async move {
            let mut parts = Vec::new();
            for clause in doc.clauses() {
                match clause {
                    Clause::Attribute { name, condition } => {
                        parts.push(self.leaf(name, condition, &prefix).await?);
                    }
                    Clause::Group { op, docs } => {
                        if let Some(part) = self.group(*op, docs, &prefix).await? {
                            parts.push(part);
                        }
                    }
                }
            }
            Ok(parts)
        }
        .boxed()
    }

    async fn group(
        &mut self,
        op: Operator,
        docs: &[Where],
        prefix: &str,
    ) -> Result<Option<Part>, CompileError> {
        let letter = op
            .group_letter()
            .ok_or(CompileError::NotAGroupOperator(op))?;
        let child_prefix = format!("{prefix}{letter}");

        let mut elements = Vec::with_capacity(docs.len());
        for doc in docs {
            let mut parts = self.compile(doc, child_prefix.clone()).await?;
            match parts.len() {
                0 => {}
                1 => elements.extend(parts.pop()),
                _ => elements.push(Part {
                    text: join(parts, " AND "),
                    compound: true,
                }),
            }
        }
        if elements.is_empty() {
            return Ok(None);
        }

        let text = match op {
            Operator::Or => format!(
                "({})",
                elements
                    .into_iter()
                    .map(Part::wrapped)
                    .collect::<Vec<_>>()
                    .join(" OR ")
            ),
            Operator::Not => format!("NOT ({})", join(elements, " AND ")),
            _ => format!("({})", join(elements, " AND ")),
        };
        Ok(Some(Part::simple(text)))
    }

    async fn leaf(
        &mut self,
        attribute: &str,
        condition: &Condition,
        prefix: &str,
    ) -> Result<Part, CompileError> {
        let prop = self
            .schema
            .get(attribute)
            .ok_or_else(|| CompileError::UnknownProperty(attribute.to_owned()))?;
        let plan = match condition {
            Condition::Value(value) => Plan::Compare(Operator::Eq, value),
            Condition::Operators(pairs) => classify(attribute, pairs)?,
        };

        let (name, value) = self.placeholders.allocate(prefix);
        self.placeholders.bind_name(&name, attribute);

        match plan {
            Plan::Compare(op, operand_value) => {
                let symbol = symbol_of(op);
                let stored = operand(prop, attribute, operand_value).await?;
                self.placeholders.bind_value(value.clone(), stored);
                Ok(Part::simple(format!("{name} {symbol} {value}")))
            }
            Plan::Range { lower, upper } => {
                let (lower_op, lower_value) = lower;
                let (upper_op, upper_value) = upper;
                let lower_stored = operand(prop, attribute, lower_value).await?;
                let upper_stored = operand(prop, attribute, upper_value).await?;
                self.placeholders.bind_value(format!("{value}l"), lower_stored);
                self.placeholders.bind_value(format!("{value}r"), upper_stored);
                Ok(Part {
                    text: format!(
                        "{name} {} {value}l AND {name} {} {value}r",
                        symbol_of(lower_op),
                        symbol_of(upper_op)
                    ),
                    compound: true,
                })
            }
            Plan::In(list) => {
                let Value::List(items) = list else {
                    return Err(CompileError::InvalidInOperand(attribute.to_owned()));
                };
                if items.is_empty() {
                    return Err(CompileError::EmptyIn(attribute.to_owned()));
                }
                let mut placeholders = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let stored = operand(prop, attribute, item).await?;
                    let placeholder = format!("{value}l{i}");
                    self.placeholders.bind_value(placeholder.clone(), stored);
                    placeholders.push(placeholder);
                }
                Ok(Part::simple(format!(
                    "{name} IN ({})",
                    placeholders.join(", ")
                )))
            }
        }
    }
}

/// What a leaf compiles to.
enum Plan<'v> {
    Compare(Operator, &'v Value),
    Range {
        lower: (Operator, &'v Value),
        upper: (Operator, &'v Value),
    },
    In(&'v Value),
}

fn classify<'v>(
    attribute: &str,
    pairs: &'v [(Operator, Value)],
) -> Result<Plan<'v>, CompileError> {
    if pairs.is_empty() {
        return Err(CompileError::EmptyOperators(attribute.to_owned()));
    }

    let mut standalone: Option<(Operator, &Value)> = None;
    let mut lower: Option<(Operator, &Value)> = None;
    let mut upper: Option<(Operator, &Value)> = None;

    for (op, value) in pairs {
        let slot = match op {
            Operator::And | Operator::Or | Operator::Not => {
                return Err(CompileError::MisplacedOperator {
                    attribute: attribute.to_owned(),
                    operator: *op,
                });
            }
            Operator::Lt | Operator::Lte => &mut lower,
            Operator::Gt | Operator::Gte => &mut upper,
            Operator::Eq | Operator::Ne | Operator::In => &mut standalone,
        };
        if let Some((first, _)) = slot {
            return Err(if is_range(*op) {
                CompileError::ConflictingOperators {
                    attribute: attribute.to_owned(),
                    first: *first,
                    second: *op,
                }
            } else {
                CompileError::MixedOperators {
                    attribute: attribute.to_owned(),
                    operator: *op,
                }
            });
        }
        *slot = Some((*op, value));
    }

    match (standalone, lower, upper) {
        (Some((Operator::In, list)), None, None) => Ok(Plan::In(list)),
        (Some((op, value)), None, None)
        | (None, Some((op, value)), None)
        | (None, None, Some((op, value))) => Ok(Plan::Compare(op, value)),
        (None, Some(lower), Some(upper)) => Ok(Plan::Range { lower, upper }),
        (Some((op, _)), _, _) => Err(CompileError::MixedOperators {
            attribute: attribute.to_owned(),
            operator: op,
        }),
        (None, None, None) => Err(CompileError::EmptyOperators(attribute.to_owned())),
    }
}

fn is_range(op: Operator) -> bool {
    matches!(op, Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte)
}

fn symbol_of(op: Operator) -> &'static str {
    op.symbol().unwrap_or("=")
}

/// Type-check a comparison operand and coerce it for storage.
pub(crate) async fn operand(
    prop: &PropertyDefinition,
    attribute: &str,
    value: &Value,
) -> Result<Value, CompileError> {
    if !matches!(
        value,
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Date(_)
    ) {
        return Err(CompileError::InvalidValueType {
            attribute: attribute.to_owned(),
            found: value.type_name(),
        });
    }
    coerce_value(prop, value.clone())
        .await
        .map_err(|e| CompileError::Coercion(e.prefixed(attribute)))
}
