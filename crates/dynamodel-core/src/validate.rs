//! Validation engine.

use dynamodel_model::{Document, Value};
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::error::join_path;
use crate::registry;
use crate::schema::{PropertyDefinition, Schema, Validator};

/// A document failed a declared constraint.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// A built-in check, `enum` membership or a predicate returning `false`.
    #[error("invalid value for '{path}' ({code}): {value}")]
    Field {
        /// Field path.
        path: String,
        /// Offending value.
        value: Value,
        /// Validator name, `type` or `enum`.
        code: String,
    },
    /// A custom predicate returned an error.
    #[error("validator '{code}' failed for '{path}': {source}")]
    Validator {
        /// Field path.
        path: String,
        /// Validator name.
        code: String,
        /// The predicate's error.
        #[source]
        source: anyhow::Error,
    },
    /// A built-in validator name the field's type does not provide.
    #[error("unknown validator '{code}' for '{path}'")]
    UnknownValidator {
        /// Field path.
        path: String,
        /// Validator name.
        code: String,
    },
    /// Every required field missing from a document.
    #[error("missing required fields: {}", .fields.join(", "))]
    MissingRequired {
        /// Field paths.
        fields: Vec<String>,
    },
    /// Every document key the schema does not declare.
    #[error("unexpected fields: {}", .fields.join(", "))]
    UnexpectedFields {
        /// Field paths.
        fields: Vec<String>,
    },
}

impl ValidationError {
    /// Machine-readable code of a single-field failure.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Field { code, .. }
            | Self::Validator { code, .. }
            | Self::UnknownValidator { code, .. } => Some(code),
            Self::MissingRequired { .. } | Self::UnexpectedFields { .. } => None,
        }
    }

    /// Re-annotate with a parent path.
    #[must_use]
    pub fn prefixed(mut self, prefix: &str) -> Self {
        match &mut self {
            Self::Field { path, .. }
            | Self::Validator { path, .. }
            | Self::UnknownValidator { path, .. } => *path = join_path(prefix, path),
            Self::MissingRequired { fields } | Self::UnexpectedFields { fields } => {
                for field in fields {
                    *field = join_path(prefix, field);
                }
            }
        }
        self
    }

    fn field(value: &Value, code: &str) -> Self {
        Self::Field {
            path: String::new(),
            value: value.clone(),
            code: code.to_owned(),
        }
    }
}

/// Validate every declared field of `doc`, in the document's key order.
///
/// The first failing field is reported, and for that field the first
/// failing check: the type validator, then `enum`, then the declared
/// validators in declaration order. Null values only run `notNull`.
/// Undeclared keys are ignored here.
pub async fn validate(schema: &Schema, doc: &Document) -> Result<(), ValidationError> {
    validate_level(schema, doc).await
}

fn validate_level<'a>(
    schema: &'a Schema,
    doc: &'a Document,
) -> BoxFuture<'a, Result<(), ValidationError>> {
    async move {
        for (key, value) in doc.iter() {
            if let Some(prop) = schema.get(key) {
                validate_field(prop, value).await.map_err(|e| {
                    debug!(field = key, error = %e, "validation failed");
                    e.prefixed(key)
                })?;
            }
        }
        Ok(())
    }
    .boxed()
}

async fn validate_field(prop: &PropertyDefinition, value: &Value) -> Result<(), ValidationError> {
    let descriptor = registry::descriptor(prop.ty());

    if value.is_null() {
        return match (prop.builtin_param("notNull"), descriptor.validator("notNull")) {
            (Some(param), Some(not_null)) if !not_null(value, param) => {
                Err(ValidationError::field(value, "notNull"))
            }
            _ => Ok(()),
        };
    }

    if let Some(type_check) = descriptor.validator("type") {
        if !type_check(value, &Value::Bool(true)) {
            return Err(ValidationError::field(value, "type"));
        }
    }

    if let Some(allowed) = prop.enum_values() {
        if !allowed.contains(value) {
            return Err(ValidationError::field(value, "enum"));
        }
    }

    for (name, validator) in prop.validators() {
        match validator {
            Validator::Builtin(param) => {
                let Some(check) = descriptor.validator(name) else {
                    return Err(ValidationError::UnknownValidator {
                        path: String::new(),
                        code: name.clone(),
                    });
                };
                if !check(value, param) {
                    return Err(ValidationError::field(value, name));
                }
            }
            Validator::Custom(predicate) => match predicate.call(value.clone()).await {
                Ok(true) => {}
                Ok(false) => return Err(ValidationError::field(value, name)),
                Err(source) => {
                    return Err(ValidationError::Validator {
                        path: String::new(),
                        code: name.clone(),
                        source,
                    });
                }
            },
        }
    }

    if let Some(sub) = prop.properties() {
        match value {
            Value::Map(map) => validate_level(sub, map).await?,
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if let Value::Map(map) = item {
                        validate_level(sub, map)
                            .await
                            .map_err(|e| e.prefixed(&format!("[{i}]")))?;
                    }
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Report every required field (without a default) absent from `doc`, as
/// one error. Present nested objects are checked too.
pub fn assert_missing_required(schema: &Schema, doc: &Document) -> Result<(), ValidationError> {
    let mut fields = Vec::new();
    collect_missing(schema, doc, "", &mut fields);
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingRequired { fields })
    }
}

fn collect_missing(schema: &Schema, doc: &Document, prefix: &str, out: &mut Vec<String>) {
    for prop in schema.iter() {
        let path = join_path(prefix, prop.name());
        match doc.get(prop.name()) {
            None if prop.is_required() && prop.default().is_none() => out.push(path),
            Some(value) => {
                if let Some(sub) = prop.properties() {
                    visit_nested(sub, value, &path, out, collect_missing);
                }
            }
            None => {}
        }
    }
}

/// Report every key of `doc` the schema does not declare, as one error.
/// Present nested objects with a sub-schema are checked too.
pub fn assert_no_unexpected_fields(schema: &Schema, doc: &Document) -> Result<(), ValidationError> {
    let mut fields = Vec::new();
    collect_unexpected(schema, doc, "", &mut fields);
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::UnexpectedFields { fields })
    }
}

fn collect_unexpected(schema: &Schema, doc: &Document, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in doc.iter() {
        let path = join_path(prefix, key);
        match schema.get(key) {
            None => out.push(path),
            Some(prop) => {
                if let Some(sub) = prop.properties() {
                    visit_nested(sub, value, &path, out, collect_unexpected);
                }
            }
        }
    }
}

fn visit_nested(
    sub: &Schema,
    value: &Value,
    path: &str,
    out: &mut Vec<String>,
    check: fn(&Schema, &Document, &str, &mut Vec<String>),
) {
    match value {
        Value::Map(map) => check(sub, map, path, out),
        Value::List(items) => {
            for (i, item) in items.iter().enumerate() {
                if let Value::Map(map) = item {
                    check(sub, map, &format!("{path}[{i}]"), out);
                }
            }
        }
        _ => {}
    }
}
