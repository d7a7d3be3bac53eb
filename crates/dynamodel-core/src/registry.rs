//! Scalar type registry.
//!
//! A closed table of [`TypeDescriptor`]s keyed by [`AttributeType`]. Each
//! descriptor carries optional read/write coercion and its built-in
//! validators. Structural types (`List`, `Object`) get a descriptor too so
//! `type` and `notNull` work uniformly; they never coerce.

use chrono::{DateTime, TimeZone, Utc};
use dynamodel_model::value::format_date;
use dynamodel_model::{AttributeType, DateFormat, Value};

use crate::coerce::CoercionError;

/// Type-level coercion step.
pub type CoerceFn = fn(Value, DateFormat) -> Result<Value, CoercionError>;

/// Built-in validator: `(value, parameter) -> passed`.
pub type BuiltinValidator = fn(&Value, &Value) -> bool;

/// Registry entry for one type tag.
#[derive(Debug)]
pub struct TypeDescriptor {
    /// Tag this entry describes.
    pub ty: AttributeType,
    /// Read-side coercion, stored value to domain value.
    pub get: Option<CoerceFn>,
    /// Write-side coercion, domain value to stored value.
    pub set: Option<CoerceFn>,
    /// Built-in validators by name.
    pub validators: &'static [(&'static str, BuiltinValidator)],
}

impl TypeDescriptor {
    /// Look up a built-in validator by name.
    #[must_use]
    pub fn validator(&self, name: &str) -> Option<BuiltinValidator> {
        self.validators
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, f)| *f)
    }
}

/// Descriptor for a type tag.
#[must_use]
pub fn descriptor(ty: AttributeType) -> &'static TypeDescriptor {
    match ty {
        AttributeType::String => &STRING,
        AttributeType::Number => &NUMBER,
        AttributeType::Boolean => &BOOLEAN,
        AttributeType::Date => &DATE,
        AttributeType::Binary => &BINARY,
        AttributeType::List => &LIST,
        AttributeType::Object => &OBJECT,
    }
}

static STRING: TypeDescriptor = TypeDescriptor {
    ty: AttributeType::String,
    get: None,
    set: None,
    validators: &[
        ("type", is_string),
        ("notNull", not_null),
        ("notEmpty", not_empty_string),
    ],
};

static NUMBER: TypeDescriptor = TypeDescriptor {
    ty: AttributeType::Number,
    get: None,
    set: None,
    validators: &[
        ("type", is_number),
        ("notNull", not_null),
        ("isUnsigned", is_unsigned),
    ],
};

static BOOLEAN: TypeDescriptor = TypeDescriptor {
    ty: AttributeType::Boolean,
    get: None,
    set: None,
    validators: &[("type", is_boolean), ("notNull", not_null)],
};

static DATE: TypeDescriptor = TypeDescriptor {
    ty: AttributeType::Date,
    get: Some(date_get),
    set: Some(date_set),
    validators: &[
        ("type", is_date),
        ("notNull", not_null),
        ("isBefore", is_before),
        ("isAfter", is_after),
    ],
};

static BINARY: TypeDescriptor = TypeDescriptor {
    ty: AttributeType::Binary,
    get: None,
    set: None,
    validators: &[
        ("type", is_binary),
        ("notNull", not_null),
        ("notEmpty", not_empty_binary),
    ],
};

static LIST: TypeDescriptor = TypeDescriptor {
    ty: AttributeType::List,
    get: None,
    set: None,
    validators: &[("type", is_list), ("notNull", not_null)],
};

static OBJECT: TypeDescriptor = TypeDescriptor {
    ty: AttributeType::Object,
    get: None,
    set: None,
    validators: &[("type", is_object), ("notNull", not_null)],
};

// ---------------------------------------------------------------------------
// Date coercion
// ---------------------------------------------------------------------------

/// Parse a date parameter or stored value: a `Date`, epoch milliseconds or
/// an RFC 3339 string.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Number(n) if n.is_finite() => Utc.timestamp_millis_opt(*n as i64).single(),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        _ => None,
    }
}

fn date_get(value: Value, _format: DateFormat) -> Result<Value, CoercionError> {
    match &value {
        Value::Date(_) => Ok(value),
        Value::Number(_) | Value::String(_) => {
            parse_date(&value)
                .map(Value::Date)
                .ok_or_else(|| CoercionError::InvalidDate {
                    path: String::new(),
                    value: value.to_string(),
                })
        }
        other => Err(CoercionError::TypeMismatch {
            path: String::new(),
            expected: AttributeType::Date,
            found: other.type_name(),
        }),
    }
}

#[allow(clippy::cast_precision_loss)]
fn date_set(value: Value, format: DateFormat) -> Result<Value, CoercionError> {
    let Value::Date(date) = value else {
        return Err(CoercionError::TypeMismatch {
            path: String::new(),
            expected: AttributeType::Date,
            found: value.type_name(),
        });
    };
    Ok(match format {
        DateFormat::Number => Value::Number(date.timestamp_millis() as f64),
        DateFormat::Iso => Value::String(format_date(&date)),
    })
}

// ---------------------------------------------------------------------------
// Built-in validators
// ---------------------------------------------------------------------------

fn is_string(v: &Value, _: &Value) -> bool {
    matches!(v, Value::String(_))
}

fn is_number(v: &Value, _: &Value) -> bool {
    matches!(v, Value::Number(n) if n.is_finite())
}

fn is_boolean(v: &Value, _: &Value) -> bool {
    matches!(v, Value::Bool(_))
}

fn is_date(v: &Value, _: &Value) -> bool {
    matches!(v, Value::Date(_))
}

fn is_binary(v: &Value, _: &Value) -> bool {
    matches!(v, Value::Binary(_))
}

fn is_list(v: &Value, _: &Value) -> bool {
    matches!(v, Value::List(_))
}

fn is_object(v: &Value, _: &Value) -> bool {
    matches!(v, Value::Map(_))
}

/// `notNull: false` switches the check off.
fn not_null(v: &Value, param: &Value) -> bool {
    !param.is_truthy() || !v.is_null()
}

fn not_empty_string(v: &Value, param: &Value) -> bool {
    !param.is_truthy() || matches!(v, Value::String(s) if !s.is_empty())
}

fn not_empty_binary(v: &Value, param: &Value) -> bool {
    !param.is_truthy() || matches!(v, Value::Binary(b) if !b.is_empty())
}

fn is_unsigned(v: &Value, param: &Value) -> bool {
    !param.is_truthy() || matches!(v, Value::Number(n) if *n >= 0.0)
}

fn is_before(v: &Value, param: &Value) -> bool {
    match (v, parse_date(param)) {
        (Value::Date(d), Some(bound)) => *d < bound,
        _ => false,
    }
}

fn is_after(v: &Value, param: &Value) -> bool {
    match (v, parse_date(param)) {
        (Value::Date(d), Some(bound)) => *d > bound,
        _ => false,
    }
}
