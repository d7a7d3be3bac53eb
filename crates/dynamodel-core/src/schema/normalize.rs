//! Schema normalization.

use std::collections::HashSet;
use std::sync::Arc;

use dynamodel_model::{AttributeType, Value};
use tracing::{debug, trace};

use super::composite::CompositeTemplate;
use super::property::{DefaultValue, Hook, PropertyDefinition, RawProperty, Validator};
use super::{RawSchema, Schema, SchemaError, SchemaErrorKind};
use crate::error::join_path;
use crate::registry::{self, parse_date};

/// Normalize a raw schema into an immutable [`Schema`].
///
/// The input is left untouched. Nested list-element schemas are reported
/// under `key[]`, object fields under `key.field`.
pub fn normalize(raw: &RawSchema) -> Result<Schema, SchemaError> {
    let schema = normalize_level(raw, "", true)?;
    check_composite_cycles(&schema)?;
    debug!(properties = schema.len(), "normalized schema");
    Ok(schema)
}

fn normalize_level(raw: &RawSchema, prefix: &str, top_level: bool) -> Result<Schema, SchemaError> {
    let mut seen = HashSet::new();
    let mut properties = Vec::with_capacity(raw.len());
    for (name, prop) in raw.iter() {
        let path = join_path(prefix, name);
        if name.contains('.') {
            return Err(SchemaError::new(path, SchemaErrorKind::DottedName));
        }
        if !seen.insert(name) {
            return Err(SchemaError::new(path, SchemaErrorKind::DuplicateName));
        }
        properties.push(normalize_property(name, prop, &path, top_level)?);
    }

    for prop in &properties {
        let Some(template) = &prop.composite else {
            continue;
        };
        for var in template.variables() {
            if !properties.iter().any(|p| &p.name == var) {
                return Err(SchemaError::new(
                    join_path(prefix, &prop.name),
                    SchemaErrorKind::CompositeUnknownVariable(var.clone()),
                ));
            }
        }
    }

    Ok(Schema::from_properties(properties))
}

fn normalize_property(
    name: &str,
    raw: &RawProperty,
    path: &str,
    top_level: bool,
) -> Result<PropertyDefinition, SchemaError> {
    let fail = |kind| SchemaError::new(path, kind);

    let ty = AttributeType::from_alias(&raw.type_name)
        .ok_or_else(|| fail(SchemaErrorKind::UnknownType(raw.type_name.clone())))?;

    let properties = match &raw.properties {
        None => None,
        Some(_) if !ty.is_structural() => return Err(fail(SchemaErrorKind::NestedOnScalar(ty))),
        Some(sub) => {
            let sub_prefix = if ty == AttributeType::List {
                format!("{path}[]")
            } else {
                path.to_owned()
            };
            Some(Arc::new(normalize_level(sub, &sub_prefix, false)?))
        }
    };

    let enum_values = match &raw.enum_values {
        None | Some(Value::Null) => None,
        Some(Value::List(values)) => Some(values.clone()),
        Some(_) => return Err(fail(SchemaErrorKind::EnumNotList)),
    };

    let descriptor = registry::descriptor(ty);
    for (validator_name, validator) in &raw.validate {
        let Validator::Builtin(param) = validator else {
            continue;
        };
        if descriptor.validator(validator_name).is_none() {
            return Err(fail(SchemaErrorKind::UnknownValidator(validator_name.clone())));
        }
        if matches!(validator_name.as_str(), "isBefore" | "isAfter") && parse_date(param).is_none() {
            return Err(fail(SchemaErrorKind::InvalidValidatorParameter(
                validator_name.clone(),
            )));
        }
    }

    let mut default = raw.default.clone();
    let mut on_create = raw.on_create.clone();
    let composite = match &raw.composite {
        None => None,
        Some(_) if !top_level => return Err(fail(SchemaErrorKind::NestedComposite)),
        Some(_) if ty != AttributeType::String => {
            return Err(fail(SchemaErrorKind::CompositeNotString(ty)));
        }
        Some(_) if default.is_some() || on_create.is_some() => {
            return Err(fail(SchemaErrorKind::CompositeWithDefault));
        }
        Some(source) => {
            let template = CompositeTemplate::parse(source)
                .map_err(|e| fail(SchemaErrorKind::InvalidComposite(e.to_string())))?;
            default = Some(DefaultValue::Composite(template.clone()));
            on_create = Some(composite_hook(template.clone()));
            trace!(property = %path, template = %source, "installed composite");
            Some(template)
        }
    };

    Ok(PropertyDefinition {
        name: name.to_owned(),
        ty,
        required: raw.required,
        default,
        on_create,
        on_update: raw.on_update.clone(),
        on_upsert: raw.on_upsert.clone(),
        get: raw.get.clone(),
        set: raw.set.clone(),
        enum_values,
        validators: raw.validate.clone(),
        composite,
        format: raw.format.unwrap_or_default(),
        properties,
    })
}

fn composite_hook(template: CompositeTemplate) -> Hook {
    Hook::sync(move |_, doc| Ok(Some(Value::String(template.render(doc)))))
}

fn check_composite_cycles(schema: &Schema) -> Result<(), SchemaError> {
    for prop in schema.iter().filter(|p| p.composite.is_some()) {
        let mut chain = vec![prop.name()];
        visit_composite(schema, prop, &mut chain)?;
    }
    Ok(())
}

fn visit_composite<'a>(
    schema: &'a Schema,
    prop: &'a PropertyDefinition,
    chain: &mut Vec<&'a str>,
) -> Result<(), SchemaError> {
    let Some(template) = &prop.composite else {
        return Ok(());
    };
    for var in template.variables() {
        if chain.contains(&var.as_str()) {
            return Err(SchemaError::new(
                chain[0],
                SchemaErrorKind::CompositeCycle(var.clone()),
            ));
        }
        if let Some(next) = schema.get(var) {
            chain.push(next.name());
            visit_composite(schema, next, chain)?;
            chain.pop();
        }
    }
    Ok(())
}
