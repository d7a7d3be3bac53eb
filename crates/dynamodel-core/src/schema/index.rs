//! Key schema and secondary index validation.

use dynamodel_model::KeySchema;

use super::{PropertyDefinition, Schema, SchemaError, SchemaErrorKind};

/// Check a key schema against the normalized properties.
///
/// Both attributes must exist with a key-eligible type. With
/// `require_top_level` (the table's primary key) a non-composite key
/// property must itself be required. Composite key properties must have
/// every template variable required, directly or through another composite
/// whose variables are. Fails on the first problem.
pub fn validate_index_properties(
    schema: &Schema,
    index_name: &str,
    key: &KeySchema,
    require_top_level: bool,
) -> Result<(), SchemaError> {
    for attribute in key.attributes() {
        let fail = |kind| SchemaError::new(attribute, kind);
        let index = index_name.to_owned();

        let prop = schema
            .get(attribute)
            .ok_or_else(|| fail(SchemaErrorKind::UnknownKeyAttribute { index: index.clone() }))?;

        if !prop.ty.is_key_type() {
            return Err(fail(SchemaErrorKind::InvalidKeyType { index, ty: prop.ty }));
        }

        match &prop.composite {
            Some(template) => {
                for variable in template.variables() {
                    let mut seen = vec![attribute];
                    if !is_transitively_required(schema, variable, &mut seen) {
                        return Err(fail(SchemaErrorKind::CompositeVariableNotRequired {
                            index,
                            variable: variable.clone(),
                        }));
                    }
                }
            }
            None if require_top_level && !prop.required => {
                return Err(fail(SchemaErrorKind::KeyNotRequired { index }));
            }
            None => {}
        }
    }
    Ok(())
}

/// Whether `name` is guaranteed to be present on create.
pub(crate) fn is_transitively_required<'a>(
    schema: &'a Schema,
    name: &'a str,
    seen: &mut Vec<&'a str>,
) -> bool {
    let Some(prop) = schema.get(name) else {
        return false;
    };
    if prop.required {
        return true;
    }
    let Some(template) = &prop.composite else {
        return false;
    };
    if seen.contains(&name) {
        return false;
    }
    seen.push(name);
    template
        .variables()
        .iter()
        .all(|v| is_transitively_required(schema, v, seen))
}

/// Template of a composite property, if `doc` holds every variable.
pub(crate) fn derivable<'a>(
    prop: &'a PropertyDefinition,
    doc: &dynamodel_model::Document,
) -> Option<&'a super::CompositeTemplate> {
    prop.composite.as_ref().filter(|t| t.is_satisfied_by(doc))
}
