//! Projection expression compiler.

use dynamodel_model::ExpressionFragment;

use super::CompileError;
use super::placeholder::Placeholders;
use crate::schema::Schema;

/// `#p1, #p2, ...` over the requested attributes. Names only; repeated
/// attributes are listed once. Returns `None` for an empty list.
pub fn build_projection_expression<S: AsRef<str>>(
    schema: &Schema,
    attributes: &[S],
) -> Result<Option<ExpressionFragment>, CompileError> {
    let mut placeholders = Placeholders::new();
    let mut seen: Vec<&str> = Vec::with_capacity(attributes.len());
    let mut names = Vec::with_capacity(attributes.len());
    for attribute in attributes {
        let attribute = attribute.as_ref();
        if !schema.contains(attribute) {
            return Err(CompileError::UnknownProperty(attribute.to_owned()));
        }
        if seen.contains(&attribute) {
            continue;
        }
        seen.push(attribute);
        let (name, _) = placeholders.allocate("p");
        placeholders.bind_name(&name, attribute);
        names.push(name);
    }
    if names.is_empty() {
        return Ok(None);
    }
    Ok(Some(placeholders.finish(names.join(", "))))
}
