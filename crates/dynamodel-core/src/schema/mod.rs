//! Schema definition and normalization.
//!
//! A [`RawSchema`] is what authors write (in code or JSON). [`normalize`]
//! turns it into an immutable [`Schema`] of [`PropertyDefinition`]s, with
//! type aliases resolved and composite templates installed as defaults and
//! create hooks. [`validate_index_properties`] then checks key schemas and
//! secondary indexes against the normalized properties.

pub mod composite;
pub mod index;
pub mod normalize;
pub mod property;

use std::fmt;
use std::marker::PhantomData;

use dynamodel_model::AttributeType;
use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

pub use composite::CompositeTemplate;
pub use index::validate_index_properties;
pub use normalize::normalize;
pub use property::{
    DefaultValue, Hook, Predicate, Producer, PropertyDefinition, RawProperty, Transform, Validator,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// What is wrong with a property or key definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaErrorKind {
    /// Type spelling matches no tag or alias.
    #[error("unknown type '{0}'")]
    UnknownType(String),
    /// Property names may not contain `.`.
    #[error("property names may not contain '.'")]
    DottedName,
    /// Name declared twice at the same level.
    #[error("duplicate property")]
    DuplicateName,
    /// Nested properties on a type that cannot hold them.
    #[error("nested properties are only allowed on LIST and OBJECT, not {0}")]
    NestedOnScalar(AttributeType),
    /// Composite on a non-string type.
    #[error("composite attributes must be STRING, not {0}")]
    CompositeNotString(AttributeType),
    /// Composite inside a nested schema.
    #[error("composite attributes are only allowed at the top level")]
    NestedComposite,
    /// Template references no declared property.
    #[error("composite references unknown property '{0}'")]
    CompositeUnknownVariable(String),
    /// Composites reference each other in a loop.
    #[error("composite references form a cycle through '{0}'")]
    CompositeCycle(String),
    /// Composite combined with an explicit default or create hook.
    #[error("composite attributes cannot declare a default or onCreate hook")]
    CompositeWithDefault,
    /// Template failed to compile.
    #[error("invalid composite template: {0}")]
    InvalidComposite(String),
    /// Validator name unknown for the property's type.
    #[error("unknown validator '{0}'")]
    UnknownValidator(String),
    /// Built-in parameter has the wrong shape.
    #[error("invalid parameter for validator '{0}'")]
    InvalidValidatorParameter(String),
    /// `enum` is not a list.
    #[error("enum must be a list")]
    EnumNotList,
    /// Key attribute is not a declared property.
    #[error("{index}: key attribute is not a declared property")]
    UnknownKeyAttribute {
        /// Index name.
        index: String,
    },
    /// Key attribute has an ineligible type.
    #[error("{index}: key attributes must be STRING, NUMBER, BINARY or DATE, not {ty}")]
    InvalidKeyType {
        /// Index name.
        index: String,
        /// Offending type.
        ty: AttributeType,
    },
    /// Primary key attribute is optional.
    #[error("{index}: key attribute must be required")]
    KeyNotRequired {
        /// Index name.
        index: String,
    },
    /// A composite key variable is optional.
    #[error("{index}: composite variable '{variable}' must be required")]
    CompositeVariableNotRequired {
        /// Index name.
        index: String,
        /// Offending variable.
        variable: String,
    },
    /// Local index with a different hash key.
    #[error("{index}: local indexes must use the table hash key '{expected}'")]
    LocalIndexHashMismatch {
        /// Index name.
        index: String,
        /// Table hash key.
        expected: String,
    },
    /// Two indexes share a name.
    #[error("duplicate index name '{0}'")]
    DuplicateIndex(String),
}

/// Model definition error, carrying the offending property path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid schema at '{path}': {kind}")]
pub struct SchemaError {
    /// Property path, e.g. `address.city` or `tags[]`.
    pub path: String,
    /// What went wrong.
    pub kind: SchemaErrorKind,
}

impl SchemaError {
    /// Error at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>, kind: SchemaErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// RawSchema
// ---------------------------------------------------------------------------

/// Properties as authored, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RawSchema {
    properties: Vec<(String, RawProperty)>,
}

impl RawSchema {
    /// Empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, property: RawProperty) -> Self {
        self.properties.push((name.into(), property));
        self
    }

    /// Properties in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawProperty)> {
        self.properties.iter().map(|(k, p)| (k.as_str(), p))
    }

    /// Number of declared properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether no properties are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl<'de> Deserialize<'de> for RawSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_ordered(deserializer).map(|properties| Self { properties })
    }
}

/// Deserialize a JSON object into its entries, in source order and keeping
/// duplicates so normalization can report them.
pub(crate) fn deserialize_ordered<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct OrderedVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a JSON object")
        }

        fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, V>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedVisitor(PhantomData))
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Normalized properties in declaration order. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    properties: IndexMap<String, PropertyDefinition>,
}

impl Schema {
    /// Names must already be unique; a repeated name replaces the earlier
    /// definition in its original position.
    pub(crate) fn from_properties(properties: Vec<PropertyDefinition>) -> Self {
        Self {
            properties: properties
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    /// Look up a property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.get(name)
    }

    /// Whether `name` is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Properties in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyDefinition> {
        self.properties.values()
    }

    /// Property names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the schema is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
