//! Attribute type tags, date storage formats, key schemas and index definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AttributeType
// ---------------------------------------------------------------------------

/// Type tag of a declared property.
///
/// The first five variants are the registry scalars. `List` and `Object` are
/// structural and may carry a nested sub-schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// UTF-8 string.
    String,
    /// Number.
    Number,
    /// Boolean.
    Boolean,
    /// Date/time, stored as epoch milliseconds or an ISO-8601 string.
    Date,
    /// Byte buffer.
    Binary,
    /// List of values.
    List,
    /// Nested object.
    Object,
}

impl AttributeType {
    /// Canonical tag name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Binary => "BINARY",
            Self::List => "LIST",
            Self::Object => "OBJECT",
        }
    }

    /// Resolve a canonical tag or a convenience spelling.
    ///
    /// Matching is case-insensitive, so `STRING`, `String` and `string` all
    /// resolve to [`AttributeType::String`].
    #[must_use]
    pub fn from_alias(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let ty = match lower.as_str() {
            "string" | "str" | "&str" | "text" => Self::String,
            "number" | "f64" | "f32" | "i64" | "i32" | "u64" | "u32" | "int" | "integer"
            | "float" => Self::Number,
            "boolean" | "bool" => Self::Boolean,
            "date" | "datetime" | "chrono::datetime" | "systemtime" | "timestamp" => Self::Date,
            "binary" | "buffer" | "bytes" | "vec<u8>" => Self::Binary,
            "list" | "array" | "vec" => Self::List,
            "object" | "map" | "hashmap" => Self::Object,
            _ => return None,
        };
        Some(ty)
    }

    /// Whether this is one of the five registry scalars.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        !self.is_structural()
    }

    /// Whether this is `List` or `Object`.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::List | Self::Object)
    }

    /// Whether a property of this type may back a hash or range key.
    #[must_use]
    pub fn is_key_type(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Number | Self::Binary | Self::Date
        )
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_alias(s).ok_or_else(|| format!("unknown attribute type '{s}'"))
    }
}

impl Serialize for AttributeType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttributeType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// DateFormat
// ---------------------------------------------------------------------------

/// Storage format of a `DATE` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// ISO-8601 string with millisecond precision.
    #[default]
    #[serde(alias = "ISO", alias = "String")]
    Iso,
    /// Milliseconds since the Unix epoch.
    #[serde(alias = "Number", alias = "NUMBER")]
    Number,
}

// ---------------------------------------------------------------------------
// Keys and indexes
// ---------------------------------------------------------------------------

/// Hash/range key pair naming schema properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySchema {
    /// Partition (hash) key property.
    pub hash: String,
    /// Optional sort (range) key property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}

impl KeySchema {
    /// Key schema with only a hash key.
    #[must_use]
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            range: None,
        }
    }

    /// Add a range key.
    #[must_use]
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Key attribute names, hash first.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.hash.as_str()).chain(self.range.as_deref())
    }

    /// Whether `name` is the hash or range attribute.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.attributes().any(|a| a == name)
    }
}

/// Kind of secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Global secondary index: any hash key.
    #[default]
    Global,
    /// Local secondary index: shares the table hash key.
    Local,
}

/// A named secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// Global or local.
    #[serde(default)]
    pub kind: IndexKind,
    /// Index key attributes.
    #[serde(flatten)]
    pub key: KeySchema,
}

impl IndexDefinition {
    /// Global index over the given key.
    #[must_use]
    pub fn global(name: impl Into<String>, key: KeySchema) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Global,
            key,
        }
    }

    /// Local index over the given key.
    #[must_use]
    pub fn local(name: impl Into<String>, key: KeySchema) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Local,
            key,
        }
    }
}
