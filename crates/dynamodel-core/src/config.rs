//! Model configuration.

use std::env;

/// Options shared by every operation of a [`Model`](crate::model::Model).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Prepended to the model name to form the table name.
    pub table_prefix: String,
    /// Reject documents carrying fields the schema does not declare.
    pub strict_fields: bool,
    /// Guard creates with `attribute_not_exists` on the primary key.
    pub create_condition: bool,
}

impl ModelConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from a variable lookup. Unset variables keep
    /// their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            table_prefix: lookup("DYNAMODEL_TABLE_PREFIX").unwrap_or_default(),
            strict_fields: env_bool(lookup("DYNAMODEL_STRICT_FIELDS"), false),
            create_condition: env_bool(lookup("DYNAMODEL_CREATE_CONDITION"), true),
        }
    }

    /// Table name for a model.
    #[must_use]
    pub fn table_name(&self, model: &str) -> String {
        format!("{}{model}", self.table_prefix)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            strict_fields: false,
            create_condition: true,
        }
    }
}

fn env_bool(value: Option<String>, default: bool) -> bool {
    value.map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}
