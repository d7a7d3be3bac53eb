//! Schema engine and expression compilers for dynamodel.
//!
//! Describe a table with a [`RawSchema`](schema::RawSchema), wrap it in a
//! [`Model`](model::Model), and compile item-level requests whose values
//! have been defaulted, validated and coerced against the schema.
#![allow(missing_docs, clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod coerce;
pub mod config;
pub mod error;
pub mod expression;
pub mod model;
pub mod registry;
pub mod schema;
pub mod validate;

pub use coerce::{CoercionError, WriteStage};
pub use config::ModelConfig;
pub use error::{MissingKeyError, ModelError};
pub use expression::CompileError;
pub use model::{Model, QueryOptions, ScanOptions};
pub use schema::{RawProperty, RawSchema, Schema, SchemaError, SchemaErrorKind};
pub use validate::ValidationError;
