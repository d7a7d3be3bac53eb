//! Model types for dynamodel.
//!
//! This crate holds the plain data shared by the schema engine and the
//! expression compilers: the application-level [`Value`] and its
//! insertion-ordered [`Document`] container, attribute type tags, key and
//! index definitions, typed where-documents, compiled expression fragments
//! and the request shapes handed to a transport.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)]

pub mod expression;
pub mod query;
pub mod request;
pub mod types;
pub mod value;

pub use expression::ExpressionFragment;
pub use query::{Clause, Condition, Operator, Where};
pub use request::{DeleteRequest, GetRequest, PutRequest, QueryRequest, ScanRequest, UpdateRequest};
pub use types::{AttributeType, DateFormat, IndexDefinition, IndexKind, KeySchema};
pub use value::{Document, Value};
