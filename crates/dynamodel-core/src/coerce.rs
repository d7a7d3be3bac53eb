//! Coercion pipeline.
//!
//! Write stages walk the schema in declaration order. For each property the
//! stage hook runs first (it may produce a value for an absent field), then
//! nested sub-schemas, then the property `set` transform, then the type
//! `set`. Reads walk the document's own key order and run type `get` before
//! property `get`. Within one document every step is awaited in sequence;
//! separate documents are processed concurrently by the `*_many` helpers.

use std::fmt;

use dynamodel_model::{AttributeType, Document, Value};
use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use tracing::trace;

use crate::error::join_path;
use crate::registry;
use crate::schema::{Hook, PropertyDefinition, Schema};

/// Failure while coercing a value.
#[derive(Debug, thiserror::Error)]
pub enum CoercionError {
    /// Value has the wrong shape for its type.
    #[error("'{path}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Field path.
        path: String,
        /// Declared type.
        expected: AttributeType,
        /// Shape actually found.
        found: &'static str,
    },
    /// Stored date could not be parsed.
    #[error("'{path}': invalid date '{value}'")]
    InvalidDate {
        /// Field path.
        path: String,
        /// Offending value.
        value: String,
    },
    /// A user hook, transform or default producer failed.
    #[error("'{path}': {stage} failed: {source}")]
    Hook {
        /// Field path.
        path: String,
        /// Which extension point failed.
        stage: &'static str,
        /// The user's error.
        #[source]
        source: anyhow::Error,
    },
}

impl CoercionError {
    /// Field path the error is attributed to.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::TypeMismatch { path, .. }
            | Self::InvalidDate { path, .. }
            | Self::Hook { path, .. } => path,
        }
    }

    /// Re-annotate with a parent path.
    #[must_use]
    pub fn prefixed(mut self, prefix: &str) -> Self {
        let (Self::TypeMismatch { path, .. }
        | Self::InvalidDate { path, .. }
        | Self::Hook { path, .. }) = &mut self;
        *path = join_path(prefix, path);
        self
    }

    fn hook(stage: &'static str, source: anyhow::Error) -> Self {
        Self::Hook {
            path: String::new(),
            stage,
            source,
        }
    }
}

/// Which write pipeline is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteStage {
    /// New item.
    Create,
    /// In-place update of an existing item.
    Update,
    /// Create-or-update.
    Upsert,
}

impl WriteStage {
    /// Name of the hook this stage runs.
    #[must_use]
    pub fn hook_name(&self) -> &'static str {
        match self {
            Self::Create => "onCreate",
            Self::Update => "onUpdate",
            Self::Upsert => "onUpsert",
        }
    }

    fn hook<'a>(&self, prop: &'a PropertyDefinition) -> Option<&'a Hook> {
        match self {
            Self::Create => prop.on_create.as_ref(),
            Self::Update => prop.on_update.as_ref(),
            Self::Upsert => prop.on_upsert.as_ref(),
        }
    }
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hook_name())
    }
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

/// Run a write pipeline over one document.
pub async fn coerce_write(
    schema: &Schema,
    doc: &Document,
    stage: WriteStage,
) -> Result<Document, CoercionError> {
    write_level(schema, doc.clone(), stage).await
}

/// Run a write pipeline over many documents concurrently.
pub async fn coerce_write_many(
    schema: &Schema,
    docs: &[Document],
    stage: WriteStage,
) -> Result<Vec<Document>, CoercionError> {
    try_join_all(docs.iter().map(|doc| coerce_write(schema, doc, stage))).await
}

/// Stage hooks receive `domain`: the input plus earlier hook results, never
/// a stored representation.
fn write_level(
    schema: &Schema,
    mut domain: Document,
    stage: WriteStage,
) -> BoxFuture<'_, Result<Document, CoercionError>> {
    async move {
        let mut out = domain.clone();
        for prop in schema.iter() {
            let name = prop.name();
            let mut current = domain.get(name).cloned();
            if let Some(hook) = stage.hook(prop) {
                current = hook
                    .call(current, domain.clone())
                    .await
                    .map_err(|e| CoercionError::hook(stage.hook_name(), e).prefixed(name))?;
                match &current {
                    Some(value) => domain.insert(name, value.clone()),
                    None => domain.remove(name),
                };
            }
            match current {
                None => {
                    out.remove(name);
                }
                Some(value) => {
                    let value = write_value(prop, value, stage)
                        .await
                        .map_err(|e| e.prefixed(name))?;
                    out.insert(name, value);
                }
            }
        }
        trace!(%stage, fields = out.len(), "coerced document for write");
        Ok(out)
    }
    .boxed()
}

async fn write_value(
    prop: &PropertyDefinition,
    value: Value,
    stage: WriteStage,
) -> Result<Value, CoercionError> {
    if value.is_null() {
        return Ok(value);
    }
    let value = match (prop.properties(), value) {
        (Some(sub), Value::Map(map)) => Value::Map(write_level(sub, map, stage).await?),
        (Some(sub), Value::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                out.push(match item {
                    Value::Map(map) => Value::Map(
                        write_level(sub, map, stage)
                            .await
                            .map_err(|e| e.prefixed(&format!("[{i}]")))?,
                    ),
                    other => other,
                });
            }
            Value::List(out)
        }
        (_, value) => value,
    };
    coerce_value(prop, value).await
}

/// Property `set` then type `set`. Null passes through untouched.
pub(crate) async fn coerce_value(
    prop: &PropertyDefinition,
    value: Value,
) -> Result<Value, CoercionError> {
    if value.is_null() {
        return Ok(value);
    }
    let value = match &prop.set {
        Some(transform) => transform
            .call(value)
            .await
            .map_err(|e| CoercionError::hook("set", e))?,
        None => value,
    };
    match registry::descriptor(prop.ty()).set {
        Some(set) if !value.is_null() => set(value, prop.format()),
        _ => Ok(value),
    }
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// Convert a stored item back to domain values.
pub async fn coerce_read(schema: &Schema, doc: &Document) -> Result<Document, CoercionError> {
    read_level(schema, doc.clone()).await
}

/// Read-coerce many items concurrently.
pub async fn coerce_read_many(
    schema: &Schema,
    docs: &[Document],
) -> Result<Vec<Document>, CoercionError> {
    try_join_all(docs.iter().map(|doc| coerce_read(schema, doc))).await
}

fn read_level(schema: &Schema, doc: Document) -> BoxFuture<'_, Result<Document, CoercionError>> {
    async move {
        let mut out = Document::new();
        for (key, value) in doc {
            let value = match schema.get(&key) {
                Some(prop) => read_value(prop, value)
                    .await
                    .map_err(|e| e.prefixed(&key))?,
                None => value,
            };
            out.insert(key, value);
        }
        Ok(out)
    }
    .boxed()
}

async fn read_value(prop: &PropertyDefinition, value: Value) -> Result<Value, CoercionError> {
    if value.is_null() {
        return Ok(value);
    }
    let value = match (prop.properties(), value) {
        (Some(sub), Value::Map(map)) => Value::Map(read_level(sub, map).await?),
        (Some(sub), Value::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                out.push(match item {
                    Value::Map(map) => Value::Map(
                        read_level(sub, map)
                            .await
                            .map_err(|e| e.prefixed(&format!("[{i}]")))?,
                    ),
                    other => other,
                });
            }
            Value::List(out)
        }
        (_, value) => value,
    };
    let value = match registry::descriptor(prop.ty()).get {
        Some(get) => get(value, prop.format())?,
        None => value,
    };
    match &prop.get {
        Some(transform) => transform
            .call(value)
            .await
            .map_err(|e| CoercionError::hook("get", e)),
        None => Ok(value),
    }
}

// ---------------------------------------------------------------------------
// Defaults and composites
// ---------------------------------------------------------------------------

/// Fill absent fields from their defaults, in schema order.
///
/// Producers and composite templates see the document as filled so far, so
/// a composite declared after its variables renders their defaults too.
pub async fn apply_defaults(schema: &Schema, doc: &Document) -> Result<Document, CoercionError> {
    defaults_level(schema, doc.clone()).await
}

fn defaults_level(
    schema: &Schema,
    mut doc: Document,
) -> BoxFuture<'_, Result<Document, CoercionError>> {
    async move {
        for prop in schema.iter() {
            let name = prop.name();
            match (doc.get(name), prop.default(), prop.properties()) {
                (None, Some(default), _) => {
                    let value = default
                        .resolve(&doc)
                        .await
                        .map_err(|e| CoercionError::hook("default", e).prefixed(name))?;
                    doc.insert(name, value);
                }
                (Some(Value::Map(map)), _, Some(sub)) => {
                    let filled = defaults_level(sub, map.clone())
                        .await
                        .map_err(|e| e.prefixed(name))?;
                    doc.insert(name, Value::Map(filled));
                }
                _ => {}
            }
        }
        Ok(doc)
    }
    .boxed()
}

/// Re-render every composite whose variables are all present in `doc`.
///
/// Update and upsert pipelines never do this on their own; callers that
/// want derived attributes to follow their variables invoke it explicitly.
#[must_use]
pub fn refresh_composites(schema: &Schema, doc: &Document) -> Document {
    let mut out = doc.clone();
    for prop in schema.iter() {
        if let Some(template) = prop.composite().filter(|t| t.is_satisfied_by(&out)) {
            let rendered = template.render(&out);
            out.insert(prop.name(), rendered);
        }
    }
    out
}
