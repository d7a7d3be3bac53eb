//! Property definitions and their extension points.
//!
//! User code plugs into the pipeline through plain function values stored
//! on each property: lifecycle [`Hook`]s, `get`/`set` [`Transform`]s, default
//! producers and custom validation [`Predicate`]s. All of them may be
//! asynchronous and report failure through `anyhow::Result`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dynamodel_model::{AttributeType, DateFormat, Document, Value};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Deserializer};

use super::RawSchema;
use super::composite::CompositeTemplate;

// ---------------------------------------------------------------------------
// Extension points
// ---------------------------------------------------------------------------

type HookFn = dyn Fn(Option<Value>, Document) -> BoxFuture<'static, anyhow::Result<Option<Value>>>
    + Send
    + Sync;

/// Stage hook (`onCreate`, `onUpdate`, `onUpsert`).
///
/// Receives the field's current value (`None` when absent) and a snapshot of
/// the in-progress document. Returning `None` leaves the field absent.
#[derive(Clone)]
pub struct Hook(Arc<HookFn>);

impl Hook {
    /// Wrap an async hook.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Option<Value>, Document) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        Self(Arc::new(move |v, d| f(v, d).boxed()))
    }

    /// Wrap a synchronous hook.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Option<Value>, &Document) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        Self(Arc::new(move |v, d| futures::future::ready(f(v, &d)).boxed()))
    }

    /// Run the hook.
    pub async fn call(
        &self,
        current: Option<Value>,
        doc: Document,
    ) -> anyhow::Result<Option<Value>> {
        (self.0)(current, doc).await
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

type TransformFn = dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync;

/// Property-level `get`/`set` coercion.
#[derive(Clone)]
pub struct Transform(Arc<TransformFn>);

impl Transform {
    /// Wrap an async transform.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self(Arc::new(move |v| f(v).boxed()))
    }

    /// Wrap a synchronous transform.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(move |v| futures::future::ready(f(v)).boxed()))
    }

    /// Run the transform.
    pub async fn call(&self, value: Value) -> anyhow::Result<Value> {
        (self.0)(value).await
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

type ProducerFn = dyn Fn() -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync;

/// Zero-argument default producer.
#[derive(Clone)]
pub struct Producer(Arc<ProducerFn>);

impl Producer {
    /// Wrap an async producer.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self(Arc::new(move || f().boxed()))
    }

    /// Wrap a synchronous producer.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(move || futures::future::ready(Ok::<_, anyhow::Error>(f())).boxed()))
    }

    /// Produce a value.
    pub async fn call(&self) -> anyhow::Result<Value> {
        (self.0)().await
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Producer(..)")
    }
}

type PredicateFn = dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync;

/// Custom validator. `Ok(false)` and `Err(_)` both fail validation; an error
/// is kept as the failure's source.
#[derive(Clone)]
pub struct Predicate(Arc<PredicateFn>);

impl Predicate {
    /// Wrap an async predicate.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        Self(Arc::new(move |v| f(v).boxed()))
    }

    /// Wrap a synchronous predicate.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(move |v| futures::future::ready(Ok::<_, anyhow::Error>(f(&v))).boxed()))
    }

    /// Evaluate the predicate.
    pub async fn call(&self, value: Value) -> anyhow::Result<bool> {
        (self.0)(value).await
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Default for an absent field.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    /// Fixed value.
    Constant(Value),
    /// Computed on demand.
    Producer(Producer),
    /// Rendered from other fields of the same document.
    Composite(CompositeTemplate),
}

impl DefaultValue {
    /// Resolve the default against the in-progress document.
    pub async fn resolve(&self, doc: &Document) -> anyhow::Result<Value> {
        match self {
            Self::Constant(v) => Ok(v.clone()),
            Self::Producer(p) => p.call().await,
            Self::Composite(t) => Ok(Value::String(t.render(doc))),
        }
    }
}

impl<T: Into<Value>> From<T> for DefaultValue {
    fn from(value: T) -> Self {
        Self::Constant(value.into())
    }
}

impl From<Producer> for DefaultValue {
    fn from(producer: Producer) -> Self {
        Self::Producer(producer)
    }
}

impl<'de> Deserialize<'de> for DefaultValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::Constant)
    }
}

/// Entry of a property's `validate` map.
#[derive(Debug, Clone)]
pub enum Validator {
    /// Parameter for the type's built-in validator of the same name.
    Builtin(Value),
    /// User predicate.
    Custom(Predicate),
}

impl<T: Into<Value>> From<T> for Validator {
    fn from(param: T) -> Self {
        Self::Builtin(param.into())
    }
}

impl From<Predicate> for Validator {
    fn from(predicate: Predicate) -> Self {
        Self::Custom(predicate)
    }
}

impl<'de> Deserialize<'de> for Validator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::Builtin)
    }
}

// ---------------------------------------------------------------------------
// RawProperty
// ---------------------------------------------------------------------------

/// A property as authored, before normalization.
///
/// Deserializes from the JSON shape
/// `{"type": "DATE", "required": true, "format": "number", "validate": {...}}`.
/// Function-valued fields cannot come from JSON and are attached with the
/// builder methods.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProperty {
    /// Type spelling: a canonical tag or an alias.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Whether the field must be present on create.
    #[serde(default)]
    pub required: bool,
    /// Default for absent fields.
    #[serde(default)]
    pub default: Option<DefaultValue>,
    /// Create-stage hook.
    #[serde(skip)]
    pub on_create: Option<Hook>,
    /// Update-stage hook.
    #[serde(skip)]
    pub on_update: Option<Hook>,
    /// Upsert-stage hook.
    #[serde(skip)]
    pub on_upsert: Option<Hook>,
    /// Read-side transform.
    #[serde(skip)]
    pub get: Option<Transform>,
    /// Write-side transform.
    #[serde(skip)]
    pub set: Option<Transform>,
    /// Allowed values; must be a list.
    #[serde(default, rename = "enum")]
    pub enum_values: Option<Value>,
    /// Validators in declaration order.
    #[serde(default, deserialize_with = "super::deserialize_ordered")]
    pub validate: Vec<(String, Validator)>,
    /// Composite template, e.g. `"USER#{id}"`.
    #[serde(default)]
    pub composite: Option<String>,
    /// Date storage format.
    #[serde(default)]
    pub format: Option<DateFormat>,
    /// Nested sub-schema for list elements or object fields.
    #[serde(default)]
    pub properties: Option<RawSchema>,
}

impl RawProperty {
    /// Property with the given type spelling.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Property of a canonical type.
    #[must_use]
    pub fn of(ty: AttributeType) -> Self {
        Self::new(ty.as_str())
    }

    /// Mark as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default.
    #[must_use]
    pub fn default_value(mut self, default: impl Into<DefaultValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the create hook.
    #[must_use]
    pub fn on_create(mut self, hook: Hook) -> Self {
        self.on_create = Some(hook);
        self
    }

    /// Set the update hook.
    #[must_use]
    pub fn on_update(mut self, hook: Hook) -> Self {
        self.on_update = Some(hook);
        self
    }

    /// Set the upsert hook.
    #[must_use]
    pub fn on_upsert(mut self, hook: Hook) -> Self {
        self.on_upsert = Some(hook);
        self
    }

    /// Set the read transform.
    #[must_use]
    pub fn get(mut self, transform: Transform) -> Self {
        self.get = Some(transform);
        self
    }

    /// Set the write transform.
    #[must_use]
    pub fn set(mut self, transform: Transform) -> Self {
        self.set = Some(transform);
        self
    }

    /// Restrict to a list of allowed values.
    #[must_use]
    pub fn enum_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(Value::List(values.into_iter().map(Into::into).collect()));
        self
    }

    /// Append a validator.
    #[must_use]
    pub fn validate(mut self, name: impl Into<String>, validator: impl Into<Validator>) -> Self {
        self.validate.push((name.into(), validator.into()));
        self
    }

    /// Derive the value from a template.
    #[must_use]
    pub fn composite(mut self, template: impl Into<String>) -> Self {
        self.composite = Some(template.into());
        self
    }

    /// Set the date storage format.
    #[must_use]
    pub fn format(mut self, format: DateFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Attach a nested sub-schema.
    #[must_use]
    pub fn properties(mut self, schema: RawSchema) -> Self {
        self.properties = Some(schema);
        self
    }
}

// ---------------------------------------------------------------------------
// PropertyDefinition
// ---------------------------------------------------------------------------

/// A normalized, immutable property.
#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    pub(crate) name: String,
    pub(crate) ty: AttributeType,
    pub(crate) required: bool,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) on_create: Option<Hook>,
    pub(crate) on_update: Option<Hook>,
    pub(crate) on_upsert: Option<Hook>,
    pub(crate) get: Option<Transform>,
    pub(crate) set: Option<Transform>,
    pub(crate) enum_values: Option<Vec<Value>>,
    pub(crate) validators: Vec<(String, Validator)>,
    pub(crate) composite: Option<CompositeTemplate>,
    pub(crate) format: DateFormat,
    pub(crate) properties: Option<Arc<super::Schema>>,
}

impl PropertyDefinition {
    /// Property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved type.
    #[must_use]
    pub fn ty(&self) -> AttributeType {
        self.ty
    }

    /// Whether the property is required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Default, if any.
    #[must_use]
    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// Allowed values, if restricted.
    #[must_use]
    pub fn enum_values(&self) -> Option<&[Value]> {
        self.enum_values.as_deref()
    }

    /// Declared validators in order.
    #[must_use]
    pub fn validators(&self) -> &[(String, Validator)] {
        &self.validators
    }

    /// Composite template, if derived.
    #[must_use]
    pub fn composite(&self) -> Option<&CompositeTemplate> {
        self.composite.as_ref()
    }

    /// Date storage format.
    #[must_use]
    pub fn format(&self) -> DateFormat {
        self.format
    }

    /// Nested sub-schema.
    #[must_use]
    pub fn properties(&self) -> Option<&Arc<super::Schema>> {
        self.properties.as_ref()
    }

    /// Declared parameter of a built-in validator, if present.
    #[must_use]
    pub fn builtin_param(&self, name: &str) -> Option<&Value> {
        self.validators.iter().find_map(|(n, v)| match v {
            Validator::Builtin(param) if n == name => Some(param),
            _ => None,
        })
    }
}
