//! Model facade.
//!
//! A [`Model`] binds a normalized schema to a table, its primary key and its
//! secondary indexes, and compiles item-level requests: every `prepare_*`
//! method runs the relevant checks, defaults, validation and coercion and
//! returns a request shape with all placeholders merged. Sending it is the
//! transport's job.

use std::collections::HashSet;
use std::sync::Arc;

use dynamodel_model::{
    Clause, Condition, DeleteRequest, Document, GetRequest, IndexDefinition, IndexKind,
    KeySchema, Operator, PutRequest, QueryRequest, ScanRequest, UpdateRequest, Value, Where,
};
use futures::future::try_join_all;
use tracing::debug;

use crate::coerce::{
    WriteStage, apply_defaults, coerce_read, coerce_read_many, coerce_value, coerce_write,
};
use crate::config::ModelConfig;
use crate::error::{MissingKeyError, ModelError};
use crate::expression::{
    CompileError, build_filter_expression, build_key_expression, build_projection_expression,
    create_condition, exists_condition, stringify_update_statement, stringify_upsert_statement,
};
use crate::schema::index::derivable;
use crate::schema::{
    RawSchema, Schema, SchemaError, SchemaErrorKind, normalize, validate_index_properties,
};
use crate::validate::{assert_missing_required, assert_no_unexpected_fields, validate};

const PRIMARY_INDEX: &str = "primary";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Parameters of [`Model::prepare_query`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Key condition. The index hash key must be tested with `EQ`.
    pub key: Where,
    /// Filter applied after the key condition.
    pub filter: Option<Where>,
    /// Index to query; auto-selected from the key condition when `None`.
    pub index: Option<String>,
    /// Attributes to return; all when empty.
    pub attributes: Vec<String>,
    /// Maximum items to evaluate.
    pub limit: Option<u32>,
    /// Traversal direction; store default when `None`.
    pub scan_forward: Option<bool>,
}

impl QueryOptions {
    /// Query over a key condition.
    #[must_use]
    pub fn new(key: Where) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    /// Set the filter.
    #[must_use]
    pub fn filter(mut self, filter: Where) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Query a named index.
    #[must_use]
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Project onto these attributes.
    #[must_use]
    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Cap the items evaluated.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Traverse the sort key in descending order.
    #[must_use]
    pub fn descending(mut self) -> Self {
        self.scan_forward = Some(false);
        self
    }
}

/// Parameters of [`Model::prepare_scan`].
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Filter over every item.
    pub filter: Option<Where>,
    /// Index to scan instead of the table.
    pub index: Option<String>,
    /// Attributes to return; all when empty.
    pub attributes: Vec<String>,
    /// Maximum items to evaluate.
    pub limit: Option<u32>,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A table model: schema, keys, indexes and configuration.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    table_name: String,
    schema: Arc<Schema>,
    key: KeySchema,
    indexes: Vec<IndexDefinition>,
    config: ModelConfig,
}

impl Model {
    /// Normalize `raw` and check the primary key and every index against it.
    pub fn new(
        name: impl Into<String>,
        raw: &RawSchema,
        key: KeySchema,
        indexes: Vec<IndexDefinition>,
        config: ModelConfig,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let schema = normalize(raw)?;
        validate_index_properties(&schema, PRIMARY_INDEX, &key, true)?;

        let mut seen = HashSet::new();
        for index in &indexes {
            if index.name == PRIMARY_INDEX || !seen.insert(index.name.as_str()) {
                return Err(SchemaError::new(
                    index.name.as_str(),
                    SchemaErrorKind::DuplicateIndex(index.name.clone()),
                ));
            }
            if index.kind == IndexKind::Local && index.key.hash != key.hash {
                return Err(SchemaError::new(
                    index.key.hash.as_str(),
                    SchemaErrorKind::LocalIndexHashMismatch {
                        index: index.name.clone(),
                        expected: key.hash.clone(),
                    },
                ));
            }
            validate_index_properties(&schema, &index.name, &index.key, false)?;
        }

        let table_name = config.table_name(&name);
        debug!(model = %name, table = %table_name, indexes = indexes.len(), "model defined");
        Ok(Self {
            name,
            table_name,
            schema: Arc::new(schema),
            key,
            indexes,
            config,
        })
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name, including the configured prefix.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Normalized schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Primary key.
    #[must_use]
    pub fn key_schema(&self) -> &KeySchema {
        &self.key
    }

    /// Secondary indexes.
    #[must_use]
    pub fn indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    /// Configuration the model was built with.
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Compile a create: field checks, defaults, validation, create
    /// coercion and (unless disabled) an `attribute_not_exists` guard.
    pub async fn prepare_create(&self, doc: &Document) -> Result<PutRequest, ModelError> {
        if self.config.strict_fields {
            assert_no_unexpected_fields(&self.schema, doc)?;
        }
        assert_missing_required(&self.schema, doc)?;
        let filled = apply_defaults(&self.schema, doc).await?;
        validate(&self.schema, &filled).await?;
        let item = coerce_write(&self.schema, &filled, WriteStage::Create).await?;
        check_key_present(&self.key, &item)?;

        let mut request = PutRequest::new(self.table_name.as_str(), item);
        if self.config.create_condition {
            request = request.with_condition(create_condition(&self.key));
        }
        debug!(model = %self.name, "prepared create");
        Ok(request)
    }

    /// [`prepare_create`](Self::prepare_create) over many documents,
    /// processed concurrently.
    pub async fn prepare_create_many(
        &self,
        docs: &[Document],
    ) -> Result<Vec<PutRequest>, ModelError> {
        try_join_all(docs.iter().map(|doc| self.prepare_create(doc))).await
    }

    /// Compile an in-place update of the item identified by `key`.
    ///
    /// Key attributes are dropped from `changes`. The write is guarded by
    /// `attribute_exists` on the primary key, AND-ed with `condition` when
    /// given.
    pub async fn prepare_update(
        &self,
        key: &Document,
        changes: &Document,
        condition: Option<&Where>,
    ) -> Result<UpdateRequest, ModelError> {
        let key_doc = self.key(key).await?;
        if self.config.strict_fields {
            assert_no_unexpected_fields(&self.schema, changes)?;
        }
        let body = self.without_keys(changes);
        validate(&self.schema, &body).await?;
        let coerced = coerce_write(&self.schema, &body, WriteStage::Update).await?;
        let coerced = self.without_keys(&coerced);
        let update = stringify_update_statement(&coerced).ok_or(CompileError::EmptyUpdate)?;

        let mut guard = exists_condition(&self.key);
        if let Some(condition) = condition {
            if let Some(filter) = build_filter_expression(&self.schema, condition).await? {
                guard = guard.and(filter);
            }
        }
        debug!(model = %self.name, fields = coerced.len(), "prepared update");
        Ok(UpdateRequest::new(self.table_name.as_str(), key_doc)
            .with_update(update)
            .with_condition(guard))
    }

    /// Compile a create-or-update.
    ///
    /// Fields the caller supplied, and fields produced by an `onUpsert`
    /// hook, overwrite the stored item. Fields filled in from defaults only
    /// apply when the stored item lacks them.
    pub async fn prepare_upsert(&self, doc: &Document) -> Result<UpdateRequest, ModelError> {
        let key_doc = self.key(doc).await?;
        if self.config.strict_fields {
            assert_no_unexpected_fields(&self.schema, doc)?;
        }
        let filled = apply_defaults(&self.schema, doc).await?;
        validate(&self.schema, &filled).await?;
        let coerced = coerce_write(&self.schema, &filled, WriteStage::Upsert).await?;
        let body = self.without_keys(&coerced);

        let exact: HashSet<String> = doc
            .keys()
            .map(str::to_owned)
            .chain(
                self.schema
                    .iter()
                    .filter(|prop| prop.on_upsert.is_some())
                    .map(|prop| prop.name().to_owned()),
            )
            .collect();

        let mut request = UpdateRequest::new(self.table_name.as_str(), key_doc);
        if let Some(update) = stringify_upsert_statement(&body, &exact) {
            request = request.with_update(update);
        }
        debug!(model = %self.name, fields = body.len(), "prepared upsert");
        Ok(request)
    }

    /// Compile a delete, optionally conditional.
    pub async fn prepare_delete(
        &self,
        key: &Document,
        condition: Option<&Where>,
    ) -> Result<DeleteRequest, ModelError> {
        let key_doc = self.key(key).await?;
        let mut request = DeleteRequest::new(self.table_name.as_str(), key_doc);
        if let Some(condition) = condition {
            if let Some(filter) = build_filter_expression(&self.schema, condition).await? {
                request = request.with_condition(filter);
            }
        }
        Ok(request)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Compile a point read, returning only `attributes` when non-empty.
    pub async fn prepare_get<S: AsRef<str>>(
        &self,
        key: &Document,
        attributes: &[S],
    ) -> Result<GetRequest, ModelError> {
        let key_doc = self.key(key).await?;
        let mut request = GetRequest::new(self.table_name.as_str(), key_doc);
        if let Some(projection) = build_projection_expression(&self.schema, attributes)? {
            request = request.with_projection(projection);
        }
        Ok(request)
    }

    /// Compile a query against the table or a secondary index.
    pub async fn prepare_query(&self, options: &QueryOptions) -> Result<QueryRequest, ModelError> {
        let (index_name, key) = self.resolve_index(options)?;
        let index_label = index_name.unwrap_or(PRIMARY_INDEX);

        let mut hash_tested = false;
        for clause in options.key.clauses() {
            let Clause::Attribute { name, condition } = clause else {
                continue;
            };
            if !key.contains(name) {
                return Err(CompileError::NotAKeyAttribute {
                    attribute: name.clone(),
                    index: index_label.to_owned(),
                }
                .into());
            }
            if *name == key.hash {
                hash_tested = is_equality(condition);
            }
        }
        if !hash_tested {
            return Err(CompileError::MissingHashCondition(key.hash.clone()).into());
        }

        let key_condition = build_key_expression(&self.schema, &options.key)
            .await?
            .ok_or_else(|| CompileError::MissingHashCondition(key.hash.clone()))?;
        let mut request = QueryRequest::new(self.table_name.as_str(), key_condition);
        request.index_name = index_name.map(str::to_owned);
        request.limit = options.limit;
        request.scan_index_forward = options.scan_forward;

        if let Some(filter) = &options.filter {
            if let Some(filter) = build_filter_expression(&self.schema, filter).await? {
                request = request.with_filter(filter);
            }
        }
        if let Some(projection) = build_projection_expression(&self.schema, &options.attributes)? {
            request = request.with_projection(projection);
        }
        debug!(model = %self.name, index = index_label, "prepared query");
        Ok(request)
    }

    /// Compile a scan of the table or a secondary index.
    pub async fn prepare_scan(&self, options: &ScanOptions) -> Result<ScanRequest, ModelError> {
        let mut request = ScanRequest::new(self.table_name.as_str());
        if let Some(name) = &options.index {
            let index = self
                .indexes
                .iter()
                .find(|index| index.name == *name)
                .ok_or_else(|| CompileError::UnknownIndex(name.clone()))?;
            request.index_name = Some(index.name.clone());
        }
        request.limit = options.limit;

        if let Some(filter) = &options.filter {
            if let Some(filter) = build_filter_expression(&self.schema, filter).await? {
                request = request.with_filter(filter);
            }
        }
        if let Some(projection) = build_projection_expression(&self.schema, &options.attributes)? {
            request = request.with_projection(projection);
        }
        Ok(request)
    }

    /// Read coercion of one stored item.
    pub async fn read(&self, item: &Document) -> Result<Document, ModelError> {
        Ok(coerce_read(&self.schema, item).await?)
    }

    /// Read coercion of many stored items, processed concurrently.
    pub async fn read_many(&self, items: &[Document]) -> Result<Vec<Document>, ModelError> {
        Ok(coerce_read_many(&self.schema, items).await?)
    }

    // -----------------------------------------------------------------------
    // Keys
    // -----------------------------------------------------------------------

    /// Extract and coerce the primary key from `doc`.
    ///
    /// A composite key attribute missing from `doc` is derived from its
    /// template when every variable is present.
    pub async fn key(&self, doc: &Document) -> Result<Document, ModelError> {
        let mut out = Document::new();
        for attribute in self.key.attributes() {
            let missing = || MissingKeyError {
                attribute: attribute.to_owned(),
            };
            let prop = self.schema.get(attribute).ok_or_else(missing)?;
            let value = match doc.get(attribute) {
                Some(value) if !value.is_null() => value.clone(),
                _ => derivable(prop, doc)
                    .map(|template| Value::from(template.render(doc)))
                    .ok_or_else(missing)?,
            };
            let stored = coerce_value(prop, value)
                .await
                .map_err(|e| e.prefixed(attribute))?;
            out.insert(attribute, stored);
        }
        Ok(out)
    }

    fn without_keys(&self, doc: &Document) -> Document {
        let mut out = doc.clone();
        for attribute in self.key.attributes() {
            if out.remove(attribute).is_some() {
                debug!(model = %self.name, attribute, "dropped key attribute from update body");
            }
        }
        out
    }

    fn resolve_index(
        &self,
        options: &QueryOptions,
    ) -> Result<(Option<&str>, &KeySchema), CompileError> {
        if let Some(name) = &options.index {
            return self
                .indexes
                .iter()
                .find(|index| index.name == *name)
                .map(|index| (Some(index.name.as_str()), &index.key))
                .ok_or_else(|| CompileError::UnknownIndex(name.clone()));
        }

        let attributes: Vec<&str> = options
            .key
            .clauses()
            .iter()
            .filter_map(|clause| match clause {
                Clause::Attribute { name, .. } => Some(name.as_str()),
                Clause::Group { .. } => None,
            })
            .collect();

        if attributes.contains(&self.key.hash.as_str()) {
            return Ok((None, &self.key));
        }
        self.indexes
            .iter()
            .find(|index| attributes.contains(&index.key.hash.as_str()))
            .map(|index| (Some(index.name.as_str()), &index.key))
            .ok_or_else(|| {
                CompileError::NoMatchingIndex(attributes.iter().map(|a| (*a).to_owned()).collect())
            })
    }
}

fn is_equality(condition: &Condition) -> bool {
    match condition {
        Condition::Value(_) => true,
        Condition::Operators(pairs) => matches!(pairs.as_slice(), [(Operator::Eq, _)]),
    }
}

/// Every primary-key attribute must survive create coercion.
fn check_key_present(key: &KeySchema, item: &Document) -> Result<(), MissingKeyError> {
    for attribute in key.attributes() {
        if item.get(attribute).is_none_or(Value::is_null) {
            return Err(MissingKeyError {
                attribute: attribute.to_owned(),
            });
        }
    }
    Ok(())
}
