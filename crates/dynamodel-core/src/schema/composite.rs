//! Composite attribute templates.

use dynamodel_model::{Document, Value};
use regex::Regex;

const TOKEN_PATTERN: &str = r"\{([^{}]+)\}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A template such as `"USER#{id}#{createdAt}"`, split into literal text and
/// variable references once at normalization time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeTemplate {
    source: String,
    segments: Vec<Segment>,
    variables: Vec<String>,
}

impl CompositeTemplate {
    /// Parse a template. Variables are collected in order of first
    /// appearance.
    pub fn parse(template: &str) -> Result<Self, regex::Error> {
        let token = Regex::new(TOKEN_PATTERN)?;
        let mut segments = Vec::new();
        let mut variables: Vec<String> = Vec::new();
        let mut last = 0;
        for cap in token.captures_iter(template) {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(template[last..whole.start()].to_owned()));
            }
            let name = name.as_str().trim().to_owned();
            if !variables.contains(&name) {
                variables.push(name.clone());
            }
            segments.push(Segment::Variable(name));
            last = whole.end();
        }
        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_owned()));
        }
        Ok(Self {
            source: template.to_owned(),
            segments,
            variables,
        })
    }

    /// Template source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Referenced field names.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Substitute each variable with the field's value in `doc`; absent and
    /// null fields render as the empty string.
    #[must_use]
    pub fn render(&self, doc: &Document) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => match doc.get(name) {
                    None | Some(Value::Null) => {}
                    Some(v) => out.push_str(&v.to_string()),
                },
            }
        }
        out
    }

    /// Whether every variable is present and non-null in `doc`.
    #[must_use]
    pub fn is_satisfied_by(&self, doc: &Document) -> bool {
        self.variables
            .iter()
            .all(|v| doc.get(v).is_some_and(|value| !value.is_null()))
    }
}
