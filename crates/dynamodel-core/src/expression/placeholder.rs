//! Placeholder allocation.

use std::collections::HashMap;

use dynamodel_model::{ExpressionFragment, Value};

/// Allocates `#{prefix}{n}` / `:{prefix}{n}` pairs from one strictly
/// increasing counter and collects their bindings.
#[derive(Debug, Default)]
pub struct Placeholders {
    counter: usize,
    names: HashMap<String, String>,
    values: HashMap<String, Value>,
}

impl Placeholders {
    /// Fresh allocator starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next name/value placeholder pair for `prefix`.
    pub fn allocate(&mut self, prefix: &str) -> (String, String) {
        self.counter += 1;
        let n = self.counter;
        (format!("#{prefix}{n}"), format!(":{prefix}{n}"))
    }

    /// Bind a name placeholder.
    pub fn bind_name(&mut self, placeholder: &str, attribute: &str) {
        self.names
            .entry(placeholder.to_owned())
            .or_insert_with(|| attribute.to_owned());
    }

    /// Bind a value placeholder.
    pub fn bind_value(&mut self, placeholder: String, value: Value) {
        self.values.entry(placeholder).or_insert(value);
    }

    /// Finish with the given expression text.
    #[must_use]
    pub fn finish(self, expression: String) -> ExpressionFragment {
        ExpressionFragment {
            expression,
            names: self.names,
            values: self.values,
        }
    }
}
