use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::value::Value;

/// Variable bindings an expression is evaluated against.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Context {
    data: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: AsRef<str>, V: Into<Value>>(&mut self, name: T, value: V) -> &mut Self {
        self.data.insert(name.as_ref().to_string(), value.into());
        self
    }

    pub fn get<T: AsRef<str>>(&self, name: T) -> Option<&Value> {
        self.data.get(name.as_ref())
    }

    pub fn contains<T: AsRef<str>>(&self, name: T) -> bool {
        self.data.contains_key(name.as_ref())
    }

    pub fn remove<T: AsRef<str>>(&mut self, name: T) -> Option<Value> {
        self.data.remove(name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Self::new();
        for (name, value) in iter {
            context.insert(name, value);
        }
        context
    }
}

/// `ExpressionEngine` is the language spoken inside a single `${...}` or
/// `#{...}` block.
///
/// The template layer never looks inside a block: it hands the block's source
/// text to [`compile`](Self::compile), caches the result, and later calls
/// [`evaluate`](Self::evaluate) with whatever context the caller supplied.
pub trait ExpressionEngine: Send + Sync {
    /// A compiled expression, shared between threads through the cache.
    type Compiled: Send + Sync;
    /// Syntax or evaluation failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// `compile` turns the source text of one block into a reusable expression.
    ///
    /// # Errors
    /// - If the source is not a valid expression.
    fn compile(&self, source: &str) -> Result<Self::Compiled, Self::Error>;

    /// `evaluate` runs a compiled expression.
    ///
    /// The lenient and silent flags of `config` are forwarded untouched; the
    /// engine decides what they mean inside the expression language.
    ///
    /// # Errors
    /// - If a variable cannot be resolved, including when `context` is `None`.
    /// - If an operation fails on the values involved.
    fn evaluate(
        &self,
        expression: &Self::Compiled,
        context: Option<&Context>,
        config: &EngineConfig,
    ) -> Result<Value, Self::Error>;
}
