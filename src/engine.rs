use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::ast::{Location, TemplateKind};
use crate::cache::ExpressionCache;
use crate::config::EngineConfig;
use crate::error::{Phase, UnilateError, UnilateResult};
use crate::expr::BasicEngine;
use crate::interface::{Context, ExpressionEngine};
use crate::parser::tokenize;
use crate::template::Template;
use crate::value::Value;

/// `UnifiedEngine` parses templates mixing `${...}` immediate blocks and
/// `#{...}` deferred blocks, and owns everything their evaluation shares: the
/// expression engine, the cache of compiled expressions and the configuration.
///
/// Templates borrow the engine that parsed them, so one engine serves any
/// number of templates and threads.
///
/// # Examples
///
/// ```
/// use unilate::{Context, UnifiedEngine, Value};
///
/// // Create a new engine
/// let engine = UnifiedEngine::new();
///
/// // Parse a template
/// let template = engine.parse("Hello, ${name}!").unwrap();
///
/// // Setup context
/// let mut context = Context::new();
/// context.insert("name", "World");
///
/// // Evaluate template
/// let output = template.evaluate(Some(&context)).unwrap();
/// assert_eq!(output, Value::from("Hello, World!"));
/// ```
pub struct UnifiedEngine<E: ExpressionEngine = BasicEngine> {
    expressions: E,
    cache: ExpressionCache<E::Compiled>,
    config: RwLock<EngineConfig>,
}

impl UnifiedEngine<BasicEngine> {
    /// Creates an engine with the bundled expression language and the default
    /// configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with the bundled expression language.
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_expression_engine(BasicEngine::new(), config)
    }
}

impl Default for UnifiedEngine<BasicEngine> {
    /// Creates a default `UnifiedEngine` instance by calling `new()`.
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ExpressionEngine> UnifiedEngine<E> {
    /// Creates an engine around any expression language.
    pub fn with_expression_engine(expressions: E, config: EngineConfig) -> Self {
        Self {
            expressions,
            cache: ExpressionCache::new(config.cache_capacity),
            config: RwLock::new(config),
        }
    }

    /// Parses template text.
    ///
    /// Only the structure is checked here; the expressions inside blocks are
    /// compiled the first time they are needed.
    ///
    /// # Errors
    ///
    /// Returns `UnilateError::Malformed` if a block, string literal or comment
    /// is never closed.
    ///
    /// # Examples
    ///
    /// ```
    /// use unilate::UnifiedEngine;
    ///
    /// let engine = UnifiedEngine::new();
    /// assert!(engine.parse("Dear #{p} ${name};").unwrap().is_deferred());
    /// assert!(engine.parse("${'world'").is_err());
    /// ```
    pub fn parse<S: Into<String>>(&self, source: S) -> UnilateResult<Template<'_, E>> {
        let source = source.into();
        let segments = tokenize(&source)?;
        let kind = TemplateKind::classify(&segments);
        Ok(Template::from_parts(self, source, segments, kind))
    }

    /// Compiles one expression through the cache.
    ///
    /// Compiling text that is already cached returns the same `Arc` without
    /// calling the expression engine.
    ///
    /// # Errors
    ///
    /// Returns `UnilateError::TemplateEvaluation` if the expression engine
    /// rejects the source.
    pub fn compile(&self, source: &str) -> UnilateResult<Arc<E::Compiled>> {
        self.compile_at(source, Location::default(), Phase::Evaluate)
    }

    /// A snapshot of the current configuration.
    pub fn config(&self) -> EngineConfig {
        *self.config.read()
    }

    /// Sets the cache capacity; 0 disables caching.
    pub fn set_cache(&self, capacity: usize) {
        self.config.write().cache_capacity = capacity;
        self.cache.resize(capacity);
    }

    pub fn set_lenient(&self, lenient: bool) {
        self.config.write().lenient = lenient;
    }

    pub fn set_silent(&self, silent: bool) {
        self.config.write().silent = silent;
    }

    /// Number of compiled expressions currently cached.
    pub fn cached_expressions(&self) -> usize {
        self.cache.len()
    }

    /// Whether `source` is cached, without refreshing it.
    pub fn is_cached(&self, source: &str) -> bool {
        self.cache.contains(source)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub const fn expression_engine(&self) -> &E {
        &self.expressions
    }

    fn compile_at(
        &self,
        source: &str,
        location: Location,
        phase: Phase,
    ) -> UnilateResult<Arc<E::Compiled>> {
        self.cache
            .get_or_compile(source, |source| self.expressions.compile(source))
            .map_err(|cause| UnilateError::evaluation(phase, source, location, cause))
    }

    /// Compiles and evaluates one block.
    ///
    /// Compilation errors are always returned. Evaluation errors are returned,
    /// or logged and replaced by null when the engine is silent.
    pub(crate) fn evaluate_expression(
        &self,
        source: &str,
        location: Location,
        context: Option<&Context>,
        phase: Phase,
    ) -> UnilateResult<Value> {
        let config = self.config();
        let compiled = self.compile_at(source, location, phase)?;

        match self.expressions.evaluate(&compiled, context, &config) {
            Ok(value) => Ok(value),
            Err(cause) if config.silent => {
                warn!(%phase, source, %location, error = %cause, "expression failed, using null");
                Ok(Value::Null)
            }
            Err(cause) => Err(UnilateError::evaluation(phase, source, location, cause)),
        }
    }
}
