//! The expression language bundled with the crate.
//!
//! Any [`ExpressionEngine`] can back a [`UnifiedEngine`](crate::UnifiedEngine);
//! [`BasicEngine`] is the default one. It understands literals, dotted
//! variable paths, arithmetic, comparisons, boolean logic, the ternary
//! operator, indexing and a handful of string, list and map methods.

mod interpreter;
mod lexer;
mod parser;

use crate::config::EngineConfig;
use crate::interface::{Context, ExpressionEngine};
use crate::value::{Value, ValueTy};

pub use parser::Script;

/// Failures of the bundled expression language.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ExpressionError {
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("Cannot resolve '{name}': no context was supplied")]
    NoContext { name: String },
    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },
    #[error("Undefined property '{name}' on {ty}")]
    UndefinedProperty { name: String, ty: ValueTy },
    #[error("Unknown method '{method}' on {ty}")]
    UnknownMethod { method: String, ty: ValueTy },
    #[error("Method '{method}' expects {expected} argument(s), found {found}")]
    WrongArity {
        method: String,
        expected: String,
        found: usize,
    },
    #[error("Cannot apply '{operation}' to {left} and {right}")]
    TypeMismatch {
        operation: String,
        left: ValueTy,
        right: ValueTy,
    },
    #[error("Index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Integer overflow in '{operation}'")]
    Overflow { operation: String },
}

impl ExpressionError {
    pub(crate) fn syntax<M: Into<String>>(offset: usize, message: M) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }
}

/// `BasicEngine` is the default [`ExpressionEngine`].
///
/// In strict mode undefined variables, undefined properties and null operands
/// are errors. In lenient mode they evaluate to null, and null counts as `0`
/// in arithmetic (or `""` next to a string). Without a context every variable
/// reference fails.
///
/// ```
/// use unilate::{BasicEngine, Context, EngineConfig, ExpressionEngine, Value};
///
/// let engine = BasicEngine::new();
/// let script = engine.compile("'Hello ' + name.toUpperCase()").unwrap();
///
/// let mut context = Context::new();
/// context.insert("name", "world");
/// let value = engine
///     .evaluate(&script, Some(&context), &EngineConfig::default())
///     .unwrap();
/// assert_eq!(value, Value::from("Hello WORLD"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicEngine;

impl BasicEngine {
    pub const fn new() -> Self {
        Self
    }
}

impl ExpressionEngine for BasicEngine {
    type Compiled = Script;
    type Error = ExpressionError;

    fn compile(&self, source: &str) -> Result<Script, ExpressionError> {
        parser::parse(source)
    }

    fn evaluate(
        &self,
        expression: &Script,
        context: Option<&Context>,
        config: &EngineConfig,
    ) -> Result<Value, ExpressionError> {
        interpreter::Interpreter::new(context, config.lenient).run(expression)
    }
}
