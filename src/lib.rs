//! A unified template engine with two evaluation phases.
//!
//! Templates mix literal text with `${...}` immediate blocks and `#{...}`
//! deferred blocks. [`Template::prepare`] evaluates the immediate blocks
//! against one context and returns a template holding only deferred ones;
//! [`Template::evaluate`] evaluates everything that is left.

mod ast;
mod cache;
mod config;
mod engine;
mod error;
mod expr;
mod interface;
mod parser;
mod template;
mod value;

// Public exports.
pub use ast::{Deferred, Expression, Location, Segment, TemplateKind};
pub use config::{DEFAULT_CACHE_CAPACITY, EngineConfig};
pub use engine::UnifiedEngine;
pub use error::{BoxedCause, ParseError, ParseErrorKind, Phase, UnilateError, UnilateResult};
pub use expr::{BasicEngine, ExpressionError, Script};
pub use interface::{Context, ExpressionEngine};
pub use template::{PreparedTemplate, Template};
pub use value::{Value, ValueTy};
