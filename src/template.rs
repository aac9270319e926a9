use std::borrow::Cow;
use std::fmt;

use tracing::{debug, warn};

use crate::ast::{Deferred, Segment, TemplateKind, push_literal};
use crate::engine::UnifiedEngine;
use crate::error::{Phase, UnilateError, UnilateResult};
use crate::expr::BasicEngine;
use crate::interface::{Context, ExpressionEngine};
use crate::parser::check_block_source;
use crate::value::Value;

/// The result of [`Template::prepare`]: the template itself when nothing had to
/// be resolved, otherwise a reduced copy.
pub type PreparedTemplate<'t, 'e, E = BasicEngine> = Cow<'t, Template<'e, E>>;

/// A Template is parsed text made of literal segments, `${...}` immediate
/// blocks and `#{...}` deferred blocks.
///
/// Templates are immutable. [`evaluate`](Self::evaluate) resolves everything
/// against a context; [`prepare`](Self::prepare) resolves only the immediate
/// blocks and returns a template whose deferred blocks wait for a later
/// `evaluate`, possibly against another context.
///
/// # Example
///
/// ```rust
/// use unilate::{Context, UnifiedEngine, Value};
///
/// let engine = UnifiedEngine::new();
/// let template = engine.parse("Dear #{p} ${name};").unwrap();
///
/// // Phase one freezes `name`.
/// let mut first = Context::new();
/// first.insert("name", "Doe");
/// let prepared = template.prepare(Some(&first)).unwrap();
/// assert_eq!(prepared.render_source(), "Dear #{p} Doe;");
///
/// // Phase two only looks up `p`.
/// let mut second = Context::new();
/// second.insert("p", "Mr").insert("name", "ignored");
/// let result = prepared.evaluate(Some(&second)).unwrap();
/// assert_eq!(result, Value::from("Dear Mr Doe;"));
/// ```
pub struct Template<'e, E: ExpressionEngine = BasicEngine> {
    engine: &'e UnifiedEngine<E>,
    source: String,
    segments: Vec<Segment>,
    kind: TemplateKind,
}

impl<E: ExpressionEngine> Clone for Template<'_, E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine,
            source: self.source.clone(),
            segments: self.segments.clone(),
            kind: self.kind,
        }
    }
}

impl<E: ExpressionEngine> fmt::Debug for Template<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.source)
            .field("kind", &self.kind)
            .field("segments", &self.segments)
            .finish_non_exhaustive()
    }
}

impl<E: ExpressionEngine> fmt::Display for Template<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Templates with the same source text are interchangeable.
impl<E: ExpressionEngine> PartialEq for Template<'_, E> {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl<E: ExpressionEngine> Eq for Template<'_, E> {}

#[cfg(feature = "serde")]
impl<E: ExpressionEngine> serde::Serialize for Template<'_, E> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.source)
    }
}

impl<'e, E: ExpressionEngine> Template<'e, E> {
    pub(crate) const fn from_parts(
        engine: &'e UnifiedEngine<E>,
        source: String,
        segments: Vec<Segment>,
        kind: TemplateKind,
    ) -> Self {
        Self {
            engine,
            source,
            segments,
            kind,
        }
    }

    /// Builds a prepared template from its segments.
    ///
    /// The segments are written back as escaped source and scanned again, so
    /// the new template is exactly what parsing its own source would give and
    /// block locations point into that source.
    fn reduced(engine: &'e UnifiedEngine<E>, segments: &[Segment]) -> UnilateResult<Self> {
        let mut source = String::new();
        for segment in segments {
            segment.render_source(&mut source);
        }
        engine.parse(source)
    }

    /// The text this template was parsed from, or for a prepared template the
    /// text it renders to.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub const fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Plain text without any block.
    pub fn is_constant(&self) -> bool {
        self.kind == TemplateKind::Constant
    }

    /// Nothing is deferred; true for constant templates as well.
    pub fn is_immediate(&self) -> bool {
        self.kind != TemplateKind::Deferred
    }

    /// At least one `#{...}` block is present.
    pub fn is_deferred(&self) -> bool {
        self.kind == TemplateKind::Deferred
    }

    pub const fn engine(&self) -> &'e UnifiedEngine<E> {
        self.engine
    }

    /// Reconstructs template text: literal text escaped, blocks written back
    /// with their markers. Parsing the result yields the same segments.
    pub fn render_source(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            segment.render_source(&mut out);
        }
        out
    }

    /// Evaluates every block against `context`.
    ///
    /// A template made of a single block returns that block's native value; any
    /// other template returns the concatenated text, null values contributing
    /// nothing. Deferred blocks are evaluated too.
    ///
    /// # Errors
    ///
    /// Returns `UnilateError::TemplateEvaluation` if a block fails to compile,
    /// or fails to evaluate while the engine is not silent.
    pub fn evaluate(&self, context: Option<&Context>) -> UnilateResult<Value> {
        match self.segments.as_slice() {
            [] => Ok(Value::Str(String::new())),
            [Segment::Literal(text)] => Ok(Value::Str(text.clone())),
            [single] => evaluate_segment(self.engine, single, context),
            segments => {
                let mut output = String::new();
                for segment in segments {
                    match segment {
                        Segment::Literal(text) => output.push_str(text),
                        Segment::Immediate(_) | Segment::Deferred(_) => {
                            evaluate_segment(self.engine, segment, context)?.render_into(&mut output);
                        }
                    }
                }
                Ok(Value::Str(output))
            }
        }
    }

    /// Resolves the immediate blocks now and keeps the deferred ones.
    ///
    /// Constant and immediate templates, and deferred templates without any
    /// immediate block, come back as the same instance.
    ///
    /// # Errors
    ///
    /// Returns `UnilateError::TemplateEvaluation` if an immediate block fails,
    /// under the same rules as [`evaluate`](Self::evaluate), or if a nested
    /// block reduces to text that cannot be written back inside `#{...}`.
    pub fn prepare(&self, context: Option<&Context>) -> UnilateResult<PreparedTemplate<'_, 'e, E>> {
        if !self.is_deferred() || !self.segments.iter().any(Segment::has_immediate) {
            return Ok(Cow::Borrowed(self));
        }

        let mut segments = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => push_literal(&mut segments, text),
                Segment::Immediate(expression) => {
                    let value = self.engine.evaluate_expression(
                        &expression.source,
                        expression.location,
                        context,
                        Phase::Prepare,
                    )?;
                    push_literal(&mut segments, &value.to_text());
                }
                Segment::Deferred(deferred) => {
                    match reduce_deferred(self.engine, deferred, context, Phase::Prepare)? {
                        Some(source) => {
                            check_block_source(&source, deferred.location).map_err(|cause| {
                                UnilateError::evaluation(
                                    Phase::Prepare,
                                    &source,
                                    deferred.location,
                                    cause,
                                )
                            })?;
                            segments.push(Segment::Deferred(Deferred::flat(
                                source.into_owned(),
                                deferred.location,
                            )));
                        }
                        None => warn!(
                            location = %deferred.location,
                            "nested block reduced to null, dropping deferred block"
                        ),
                    }
                }
            }
        }

        let prepared = Template::reduced(self.engine, &segments)?;
        debug!(from = %self.source, to = %prepared.source, "prepared template");
        Ok(Cow::Owned(prepared))
    }
}

/// Computes one block's value.
fn evaluate_segment<E: ExpressionEngine>(
    engine: &UnifiedEngine<E>,
    segment: &Segment,
    context: Option<&Context>,
) -> UnilateResult<Value> {
    match segment {
        Segment::Literal(text) => Ok(Value::Str(text.clone())),
        Segment::Immediate(expression) => engine.evaluate_expression(
            &expression.source,
            expression.location,
            context,
            Phase::Evaluate,
        ),
        Segment::Deferred(deferred) => {
            match reduce_deferred(engine, deferred, context, Phase::Evaluate)? {
                Some(source) => {
                    engine.evaluate_expression(&source, deferred.location, context, Phase::Evaluate)
                }
                None => Ok(Value::Null),
            }
        }
    }
}

/// The expression source of a deferred block.
///
/// A plain block is its own source. A block holding `${...}` parts is reduced:
/// its inner text, with each nested block unwrapped, is evaluated as one
/// immediate expression and the resulting text becomes the deferred source.
/// `None` means the reduction produced null under a silent engine.
fn reduce_deferred<'d, E: ExpressionEngine>(
    engine: &UnifiedEngine<E>,
    deferred: &'d Deferred,
    context: Option<&Context>,
    phase: Phase,
) -> UnilateResult<Option<Cow<'d, str>>> {
    if let Some(source) = deferred.flat_source() {
        return Ok(Some(Cow::Borrowed(source)));
    }

    let expression = deferred.reduction_source();
    let value = engine.evaluate_expression(&expression, deferred.location, context, phase)?;
    if value.is_null() {
        return Ok(None);
    }
    let source = value.to_text();
    debug!(nested = %expression, reduced = %source, "reduced nested block");
    Ok(Some(Cow::Owned(source)))
}
