use std::fmt;

/// Line and column (both 1-indexed) of an expression marker in the template.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// The body of a `${...}` block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression {
    pub(crate) source: String,
    pub(crate) location: Location,
}

impl Expression {
    pub(crate) const fn new(source: String, location: Location) -> Self {
        Self { source, location }
    }

    /// The verbatim text between the braces.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub const fn location(&self) -> Location {
        self.location
    }

    fn render_source(&self, out: &mut String) {
        out.push_str("${");
        out.push_str(&self.source);
        out.push('}');
    }
}

/// The body of a `#{...}` block.
///
/// The inner source is itself a segment sequence: a plain deferred block is a
/// single literal part, while `#{${a}.b}` interleaves literal and immediate
/// parts which are reduced before the deferred expression is compiled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Deferred {
    pub(crate) parts: Vec<Segment>,
    pub(crate) location: Location,
}

impl Deferred {
    pub(crate) const fn new(parts: Vec<Segment>, location: Location) -> Self {
        Self { parts, location }
    }

    pub(crate) fn flat(source: String, location: Location) -> Self {
        let parts = if source.is_empty() {
            Vec::new()
        } else {
            vec![Segment::Literal(source)]
        };
        Self { parts, location }
    }

    pub fn parts(&self) -> &[Segment] {
        &self.parts
    }

    pub const fn location(&self) -> Location {
        self.location
    }

    /// Whether the inner source holds `${...}` blocks.
    pub fn is_nested(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, Segment::Immediate(_)))
    }

    /// The inner source when it has no nested blocks.
    pub fn flat_source(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [] => Some(""),
            [Segment::Literal(text)] => Some(text),
            _ => None,
        }
    }

    /// The inner source with each nested `${x}` unwrapped to `x`.
    ///
    /// This is the expression whose value becomes the deferred source once the
    /// nested blocks are reduced.
    pub fn reduction_source(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Segment::Literal(text) => out.push_str(text),
                Segment::Immediate(expression) => out.push_str(&expression.source),
                // The scanner reads `#{` inside a deferred block as plain text.
                Segment::Deferred(_) => {}
            }
        }
        out
    }

    /// Writes the inner source back. Parts are raw block text, so nothing is
    /// escaped.
    fn render_inner(&self, out: &mut String) {
        for part in &self.parts {
            match part {
                Segment::Literal(text) => out.push_str(text),
                Segment::Immediate(expression) => expression.render_source(out),
                Segment::Deferred(_) => {}
            }
        }
    }
}

/// One unit of a parsed template, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal text with all escapes processed.
    Literal(String),
    /// A `${...}` block, resolved whenever the enclosing phase runs.
    Immediate(Expression),
    /// A `#{...}` block, only resolved by `evaluate`.
    Deferred(Deferred),
}

impl Segment {
    /// Writes the segment as template text that scans back to this segment.
    pub(crate) fn render_source(&self, out: &mut String) {
        match self {
            Self::Literal(text) => push_escaped(out, text),
            Self::Immediate(expression) => expression.render_source(out),
            Self::Deferred(deferred) => {
                out.push_str("#{");
                deferred.render_inner(out);
                out.push('}');
            }
        }
    }

    fn has_deferred(&self) -> bool {
        match self {
            Self::Deferred(_) => true,
            Self::Literal(_) | Self::Immediate(_) => false,
        }
    }

    pub(crate) fn has_immediate(&self) -> bool {
        match self {
            Self::Literal(_) => false,
            Self::Immediate(_) => true,
            Self::Deferred(deferred) => deferred.parts.iter().any(Self::has_immediate),
        }
    }
}

/// How much of a template is left to compute.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemplateKind {
    /// Plain text: no expression blocks at all.
    Constant,
    /// Only `${...}` blocks.
    Immediate,
    /// At least one `#{...}` block.
    Deferred,
}

impl TemplateKind {
    pub(crate) fn classify(segments: &[Segment]) -> Self {
        if segments.iter().any(Segment::has_deferred) {
            return Self::Deferred;
        }
        match segments {
            [] | [Segment::Literal(_)] => Self::Constant,
            _ => Self::Immediate,
        }
    }
}

/// Appends literal text with the escapes the scanner needs to read it back:
/// backslashes and quotes always, `$` and `#` only when a `{` follows.
fn push_escaped(out: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(current_char) = chars.next() {
        let escape = match current_char {
            '\\' | '"' | '\'' => true,
            '$' | '#' => chars.peek() == Some(&'{'),
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(current_char);
    }
}

/// Appends literal text, merging it into a trailing literal segment.
pub(crate) fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Literal(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Literal(text.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn immediate(source: &str) -> Segment {
        Segment::Immediate(Expression::new(source.to_owned(), Location::default()))
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_classify_constant() {
        assert_eq!(TemplateKind::classify(&[]), TemplateKind::Constant);
        assert_eq!(
            TemplateKind::classify(&[Segment::Literal("text".to_owned())]),
            TemplateKind::Constant
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_classify_immediate() {
        assert_eq!(TemplateKind::classify(&[immediate("a")]), TemplateKind::Immediate);
        assert_eq!(
            TemplateKind::classify(&[Segment::Literal("x".to_owned()), immediate("a")]),
            TemplateKind::Immediate
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_classify_deferred_nested() {
        let nested = Deferred::new(
            vec![immediate("hi"), Segment::Literal("+'.world'".to_owned())],
            Location::default(),
        );
        let segments = [Segment::Literal("x".to_owned()), Segment::Deferred(nested)];
        assert_eq!(TemplateKind::classify(&segments), TemplateKind::Deferred);
        assert!(segments.iter().any(Segment::has_immediate));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_reduction_source_unwraps_markers() {
        let nested = Deferred::new(
            vec![immediate("hi"), Segment::Literal("+'.world'".to_owned())],
            Location::default(),
        );
        assert!(nested.is_nested());
        assert_eq!(nested.flat_source(), None);
        assert_eq!(nested.reduction_source(), "hi+'.world'");

        let mut rendered = String::new();
        Segment::Deferred(nested).render_source(&mut rendered);
        assert_eq!(rendered, "#{${hi}+'.world'}");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_literal_render_is_escaped() {
        let mut rendered = String::new();
        Segment::Literal(r#"${x} #{y} $5 #1 "q" 'a' c:\dir"#.to_owned()).render_source(&mut rendered);
        assert_eq!(rendered, r#"\${x} \#{y} $5 #1 \"q\" \'a\' c:\\dir"#);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_deferred_parts_render_raw() {
        let deferred = Deferred::new(
            vec![Segment::Literal("'a\\b' + ".to_owned()), immediate("c")],
            Location::default(),
        );
        let mut rendered = String::new();
        Segment::Deferred(deferred).render_source(&mut rendered);
        assert_eq!(rendered, "#{'a\\b' + ${c}}");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_push_literal_merges() {
        let mut segments = vec![Segment::Literal("Dear ".to_owned())];
        push_literal(&mut segments, "Doe");
        push_literal(&mut segments, "");
        push_literal(&mut segments, ";");
        assert_eq!(segments, vec![Segment::Literal("Dear Doe;".to_owned())]);
    }
}
