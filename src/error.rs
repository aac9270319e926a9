use std::fmt;

use crate::ast::Location;

pub type UnilateResult<T> = std::result::Result<T, UnilateError>;

/// Boxed cause reported by an expression engine.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unterminated expression, expected '}}' to close '{marker}{{'")]
    UnterminatedExpression { marker: char },
    #[error("unterminated string literal, expected closing {quote}")]
    UnterminatedString { quote: char },
    #[error("unterminated comment, expected '*/'")]
    UnterminatedComment,
    /// A prepared deferred source that would not scan back as one block.
    #[error("reduced source cannot be written back as a '#{{...}}' block")]
    UnrepresentableBlock,
}

/// A structural failure of the scanner, reported at the marker that never
/// closed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
#[error("Parse error at line {line}, column {column}: {kind} (near '{snippet}')")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    /// A short excerpt of the template starting at the offending marker.
    pub snippet: String,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub const fn location(&self) -> Location {
        Location {
            line: self.line,
            column: self.column,
        }
    }
}

/// The phase during which an expression failed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    Prepare,
    Evaluate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prepare => f.write_str("prepare"),
            Self::Evaluate => f.write_str("evaluate"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UnilateError {
    /// The template text is structurally broken.
    #[error(transparent)]
    Malformed(#[from] ParseError),
    /// The expression engine rejected or failed to evaluate a block.
    #[error("Failed to {phase} '{source_text}' at {location}: {cause}")]
    TemplateEvaluation {
        phase: Phase,
        source_text: String,
        location: Location,
        #[source]
        cause: BoxedCause,
    },
}

impl UnilateError {
    pub(crate) fn evaluation<C>(phase: Phase, source_text: &str, location: Location, cause: C) -> Self
    where
        C: std::error::Error + Send + Sync + 'static,
    {
        Self::TemplateEvaluation {
            phase,
            source_text: source_text.to_owned(),
            location,
            cause: Box::new(cause),
        }
    }

    /// The inner expression source that failed, if this is an evaluation error.
    pub fn source_text(&self) -> Option<&str> {
        match self {
            Self::TemplateEvaluation { source_text, .. } => Some(source_text),
            Self::Malformed(_) => None,
        }
    }

    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}
