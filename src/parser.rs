use tracing::trace;

use crate::{
    ast::{Deferred, Expression, Location, Segment, push_literal},
    error::{ParseError, ParseErrorKind},
};

type ParseResult<T> = Result<T, ParseError>;

/// Characters a backslash escapes in literal text.
const ESCAPABLE: [char; 5] = ['$', '#', '"', '\'', '\\'];

/// Number of characters quoted in a parse error.
const SNIPPET_LEN: usize = 24;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// The starting location of the current line
    line_start_pos: usize,
}

/// Where a block starts, for error reporting.
#[derive(Clone, Copy)]
struct Opening {
    marker: char,
    pos: usize,
    location: Location,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a str) -> Self {
        Parser {
            input,
            pos: 0,
            line: 1,
            line_start_pos: 0,
        }
    }

    #[inline]
    const fn current_column(&self) -> usize {
        self.pos - self.line_start_pos + 1
    }

    #[inline]
    const fn location(&self) -> Location {
        Location {
            line: self.line,
            column: self.current_column(),
        }
    }

    fn make_error(&self, opening: Opening, kind: ParseErrorKind) -> ParseError {
        let snippet = self
            .input
            .get(opening.pos..)
            .unwrap_or_default()
            .chars()
            .take(SNIPPET_LEN)
            .collect();
        ParseError {
            line: opening.location.line,
            column: opening.location.column,
            snippet,
            kind,
        }
    }

    /// Advances the parser position by char_len bytes, correctly handling
    /// multi-byte characters. Updates line and column numbers if a newline is
    /// encountered.
    #[inline]
    fn advance_by_char(&mut self, current_char: char, char_len: usize) {
        if current_char == '\n' {
            self.line += 1;
            self.line_start_pos = self.pos + char_len;
        }
        self.pos += char_len;
    }

    /// Advances the parser position by `len` bytes.
    /// Only used for fixed ASCII delimiters, which never contain newlines.
    #[inline]
    fn advance_bytes_no_newline(&mut self, len: usize) {
        self.pos += len;
    }

    /// Peek if the remaining input starts with `s`
    fn peek(&self, s: &str) -> bool {
        self.input
            .get(self.pos..)
            .is_some_and(|rest| rest.starts_with(s))
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos..)?.chars().next()
    }

    /// Consumes one character and returns it.
    fn bump(&mut self) -> Option<char> {
        let current_char = self.peek_char()?;
        self.advance_by_char(current_char, current_char.len_utf8());
        Some(current_char)
    }

    /// Parses literal text and blocks until the end of input.
    fn parse_segments(&mut self) -> ParseResult<Vec<Segment>> {
        let mut segments = Vec::new();
        let mut literal = String::new();

        while let Some(current_char) = self.peek_char() {
            match current_char {
                '\\' => {
                    self.bump();
                    match self.peek_char() {
                        Some(next) if ESCAPABLE.contains(&next) => {
                            self.bump();
                            literal.push(next);
                        }
                        // A backslash before anything else is kept as is, the
                        // next character is scanned normally.
                        Some(_) | None => literal.push('\\'),
                    }
                }
                '$' | '#' if self.peek_block_start(current_char) => {
                    push_literal(&mut segments, &literal);
                    literal.clear();
                    segments.push(self.parse_block(current_char)?);
                }
                _ => {
                    self.bump();
                    literal.push(current_char);
                }
            }
        }
        push_literal(&mut segments, &literal);

        Ok(segments)
    }

    fn peek_block_start(&self, marker: char) -> bool {
        match marker {
            '$' => self.peek("${"),
            '#' => self.peek("#{"),
            _ => false,
        }
    }

    /// Parses a `${...}` or `#{...}` block starting at the marker.
    fn parse_block(&mut self, marker: char) -> ParseResult<Segment> {
        let opening = Opening {
            marker,
            pos: self.pos,
            location: self.location(),
        };
        self.advance_bytes_no_newline(2);

        if marker == '#' {
            let parts = self.parse_block_body(opening, true)?;
            Ok(Segment::Deferred(Deferred::new(parts, opening.location)))
        } else {
            let source = self.parse_immediate_body(opening)?;
            Ok(Segment::Immediate(Expression::new(source, opening.location)))
        }
    }

    fn parse_immediate_body(&mut self, opening: Opening) -> ParseResult<String> {
        let parts = self.parse_block_body(opening, false)?;
        let mut source = String::new();
        for part in &parts {
            if let Segment::Literal(text) = part {
                source.push_str(text);
            }
        }
        Ok(source)
    }

    /// Scans a block body up to its matching `}`, which is consumed.
    ///
    /// Braces inside string literals and block comments do not count. When
    /// `nested` is set, `${...}` blocks inside the body become immediate parts.
    fn parse_block_body(&mut self, opening: Opening, nested: bool) -> ParseResult<Vec<Segment>> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut depth: usize = 1;

        loop {
            let Some(current_char) = self.peek_char() else {
                return Err(self.make_error(
                    opening,
                    ParseErrorKind::UnterminatedExpression {
                        marker: opening.marker,
                    },
                ));
            };

            match current_char {
                '\'' | '"' => self.parse_string(opening, current_char, &mut text)?,
                '/' if self.peek("/*") => self.parse_comment(opening, &mut text)?,
                '$' if nested && self.peek("${") => {
                    let inner = Opening {
                        marker: '$',
                        pos: self.pos,
                        location: self.location(),
                    };
                    self.advance_bytes_no_newline(2);
                    let source = self.parse_immediate_body(inner)?;

                    push_literal(&mut parts, &text);
                    text.clear();
                    parts.push(Segment::Immediate(Expression::new(source, inner.location)));
                }
                '{' => {
                    depth = depth.saturating_add(1);
                    self.bump();
                    text.push(current_char);
                }
                '}' => {
                    depth = depth.saturating_sub(1);
                    self.bump();
                    if depth == 0 {
                        break;
                    }
                    text.push(current_char);
                }
                _ => {
                    self.bump();
                    text.push(current_char);
                }
            }
        }
        push_literal(&mut parts, &text);

        Ok(parts)
    }

    /// Copies a quoted string literal verbatim, escapes included.
    fn parse_string(&mut self, opening: Opening, quote: char, out: &mut String) -> ParseResult<()> {
        self.bump();
        out.push(quote);
        loop {
            let Some(current_char) = self.bump() else {
                return Err(self.make_error(opening, ParseErrorKind::UnterminatedString { quote }));
            };
            out.push(current_char);
            if current_char == quote {
                return Ok(());
            }
            if current_char == '\\' {
                if let Some(escaped) = self.bump() {
                    out.push(escaped);
                }
            }
        }
    }

    /// Copies a `/* ... */` comment verbatim.
    fn parse_comment(&mut self, opening: Opening, out: &mut String) -> ParseResult<()> {
        self.advance_bytes_no_newline(2);
        out.push_str("/*");
        loop {
            if self.peek("*/") {
                self.advance_bytes_no_newline(2);
                out.push_str("*/");
                return Ok(());
            }
            let Some(current_char) = self.bump() else {
                return Err(self.make_error(opening, ParseErrorKind::UnterminatedComment));
            };
            out.push(current_char);
        }
    }
}

/// Splits template text into literal and expression segments.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Segment>, ParseError> {
    let mut parser = Parser::new(input);
    let segments = parser.parse_segments()?;
    trace!(segments = segments.len(), "scanned template");
    Ok(segments)
}

/// Checks that a reduced deferred source, written back as `#{source}`, scans
/// to one deferred block holding exactly `source`.
///
/// Errors are reported at `location`, the block the source was reduced for.
pub(crate) fn check_block_source(source: &str, location: Location) -> Result<(), ParseError> {
    let closed = format!("{source}}}");
    let mut parser = Parser::new(&closed);
    let opening = Opening {
        marker: '#',
        pos: 0,
        location,
    };
    let parts = parser.parse_block_body(opening, true)?;
    if parser.pos != closed.len() || parts.iter().any(Segment::has_immediate) {
        return Err(parser.make_error(opening, ParseErrorKind::UnrepresentableBlock));
    }
    Ok(())
}

/// Tests for individual functions in the parser module.
#[cfg(test)]
mod test_utils {
    use super::*;

    #[test]
    #[ntest::timeout(100)]
    fn test_peek_block_start() {
        let parser = Parser::new("${a}");
        assert!(parser.peek_block_start('$'));
        assert!(!parser.peek_block_start('#'));

        let parser = Parser::new("$ {a}");
        assert!(!parser.peek_block_start('$'));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_check_block_source() {
        let location = Location { line: 3, column: 7 };
        assert!(check_block_source("hello.world", location).is_ok());
        assert!(check_block_source("'}' + {a: 1}", location).is_ok());
        assert!(check_block_source("'${x}' /* } */", location).is_ok());
        assert!(check_block_source("", location).is_ok());

        let err = check_block_source("a}b", location).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnrepresentableBlock);
        assert_eq!(err.location(), location);

        let err = check_block_source("${x}", location).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnrepresentableBlock);

        let err = check_block_source("it's", location).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedString { quote: '\'' });
        assert_eq!(err.location(), location);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_location_tracks_newlines() {
        let mut parser = Parser::new("ab\ncd");
        for _ in 0..4 {
            parser.bump();
        }
        assert_eq!(parser.location(), Location { line: 2, column: 2 });
    }
}
