use super::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Question,
    Colon,
    Dot,
    Comma,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    /// Byte offset of the token in the expression source.
    pub(crate) offset: usize,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self, s: &str) -> bool {
        self.input
            .get(self.pos..)
            .is_some_and(|rest| rest.starts_with(s))
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos..)?.chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.input.get(self.pos..)?.chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let current_char = self.peek_char()?;
        self.pos += current_char.len_utf8();
        Some(current_char)
    }

    fn slice(&self, start: usize) -> &'a str {
        self.input.get(start..self.pos).unwrap_or_default()
    }

    /// Skips whitespace, `/* */` block comments and `//` line comments.
    fn skip_trivia(&mut self) -> Result<(), ExpressionError> {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek("/*") => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        if self.peek("*/") {
                            self.pos += 2;
                            break;
                        }
                        if self.bump().is_none() {
                            return Err(ExpressionError::syntax(start, "unterminated comment"));
                        }
                    }
                }
                Some('/') if self.peek("//") => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some(_) | None => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ExpressionError> {
        self.skip_trivia()?;
        let offset = self.pos;
        let Some(current_char) = self.peek_char() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                offset,
            });
        };

        let kind = match current_char {
            '0'..='9' => self.number()?,
            '\'' | '"' => self.string(current_char)?,
            c if c.is_alphabetic() || c == '_' => self.identifier(),
            _ => self.punctuation(current_char)?,
        };
        Ok(Token { kind, offset })
    }

    fn number(&mut self) -> Result<TokenKind, ExpressionError> {
        let start = self.pos;
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let is_float =
            self.peek_char() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.bump();
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
            return self
                .slice(start)
                .parse()
                .map(TokenKind::Float)
                .map_err(|_| ExpressionError::syntax(start, "invalid float literal"));
        }
        self.slice(start)
            .parse()
            .map(TokenKind::Int)
            .map_err(|_| ExpressionError::syntax(start, "integer literal out of range"))
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, ExpressionError> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            let Some(current_char) = self.bump() else {
                return Err(ExpressionError::syntax(start, "unterminated string literal"));
            };
            match current_char {
                c if c == quote => return Ok(TokenKind::Str(value)),
                '\\' => {
                    let Some(escaped) = self.bump() else {
                        return Err(ExpressionError::syntax(start, "unterminated string literal"));
                    };
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                c => value.push(c),
            }
        }
    }

    fn identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .peek_char()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.bump();
        }
        match self.slice(start) {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "and" => TokenKind::AndAnd,
            "or" => TokenKind::OrOr,
            "not" => TokenKind::Bang,
            word => TokenKind::Ident(word.to_owned()),
        }
    }

    fn punctuation(&mut self, current_char: char) -> Result<TokenKind, ExpressionError> {
        let start = self.pos;
        let two_char = [
            ("==", TokenKind::EqEq),
            ("!=", TokenKind::NotEq),
            ("<=", TokenKind::Le),
            (">=", TokenKind::Ge),
            ("&&", TokenKind::AndAnd),
            ("||", TokenKind::OrOr),
        ];
        for (text, kind) in two_char {
            if self.peek(text) {
                self.pos += 2;
                return Ok(kind);
            }
        }

        self.bump();
        let kind = match current_char {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '!' => TokenKind::Bang,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '=' => return Err(ExpressionError::syntax(start, "assignment is not supported")),
            other => {
                return Err(ExpressionError::syntax(
                    start,
                    format!("unexpected character '{other}'"),
                ));
            }
        };
        Ok(kind)
    }
}

/// Splits expression source into tokens, ending with `Eof`.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
