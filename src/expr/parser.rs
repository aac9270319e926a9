use super::ExpressionError;
use super::lexer::{Token, TokenKind, tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub(crate) const fn symbol(self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Expr>),
    /// A dotted variable reference such as `hello.world`.
    Path(Vec<String>),
    Property {
        target: Box<Expr>,
        name: String,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

/// A compiled expression: one or more statements separated by `;`.
///
/// Evaluating a script yields the value of its last statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub(crate) statements: Vec<Expr>,
}

impl Script {
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

/// How deeply expressions may nest before parsing gives up. Parsing,
/// evaluation and dropping of the tree all recurse over it.
const MAX_DEPTH: usize = 128;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Nesting of the expression being parsed: enclosing expressions plus the
    /// operators, unary prefixes and postfixes wrapped around it so far.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map_or(&TokenKind::Eof, |token| &token.kind)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |token| token.offset)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if kind != TokenKind::Eof {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, expected: &TokenKind) -> bool {
        if self.peek() == expected {
            self.advance();
            return true;
        }
        false
    }

    fn expect(&mut self, expected: &TokenKind, what: &str) -> Result<(), ExpressionError> {
        if self.eat(expected) {
            return Ok(());
        }
        Err(self.unexpected(what))
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::syntax(
                self.offset(),
                format!("expression nested deeper than {MAX_DEPTH} levels"),
            ));
        }
        Ok(())
    }

    fn unexpected(&self, what: &str) -> ExpressionError {
        let found = match self.peek() {
            TokenKind::Eof => "end of expression".to_owned(),
            other => format!("{other:?}"),
        };
        ExpressionError::syntax(self.offset(), format!("expected {what}, found {found}"))
    }

    fn parse_script(&mut self) -> Result<Script, ExpressionError> {
        let mut statements = Vec::new();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if *self.peek() == TokenKind::Eof {
                break;
            }
            statements.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Semicolon) && *self.peek() != TokenKind::Eof {
                return Err(self.unexpected("';' or end of expression"));
            }
        }

        if statements.is_empty() {
            return Err(ExpressionError::syntax(0, "empty expression"));
        }
        Ok(Script { statements })
    }

    fn parse_expression(&mut self) -> Result<Expr, ExpressionError> {
        let depth = self.depth;
        self.descend()?;
        let expr = self.parse_conditional_expression()?;
        self.depth = depth;
        Ok(expr)
    }

    fn parse_conditional_expression(&mut self) -> Result<Expr, ExpressionError> {
        let condition = self.parse_or_expression()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(condition);
        }
        let then = self.parse_expression()?;
        self.expect(&TokenKind::Colon, "':'")?;
        let otherwise = self.parse_expression()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// Parses a chain of left-associative binary operators sharing one
    /// precedence level.
    fn parse_binary_level(
        &mut self,
        operators: &[(TokenKind, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, ExpressionError>,
    ) -> Result<Expr, ExpressionError> {
        let depth = self.depth;
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in operators {
                if self.eat(token) {
                    self.descend()?;
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            self.depth = depth;
            return Ok(left);
        }
    }

    fn parse_or_expression(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_binary_level(&[(TokenKind::OrOr, BinaryOp::Or)], Self::parse_and_expression)
    }

    fn parse_and_expression(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_binary_level(
            &[(TokenKind::AndAnd, BinaryOp::And)],
            Self::parse_equality_expression,
        )
    }

    fn parse_equality_expression(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_binary_level(
            &[(TokenKind::EqEq, BinaryOp::Eq), (TokenKind::NotEq, BinaryOp::Ne)],
            Self::parse_comparison_expression,
        )
    }

    fn parse_comparison_expression(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_binary_level(
            &[
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::Le, BinaryOp::Le),
                (TokenKind::Gt, BinaryOp::Gt),
                (TokenKind::Ge, BinaryOp::Ge),
            ],
            Self::parse_additive_expression,
        )
    }

    fn parse_additive_expression(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_binary_level(
            &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)],
            Self::parse_multiplicative_expression,
        )
    }

    fn parse_multiplicative_expression(&mut self) -> Result<Expr, ExpressionError> {
        self.parse_binary_level(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Rem),
            ],
            Self::parse_not_expression,
        )
    }

    fn parse_not_expression(&mut self) -> Result<Expr, ExpressionError> {
        let wrap = if self.eat(&TokenKind::Bang) {
            Expr::Not
        } else if self.eat(&TokenKind::Minus) {
            Expr::Neg
        } else {
            return self.parse_postfix_expression();
        };
        let depth = self.depth;
        self.descend()?;
        let inner = self.parse_not_expression()?;
        self.depth = depth;
        Ok(wrap(Box::new(inner)))
    }

    fn parse_postfix_expression(&mut self) -> Result<Expr, ExpressionError> {
        let depth = self.depth;
        let mut expr = self.parse_primary_expression()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let TokenKind::Ident(name) = self.peek().clone() else {
                    return Err(self.unexpected("a property or method name"));
                };
                self.advance();
                if self.eat(&TokenKind::LParen) {
                    self.descend()?;
                    let args = self.parse_arguments(&TokenKind::RParen)?;
                    expr = Expr::Call {
                        target: Box::new(expr),
                        method: name,
                        args,
                    };
                } else if let Expr::Path(path) = &mut expr {
                    path.push(name);
                } else {
                    self.descend()?;
                    expr = Expr::Property {
                        target: Box::new(expr),
                        name,
                    };
                }
            } else if self.eat(&TokenKind::LBracket) {
                self.descend()?;
                let index = self.parse_expression()?;
                self.expect(&TokenKind::RBracket, "']'")?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                self.depth = depth;
                return Ok(expr);
            }
        }
    }

    /// Parses comma separated expressions up to and including `close`.
    fn parse_arguments(&mut self, close: &TokenKind) -> Result<Vec<Expr>, ExpressionError> {
        let mut args = Vec::new();
        if self.eat(close) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.eat(close) {
                return Ok(args);
            }
            self.expect(&TokenKind::Comma, "',' or closing bracket")?;
        }
    }

    fn parse_primary_expression(&mut self) -> Result<Expr, ExpressionError> {
        let expr = match self.peek() {
            TokenKind::Int(value) => Expr::Int(*value),
            TokenKind::Float(value) => Expr::Float(*value),
            TokenKind::Str(value) => Expr::Str(value.clone()),
            TokenKind::True => Expr::Bool(true),
            TokenKind::False => Expr::Bool(false),
            TokenKind::Null => Expr::Null,
            TokenKind::Ident(name) => Expr::Path(vec![name.clone()]),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                return Ok(inner);
            }
            TokenKind::LBracket => {
                self.advance();
                return Ok(Expr::List(self.parse_arguments(&TokenKind::RBracket)?));
            }
            _ => return Err(self.unexpected("an expression")),
        };
        self.advance();
        Ok(expr)
    }
}

/// Compiles expression source into a [`Script`].
pub(crate) fn parse(source: &str) -> Result<Script, ExpressionError> {
    let tokens = tokenize(source)?;
    Parser {
        tokens,
        pos: 0,
        depth: 0,
    }
    .parse_script()
}
