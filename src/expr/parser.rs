//! Recursive-descent parser producing the expression syntax tree.
//!
//! Precedence, lowest first: `||`, `&&`, equality, comparison, unary,
//! primary with member accessors.

use crate::expr::lexer::{tokenize, Token, TokenKind};
use crate::expr::ExprError;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// One step of a member chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    /// `.name` or `['name']`
    Key(String),
    /// `[n]`
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// The `undefined` keyword.
    Absent,
    /// A bare identifier; only the binding roots resolve.
    Ident(String),
    Member {
        object: Box<Expr>,
        accessor: Accessor,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Parse a full expression. Trailing tokens are an error.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(ExprError::parse(
            trailing.offset,
            format!("unexpected {}", trailing.kind.describe()),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ExprError> {
        let token = self.peek().clone();
        if token.kind == kind {
            Ok(self.advance())
        } else {
            Err(ExprError::parse(
                token.offset,
                format!("expected {}, found {}", kind.describe(), token.kind.describe()),
            ))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&TokenKind::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq | TokenKind::EqEqEq => BinaryOp::Eq,
                TokenKind::NotEq | TokenKind::NotEqEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let token = self.advance();
                let name = match token.kind {
                    TokenKind::Ident(name) => name,
                    // keywords are valid property names
                    TokenKind::True => "true".into(),
                    TokenKind::False => "false".into(),
                    TokenKind::Null => "null".into(),
                    TokenKind::Undefined => "undefined".into(),
                    other => {
                        return Err(ExprError::parse(
                            token.offset,
                            format!("expected property name, found {}", other.describe()),
                        ))
                    }
                };
                expr = member(expr, Accessor::Key(name));
            } else if self.eat(&TokenKind::LBracket) {
                let token = self.advance();
                let accessor = match token.kind {
                    TokenKind::Str(key) => Accessor::Key(key),
                    TokenKind::Number(n) if n >= 0.0 && n.fract() == 0.0 => {
                        Accessor::Index(n as usize)
                    }
                    other => {
                        return Err(ExprError::parse(
                            token.offset,
                            format!(
                                "expected string key or non-negative index, found {}",
                                other.describe()
                            ),
                        ))
                    }
                };
                self.expect(TokenKind::RBracket)?;
                expr = member(expr, accessor);
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(number(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::True => Ok(Expr::Literal(Value::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Value::Bool(false))),
            TokenKind::Null => Ok(Expr::Literal(Value::Null)),
            TokenKind::Undefined => Ok(Expr::Absent),
            TokenKind::Ident(name) => Ok(Expr::Ident(name)),
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            other => Err(ExprError::parse(
                token.offset,
                format!("unexpected {}", other.describe()),
            )),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn member(object: Expr, accessor: Accessor) -> Expr {
    Expr::Member {
        object: Box::new(object),
        accessor,
    }
}

/// JSON number for a literal, integral when possible.
pub(crate) fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
