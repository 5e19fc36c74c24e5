//! Condition expression language for the Conditional Filter.
//!
//! A deliberately small language evaluated against one record's metadata.
//! It is parsed into a syntax tree and interpreted; it cannot call
//! functions, assign, or reach anything but the record it is given.
//!
//! ## Bindings
//!
//! - `metadata` / `item` - The record's metadata document
//!
//! ## Syntax
//!
//! - Literals: numbers, `'single'` or `"double"` quoted strings, `true`,
//!   `false`, `null`, `undefined`
//! - Member access: `.field`, `['field']`, `[0]`, `.length` on arrays and strings
//! - Operators, loosest first: `||`, `&&`, `==` `===` `!=` `!==`,
//!   `<` `<=` `>` `>=`, unary `!` `-`
//!
//! ## Semantics
//!
//! - A missing key is `undefined`; reading a member of `undefined` or
//!   `null` is an error
//! - `==` and `===` are both strict: no type coercion, numbers by value
//! - Ordering compares two strings lexically and coerces anything else to a
//!   number; a side that is not a number (absent, object, text) makes it false
//!
//! ## Example
//!
//! ```
//! use visionflow::expr::Expression;
//! use serde_json::json;
//!
//! let cond = Expression::compile("metadata.label === 'ANGRY' && item.confidence > 80").unwrap();
//! assert!(cond.matches(&json!({"label": "ANGRY", "confidence": 91.2})).unwrap());
//! assert!(!cond.matches(&json!({"label": "CALM", "confidence": 99})).unwrap());
//! ```

pub mod eval;
pub mod lexer;
pub mod parser;

pub use eval::{evaluate, truthy, Operand, ROOT_NAMES};
pub use parser::{parse, Accessor, BinaryOp, Expr, UnaryOp};

use serde_json::Value;
use thiserror::Error;

/// Errors raised while parsing or evaluating an expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    /// Syntax error at a byte offset of the source
    #[error("Parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// An identifier other than the binding roots
    #[error("Unknown identifier '{0}'")]
    UnknownIdentifier(String),

    /// Member access on `null` or `undefined`
    #[error("Cannot read property '{property}' of {base}")]
    NullAccess {
        property: String,
        base: &'static str,
    },

    /// Operator applied to operands of unsupported types
    #[error("Operator '{op}' cannot be applied to {}", describe_operands(.lhs, .rhs))]
    TypeMismatch {
        op: String,
        lhs: String,
        rhs: Option<String>,
    },
}

fn describe_operands(lhs: &str, rhs: &Option<String>) -> String {
    match rhs {
        Some(rhs) => format!("{} and {}", lhs, rhs),
        None => lhs.to_string(),
    }
}

impl ExprError {
    pub fn parse(offset: usize, message: impl Into<String>) -> Self {
        ExprError::Parse {
            offset,
            message: message.into(),
        }
    }
}

/// A compiled condition. A blank source matches every record.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Option<Expr>,
}

impl Expression {
    pub fn compile(source: &str) -> Result<Self, ExprError> {
        let ast = if source.trim().is_empty() {
            None
        } else {
            Some(parse(source)?)
        };
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the source is blank.
    pub fn is_match_all(&self) -> bool {
        self.ast.is_none()
    }

    /// Evaluate to a JSON value (`undefined` becomes `null`).
    pub fn eval_value(&self, metadata: &Value) -> Result<Value, ExprError> {
        match &self.ast {
            None => Ok(Value::Bool(true)),
            Some(ast) => evaluate(ast, metadata).map(Operand::into_value),
        }
    }

    /// Evaluate and apply truthiness.
    pub fn matches(&self, metadata: &Value) -> Result<bool, ExprError> {
        match &self.ast {
            None => Ok(true),
            Some(ast) => Ok(evaluate(ast, metadata)?.is_truthy()),
        }
    }
}
