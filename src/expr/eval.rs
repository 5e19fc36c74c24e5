//! Evaluator for parsed expressions.
//!
//! Values are JSON values plus an explicit "absent" state for missing keys.
//! Truthiness: `false`, `0`, `NaN`, `""`, `null` and absent are falsy.

use crate::expr::parser::{number, Accessor, BinaryOp, Expr, UnaryOp};
use crate::expr::ExprError;
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

/// Names the record's metadata can be referenced by.
pub const ROOT_NAMES: &[&str] = &["metadata", "item"];

/// Result of evaluating a sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand<'a> {
    Absent,
    Value(Cow<'a, Value>),
}

impl<'a> Operand<'a> {
    fn owned(value: Value) -> Self {
        Operand::Value(Cow::Owned(value))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Operand::Absent => false,
            Operand::Value(v) => truthy(v),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Operand::Absent => "undefined",
            Operand::Value(v) => match v.as_ref() {
                Value::Null => "null",
                Value::Bool(_) => "boolean",
                Value::Number(_) => "number",
                Value::String(_) => "string",
                Value::Array(_) => "array",
                Value::Object(_) => "object",
            },
        }
    }

    /// Convert into a plain JSON value; absent becomes `null`.
    pub fn into_value(self) -> Value {
        match self {
            Operand::Absent => Value::Null,
            Operand::Value(v) => v.into_owned(),
        }
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Evaluate `expr` with `root` bound to every name in [`ROOT_NAMES`].
pub fn evaluate<'a>(expr: &'a Expr, root: &'a Value) -> Result<Operand<'a>, ExprError> {
    match expr {
        Expr::Literal(v) => Ok(Operand::Value(Cow::Borrowed(v))),
        Expr::Absent => Ok(Operand::Absent),
        Expr::Ident(name) => {
            if ROOT_NAMES.contains(&name.as_str()) {
                Ok(Operand::Value(Cow::Borrowed(root)))
            } else {
                Err(ExprError::UnknownIdentifier(name.clone()))
            }
        }
        Expr::Member { object, accessor } => {
            let base = evaluate(object, root)?;
            access(base, accessor)
        }
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, root)?;
            match op {
                UnaryOp::Not => Ok(Operand::owned(Value::Bool(!value.is_truthy()))),
                UnaryOp::Neg => match &value {
                    Operand::Value(v) if v.is_number() => {
                        let n = v.as_f64().unwrap_or(f64::NAN);
                        Ok(Operand::owned(number(-n)))
                    }
                    _ => Err(ExprError::TypeMismatch {
                        op: "-".into(),
                        lhs: value.type_name().into(),
                        rhs: None,
                    }),
                },
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            let left = evaluate(lhs, root)?;
            match op {
                // short-circuit, yielding the deciding operand
                BinaryOp::Or => {
                    if left.is_truthy() {
                        Ok(left)
                    } else {
                        evaluate(rhs, root)
                    }
                }
                BinaryOp::And => {
                    if left.is_truthy() {
                        evaluate(rhs, root)
                    } else {
                        Ok(left)
                    }
                }
                BinaryOp::Eq | BinaryOp::NotEq => {
                    let right = evaluate(rhs, root)?;
                    let equal = strict_equals(&left, &right);
                    let result = if *op == BinaryOp::Eq { equal } else { !equal };
                    Ok(Operand::owned(Value::Bool(result)))
                }
                BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                    let right = evaluate(rhs, root)?;
                    let result = match (op, compare(&left, &right)) {
                        // NaN compares false to everything
                        (_, None) => false,
                        (BinaryOp::Lt, Some(o)) => o == Ordering::Less,
                        (BinaryOp::Le, Some(o)) => o != Ordering::Greater,
                        (BinaryOp::Gt, Some(o)) => o == Ordering::Greater,
                        (_, Some(o)) => o != Ordering::Less,
                    };
                    Ok(Operand::owned(Value::Bool(result)))
                }
            }
        }
    }
}

fn access<'a>(base: Operand<'a>, accessor: &Accessor) -> Result<Operand<'a>, ExprError> {
    let property = match accessor {
        Accessor::Key(k) => k.clone(),
        Accessor::Index(i) => i.to_string(),
    };

    let value = match base {
        Operand::Absent => {
            return Err(ExprError::NullAccess {
                property,
                base: "undefined",
            })
        }
        Operand::Value(v) => v,
    };

    match value {
        Cow::Borrowed(v) => Ok(match lookup(v, accessor)? {
            Lookup::Found(child) => Operand::Value(Cow::Borrowed(child)),
            Lookup::Computed(v) => Operand::owned(v),
            Lookup::Missing => Operand::Absent,
        }),
        Cow::Owned(v) => Ok(match lookup(&v, accessor)? {
            Lookup::Found(child) => Operand::owned(child.clone()),
            Lookup::Computed(v) => Operand::owned(v),
            Lookup::Missing => Operand::Absent,
        }),
    }
}

enum Lookup<'v> {
    Found(&'v Value),
    Computed(Value),
    Missing,
}

fn lookup<'v>(value: &'v Value, accessor: &Accessor) -> Result<Lookup<'v>, ExprError> {
    Ok(match (value, accessor) {
        (Value::Null, _) => {
            let property = match accessor {
                Accessor::Key(k) => k.clone(),
                Accessor::Index(i) => i.to_string(),
            };
            return Err(ExprError::NullAccess {
                property,
                base: "null",
            });
        }
        (Value::Object(map), Accessor::Key(k)) => map.get(k).map_or(Lookup::Missing, Lookup::Found),
        (Value::Object(map), Accessor::Index(i)) => {
            map.get(&i.to_string()).map_or(Lookup::Missing, Lookup::Found)
        }
        (Value::Array(items), Accessor::Index(i)) => {
            items.get(*i).map_or(Lookup::Missing, Lookup::Found)
        }
        (Value::Array(items), Accessor::Key(k)) if k == "length" => {
            Lookup::Computed(Value::from(items.len()))
        }
        (Value::String(s), Accessor::Key(k)) if k == "length" => {
            Lookup::Computed(Value::from(s.chars().count()))
        }
        (Value::String(s), Accessor::Index(i)) => match s.chars().nth(*i) {
            Some(c) => Lookup::Computed(Value::String(c.to_string())),
            None => Lookup::Missing,
        },
        // properties of other primitives are absent
        _ => Lookup::Missing,
    })
}

fn strict_equals(left: &Operand<'_>, right: &Operand<'_>) -> bool {
    match (left, right) {
        (Operand::Absent, Operand::Absent) => true,
        (Operand::Value(a), Operand::Value(b)) => match (a.as_ref(), b.as_ref()) {
            (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
            (a, b) => a == b,
        },
        _ => false,
    }
}

/// Relational ordering with JavaScript coercion: two strings compare
/// lexically, anything else compares as numbers. `None` when either side
/// is not a number after coercion, which makes every relation false.
fn compare(left: &Operand<'_>, right: &Operand<'_>) -> Option<Ordering> {
    if let (Operand::Value(a), Operand::Value(b)) = (left, right) {
        if let (Value::String(x), Value::String(y)) = (a.as_ref(), b.as_ref()) {
            return Some(x.cmp(y));
        }
    }
    to_number(left)?.partial_cmp(&to_number(right)?)
}

fn to_number(operand: &Operand<'_>) -> Option<f64> {
    let value = match operand {
        Operand::Absent => return None,
        Operand::Value(v) => v.as_ref(),
    };
    match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}
