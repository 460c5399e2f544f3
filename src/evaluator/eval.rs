//! AST interpreter over `serde_json::Value`.

use std::collections::HashMap;

use serde_json::Value;

use super::ast::{BinOp, Expr};
use super::{is_truthy, EvalLimits, ExpressionError};

pub(crate) fn eval(
    expr: &Expr,
    vars: &HashMap<String, Value>,
    limits: &EvalLimits,
) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Var(name) => vars
            .get(name)
            .cloned()
            .ok_or_else(|| ExpressionError::undefined(name, vars)),
        Expr::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval(item, vars, limits)?);
            }
            Ok(Value::Array(out))
        }
        Expr::Not(inner) => Ok(Value::Bool(!is_truthy(&eval(inner, vars, limits)?))),
        Expr::Neg(inner) => {
            let v = eval(inner, vars, limits)?;
            match as_f64(&v) {
                Some(f) => {
                    if let Some(i) = as_i64(&v) {
                        Ok(Value::from(-i))
                    } else {
                        Ok(Value::from(-f))
                    }
                }
                None => Err(ExpressionError::TypeMismatch(format!(
                    "cannot negate {}",
                    type_name(&v)
                ))),
            }
        }
        Expr::Len(inner) => {
            let v = eval(inner, vars, limits)?;
            let n = match &v {
                Value::String(s) => s.chars().count(),
                Value::Array(a) => a.len(),
                Value::Object(o) => o.len(),
                other => {
                    return Err(ExpressionError::TypeMismatch(format!(
                        "len() expects a string or list, got {}",
                        type_name(other)
                    )))
                }
            };
            Ok(Value::from(n as i64))
        }
        Expr::Binary(BinOp::And, lhs, rhs) => {
            // Short-circuit, returning the deciding operand's value.
            let left = eval(lhs, vars, limits)?;
            if !is_truthy(&left) {
                return Ok(left);
            }
            eval(rhs, vars, limits)
        }
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            let left = eval(lhs, vars, limits)?;
            if is_truthy(&left) {
                return Ok(left);
            }
            eval(rhs, vars, limits)
        }
        Expr::Binary(op, lhs, rhs) => {
            let left = eval(lhs, vars, limits)?;
            let right = eval(rhs, vars, limits)?;
            apply(*op, &left, &right, limits)
        }
    }
}

fn apply(
    op: BinOp,
    left: &Value,
    right: &Value,
    limits: &EvalLimits,
) -> Result<Value, ExpressionError> {
    match op {
        BinOp::Eq => Ok(Value::Bool(loose_eq(left, right))),
        BinOp::Ne => Ok(Value::Bool(!loose_eq(left, right))),
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
            let ordering = compare(left, right)?;
            Ok(Value::Bool(match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Gt => ordering.is_gt(),
                BinOp::Le => ordering.is_le(),
                _ => ordering.is_ge(),
            }))
        }
        BinOp::In => Ok(Value::Bool(membership(left, right)?)),
        BinOp::NotIn => Ok(Value::Bool(!membership(left, right)?)),
        BinOp::Add => add(left, right, limits),
        BinOp::Sub => numeric(op, left, right, |a, b| Ok(a - b), |a, b| a.checked_sub(b)),
        BinOp::Mul => numeric(op, left, right, |a, b| Ok(a * b), |a, b| a.checked_mul(b)),
        BinOp::Div => {
            let (a, b) = numeric_pair(op, left, right)?;
            if b == 0.0 {
                return Err(ExpressionError::Eval("division by zero".into()));
            }
            Ok(Value::from(a / b))
        }
        BinOp::Mod => {
            let (a, b) = numeric_pair(op, left, right)?;
            if b == 0.0 {
                return Err(ExpressionError::Eval("modulo by zero".into()));
            }
            match (as_i64(left), as_i64(right)) {
                (Some(ia), Some(ib)) => Ok(Value::from(ia.rem_euclid(ib))),
                _ => Ok(Value::from(a % b)),
            }
        }
        BinOp::Pow => {
            let (base, exp) = numeric_pair(op, left, right)?;
            if base.abs() > limits.max_power {
                return Err(ExpressionError::PowerLimit {
                    base,
                    limit: limits.max_power,
                });
            }
            let result = base.powf(exp);
            if !result.is_finite() {
                return Err(ExpressionError::Eval("exponentiation overflow".into()));
            }
            match (as_i64(left), as_i64(right)) {
                (Some(_), Some(e)) if e >= 0 && result.fract() == 0.0 && result.abs() < 9e15 => {
                    Ok(Value::from(result as i64))
                }
                _ => Ok(Value::from(result)),
            }
        }
        BinOp::And | BinOp::Or => unreachable!("short-circuit ops handled in eval()"),
    }
}

fn add(left: &Value, right: &Value, limits: &EvalLimits) -> Result<Value, ExpressionError> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => {
            if a.len() + b.len() > limits.max_string_length {
                return Err(ExpressionError::LengthLimit {
                    length: a.len() + b.len(),
                    limit: limits.max_string_length,
                });
            }
            Ok(Value::String(format!("{a}{b}")))
        }
        (Value::Array(a), Value::Array(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Value::Array(out))
        }
        _ => numeric(
            BinOp::Add,
            left,
            right,
            |a, b| Ok(a + b),
            |a, b| a.checked_add(b),
        ),
    }
}

fn numeric(
    op: BinOp,
    left: &Value,
    right: &Value,
    float_op: impl Fn(f64, f64) -> Result<f64, ExpressionError>,
    int_op: impl Fn(i64, i64) -> Option<i64>,
) -> Result<Value, ExpressionError> {
    if let (Some(a), Some(b)) = (as_i64(left), as_i64(right)) {
        return match int_op(a, b) {
            Some(n) => Ok(Value::from(n)),
            None => Err(ExpressionError::Eval("integer overflow".into())),
        };
    }
    let (a, b) = numeric_pair(op, left, right)?;
    Ok(Value::from(float_op(a, b)?))
}

fn numeric_pair(op: BinOp, left: &Value, right: &Value) -> Result<(f64, f64), ExpressionError> {
    match (as_f64(left), as_f64(right)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(ExpressionError::TypeMismatch(format!(
            "operator {op:?} expects numbers, got {} and {}",
            type_name(left),
            type_name(right)
        ))),
    }
}

/// Equality with numeric cross-type tolerance (`1 == 1.0` is true).
fn loose_eq(left: &Value, right: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_f64(left), as_f64(right)) {
        return a == b;
    }
    left == right
}

fn compare(left: &Value, right: &Value) -> Result<std::cmp::Ordering, ExpressionError> {
    if let (Some(a), Some(b)) = (as_f64(left), as_f64(right)) {
        return a.partial_cmp(&b).ok_or_else(|| {
            ExpressionError::TypeMismatch("cannot order NaN values".into())
        });
    }
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Ok(a.cmp(b));
    }
    Err(ExpressionError::TypeMismatch(format!(
        "cannot compare {} with {}",
        type_name(left),
        type_name(right)
    )))
}

fn membership(needle: &Value, haystack: &Value) -> Result<bool, ExpressionError> {
    match haystack {
        Value::Array(items) => Ok(items.iter().any(|item| loose_eq(needle, item))),
        Value::String(s) => match needle {
            Value::String(sub) => Ok(s.contains(sub.as_str())),
            other => Err(ExpressionError::TypeMismatch(format!(
                "'in <string>' expects a string operand, got {}",
                type_name(other)
            ))),
        },
        Value::Object(map) => match needle {
            Value::String(key) => Ok(map.contains_key(key)),
            other => Err(ExpressionError::TypeMismatch(format!(
                "'in <object>' expects a string key, got {}",
                type_name(other)
            ))),
        },
        other => Err(ExpressionError::TypeMismatch(format!(
            "'in' expects a list or string on the right, got {}",
            type_name(other)
        ))),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
