//! Sandboxed expression evaluation for workflow control flow.
//!
//! Evaluates user-supplied boolean and categorical expressions without
//! arbitrary code execution. The language is intentionally small:
//!
//! - Comparison: `==`, `!=`, `<`, `>`, `<=`, `>=`
//! - Membership: `in`, `not in`
//! - Logical: `and`, `or`, `not`
//! - Arithmetic: `+`, `-`, `*`, `/`, `%`, `**`
//! - Literals: strings, numbers, booleans, lists; parenthesized grouping
//! - One allow-listed function: `len(...)`
//!
//! Function definitions, assignment, imports, attribute access, and any
//! other construct are rejected at parse time. Evaluation is bounded by
//! [`EvalLimits`] (expression length, exponentiation base, string size).

mod ast;
mod eval;
mod token;

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

/// Expression-language errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Expression cannot be empty")]
    Empty,
    #[error("Invalid expression syntax: {0}")]
    Syntax(String),
    #[error("Forbidden construct: {0}")]
    Forbidden(String),
    #[error("Variable '{name}' not found in context (available: [{available}])")]
    UndefinedVariable { name: String, available: String },
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Expression evaluation error: {0}")]
    Eval(String),
    #[error("Expression length {length} exceeds limit of {limit} characters")]
    LengthLimit { length: usize, limit: usize },
    #[error("Exponentiation base {base} exceeds limit of {limit}")]
    PowerLimit { base: f64, limit: f64 },
}

impl ExpressionError {
    fn undefined(name: &str, vars: &HashMap<String, Value>) -> Self {
        let mut available: Vec<&str> = vars.keys().map(String::as_str).collect();
        available.sort_unstable();
        ExpressionError::UndefinedVariable {
            name: name.to_string(),
            available: available.join(", "),
        }
    }

    /// True for the resource-limit failures (denial-of-service guards).
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            ExpressionError::LengthLimit { .. } | ExpressionError::PowerLimit { .. }
        )
    }
}

/// Evaluation cost bounds. Exceeding a bound is a distinct error, never a
/// silent truncation.
#[derive(Debug, Clone)]
pub struct EvalLimits {
    /// Maximum length of the expression source text.
    pub max_expression_length: usize,
    /// Maximum absolute exponentiation base for `**`.
    pub max_power: f64,
    /// Maximum length of a string produced by concatenation.
    pub max_string_length: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_expression_length: 100_000,
            max_power: 4_000_000.0,
            max_string_length: 100_000,
        }
    }
}

/// A parsed expression, reusable across evaluations.
///
/// Parsing validates syntax and operator restrictions eagerly, so a
/// `ConditionalNode` can reject a bad condition at workflow-definition time
/// and evaluate the cached AST on every invocation.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    ast: ast::Expr,
}

impl Expression {
    /// Parse and validate an expression. Syntax-only: undefined variables
    /// are context-dependent and reported at evaluation time. The default
    /// expression-length limit applies here too, so an oversized condition
    /// is rejected before it is tokenized.
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        if source.trim().is_empty() {
            return Err(ExpressionError::Empty);
        }
        let max_length = EvalLimits::default().max_expression_length;
        if source.len() > max_length {
            return Err(ExpressionError::LengthLimit {
                length: source.len(),
                limit: max_length,
            });
        }
        let tokens = token::tokenize(source)?;
        let ast = ast::parse(&tokens)?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    /// The original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a variable mapping. The result type is the natural
    /// type of the expression: boolean for conditions, any scalar for
    /// dispatch-style uses.
    pub fn evaluate(
        &self,
        variables: &HashMap<String, Value>,
        limits: &EvalLimits,
    ) -> Result<Value, ExpressionError> {
        if self.source.len() > limits.max_expression_length {
            return Err(ExpressionError::LengthLimit {
                length: self.source.len(),
                limit: limits.max_expression_length,
            });
        }
        eval::eval(&self.ast, variables, limits)
    }
}

/// Validate expression syntax without evaluating it. Intended for
/// workflow-definition time; cheaper than evaluation.
pub fn validate(expression: &str) -> Result<(), ExpressionError> {
    Expression::parse(expression).map(|_| ())
}

/// Parse and evaluate in one step.
pub fn evaluate(
    expression: &str,
    variables: &HashMap<String, Value>,
    limits: &EvalLimits,
) -> Result<Value, ExpressionError> {
    Expression::parse(expression)?.evaluate(variables, limits)
}

/// Truthiness of a JSON value: `null`, `false`, `0`, `""`, `[]` and `{}`
/// are falsy; everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
