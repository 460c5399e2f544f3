//! Recursive-descent parser producing the expression AST.
//!
//! Precedence, loosest to tightest: `or`, `and`, `not`, comparison and
//! membership, additive, multiplicative, unary minus, `**` (right
//! associative). Chained comparisons (`a < b < c`) are not supported.

use super::token::Token;
use super::ExpressionError;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    NotIn,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Value),
    Var(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Len(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

pub(crate) fn parse(tokens: &[Token]) -> Result<Expr, ExpressionError> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    if parser.pos != tokens.len() {
        return Err(ExpressionError::Syntax(format!(
            "unexpected trailing token {:?}",
            tokens[parser.pos]
        )));
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ExpressionError> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(ExpressionError::Syntax(format!(
                "expected {what}, found {tok:?}"
            ))),
            None => Err(ExpressionError::Syntax(format!(
                "expected {what}, found end of expression"
            ))),
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.and_expr()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.not_expr()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.not_expr()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ExpressionError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.not_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ExpressionError> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Ge) => BinOp::Ge,
            Some(Token::In) => BinOp::In,
            Some(Token::Not) => {
                // `not` after an operand is only valid as `not in`
                if self.tokens.get(self.pos + 1) == Some(&Token::In) {
                    self.pos += 1;
                    BinOp::NotIn
                } else {
                    return Err(ExpressionError::Syntax(
                        "expected 'in' after 'not'".into(),
                    ));
                }
            }
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.additive()?;
        // Reject `a < b < c` rather than parse it with surprising meaning.
        if matches!(
            self.peek(),
            Some(
                Token::Eq
                    | Token::Ne
                    | Token::Lt
                    | Token::Gt
                    | Token::Le
                    | Token::Ge
                    | Token::In
            )
        ) {
            return Err(ExpressionError::Syntax(
                "chained comparisons are not supported".into(),
            ));
        }
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn additive(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            let inner = self.unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::DoubleStar) {
            self.pos += 1;
            let exp = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let tok = self
            .advance()
            .ok_or_else(|| ExpressionError::Syntax("unexpected end of expression".into()))?
            .clone();
        match tok {
            Token::Int(n) => Ok(Expr::Literal(Value::from(n))),
            Token::Float(f) => Ok(Expr::Literal(Value::from(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::LParen => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if self.peek() == Some(&Token::RBracket) {
                    self.pos += 1;
                    return Ok(Expr::List(items));
                }
                loop {
                    items.push(self.or_expr()?);
                    match self.advance() {
                        Some(Token::Comma) => {
                            if self.peek() == Some(&Token::RBracket) {
                                self.pos += 1;
                                return Ok(Expr::List(items));
                            }
                        }
                        Some(Token::RBracket) => return Ok(Expr::List(items)),
                        _ => {
                            return Err(ExpressionError::Syntax(
                                "expected ',' or ']' in list literal".into(),
                            ))
                        }
                    }
                }
            }
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    // `len` is the only allow-listed function.
                    if name != "len" {
                        return Err(ExpressionError::Forbidden(format!(
                            "function '{name}' is not allowed (only 'len')"
                        )));
                    }
                    self.pos += 1;
                    let arg = self.or_expr()?;
                    self.expect(&Token::RParen, "')'")?;
                    return Ok(Expr::Len(Box::new(arg)));
                }
                Ok(Expr::Var(name))
            }
            other => Err(ExpressionError::Syntax(format!(
                "unexpected token {other:?}"
            ))),
        }
    }
}
