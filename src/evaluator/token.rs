//! Tokenizer for the expression language.
//!
//! Rejects forbidden constructs (assignment, attribute access, dunder
//! names, statement keywords) as early as possible so they never reach
//! the parser.

use super::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    And,
    Or,
    Not,
    In,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    Percent,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

/// Keywords that would make this a scripting language. All rejected.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "lambda", "def", "import", "from", "exec", "eval", "global", "class", "return", "while",
    "for", "if", "else", "assert", "del", "yield", "with", "raise",
];

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::DoubleStar);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Eq);
                    i += 2;
                } else {
                    return Err(ExpressionError::Forbidden(
                        "assignment is not supported".into(),
                    ));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    return Err(ExpressionError::Syntax(format!(
                        "unexpected character '!' at position {i}"
                    )));
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '\'' | '"' => {
                let (s, next) = read_string(&chars, i, c)?;
                tokens.push(Token::Str(s));
                i = next;
            }
            '.' => {
                return Err(ExpressionError::Forbidden(
                    "attribute access is not supported".into(),
                ));
            }
            _ if c.is_ascii_digit() => {
                let (tok, next) = read_number(&chars, i)?;
                tokens.push(tok);
                i = next;
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(keyword_or_ident(&word)?);
            }
            _ => {
                return Err(ExpressionError::Syntax(format!(
                    "unexpected character '{c}' at position {i}"
                )));
            }
        }
    }

    Ok(tokens)
}

fn keyword_or_ident(word: &str) -> Result<Token, ExpressionError> {
    if word.starts_with("__") {
        return Err(ExpressionError::Forbidden(format!(
            "dunder name '{word}' is not allowed"
        )));
    }
    if FORBIDDEN_KEYWORDS.contains(&word) {
        return Err(ExpressionError::Forbidden(format!(
            "keyword '{word}' is not allowed"
        )));
    }
    Ok(match word {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "in" => Token::In,
        "true" | "True" => Token::True,
        "false" | "False" => Token::False,
        _ => Token::Ident(word.to_string()),
    })
}

fn read_string(
    chars: &[char],
    start: usize,
    quote: char,
) -> Result<(String, usize), ExpressionError> {
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let escaped = chars.get(i + 1).ok_or_else(|| {
                    ExpressionError::Syntax("unterminated escape sequence".into())
                })?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    c => *c,
                });
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(ExpressionError::Syntax(format!(
        "unterminated string literal starting at position {start}"
    )))
}

fn read_number(chars: &[char], start: usize) -> Result<(Token, usize), ExpressionError> {
    let mut i = start;
    let mut is_float = false;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    // A '.' is only part of a number when followed by a digit; a bare dot
    // would be attribute access, which the '.' arm above already rejects.
    if i < chars.len() && chars[i] == '.' {
        if chars.get(i + 1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
            is_float = true;
            i += 1;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        } else {
            return Err(ExpressionError::Forbidden(
                "attribute access is not supported".into(),
            ));
        }
    }
    let text: String = chars[start..i].iter().collect();
    let tok = if is_float {
        Token::Float(
            text.parse::<f64>()
                .map_err(|e| ExpressionError::Syntax(format!("invalid number '{text}': {e}")))?,
        )
    } else {
        Token::Int(
            text.parse::<i64>()
                .map_err(|e| ExpressionError::Syntax(format!("invalid number '{text}': {e}")))?,
        )
    };
    Ok((tok, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_comparison() {
        let toks = tokenize("x >= 10").unwrap();
        assert_eq!(
            toks,
            vec![Token::Ident("x".into()), Token::Ge, Token::Int(10)]
        );
    }

    #[test]
    fn test_tokenize_string_quotes() {
        assert_eq!(
            tokenize("'it\\'s'").unwrap(),
            vec![Token::Str("it's".into())]
        );
        assert_eq!(tokenize("\"hi\"").unwrap(), vec![Token::Str("hi".into())]);
    }

    #[test]
    fn test_tokenize_float_and_int() {
        assert_eq!(
            tokenize("3.14 2").unwrap(),
            vec![Token::Float(3.14), Token::Int(2)]
        );
    }

    #[test]
    fn test_tokenize_power() {
        assert_eq!(
            tokenize("2 ** 3").unwrap(),
            vec![Token::Int(2), Token::DoubleStar, Token::Int(3)]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokenize("a and not b").unwrap(),
            vec![
                Token::Ident("a".into()),
                Token::And,
                Token::Not,
                Token::Ident("b".into())
            ]
        );
        assert_eq!(tokenize("True False").unwrap(), vec![Token::True, Token::False]);
    }

    #[test]
    fn test_forbidden_assignment() {
        assert!(matches!(
            tokenize("x = 1"),
            Err(ExpressionError::Forbidden(_))
        ));
    }

    #[test]
    fn test_forbidden_attribute_access() {
        assert!(matches!(
            tokenize("obj.attr"),
            Err(ExpressionError::Forbidden(_))
        ));
    }

    #[test]
    fn test_forbidden_keywords_and_dunders() {
        for src in ["import os", "lambda x", "__builtins__", "def f"] {
            assert!(matches!(tokenize(src), Err(ExpressionError::Forbidden(_))), "{src}");
        }
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(tokenize("'abc"), Err(ExpressionError::Syntax(_))));
    }
}
