use crate::error::ExprError;
use std::fmt;

///
/// Token
///

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// Field name, derived `$`-property, or named filter. Keywords are
    /// lexed as idents and recognized by the parser case-insensitively.
    Ident(String),
    Int(i64),
    Float(f64),
    Text(String),
    LParen,
    RParen,
    Comma,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "{name}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(t) => write!(f, "'{t}'"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::Comma => write!(f, ","),
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "<>"),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}

/// Split an expression into tokens.
///
/// Names may be quoted with `[...]` or backticks to carry spaces or
/// punctuation; text literals use single quotes with `''` as the escape.
pub fn tokenize(expression: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        match ch {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Eq);
                i += 1;
            }
            '<' => {
                i += 1;
                match chars.get(i) {
                    Some('>') => {
                        tokens.push(Token::Ne);
                        i += 1;
                    }
                    Some('=') => {
                        tokens.push(Token::Le);
                        i += 1;
                    }
                    _ => tokens.push(Token::Lt),
                }
            }
            '>' => {
                i += 1;
                if chars.get(i) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 1;
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '\'' => {
                let (text, next) = read_text(&chars, i)?;
                tokens.push(Token::Text(text));
                i = next;
            }
            '[' => {
                let (name, next) = read_quoted_name(&chars, i, ']')?;
                tokens.push(Token::Ident(name));
                i = next;
            }
            '`' => {
                let (name, next) = read_quoted_name(&chars, i, '`')?;
                tokens.push(Token::Ident(name));
                i = next;
            }
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) =>
            {
                let (token, next) = read_number(&chars, i)?;
                tokens.push(token);
                i = next;
            }
            c if is_name_start(c) => {
                let start = i;
                while i < chars.len() && is_name_part(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            c => return Err(ExprError::UnexpectedChar { ch: c, position: i }),
        }
    }

    Ok(tokens)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_name_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '.'
}

fn read_text(chars: &[char], start: usize) -> Result<(String, usize), ExprError> {
    let mut text = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        if chars[i] == '\'' {
            // '' escapes a single quote inside the literal
            if chars.get(i + 1) == Some(&'\'') {
                text.push('\'');
                i += 2;
                continue;
            }
            return Ok((text, i + 1));
        }
        text.push(chars[i]);
        i += 1;
    }

    Err(ExprError::UnterminatedText { position: start })
}

fn read_quoted_name(
    chars: &[char],
    start: usize,
    close: char,
) -> Result<(String, usize), ExprError> {
    let mut name = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        if chars[i] == close {
            return Ok((name, i + 1));
        }
        name.push(chars[i]);
        i += 1;
    }

    Err(ExprError::UnterminatedName { position: start })
}

fn read_number(chars: &[char], start: usize) -> Result<(Token, usize), ExprError> {
    let mut i = start;
    let mut is_float = false;

    if chars[i] == '-' {
        i += 1;
    }
    while i < chars.len() {
        match chars[i] {
            c if c.is_ascii_digit() => i += 1,
            '.' if !is_float => {
                is_float = true;
                i += 1;
            }
            _ => break,
        }
    }

    let literal: String = chars[start..i].iter().collect();
    let token = if is_float {
        Token::Float(literal.parse().map_err(|_| ExprError::InvalidNumber {
            literal: literal.clone(),
        })?)
    } else {
        Token::Int(literal.parse().map_err(|_| ExprError::InvalidNumber {
            literal: literal.clone(),
        })?)
    };

    Ok((token, i))
}
