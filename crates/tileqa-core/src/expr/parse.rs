//! Recursive-descent parser with standard precedence:
//! `OR` < `AND` < `NOT` < comparison.

use crate::{
    error::ExprError,
    expr::{
        ast::{CompareOp, Expr, Operand},
        token::{Token, tokenize},
    },
    value::Value,
};

/// Parse an expression string. Returns `None` for a blank expression
/// (vacuous truth is decided by the caller).
pub fn parse(expression: &str) -> Result<Option<Expr>, ExprError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;

    match parser.peek() {
        None => Ok(Some(expr)),
        Some(token) => Err(ExprError::UnexpectedToken {
            found: token.to_string(),
            expected: Some("end of expression".to_string()),
        }),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ExprError> {
        if self.eat_keyword(keyword) {
            return Ok(());
        }
        Err(self.unexpected(keyword))
    }

    fn expect(&mut self, token: &Token) -> Result<(), ExprError> {
        if self.peek() == Some(token) {
            self.pos += 1;
            return Ok(());
        }
        Err(self.unexpected(&token.to_string()))
    }

    fn unexpected(&self, expected: &str) -> ExprError {
        match self.peek() {
            None => ExprError::UnexpectedEnd,
            Some(token) => ExprError::UnexpectedToken {
                found: token.to_string(),
                expected: Some(expected.to_string()),
            },
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("OR") {
            let right = self.parse_and()?;
            left = left | right;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("AND") {
            let right = self.parse_not()?;
            left = left & right;
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if self.eat_keyword("NOT") {
            return Ok(!self.parse_not()?);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            self.expect(&Token::RParen)?;
            return Ok(inner);
        }

        let operand = self.parse_operand()?;

        match self.peek() {
            Some(Token::Eq) => self.finish_compare(operand, CompareOp::Eq),
            Some(Token::Ne) => self.finish_compare(operand, CompareOp::Ne),
            Some(Token::Lt) => self.finish_compare(operand, CompareOp::Lt),
            Some(Token::Le) => self.finish_compare(operand, CompareOp::Le),
            Some(Token::Gt) => self.finish_compare(operand, CompareOp::Gt),
            Some(Token::Ge) => self.finish_compare(operand, CompareOp::Ge),
            Some(Token::Ident(name)) if name.eq_ignore_ascii_case("IS") => {
                self.pos += 1;
                let negated = self.eat_keyword("NOT");
                self.expect_keyword("NULL")?;
                Ok(Expr::IsNull { operand, negated })
            }
            Some(Token::Ident(name))
                if name.eq_ignore_ascii_case("IN") || name.eq_ignore_ascii_case("NOT") =>
            {
                let negated = self.eat_keyword("NOT");
                self.expect_keyword("IN")?;
                let list = self.parse_value_list()?;
                Ok(Expr::In {
                    operand,
                    list,
                    negated,
                })
            }
            // a bare name is a boolean variable (named filter) reference
            _ => match operand {
                Operand::Var(name) => Ok(Expr::Var(name)),
                Operand::Value(_) => Err(self.unexpected("a comparison operator")),
            },
        }
    }

    fn finish_compare(&mut self, left: Operand, op: CompareOp) -> Result<Expr, ExprError> {
        self.pos += 1;
        let right = self.parse_operand()?;
        Ok(Expr::Compare { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand, ExprError> {
        match self.next() {
            Some(Token::Ident(name)) if name.eq_ignore_ascii_case("TRUE") => {
                Ok(Operand::Value(Value::Bool(true)))
            }
            Some(Token::Ident(name)) if name.eq_ignore_ascii_case("FALSE") => {
                Ok(Operand::Value(Value::Bool(false)))
            }
            Some(Token::Ident(name)) if name.eq_ignore_ascii_case("NULL") => {
                Ok(Operand::Value(Value::Null))
            }
            Some(Token::Ident(name)) => Ok(Operand::Var(name)),
            Some(Token::Int(i)) => Ok(Operand::Value(Value::Int(i))),
            Some(Token::Float(f)) => Ok(Operand::Value(Value::Float(f))),
            Some(Token::Text(t)) => Ok(Operand::Value(Value::Text(t))),
            Some(token) => Err(ExprError::UnexpectedToken {
                found: token.to_string(),
                expected: Some("an operand".to_string()),
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn parse_value_list(&mut self) -> Result<Vec<Value>, ExprError> {
        self.expect(&Token::LParen)?;

        let mut values = Vec::new();
        loop {
            match self.parse_operand()? {
                Operand::Value(value) => values.push(value),
                Operand::Var(name) => {
                    return Err(ExprError::UnexpectedToken {
                        found: name,
                        expected: Some("a literal".to_string()),
                    });
                }
            }

            match self.next() {
                Some(Token::Comma) => {}
                Some(Token::RParen) => return Ok(values),
                Some(token) => {
                    return Err(ExprError::UnexpectedToken {
                        found: token.to_string(),
                        expected: Some("',' or ')'".to_string()),
                    });
                }
                None => return Err(ExprError::UnexpectedEnd),
            }
        }
    }
}
