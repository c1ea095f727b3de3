//! Recursive-descent parser
//!
//! Precedence, lowest first: `or`, `and`, `not`, then conditions and
//! parenthesized groups.

use regex::RegexBuilder;

use super::ast::{CompareOp, Expr, FieldPath, Literal};
use super::error::QuerySyntaxError;
use super::lexer::{Lexer, Token, TokenKind};

/// Parse a query string into an expression tree.
///
/// # Errors
/// Returns `QuerySyntaxError` for empty input or any syntax error.
pub fn parse(input: &str) -> Result<Expr, QuerySyntaxError> {
    if input.trim().is_empty() {
        return Err(QuerySyntaxError::new("query is empty", "", 0));
    }
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser { input, tokens, pos: 0 };
    let expr = parser.parse_or()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(parser.error_at("unexpected token", &trailing.clone()));
    }
    Ok(expr)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        // tokenize() always ends with Eof, and advance() never moves past it
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn error_at(&self, message: &str, token: &Token) -> QuerySyntaxError {
        let fragment = if token.kind == TokenKind::Eof {
            "end of query"
        } else {
            &self.input[token.start..token.end]
        };
        QuerySyntaxError::new(message, fragment, token.start)
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<Token, QuerySyntaxError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at(message, &self.peek().clone()))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, QuerySyntaxError> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, QuerySyntaxError> {
        let mut left = self.parse_unary()?;
        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, QuerySyntaxError> {
        if self.check(&TokenKind::Not) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, QuerySyntaxError> {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_or()?;
                self.expect(&TokenKind::RParen, "expected ')'")?;
                Ok(expr)
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                if self.check(&TokenKind::In) {
                    let literal = Literal::Bool(token.kind == TokenKind::True);
                    return self.parse_membership(literal);
                }
                Ok(Expr::Literal(token.kind == TokenKind::True))
            }
            TokenKind::Str(text) => {
                self.advance();
                if self.check(&TokenKind::In) {
                    return self.parse_membership(Literal::String(text.clone()));
                }
                Ok(Expr::Search(text.clone()))
            }
            TokenKind::Number(_) | TokenKind::Null | TokenKind::LBracket => {
                let literal = self.parse_literal()?;
                if !self.check(&TokenKind::In) {
                    return Err(self.error_at("expected 'in' after literal", &self.peek().clone()));
                }
                self.parse_membership(literal)
            }
            TokenKind::Ident(_) => self.parse_condition(),
            TokenKind::Eof => Err(self.error_at("unexpected end of query", &token)),
            _ => Err(self.error_at("expected a condition", &token)),
        }
    }

    /// `literal in path`, with the `in` token still pending
    fn parse_membership(&mut self, literal: Literal) -> Result<Expr, QuerySyntaxError> {
        self.advance();
        let path = self.parse_path()?;
        Ok(Expr::Membership { literal, path })
    }

    fn parse_path(&mut self) -> Result<FieldPath, QuerySyntaxError> {
        let token = self.advance();
        let TokenKind::Ident(name) = &token.kind else {
            return Err(self.error_at("expected a field name", &token));
        };
        let segments: Vec<String> = name.split('.').map(String::from).collect();
        if segments.iter().any(String::is_empty) {
            return Err(self.error_at("empty segment in field path", &token));
        }
        Ok(FieldPath::new(segments))
    }

    fn parse_condition(&mut self) -> Result<Expr, QuerySyntaxError> {
        let path = self.parse_path()?;
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Op(op) => {
                self.advance();
                let literal = self.parse_literal()?;
                Ok(Expr::Comparison { path, op, literal })
            }
            TokenKind::RegexOp => {
                self.advance();
                let pattern_token = self.advance();
                let TokenKind::Str(pattern) = &pattern_token.kind else {
                    return Err(self.error_at("expected a quoted regex after '=~'", &pattern_token));
                };
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        let mut err = self.error_at("invalid regex", &pattern_token);
                        err.message = format!("invalid regex: {e}");
                        err
                    })?;
                Ok(Expr::Regex { path, regex })
            }
            TokenKind::Contains => {
                self.advance();
                let literal = self.parse_literal()?;
                Ok(Expr::Membership { literal, path })
            }
            TokenKind::In => {
                self.advance();
                let literal_token = self.peek().clone();
                let literal = self.parse_literal()?;
                if !matches!(literal, Literal::List(_) | Literal::String(_)) {
                    return Err(self.error_at("expected a list or string after 'in'", &literal_token));
                }
                Ok(Expr::OneOf { path, literal })
            }
            _ => Ok(Expr::Truthy(path)),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, QuerySyntaxError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Str(s) => Ok(Literal::String(s)),
            TokenKind::Number(n) => Ok(Literal::Number(n)),
            TokenKind::True => Ok(Literal::Bool(true)),
            TokenKind::False => Ok(Literal::Bool(false)),
            TokenKind::Null => Ok(Literal::Null),
            TokenKind::LBracket => self.parse_list(),
            // Unquoted words are accepted as strings: `language == Python`
            TokenKind::Ident(word) => Ok(Literal::String(word)),
            _ => Err(self.error_at("expected a value", &token)),
        }
    }

    fn parse_list(&mut self) -> Result<Literal, QuerySyntaxError> {
        let mut items = Vec::new();
        if self.check(&TokenKind::RBracket) {
            self.advance();
            return Ok(Literal::List(items));
        }
        loop {
            items.push(self.parse_literal()?);
            let token = self.advance();
            match token.kind {
                TokenKind::Comma => {}
                TokenKind::RBracket => return Ok(Literal::List(items)),
                _ => return Err(self.error_at("expected ',' or ']' in list", &token)),
            }
        }
    }
}
