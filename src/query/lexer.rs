//! Tokenizer for the query language

use super::ast::CompareOp;
use super::error::QuerySyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    /// Identifier or dotted path, e.g. `license.key`
    Ident(String),
    Str(String),
    Number(f64),
    Op(CompareOp),
    /// `=~`
    RegexOp,
    And,
    Or,
    Not,
    True,
    False,
    Null,
    Contains,
    In,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn keyword(word: &str) -> Option<TokenKind> {
    match word.to_ascii_lowercase().as_str() {
        "and" => Some(TokenKind::And),
        "or" => Some(TokenKind::Or),
        "not" => Some(TokenKind::Not),
        "true" => Some(TokenKind::True),
        "false" => Some(TokenKind::False),
        "null" | "none" => Some(TokenKind::Null),
        "contains" => Some(TokenKind::Contains),
        "in" => Some(TokenKind::In),
        _ => None,
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenize the whole input; the last token is always `Eof`.
    ///
    /// # Errors
    /// Returns `QuerySyntaxError` for unterminated strings, malformed
    /// numbers, and characters that start no token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, QuerySyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: &str, start: usize) -> QuerySyntaxError {
        let end = self.input[start..]
            .char_indices()
            .find(|(i, c)| *i > 0 && c.is_whitespace())
            .map_or(self.input.len(), |(i, _)| start + i);
        QuerySyntaxError::new(message, &self.input[start..end], start)
    }

    fn next_token(&mut self) -> Result<Token, QuerySyntaxError> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(Token { kind: TokenKind::Eof, start, end: start });
        };

        let kind = match c {
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            ',' => self.single(TokenKind::Comma),
            '\'' | '"' => self.string(c)?,
            '=' | '!' | '<' | '>' | '~' | '&' | '|' => self.operator()?,
            '-' if self.peek_second().is_some_and(|n| n.is_ascii_digit() || n == '.') => self.number()?,
            c if c.is_ascii_digit() => self.number()?,
            c if is_ident_start(c) => self.word(),
            _ => return Err(self.error(&format!("unexpected character {c:?}"), start)),
        };

        Ok(Token { kind, start, end: self.pos })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, QuerySyntaxError> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string", start)),
                Some(c) if c == quote => return Ok(TokenKind::Str(value)),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => value.push(other),
                    None => return Err(self.error("unterminated string", start)),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn operator(&mut self) -> Result<TokenKind, QuerySyntaxError> {
        let start = self.pos;
        let rest = &self.input[start..];
        let (kind, len) = if rest.starts_with("==") {
            (TokenKind::Op(CompareOp::Eq), 2)
        } else if rest.starts_with("!=") {
            (TokenKind::Op(CompareOp::Ne), 2)
        } else if rest.starts_with(">=") {
            (TokenKind::Op(CompareOp::Ge), 2)
        } else if rest.starts_with("<=") {
            (TokenKind::Op(CompareOp::Le), 2)
        } else if rest.starts_with("~=") {
            (TokenKind::Op(CompareOp::Fuzzy), 2)
        } else if rest.starts_with("=~") {
            (TokenKind::RegexOp, 2)
        } else if rest.starts_with("&&") {
            (TokenKind::And, 2)
        } else if rest.starts_with("||") {
            (TokenKind::Or, 2)
        } else if rest.starts_with('>') {
            (TokenKind::Op(CompareOp::Gt), 1)
        } else if rest.starts_with('<') {
            (TokenKind::Op(CompareOp::Lt), 1)
        } else if rest.starts_with('!') {
            (TokenKind::Not, 1)
        } else if rest.starts_with('=') {
            return Err(self.error("unexpected '=', use '==' for equality", start));
        } else {
            return Err(self.error("unknown operator", start));
        };
        self.pos += len;
        Ok(kind)
    }

    fn number(&mut self) -> Result<TokenKind, QuerySyntaxError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.bump();
        }
        if self.at_exponent() {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        // `12abc` is neither a number nor an identifier
        if self.peek().is_some_and(is_ident_char) {
            return Err(self.error("invalid number", start));
        }
        self.input[start..self.pos]
            .parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error("invalid number", start))
    }

    /// `e`/`E` followed by digits, optionally signed
    fn at_exponent(&self) -> bool {
        let mut chars = self.input[self.pos..].chars();
        if !matches!(chars.next(), Some('e' | 'E')) {
            return false;
        }
        match chars.next() {
            Some('+' | '-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
            Some(c) => c.is_ascii_digit(),
            None => false,
        }
    }

    fn word(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        let word = &self.input[start..self.pos];
        keyword(word).unwrap_or_else(|| TokenKind::Ident(word.to_string()))
    }
}
