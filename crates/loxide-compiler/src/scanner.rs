use crate::token::{Token, TokenKind};

/// Pull-based scanner for Lox source text.
///
/// Tokens borrow their lexemes from the source. Lexical errors are returned
/// as [`TokenKind::Error`] tokens carrying the message, so the scanner itself
/// never fails.
pub struct Scanner<'src> {
    source: &'src str,
    start: usize,
    current: usize,
    line: u32,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Scanner {
            source,
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scan the next token. Returns `Eof` forever once the input is exhausted.
    pub fn scan_token(&mut self) -> Token<'src> {
        self.skip_whitespace();
        self.start = self.current;

        let Some(c) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        if is_alpha(c) {
            return self.identifier();
        }
        if c.is_ascii_digit() {
            return self.number();
        }

        use TokenKind::*;
        match c {
            b'(' => self.make_token(LeftParen),
            b')' => self.make_token(RightParen),
            b'{' => self.make_token(LeftBrace),
            b'}' => self.make_token(RightBrace),
            b';' => self.make_token(Semicolon),
            b',' => self.make_token(Comma),
            b'.' => self.make_token(Dot),
            b'-' => self.make_token(Minus),
            b'+' => self.make_token(Plus),
            b'/' => self.make_token(Slash),
            b'*' => self.make_token(Star),
            b'!' => self.two_char(b'=', BangEqual, Bang),
            b'=' => self.two_char(b'=', EqualEqual, Equal),
            b'<' => self.two_char(b'=', LessEqual, Less),
            b'>' => self.two_char(b'=', GreaterEqual, Greater),
            b'"' => self.string(),
            _ => {
                // Consume the rest of a multi-byte character.
                while self.peek().is_some_and(|b| b & 0xC0 == 0x80) {
                    self.current += 1;
                }
                self.error_token("Unexpected character.")
            }
        }
    }

    // ---- Character helpers ----

    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.current).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.source.as_bytes().get(self.current + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.current += 1;
        Some(c)
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                b' ' | b'\r' | b'\t' => self.current += 1,
                b'\n' => {
                    self.line += 1;
                    self.current += 1;
                }
                b'/' if self.peek_next() == Some(b'/') => {
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.current += 1;
                    }
                }
                _ => return,
            }
        }
    }

    // ---- Token builders ----

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            lexeme: &self.source[self.start..self.current],
            line: self.line,
        }
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token {
            kind: TokenKind::Error,
            lexeme: message,
            line: self.line,
        }
    }

    fn two_char(&mut self, second: u8, matched: TokenKind, single: TokenKind) -> Token<'src> {
        let kind = if self.matches(second) { matched } else { single };
        self.make_token(kind)
    }

    fn identifier(&mut self) -> Token<'src> {
        while self.peek().is_some_and(|c| is_alpha(c) || c.is_ascii_digit()) {
            self.current += 1;
        }
        let text = &self.source[self.start..self.current];
        self.make_token(TokenKind::keyword(text).unwrap_or(TokenKind::Identifier))
    }

    fn number(&mut self) -> Token<'src> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.current += 1;
        }
        // A fractional part needs at least one digit after the dot.
        if self.peek() == Some(b'.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.current += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.current += 1;
            }
        }
        self.make_token(TokenKind::Number)
    }

    fn string(&mut self) -> Token<'src> {
        while let Some(c) = self.peek() {
            if c == b'"' {
                break;
            }
            if c == b'\n' {
                self.line += 1;
            }
            self.current += 1;
        }
        if self.peek().is_none() {
            return self.error_token("Unterminated string.");
        }
        // Closing quote.
        self.current += 1;
        self.make_token(TokenKind::String)
    }
}

impl<'src> Iterator for Scanner<'src> {
    type Item = Token<'src>;

    /// Yields tokens up to but not including `Eof`.
    fn next(&mut self) -> Option<Token<'src>> {
        let token = self.scan_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}
