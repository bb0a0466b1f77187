/// All Lox token kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // --- Single-char punctuation ---
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // --- One or two char operators ---
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // --- Literals ---
    Identifier,
    String,
    Number,

    // --- Keywords ---
    And,
    Class,
    Del,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    /// Lexical error; the token's lexeme is the message.
    Error,
    Eof,
}

impl TokenKind {
    /// Keyword for an identifier-shaped lexeme, if it is one.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        use TokenKind::*;
        let kind = match text {
            "and" => And,
            "class" => Class,
            "del" => Del,
            "else" => Else,
            "false" => False,
            "for" => For,
            "fun" => Fun,
            "if" => If,
            "nil" => Nil,
            "or" => Or,
            "print" => Print,
            "return" => Return,
            "super" => Super,
            "this" => This,
            "true" => True,
            "var" => Var,
            "while" => While,
            _ => return None,
        };
        Some(kind)
    }

    /// Tokens that begin a statement; error recovery stops in front of them.
    pub fn starts_statement(self) -> bool {
        use TokenKind::*;
        matches!(self, Class | Fun | Var | For | If | While | Print | Return)
    }
}

/// A token borrowed from the source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    /// Source text of the token, or the message for [`TokenKind::Error`].
    pub lexeme: &'src str,
    pub line: u32,
}
