use crate::syntax::ast::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals: exponent forms always lex as Num, even when integral
    Int(i64),
    Num(f64),
    Ident(String),

    // Type keywords
    TInt,
    TDouble,

    // Control keywords
    If,
    Else,
    For,
    Do,
    While,
    Break,
    Continue,
    Return,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Caret,      // ^
    Bang,       // !
    Eq,         // =
    EqEq,       // ==
    BangEq,     // != or <>
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    AndAnd,     // &&
    OrOr,       // ||
    PlusEq,     // +=   (script mode only)
    MinusEq,    // -=   (script mode only)
    StarEq,     // *=   (script mode only)
    SlashEq,    // /=   (script mode only)
    PlusPlus,   // ++   (script mode only)
    MinusMinus, // --   (script mode only)

    // Punctuation
    Colon,      // :
    Comma,      // ,
    Semicolon,  // ;
    Dot,        // .
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    LBracket,   // [
    RBracket,   // ]

    Eof,
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Num(_))
    }

    pub fn is_type_keyword(&self) -> bool {
        matches!(self, Self::TInt | Self::TDouble)
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::If | Self::Else | Self::For | Self::Do | Self::While
            | Self::Break | Self::Continue | Self::Return
        )
    }

    pub fn is_assign_op(&self) -> bool {
        matches!(self, Self::Eq | Self::PlusEq | Self::MinusEq | Self::StarEq | Self::SlashEq)
    }
}

/// Maps an identifier string to its keyword token, or returns `Ident`.
/// Literal constants (`true`, `Pi`, ...) stay identifiers; the resolver
/// classifies them against the constant table.
pub fn keyword_or_ident(s: String) -> TokenKind {
    match s.as_str() {
        "int"      => TokenKind::TInt,
        "double"   => TokenKind::TDouble,
        "if"       => TokenKind::If,
        "else"     => TokenKind::Else,
        "for"      => TokenKind::For,
        "do"       => TokenKind::Do,
        "while"    => TokenKind::While,
        "break"    => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "return"   => TokenKind::Return,
        _          => TokenKind::Ident(s),
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
