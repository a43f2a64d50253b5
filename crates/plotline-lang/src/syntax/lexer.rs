use crate::Mode;
use crate::error::{Error, ErrorCode};
use crate::syntax::ast::Span;
use crate::syntax::token::{Token, TokenKind, keyword_or_ident};

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    mode: Mode,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, mode: Mode) -> Self {
        Self { source: source.as_bytes(), pos: 0, line: 1, column: 1, mode }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<Error>> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, self.span_here(0)));
                break;
            }

            let start = self.pos;
            let line = self.line;
            let column = self.column;
            match self.next_token() {
                Ok(kind) => {
                    let span = Span::new(start, self.pos - start, line, column);
                    tokens.push(Token::new(kind, span));
                }
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() { Ok(tokens) } else { Err(errors) }
    }

    fn next_token(&mut self) -> Result<TokenKind, Error> {
        let start = self.pos;
        let line = self.line;
        let column = self.column;
        let ch = self.advance();

        let kind = match ch {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            b'%' => TokenKind::Percent,
            b'^' => TokenKind::Caret,

            b'+' => {
                if self.script() && self.peek() == b'+' { self.advance(); TokenKind::PlusPlus }
                else if self.script() && self.peek() == b'=' { self.advance(); TokenKind::PlusEq }
                else { TokenKind::Plus }
            }
            b'-' => {
                if self.script() && self.peek() == b'-' { self.advance(); TokenKind::MinusMinus }
                else if self.script() && self.peek() == b'=' { self.advance(); TokenKind::MinusEq }
                else { TokenKind::Minus }
            }
            b'*' => {
                if self.script() && self.peek() == b'=' { self.advance(); TokenKind::StarEq }
                else { TokenKind::Star }
            }
            b'/' => {
                if self.script() && self.peek() == b'=' { self.advance(); TokenKind::SlashEq }
                else { TokenKind::Slash }
            }
            b'=' => {
                if self.peek() == b'=' { self.advance(); TokenKind::EqEq }
                else { TokenKind::Eq }
            }
            b'!' => {
                if self.peek() == b'=' { self.advance(); TokenKind::BangEq }
                else { TokenKind::Bang }
            }
            b'<' => {
                if self.peek() == b'=' { self.advance(); TokenKind::LtEq }
                else if self.peek() == b'>' { self.advance(); TokenKind::BangEq }
                else { TokenKind::Lt }
            }
            b'>' => {
                if self.peek() == b'=' { self.advance(); TokenKind::GtEq }
                else { TokenKind::Gt }
            }
            b'&' => {
                if self.peek() == b'&' { self.advance(); TokenKind::AndAnd }
                else {
                    return Err(self.err_at(start, 1, line, column, "expected `&&`, bare `&` is not valid"));
                }
            }
            b'|' => {
                if self.peek() == b'|' { self.advance(); TokenKind::OrOr }
                else {
                    return Err(self.err_at(start, 1, line, column, "expected `||`, bare `|` is not valid"));
                }
            }

            // `.5` is a numeric literal; `.name` is an accessor step;
            // a lone `.` is left for the parser to reject.
            b'.' => {
                if self.peek().is_ascii_digit() { self.read_number(ch) }
                else { TokenKind::Dot }
            }
            b'0'..=b'9' => self.read_number(ch),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => keyword_or_ident(self.read_ident(ch)),

            other => {
                return Err(self.err_at(start, 1, line, column,
                    format!("unexpected character `{}`", other as char)));
            }
        };

        Ok(kind)
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn script(&self) -> bool {
        self.mode == Mode::Script
    }

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == b'\n' { self.line += 1; self.column = 1; }
        else { self.column += 1; }
        ch
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() { 0 } else { self.source[self.pos] }
    }

    fn peek_next(&self) -> u8 {
        if self.pos + 1 >= self.source.len() { 0 } else { self.source[self.pos + 1] }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => { self.advance(); }
                _ => break,
            }
        }
    }

    fn span_here(&self, len: usize) -> Span {
        Span::new(self.pos, len, self.line, self.column)
    }

    fn err_at(&self, offset: usize, len: usize, line: usize, column: usize, msg: impl Into<String>) -> Error {
        Error::new(ErrorCode::L001, Span::new(offset, len, line, column), msg)
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    /// Maximal numeric literal: at most one `.`, at most one exponent marker
    /// with an optional sign directly after it. Int iff no `.` and no
    /// exponent; exponent forms are always Num.
    fn read_number(&mut self, first: u8) -> TokenKind {
        let mut s = String::new();
        s.push(first as char);
        let mut seen_dot = first == b'.';
        let mut seen_exp = false;

        while !self.is_at_end() && self.peek().is_ascii_digit() {
            s.push(self.advance() as char);
        }
        if !seen_dot && self.peek() == b'.' && !self.peek_next().is_ascii_alphabetic() {
            seen_dot = true;
            s.push(self.advance() as char);
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                s.push(self.advance() as char);
            }
        }
        if matches!(self.peek(), b'e' | b'E') {
            let signed = matches!(self.peek_next(), b'+' | b'-');
            let exp_digit = if signed {
                self.pos + 2 < self.source.len() && self.source[self.pos + 2].is_ascii_digit()
            } else {
                self.peek_next().is_ascii_digit()
            };
            if exp_digit {
                seen_exp = true;
                s.push(self.advance() as char); // e/E
                if signed { s.push(self.advance() as char); }
                while !self.is_at_end() && self.peek().is_ascii_digit() {
                    s.push(self.advance() as char);
                }
            }
        }

        if !seen_dot && !seen_exp {
            match s.parse::<i64>() {
                Ok(v) => TokenKind::Int(v),
                // out of i64 range; degrade to a double literal
                Err(_) => TokenKind::Num(s.parse().unwrap_or(0.0)),
            }
        } else {
            TokenKind::Num(s.parse().unwrap_or(0.0))
        }
    }

    fn read_ident(&mut self, first: u8) -> String {
        let mut s = String::new();
        s.push(first as char);
        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == b'_') {
            s.push(self.advance() as char);
        }
        s
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, Mode::Script).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn lex_expr(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, Mode::Expression).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty() {
        assert_eq!(lex(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn integer_literal() {
        assert_eq!(lex("42"), vec![TokenKind::Int(42), TokenKind::Eof]);
    }

    #[test]
    fn double_literal() {
        assert_eq!(lex("3.14"), vec![TokenKind::Num(3.14), TokenKind::Eof]);
    }

    #[test]
    fn leading_dot_literal() {
        assert_eq!(lex(".5"), vec![TokenKind::Num(0.5), TokenKind::Eof]);
    }

    #[test]
    fn exponent_is_always_double() {
        assert_eq!(lex("1e3"),    vec![TokenKind::Num(1000.0), TokenKind::Eof]);
        assert_eq!(lex("2E+2"),   vec![TokenKind::Num(200.0), TokenKind::Eof]);
        assert_eq!(lex("1.5e-1"), vec![TokenKind::Num(0.15), TokenKind::Eof]);
    }

    #[test]
    fn bare_exponent_marker_is_ident() {
        // `2e`: no exponent digits, so `e` lexes as a separate identifier
        assert_eq!(lex("2e"), vec![TokenKind::Int(2), TokenKind::Ident("e".into()), TokenKind::Eof]);
    }

    #[test]
    fn dot_before_alpha_is_step() {
        assert_eq!(
            lex("s.x"),
            vec![TokenKind::Ident("s".into()), TokenKind::Dot, TokenKind::Ident("x".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn keywords() {
        assert_eq!(lex("if"),       vec![TokenKind::If,       TokenKind::Eof]);
        assert_eq!(lex("do"),       vec![TokenKind::Do,       TokenKind::Eof]);
        assert_eq!(lex("while"),    vec![TokenKind::While,    TokenKind::Eof]);
        assert_eq!(lex("break"),    vec![TokenKind::Break,    TokenKind::Eof]);
        assert_eq!(lex("continue"), vec![TokenKind::Continue, TokenKind::Eof]);
        assert_eq!(lex("return"),   vec![TokenKind::Return,   TokenKind::Eof]);
    }

    #[test]
    fn type_keywords() {
        assert_eq!(lex("int"),    vec![TokenKind::TInt,    TokenKind::Eof]);
        assert_eq!(lex("double"), vec![TokenKind::TDouble, TokenKind::Eof]);
    }

    #[test]
    fn constants_stay_idents() {
        assert_eq!(lex("Pi"),   vec![TokenKind::Ident("Pi".into()),   TokenKind::Eof]);
        assert_eq!(lex("true"), vec![TokenKind::Ident("true".into()), TokenKind::Eof]);
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(lex("=="), vec![TokenKind::EqEq,   TokenKind::Eof]);
        assert_eq!(lex("!="), vec![TokenKind::BangEq, TokenKind::Eof]);
        assert_eq!(lex("<>"), vec![TokenKind::BangEq, TokenKind::Eof]);
        assert_eq!(lex("<="), vec![TokenKind::LtEq,   TokenKind::Eof]);
        assert_eq!(lex(">="), vec![TokenKind::GtEq,   TokenKind::Eof]);
        assert_eq!(lex("&&"), vec![TokenKind::AndAnd, TokenKind::Eof]);
        assert_eq!(lex("||"), vec![TokenKind::OrOr,   TokenKind::Eof]);
    }

    #[test]
    fn script_only_operators() {
        assert_eq!(lex("+="), vec![TokenKind::PlusEq,     TokenKind::Eof]);
        assert_eq!(lex("++"), vec![TokenKind::PlusPlus,   TokenKind::Eof]);
        assert_eq!(lex("--"), vec![TokenKind::MinusMinus, TokenKind::Eof]);
    }

    #[test]
    fn expression_mode_splits_compound_operators() {
        assert_eq!(lex_expr("+="), vec![TokenKind::Plus, TokenKind::Eq, TokenKind::Eof]);
        assert_eq!(lex_expr("++"), vec![TokenKind::Plus, TokenKind::Plus, TokenKind::Eof]);
    }

    #[test]
    fn bare_bang_is_not() {
        assert_eq!(lex("!x"), vec![TokenKind::Bang, TokenKind::Ident("x".into()), TokenKind::Eof]);
    }

    #[test]
    fn bare_ampersand_error() {
        let errs = Lexer::new("&", Mode::Script).tokenize().unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::L001);
    }

    #[test]
    fn unexpected_character_error() {
        let errs = Lexer::new("@", Mode::Script).tokenize().unwrap_err();
        assert_eq!(errs[0].code, ErrorCode::L001);
    }

    #[test]
    fn span_tracking() {
        let tokens = Lexer::new("a\nbb", Mode::Script).tokenize().unwrap();
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (2, 1));
        assert_eq!((tokens[1].span.offset, tokens[1].span.len), (2, 2));
    }

    #[test]
    fn declaration() {
        assert_eq!(
            lex("double x = 3.14;"),
            vec![
                TokenKind::TDouble,
                TokenKind::Ident("x".into()),
                TokenKind::Eq,
                TokenKind::Num(3.14),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }
}
