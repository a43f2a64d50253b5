use thiserror::Error as ThisError;

use crate::syntax::ast::Span;

/// Error codes prefixed by phase: L = lexer, P = parser, S = resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character

    // Parser
    P001, // unexpected token / malformed construct
    P002, // missing expected token

    // Resolver
    S001, // undefined symbol
    S002, // argument type mismatch
    S003, // redeclaration in same scope
    S004, // assignment to read-only target
    S007, // wrong number of arguments
    S008, // argument must be an assignable variable
    S009, // unknown accessor step
    S010, // not callable
    S011, // break/continue outside of a loop
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::P001 => "P001",
            Self::P002 => "P002",
            Self::S001 => "S001",
            Self::S002 => "S002",
            Self::S003 => "S003",
            Self::S004 => "S004",
            Self::S007 => "S007",
            Self::S008 => "S008",
            Self::S009 => "S009",
            Self::S010 => "S010",
            Self::S011 => "S011",
        }
    }
}

/// Build-time error. `span` underlines the offending token; `secondary`
/// optionally marks the enclosing function call for argument errors.
#[derive(Debug, Clone, ThisError)]
#[error("[{}] {}:{}: {message}", code.as_str(), span.line, span.column)]
pub struct Error {
    pub code: ErrorCode,
    pub span: Span,
    pub secondary: Option<Span>,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, span: Span, message: impl Into<String>) -> Self {
        Self { code, span, secondary: None, message: message.into() }
    }

    pub fn with_secondary(mut self, span: Span) -> Self {
        self.secondary = Some(span);
        self
    }

    /// Render the source line with the offending span underlined by carets
    /// (and the secondary span, if any, underlined by tildes on the same line).
    pub fn annotate(&self, source: &str) -> String {
        let offset = self.span.offset.min(source.len());
        let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
        let line_end = source[offset..].find('\n').map_or(source.len(), |i| offset + i);
        let line = &source[line_start..line_end];

        let mut marks = vec![b' '; line.len().max(offset - line_start + self.span.len)];
        if let Some(sec) = &self.secondary {
            if sec.offset >= line_start && sec.offset <= line_end {
                let from = sec.offset - line_start;
                for m in marks.iter_mut().skip(from).take(sec.len.max(1)) {
                    *m = b'~';
                }
            }
        }
        let from = offset - line_start;
        for m in marks.iter_mut().skip(from).take(self.span.len.max(1)) {
            *m = b'^';
        }
        let marks = String::from_utf8(marks).unwrap_or_default();

        format!("{self}\n{line}\n{}", marks.trim_end())
    }
}

// ─────────────────────────────────────────────────────────────────────────────

/// Execution-time failure. The program structure stays intact; the engine
/// can run the same program again after one of these.
#[derive(Debug, Clone, ThisError)]
#[error("[runtime] line {line}: {message}")]
pub struct RuntimeError {
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotate_underlines_span() {
        let src = "1 + foo(2)";
        let e = Error::new(ErrorCode::S001, Span::new(4, 3, 1, 5), "undefined function `foo`");
        let out = e.annotate(src);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "1 + foo(2)");
        assert_eq!(lines[2], "    ^^^");
    }

    #[test]
    fn annotate_marks_secondary() {
        let src = "sin(1, 2)";
        let e = Error::new(ErrorCode::S007, Span::new(7, 1, 1, 8), "too many arguments")
            .with_secondary(Span::new(0, 3, 1, 1));
        let out = e.annotate(src);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[2], "~~~    ^");
    }
}
