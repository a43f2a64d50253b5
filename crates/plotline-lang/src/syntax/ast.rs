use crate::runtime::value::DataType;

/// Source location attached to every node for error reporting.
/// Byte offset + length drive caret rendering; line/column drive messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(offset: usize, len: usize, line: usize, column: usize) -> Self {
        Self { offset, len, line, column }
    }
}

// ─── Top level ───────────────────────────────────────────────────────────────

/// A parsed expression or script: an ordered top-level statement list.
/// In expression mode this is always a single `Stmt::Expr`.
#[derive(Debug, Clone)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `double a = 1.0, b;`
    Decl(Decl),
    /// A standalone expression terminated by `;`.
    Expr(Expr),
    /// `{ ... }`
    Block(Vec<Stmt>, Span),
    /// `if (cond) stmt else stmt`
    If(IfStmt),
    /// `while (cond) stmt`
    While(WhileStmt),
    /// `do stmt while (cond);`
    DoWhile(DoWhileStmt),
    /// `for (init cond; step) stmt`: init is a full statement (decl or expr).
    For(ForStmt),
    Break(Span),
    Continue(Span),
    Return(Option<Expr>, Span),
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub ty: DataType,
    pub vars: Vec<DeclVar>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DeclVar {
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DoWhileStmt {
    pub body: Box<Stmt>,
    pub condition: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Box<Stmt>,
    pub condition: Expr,
    pub step: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    Int(i64, Span),
    Num(f64, Span),
    Ident(String, Span),

    /// `base.step.step`: accessor chain off a variable, resolved by the
    /// host's StepResolver. Read-only.
    Path {
        base: String,
        steps: Vec<PathStep>,
        span: Span,
    },

    /// `a + b`, `a <= b`, `a && b`, `a ^ b`, ...
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },

    /// `-x`, `!x`
    UnOp {
        op: UnOp,
        operand: Box<Expr>,
        span: Span,
    },

    /// `++x`, `x--`, ...: target must be an assignable variable.
    IncDec {
        name: String,
        op: IncDecOp,
        prefix: bool,
        span: Span,
    },

    /// `x = e`, `x += e`, ...: right-associative, yields the stored value.
    Assign {
        name: String,
        op: AssignOp,
        value: Box<Expr>,
        name_span: Span,
        span: Span,
    },

    /// `name(args)`
    Call {
        callee: String,
        args: Vec<Expr>,
        span: Span,
    },
}

#[derive(Debug, Clone)]
pub struct PathStep {
    pub name: String,
    pub span: Span,
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Int(_, s)   => s,
            Expr::Num(_, s)   => s,
            Expr::Ident(_, s) => s,
            Expr::Path { span, .. }   => span,
            Expr::BinOp { span, .. }  => span,
            Expr::UnOp { span, .. }   => span,
            Expr::IncDec { span, .. } => span,
            Expr::Assign { span, .. } => span,
            Expr::Call { span, .. }   => span,
        }
    }
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add, Sub, Mul, Div, Mod, Pow,
    Eq, NotEq,
    Lt, LtEq, Gt, GtEq,
    And, Or,
}

impl BinOp {
    /// The keyword this operator occupies in the dispatch table; also the
    /// name used in runtime diagnostics.
    pub fn keyword(&self) -> &'static str {
        match self {
            BinOp::Add => "+",  BinOp::Sub => "-",
            BinOp::Mul => "*",  BinOp::Div => "/",
            BinOp::Mod => "%",  BinOp::Pow => "^",
            BinOp::Eq  => "==", BinOp::NotEq => "!=",
            BinOp::Lt  => "<",  BinOp::LtEq => "<=",
            BinOp::Gt  => ">",  BinOp::GtEq => ">=",
            BinOp::And => "&&", BinOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnOp {
    Neg,
    Not,
}

impl UnOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IncDecOp {
    Inc,
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssignOp {
    Set,        // =
    Add,        // +=
    Sub,        // -=
    Mul,        // *=
    Div,        // /=
}
