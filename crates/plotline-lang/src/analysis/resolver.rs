//! Static resolution pass over the parsed tree.
//!
//! One walk does scope checking, static typing, and call validation against
//! the dispatch table's argument specs. Free variables auto-declare as
//! global doubles when the compile options allow it; the list of
//! auto-declared names is the pass's output so the engine can seed storage
//! for them.

use crate::CompileOptions;
use crate::analysis::symbols::{Symbol, SymbolTable};
use crate::builtins::{ArgInfo, FunctionTable, SpecMismatch, constant};
use crate::error::{Error, ErrorCode};
use crate::runtime::value::DataType;
use crate::steps::StepResolver;
use crate::syntax::ast::{BinOp, Expr, Program, Span, Stmt, UnOp};

pub struct Resolver<'a> {
    table: SymbolTable,
    fns: &'a FunctionTable,
    steps: &'a dyn StepResolver,
    opts: &'a CompileOptions,
    loop_depth: usize,
    autos: Vec<(String, DataType)>,
    errors: Vec<Error>,
}

/// Returns the auto-declared global variables on success.
pub fn resolve(
    program: &Program,
    opts: &CompileOptions,
    fns: &FunctionTable,
    steps: &dyn StepResolver,
) -> Result<Vec<(String, DataType)>, Vec<Error>> {
    let mut r = Resolver {
        table: SymbolTable::new(),
        fns,
        steps,
        opts,
        loop_depth: 0,
        autos: Vec::new(),
        errors: Vec::new(),
    };
    for stmt in &program.stmts {
        r.resolve_stmt(stmt);
    }
    if r.errors.is_empty() { Ok(r.autos) } else { Err(r.errors) }
}

impl Resolver<'_> {
    // ─── Statements ──────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(decl) => {
                for var in &decl.vars {
                    if let Some(init) = &var.init {
                        self.resolve_expr(init);
                    }
                    let ok = self.table.declare(Symbol {
                        name: var.name.clone(),
                        ty: decl.ty,
                        span: var.span.clone(),
                    });
                    if !ok {
                        self.error(
                            ErrorCode::S003,
                            var.span.clone(),
                            format!("`{}` is already declared in this scope", var.name),
                        );
                    }
                }
            }
            Stmt::Expr(expr) => {
                self.resolve_expr(expr);
            }
            Stmt::Block(stmts, _) => {
                self.table.push();
                for s in stmts {
                    self.resolve_stmt(s);
                }
                self.table.pop();
            }
            Stmt::If(s) => {
                self.resolve_expr(&s.condition);
                self.resolve_stmt(&s.then_branch);
                if let Some(e) = &s.else_branch {
                    self.resolve_stmt(e);
                }
            }
            Stmt::While(s) => {
                self.resolve_expr(&s.condition);
                self.resolve_loop_body(&s.body);
            }
            Stmt::DoWhile(s) => {
                self.resolve_loop_body(&s.body);
                self.resolve_expr(&s.condition);
            }
            Stmt::For(s) => {
                // the initializer's declarations belong to the loop
                self.table.push();
                self.resolve_stmt(&s.init);
                self.resolve_expr(&s.condition);
                self.resolve_expr(&s.step);
                self.resolve_loop_body(&s.body);
                self.table.pop();
            }
            Stmt::Break(span) | Stmt::Continue(span) => {
                if self.loop_depth == 0 {
                    let what = if matches!(stmt, Stmt::Break(_)) { "break" } else { "continue" };
                    self.error(
                        ErrorCode::S011,
                        span.clone(),
                        format!("`{what}` outside of a loop"),
                    );
                }
            }
            Stmt::Return(value, _) => {
                if let Some(v) = value {
                    self.resolve_expr(v);
                }
            }
        }
    }

    /// A loop body is its own scope even without braces, so a declaration
    /// inside it never outlives the loop.
    fn resolve_loop_body(&mut self, body: &Stmt) {
        self.table.push();
        self.loop_depth += 1;
        self.resolve_stmt(body);
        self.loop_depth -= 1;
        self.table.pop();
    }

    // ─── Expressions ─────────────────────────────────────────────────────────

    /// Resolve an expression and report its static type. On an error the
    /// pass keeps going with `Double` so one mistake doesn't cascade.
    fn resolve_expr(&mut self, expr: &Expr) -> DataType {
        match expr {
            Expr::Int(..) => DataType::Int,
            Expr::Num(..) => DataType::Double,

            Expr::Ident(name, span) => self.resolve_name(name, span),

            Expr::Path { base, steps, span } => {
                let mut ty = match self.table.lookup(base) {
                    Some(sym) => sym.ty,
                    None => {
                        self.error(
                            ErrorCode::S001,
                            span.clone(),
                            format!("undefined variable `{base}`"),
                        );
                        return DataType::Double;
                    }
                };
                for step in steps {
                    match self.steps.resolve(ty, &step.name) {
                        Some(next) => ty = next,
                        None => {
                            self.error(
                                ErrorCode::S009,
                                step.span.clone(),
                                format!("`{}` has no accessor `{}`", ty.name(), step.name),
                            );
                            return DataType::Double;
                        }
                    }
                }
                ty
            }

            Expr::UnOp { op, operand, .. } => {
                let ty = self.resolve_expr(operand);
                match op {
                    UnOp::Neg => ty,
                    UnOp::Not => DataType::Int,
                }
            }

            Expr::BinOp { left, op, right, .. } => {
                let lt = self.resolve_expr(left);
                let rt = self.resolve_expr(right);
                static_binop_type(*op, lt, rt)
            }

            Expr::IncDec { name, span, .. } => self.resolve_mutable(name, span),

            Expr::Assign { name, value, name_span, .. } => {
                self.resolve_expr(value);
                self.resolve_mutable(name, name_span)
            }

            Expr::Call { callee, args, span } => self.resolve_call(callee, args, span),
        }
    }

    /// A bare identifier: declared variable, named constant, or (when
    /// enabled) a fresh auto-declared global double.
    fn resolve_name(&mut self, name: &str, span: &Span) -> DataType {
        if let Some(sym) = self.table.lookup(name) {
            return sym.ty;
        }
        if let Some(v) = constant(name, self.opts.extended_constants) {
            return v.data_type();
        }
        if self.opts.auto_declare {
            return self.auto_declare(name, span);
        }
        self.error(ErrorCode::S001, span.clone(), format!("undefined variable `{name}`"));
        DataType::Double
    }

    /// An identifier about to be written through (`=`, `+=`, `++`, ...).
    /// Declared variables are always writable here; read-only protection is
    /// a runtime property of host-bound slots.
    fn resolve_mutable(&mut self, name: &str, span: &Span) -> DataType {
        if let Some(sym) = self.table.lookup(name) {
            return sym.ty;
        }
        if constant(name, self.opts.extended_constants).is_some() {
            self.error(
                ErrorCode::S004,
                span.clone(),
                format!("cannot assign to constant `{name}`"),
            );
            return DataType::Double;
        }
        if self.opts.auto_declare {
            return self.auto_declare(name, span);
        }
        self.error(ErrorCode::S001, span.clone(), format!("undefined variable `{name}`"));
        DataType::Double
    }

    fn auto_declare(&mut self, name: &str, span: &Span) -> DataType {
        self.table.declare_global(Symbol {
            name: name.to_string(),
            ty: DataType::Double,
            span: span.clone(),
        });
        if !self.autos.iter().any(|(n, _)| n == name) {
            self.autos.push((name.to_string(), DataType::Double));
        }
        DataType::Double
    }

    fn resolve_call(&mut self, callee: &str, args: &[Expr], span: &Span) -> DataType {
        let infos: Vec<ArgInfo> = args
            .iter()
            .map(|arg| ArgInfo {
                ty: self.resolve_expr(arg),
                assignable: self.is_assignable(arg),
            })
            .collect();

        let Some(entry) = self.fns.lookup(callee) else {
            if self.table.lookup(callee).is_some() {
                self.error(
                    ErrorCode::S010,
                    span.clone(),
                    format!("`{callee}` is not callable"),
                );
            } else {
                self.error(
                    ErrorCode::S001,
                    span.clone(),
                    format!("undefined function `{callee}`"),
                );
            }
            return DataType::Double;
        };

        if let Err(mismatch) = crate::builtins::validate_args(entry.spec, &infos) {
            let (code, at) = match &mismatch {
                SpecMismatch::TooFew { .. } | SpecMismatch::TooMany { .. } => {
                    (ErrorCode::S007, span.clone())
                }
                SpecMismatch::WrongType { index, .. } => {
                    (ErrorCode::S002, arg_span(args, *index, span))
                }
                SpecMismatch::NotAssignable { index } => {
                    (ErrorCode::S008, arg_span(args, *index, span))
                }
            };
            let err = Error::new(code, at, mismatch.describe(entry.keyword))
                .with_secondary(span.clone());
            self.errors.push(err);
        }
        entry.ret
    }

    fn is_assignable(&self, arg: &Expr) -> bool {
        match arg {
            Expr::Ident(name, _) => {
                self.table.lookup(name).is_some()
            }
            _ => false,
        }
    }

    fn error(&mut self, code: ErrorCode, span: Span, message: String) {
        self.errors.push(Error::new(code, span, message));
    }
}

fn arg_span(args: &[Expr], index: usize, fallback: &Span) -> Span {
    args.get(index).map_or_else(|| fallback.clone(), |a| a.span().clone())
}

/// The static result type of a binary operator. Division and power always
/// produce doubles; the rest stay integral only when both sides are.
fn static_binop_type(op: BinOp, lt: DataType, rt: DataType) -> DataType {
    match op {
        BinOp::Div | BinOp::Pow => DataType::Double,
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Mod => {
            if lt == DataType::Int && rt == DataType::Int {
                DataType::Int
            } else {
                DataType::Double
            }
        }
        BinOp::Eq | BinOp::NotEq
        | BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq
        | BinOp::And | BinOp::Or => DataType::Int,
    }
}
