//! Tree-walking evaluator.
//!
//! Control flow is threaded as an explicit `Flow` result rather than flags:
//! every statement reports whether execution continues normally (carrying
//! the statement's value) or is unwinding through `break`, `continue`, or
//! `return`. Loops intercept the first two; `return` propagates to the top.
//!
//! The resolver has already validated names, arity, and argument types, so
//! runtime errors here are value-level only (unsupported operand pairs,
//! accessor reads, the optional loop guard).

use std::collections::HashMap;

use crate::builtins::{ExecState, FunctionTable, constant};
use crate::error::RuntimeError;
use crate::runtime::value::{DataType, Value};
use crate::steps::StepResolver;
use crate::syntax::ast::{
    AssignOp, DoWhileStmt, Expr, ForStmt, IncDecOp, Program, Stmt, WhileStmt,
};

// ─── Control flow ────────────────────────────────────────────────────────────

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal(Value),
    Break,
    Continue,
    Return(Value),
}

// ─── Variable storage ────────────────────────────────────────────────────────

/// One typed storage cell. Writes coerce to the declared type.
#[derive(Debug, Clone)]
pub struct Slot {
    pub value: Value,
    pub ty: DataType,
    pub read_only: bool,
}

impl Slot {
    pub fn new(ty: DataType, value: Value) -> Self {
        Self { value: value.coerce(ty), ty, read_only: false }
    }
}

enum SetErr {
    Undefined,
    ReadOnly,
}

/// Scope stack. The bottom scope is global state that outlives a run.
struct Env {
    scopes: Vec<HashMap<String, Slot>>,
}

impl Env {
    fn new(globals: HashMap<String, Slot>) -> Self {
        Self { scopes: vec![globals] }
    }

    fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, ty: DataType, value: Value) -> Value {
        let slot = Slot::new(ty, value);
        let stored = slot.value;
        self.scopes.last_mut().unwrap().insert(name.to_string(), slot);
        stored
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map(|slot| slot.value)
    }

    /// Store into the innermost slot holding `name`, coercing to its type.
    /// Returns the value as stored.
    fn set(&mut self, name: &str, value: Value) -> Result<Value, SetErr> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(slot) = scope.get_mut(name) {
                if slot.read_only {
                    return Err(SetErr::ReadOnly);
                }
                slot.value = value.coerce(slot.ty);
                return Ok(slot.value);
            }
        }
        Err(SetErr::Undefined)
    }

    fn into_globals(mut self) -> HashMap<String, Slot> {
        self.scopes.swap_remove(0)
    }
}

// ─── Interpreter ─────────────────────────────────────────────────────────────

pub struct Interpreter<'a> {
    env: Env,
    fns: &'a FunctionTable,
    steps: &'a dyn StepResolver,
    state: ExecState,
    extended_constants: bool,
    iterations: u64,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        globals: HashMap<String, Slot>,
        fns: &'a FunctionTable,
        steps: &'a dyn StepResolver,
        state: ExecState,
        extended_constants: bool,
    ) -> Self {
        Self {
            env: Env::new(globals),
            fns,
            steps,
            state,
            extended_constants,
            iterations: 0,
        }
    }

    /// Run the program to completion. The result is the value of a
    /// top-level `return`, or of the last statement executed.
    pub fn run(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        let mut last = Value::NoData;
        for stmt in &program.stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal(v) => last = v,
                Flow::Return(v) => return Ok(v),
                Flow::Break | Flow::Continue => break,
            }
        }
        Ok(last)
    }

    /// Recover the persistent global scope after a run.
    pub fn into_globals(self) -> HashMap<String, Slot> {
        self.env.into_globals()
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Decl(decl) => {
                let mut last = Value::NoData;
                for var in &decl.vars {
                    let value = match &var.init {
                        Some(init) => self.eval(init)?,
                        None => default_value(decl.ty),
                    };
                    last = self.env.declare(&var.name, decl.ty, value);
                }
                Ok(Flow::Normal(last))
            }

            Stmt::Expr(expr) => Ok(Flow::Normal(self.eval(expr)?)),

            Stmt::Block(stmts, _) => {
                self.env.push();
                let result = self.exec_block(stmts);
                self.env.pop();
                result
            }

            Stmt::If(s) => {
                if self.eval(&s.condition)?.as_bool() {
                    self.exec_stmt(&s.then_branch)
                } else if let Some(e) = &s.else_branch {
                    self.exec_stmt(e)
                } else {
                    Ok(Flow::Normal(Value::NoData))
                }
            }

            Stmt::While(s) => self.exec_while(s),
            Stmt::DoWhile(s) => self.exec_do_while(s),

            Stmt::For(s) => {
                self.env.push();
                let result = self.exec_for(s);
                self.env.pop();
                result
            }

            Stmt::Break(_) => Ok(Flow::Break),
            Stmt::Continue(_) => Ok(Flow::Continue),

            Stmt::Return(value, _) => {
                let v = match value {
                    Some(e) => self.eval(e)?,
                    None => Value::NoData,
                };
                Ok(Flow::Return(v))
            }
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        let mut last = Value::NoData;
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal(v) => last = v,
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal(last))
    }

    /// A loop body runs in a scope of its own each iteration, so a
    /// declaration inside an unbraced body never outlives the loop.
    fn exec_loop_body(&mut self, body: &Stmt) -> Result<Flow, RuntimeError> {
        self.env.push();
        let flow = self.exec_stmt(body);
        self.env.pop();
        flow
    }

    fn exec_while(&mut self, s: &WhileStmt) -> Result<Flow, RuntimeError> {
        let mut last = Value::NoData;
        while self.eval(&s.condition)?.as_bool() {
            self.tick(s.span.line)?;
            match self.exec_loop_body(&s.body)? {
                Flow::Normal(v) => last = v,
                Flow::Break => break,
                Flow::Continue => continue,
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn exec_do_while(&mut self, s: &DoWhileStmt) -> Result<Flow, RuntimeError> {
        let mut last = Value::NoData;
        loop {
            self.tick(s.span.line)?;
            match self.exec_loop_body(&s.body)? {
                Flow::Normal(v) => last = v,
                Flow::Break => break,
                Flow::Continue => {}
                ret @ Flow::Return(_) => return Ok(ret),
            }
            if !self.eval(&s.condition)?.as_bool() {
                break;
            }
        }
        Ok(Flow::Normal(last))
    }

    fn exec_for(&mut self, s: &ForStmt) -> Result<Flow, RuntimeError> {
        self.env.push();
        let flow = self.exec_for_inner(s);
        self.env.pop();
        flow
    }

    fn exec_for_inner(&mut self, s: &ForStmt) -> Result<Flow, RuntimeError> {
        self.exec_stmt(&s.init)?;
        let mut last = Value::NoData;
        while self.eval(&s.condition)?.as_bool() {
            self.tick(s.span.line)?;
            match self.exec_loop_body(&s.body)? {
                Flow::Normal(v) => last = v,
                Flow::Break => return Ok(Flow::Normal(last)),
                Flow::Continue => {}
                ret @ Flow::Return(_) => return Ok(ret),
            }
            self.eval(&s.step)?;
        }
        Ok(Flow::Normal(last))
    }

    /// One loop iteration against the optional guard.
    fn tick(&mut self, line: usize) -> Result<(), RuntimeError> {
        self.iterations += 1;
        if let Some(limit) = self.state.loop_limit {
            if self.iterations > limit {
                return Err(RuntimeError::new(
                    line,
                    format!("loop limit of {limit} iterations exceeded"),
                ));
            }
        }
        Ok(())
    }

    // ─── Expressions ─────────────────────────────────────────────────────────

    fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        let line = expr.span().line;
        match expr {
            Expr::Int(v, _) => Ok(Value::Int(*v)),
            Expr::Num(v, _) => Ok(Value::Double(*v)),

            Expr::Ident(name, _) => match self.env.get(name) {
                Some(v) => Ok(v),
                None => constant(name, self.extended_constants)
                    .ok_or_else(|| undefined(line, name)),
            },

            Expr::Path { base, steps, .. } => {
                let mut value = self.env.get(base).ok_or_else(|| undefined(line, base))?;
                for step in steps {
                    value = self.steps.read(&value, &step.name, step.span.line)?;
                }
                Ok(value)
            }

            Expr::UnOp { op, operand, .. } => {
                let v = self.eval(operand)?;
                self.call_native(op.keyword(), &[v], line)
            }

            // both sides always evaluate; `&&` and `||` do not short-circuit
            Expr::BinOp { left, op, right, .. } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                self.call_native(op.keyword(), &[l, r], line)
            }

            Expr::IncDec { name, op, prefix, .. } => {
                let old = self.env.get(name).ok_or_else(|| undefined(line, name))?;
                let mut next = old;
                let ok = match op {
                    IncDecOp::Inc => next.increase(),
                    IncDecOp::Dec => next.decrease(),
                };
                if !ok {
                    let kw = if *op == IncDecOp::Inc { "++" } else { "--" };
                    return Err(RuntimeError::new(
                        line,
                        format!("operator `{kw}` not defined for `{}`", old.type_name()),
                    ));
                }
                let stored = self.store(name, next, line)?;
                Ok(if *prefix { stored } else { old })
            }

            Expr::Assign { name, op, value, .. } => {
                let rhs = self.eval(value)?;
                let result = match op {
                    AssignOp::Set => rhs,
                    compound => {
                        let current = self.env.get(name).ok_or_else(|| undefined(line, name))?;
                        let kw = match compound {
                            AssignOp::Add => "+",
                            AssignOp::Sub => "-",
                            AssignOp::Mul => "*",
                            AssignOp::Div => "/",
                            AssignOp::Set => unreachable!(),
                        };
                        self.call_native(kw, &[current, rhs], line)?
                    }
                };
                self.store(name, result, line)
            }

            Expr::Call { callee, args, .. } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call_native(callee, &values, line)
            }
        }
    }

    fn call_native(
        &self,
        keyword: &str,
        args: &[Value],
        line: usize,
    ) -> Result<Value, RuntimeError> {
        let native = self
            .fns
            .lookup(keyword)
            .and_then(|e| e.native)
            .ok_or_else(|| {
                RuntimeError::new(line, format!("`{keyword}` cannot be evaluated directly"))
            })?;
        native(args, &self.state, line)
    }

    fn store(&mut self, name: &str, value: Value, line: usize) -> Result<Value, RuntimeError> {
        match self.env.set(name, value) {
            Ok(stored) => Ok(stored),
            Err(SetErr::ReadOnly) => {
                Err(RuntimeError::new(line, format!("`{name}` is read-only")))
            }
            Err(SetErr::Undefined) => Err(undefined(line, name)),
        }
    }
}

fn default_value(ty: DataType) -> Value {
    match ty {
        DataType::Int => Value::Int(0),
        DataType::Double => Value::Double(0.0),
        DataType::NoData => Value::NoData,
    }
}

fn undefined(line: usize, name: &str) -> RuntimeError {
    RuntimeError::new(line, format!("undefined variable `{name}`"))
}
