//! Embedded expression and script language for plot definitions.
//!
//! Two modes share one pipeline. *Expression* mode compiles a single
//! formula (`sin(x) / x`, typically re-run per sample point); *script*
//! mode compiles a full statement program with declarations, control flow,
//! and host accessor paths. Compilation is lex → parse → resolve, and every
//! name, arity, and argument type is checked before anything runs.
//!
//! ```no_run
//! use plotline_lang::{Engine, compile_expression};
//!
//! let program = compile_expression("sin(x) / x").unwrap();
//! let mut engine = Engine::new(program);
//! engine.bind("x", 0.5_f64);
//! let y = engine.run().unwrap();
//! # let _ = y;
//! ```

pub mod analysis;
pub mod builtins;
pub mod error;
pub mod runtime;
pub mod steps;
pub mod syntax;

use std::collections::HashMap;
use std::rc::Rc;

use crate::builtins::{ExecState, FunctionTable};
use crate::runtime::interpreter::{Interpreter, Slot};
use crate::syntax::ast;

pub use crate::builtins::AngleUnit;
pub use crate::error::{Error, ErrorCode, RuntimeError};
pub use crate::runtime::value::{DataPair, DataType, Value};
pub use crate::steps::{NoSteps, StepResolver};

// ─── Compilation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A single expression, no statements, no accessor paths.
    Expression,
    /// The full statement grammar.
    Script,
}

#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    pub mode: Mode,
    /// Free variables become global doubles instead of resolution errors.
    pub auto_declare: bool,
    /// Expose the physical-constant set (`Avogadro`, `LightSpeed`, ...).
    pub extended_constants: bool,
}

impl CompileOptions {
    pub fn expression() -> Self {
        Self { mode: Mode::Expression, auto_declare: true, extended_constants: false }
    }

    pub fn script() -> Self {
        Self { mode: Mode::Script, ..Self::expression() }
    }
}

/// A validated, runnable program.
pub struct Program {
    ast: ast::Program,
    fns: FunctionTable,
    steps: Rc<dyn StepResolver>,
    /// Auto-declared free variables the engine must seed storage for.
    globals: Vec<(String, DataType)>,
    options: CompileOptions,
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("mode", &self.options.mode)
            .field("globals", &self.globals)
            .finish_non_exhaustive()
    }
}

pub fn compile_expression(source: &str) -> Result<Program, Vec<Error>> {
    compile_with(source, &CompileOptions::expression(), Rc::new(NoSteps))
}

pub fn compile_script(source: &str) -> Result<Program, Vec<Error>> {
    compile_with(source, &CompileOptions::script(), Rc::new(NoSteps))
}

pub fn compile_with(
    source: &str,
    options: &CompileOptions,
    steps: Rc<dyn StepResolver>,
) -> Result<Program, Vec<Error>> {
    let tokens = syntax::lexer::Lexer::new(source, options.mode).tokenize()?;
    let ast = syntax::parser::parse(tokens, options.mode)?;
    let fns = FunctionTable::standard();
    let globals = analysis::resolver::resolve(&ast, options, &fns, steps.as_ref())?;
    Ok(Program { ast, fns, steps, globals, options: *options })
}

// ─── Execution ───────────────────────────────────────────────────────────────

/// Owns a compiled program plus its persistent global state. Rerunning the
/// same engine keeps variable values across runs; only a fresh engine
/// starts clean.
pub struct Engine {
    program: Program,
    globals: HashMap<String, Slot>,
    angle_unit: AngleUnit,
    loop_limit: Option<u64>,
}

impl Engine {
    pub fn new(program: Program) -> Self {
        let mut globals = HashMap::new();
        for (name, ty) in &program.globals {
            globals.insert(name.clone(), Slot::new(*ty, Value::Double(0.0)));
        }
        Self { program, globals, angle_unit: AngleUnit::Radians, loop_limit: None }
    }

    /// Set a global before (or between) runs. An auto-declared variable
    /// keeps its slot type; a new name takes the value's own type.
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.globals.get_mut(name) {
            Some(slot) => slot.value = value.coerce(slot.ty),
            None => {
                self.globals.insert(name.to_string(), Slot::new(value.data_type(), value));
            }
        }
    }

    /// Bind a global the script may read but not write. An assignment to
    /// the name fails at runtime with a read-only error.
    pub fn bind_read_only(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let mut slot = Slot::new(value.data_type(), value);
        slot.read_only = true;
        self.globals.insert(name.to_string(), slot);
    }

    /// Read a global as left by the last run.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.globals.get(name).map(|slot| slot.value)
    }

    pub fn set_angle_unit(&mut self, unit: AngleUnit) {
        self.angle_unit = unit;
    }

    /// Opt-in guard against runaway loops. Off by default; when set, a run
    /// fails once total loop iterations exceed the limit.
    pub fn set_loop_limit(&mut self, limit: Option<u64>) {
        self.loop_limit = limit;
    }

    pub fn run(&mut self) -> Result<Value, RuntimeError> {
        let state = ExecState { angle_unit: self.angle_unit, loop_limit: self.loop_limit };
        let globals = std::mem::take(&mut self.globals);
        let mut interp = Interpreter::new(
            globals,
            &self.program.fns,
            self.program.steps.as_ref(),
            state,
            self.program.options.extended_constants,
        );
        let result = interp.run(&self.program.ast);
        self.globals = interp.into_globals();
        result
    }

    /// Evaluate the program once per row of the input columns, binding each
    /// named column's current element first. All columns must be the same
    /// length.
    pub fn map(&mut self, inputs: &[(&str, &[f64])]) -> Result<Vec<f64>, RuntimeError> {
        let Some((_, first)) = inputs.first() else {
            return Err(RuntimeError::new(0, "map requires at least one input column"));
        };
        let rows = first.len();
        for (name, column) in inputs {
            if column.len() != rows {
                return Err(RuntimeError::new(
                    0,
                    format!(
                        "input column `{name}` has {} values, expected {rows}",
                        column.len()
                    ),
                ));
            }
        }

        let mut out = Vec::with_capacity(rows);
        for row in 0..rows {
            for (name, column) in inputs {
                self.bind(name, column[row]);
            }
            out.push(self.run()?.as_double());
        }
        Ok(out)
    }
}
