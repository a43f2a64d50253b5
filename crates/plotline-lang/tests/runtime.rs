//! End-to-end execution: compile, run, inspect.

use std::rc::Rc;

use plotline_lang::{
    AngleUnit, CompileOptions, DataType, Engine, NoSteps, RuntimeError, StepResolver, Value,
    compile_expression, compile_script, compile_with,
};
use pretty_assertions::assert_eq;

fn eval(src: &str) -> Value {
    let mut engine = Engine::new(compile_expression(src).unwrap());
    engine.run().unwrap()
}

fn eval_f64(src: &str) -> f64 {
    eval(src).as_double()
}

fn run(src: &str) -> Value {
    let mut engine = Engine::new(compile_script(src).unwrap());
    engine.run().unwrap()
}

fn run_err(src: &str) -> RuntimeError {
    let mut engine = Engine::new(compile_script(src).unwrap());
    engine.run().unwrap_err()
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[test]
fn arithmetic_precedence() {
    assert_eq!(eval_f64("2 + 3 * 4"), 14.0);
    assert_eq!(eval_f64("(2 + 3) * 4"), 20.0);
    assert_eq!(eval_f64("10 - 4 - 3"), 3.0);
}

#[test]
fn integer_arithmetic_stays_integral() {
    assert_eq!(eval("2 + 3"), Value::Int(5));
    assert_eq!(eval("7 % 3"), Value::Int(1));
    assert_eq!(eval("2 * 3.0"), Value::Double(6.0));
}

#[test]
fn division_always_produces_a_double() {
    assert_eq!(eval("1 / 2"), Value::Double(0.5));
    assert_eq!(eval("6 / 3"), Value::Double(2.0));
}

#[test]
fn power_is_left_associative_and_tight() {
    assert_eq!(eval_f64("2^3^2"), 64.0);
    assert_eq!(eval_f64("-2^2"), -4.0);
    assert_eq!(eval_f64("2^-3"), 0.125);
    assert_eq!(eval_f64("2 * 3^2"), 18.0);
}

#[test]
fn truth_is_strictly_positive() {
    assert_eq!(eval("0.1 && 1"), Value::Int(1));
    assert_eq!(eval("0 || 0.0"), Value::Int(0));
    // negative numbers are false too
    assert_eq!(eval("-5 || 0"), Value::Int(0));
    assert_eq!(eval("!(-1)"), Value::Int(1));
}

#[test]
fn comparisons_yield_int_flags() {
    assert_eq!(eval("2 > 1"), Value::Int(1));
    assert_eq!(eval("2 <= 1.5"), Value::Int(0));
    assert_eq!(eval("1.0 == 1"), Value::Int(1));
}

#[test]
fn math_functions() {
    assert_eq!(eval_f64("sqrt(9)"), 3.0);
    assert_eq!(eval("nint(2.5)"), Value::Int(3));
    assert_eq!(eval("nint(-0.5)"), Value::Int(0));
    assert_eq!(eval("abs(-3)"), Value::Double(3.0));
    assert_eq!(eval("min(2, 3.5)"), Value::Double(2.0));
    assert_eq!(eval("max(2, 3)"), Value::Double(3.0));
    assert!((eval_f64("ln(exp(1))") - 1.0).abs() < 1e-12);
}

#[test]
fn constants() {
    assert!((eval_f64("Pi") - std::f64::consts::PI).abs() < 1e-15);
    assert_eq!(eval("true"), Value::Int(1));
    assert_eq!(eval("false"), Value::Int(0));
    assert_eq!(eval("NULL"), Value::NoData);
}

#[test]
fn extended_constants_are_opt_in() {
    let options = CompileOptions { extended_constants: true, ..CompileOptions::expression() };
    let program = compile_with("LightSpeed", &options, Rc::new(NoSteps)).unwrap();
    let mut engine = Engine::new(program);
    assert_eq!(engine.run().unwrap(), Value::Double(2.997_924_58e8));

    // without the gate the name is just an ordinary auto-declared variable
    let mut engine = Engine::new(compile_expression("LightSpeed").unwrap());
    assert_eq!(engine.run().unwrap(), Value::Double(0.0));
}

#[test]
fn degree_convention_applies_to_trig() {
    let mut engine = Engine::new(compile_expression("sin(x)").unwrap());
    engine.set_angle_unit(AngleUnit::Degrees);
    engine.bind("x", 90.0_f64);
    assert!((engine.run().unwrap().as_double() - 1.0).abs() < 1e-12);
}

#[test]
fn nodata_operand_fails_at_runtime() {
    let mut engine = Engine::new(compile_expression("1 + NULL").unwrap());
    let err = engine.run().unwrap_err();
    assert!(err.message.contains("nodata"), "got: {}", err.message);
    assert!(err.message.contains('+'), "got: {}", err.message);
}

// ─── Engine binding and mapping ──────────────────────────────────────────────

#[test]
fn bound_variable_feeds_the_formula() {
    let mut engine = Engine::new(compile_expression("2 * x + 1").unwrap());
    engine.bind("x", 3.0_f64);
    assert_eq!(engine.run().unwrap(), Value::Double(7.0));
    engine.bind("x", -1.0_f64);
    assert_eq!(engine.run().unwrap(), Value::Double(-1.0));
}

#[test]
fn read_only_bindings_reject_script_writes() {
    let mut engine = Engine::new(compile_script("x = 1; x;").unwrap());
    engine.bind_read_only("x", 5.0_f64);
    let err = engine.run().unwrap_err();
    assert!(err.message.contains("read-only"), "got: {}", err.message);
    assert_eq!(engine.get("x"), Some(Value::Double(5.0)));

    // reading one is fine
    let mut engine = Engine::new(compile_expression("x * 2").unwrap());
    engine.bind_read_only("x", 4.0_f64);
    assert_eq!(engine.run().unwrap(), Value::Double(8.0));
}

#[test]
fn map_evaluates_per_row() {
    let mut engine = Engine::new(compile_expression("x * y").unwrap());
    let out = engine
        .map(&[("x", &[1.0, 2.0, 3.0]), ("y", &[10.0, 10.0, 0.5])])
        .unwrap();
    assert_eq!(out, vec![10.0, 20.0, 1.5]);
}

#[test]
fn map_rejects_mismatched_columns() {
    let mut engine = Engine::new(compile_expression("x + y").unwrap());
    let err = engine.map(&[("x", &[1.0, 2.0]), ("y", &[1.0])]).unwrap_err();
    assert!(err.message.contains("`y`"), "got: {}", err.message);
}

#[test]
fn globals_persist_across_runs() {
    let mut engine = Engine::new(compile_script("x = x + 1; x;").unwrap());
    assert_eq!(engine.run().unwrap(), Value::Double(1.0));
    assert_eq!(engine.run().unwrap(), Value::Double(2.0));
    assert_eq!(engine.get("x"), Some(Value::Double(2.0)));
}

// ─── Scripts ─────────────────────────────────────────────────────────────────

#[test]
fn result_is_the_last_statement_value() {
    assert_eq!(run("1 + 1;"), Value::Int(2));
    assert_eq!(run("1; 2; 3;"), Value::Int(3));
}

#[test]
fn declarations_default_to_zero_and_coerce() {
    assert_eq!(run("int a; a;"), Value::Int(0));
    assert_eq!(run("int a = 2.9; a;"), Value::Int(2));
    assert_eq!(run("double d = 3; d;"), Value::Double(3.0));
}

#[test]
fn blocks_scope_and_shadow() {
    assert_eq!(run("double x = 1; { double x = 2; x = x + 1; } x;"), Value::Double(1.0));
    assert_eq!(run("double x = 1; { x = 2; } x;"), Value::Double(2.0));
}

#[test]
fn unbraced_loop_body_scopes_its_declarations() {
    // `y` declared in the body dies with each iteration; the trailing `y`
    // is a fresh auto-declared global left at its default
    assert_eq!(
        run("int n = 0; while (n < 3) int y = n = n + 1; y;"),
        Value::Double(0.0)
    );
    assert_eq!(
        run("for (i = 0; i < 2; i = i + 1) int t = 9; t;"),
        Value::Double(0.0)
    );
}

#[test]
fn if_else_branches_on_truth() {
    assert_eq!(run("int a; if (0.5 > 0) a = 1; else a = 2; a;"), Value::Int(1));
    assert_eq!(run("int a; if (-1) a = 1; else a = 2; a;"), Value::Int(2));
}

#[test]
fn for_loop_with_break_and_continue() {
    let src = "
        x = 0;
        for (i = 0; i < 5; i = i + 1) {
            if (i == 2) continue;
            if (i == 4) break;
            x = x + i;
        }
        x;
    ";
    // adds 0, 1, and 3
    assert_eq!(run(src), Value::Double(4.0));
}

#[test]
fn while_loop() {
    assert_eq!(run("int n = 0; while (n < 10) n = n + 3; n;"), Value::Int(12));
}

#[test]
fn do_while_runs_at_least_once() {
    assert_eq!(run("x = 10; do { x = x + 1; } while (x < 5); x;"), Value::Double(11.0));
}

#[test]
fn return_stops_the_script() {
    assert_eq!(run("return 7; 100;"), Value::Int(7));
    assert_eq!(run("for (i = 0; i < 100; i = i + 1) { if (i == 3) return i; } 0;"),
        Value::Double(3.0));
    assert_eq!(run("return;"), Value::NoData);
}

#[test]
fn compound_assignment() {
    assert_eq!(run("x = 10; x /= 4; x;"), Value::Double(2.5));
    assert_eq!(run("int n = 7; n -= 2; n *= 3; n;"), Value::Int(15));
}

#[test]
fn increment_and_decrement() {
    assert_eq!(run("int i = 5; int a = i++; a;"), Value::Int(5));
    assert_eq!(run("int i = 5; i++; i;"), Value::Int(6));
    assert_eq!(run("int i = 5; int b = ++i; b;"), Value::Int(6));
    assert_eq!(run("double d = 1.5; d--; d;"), Value::Double(0.5));
}

#[test]
fn loop_limit_guard_is_opt_in() {
    // unguarded engines run long loops to completion
    assert_eq!(
        run("int n = 0; for (i = 0; i < 100000; i = i + 1) n = n + 1; n;"),
        Value::Int(100_000)
    );

    let mut engine = Engine::new(compile_script("while (1) { }").unwrap());
    engine.set_loop_limit(Some(50));
    let err = engine.run().unwrap_err();
    assert!(err.message.contains("loop limit"), "got: {}", err.message);
}

#[test]
fn integer_modulo_by_zero_fails() {
    let err = run_err("5 % 0;");
    assert!(err.message.contains("modulo"), "got: {}", err.message);
}

#[test]
fn division_by_zero_follows_ieee() {
    assert_eq!(run("1 / 0;"), Value::Double(f64::INFINITY));
}

// ─── Host accessor paths ─────────────────────────────────────────────────────

struct Doubler;

impl StepResolver for Doubler {
    fn resolve(&self, parent: DataType, name: &str) -> Option<DataType> {
        match (parent, name) {
            (DataType::Double, "doubled") => Some(DataType::Double),
            _ => None,
        }
    }

    fn read(&self, parent: &Value, name: &str, line: usize) -> Result<Value, RuntimeError> {
        match name {
            "doubled" => Ok(Value::Double(parent.as_double() * 2.0)),
            _ => Err(RuntimeError::new(line, format!(
                "`{}` has no accessor `{name}`", parent.type_name()
            ))),
        }
    }
}

#[test]
fn path_steps_read_through_the_host() {
    let program =
        compile_with("a = 1.5; b = a.doubled.doubled; b;", &CompileOptions::script(), Rc::new(Doubler))
            .unwrap();
    let mut engine = Engine::new(program);
    assert_eq!(engine.run().unwrap(), Value::Double(6.0));
}
