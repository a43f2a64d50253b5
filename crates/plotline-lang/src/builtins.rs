//! Fixed function/command dispatch table.
//!
//! One registry covers the whole builtin surface: named math functions and
//! every operator are rows in the same table. Each row carries the canonical
//! keyword, the declared return type, a compact argument-spec string, and
//! (for directly-evaluable rows) a native implementation.
//!
//! Argument-spec mini-grammar:
//!   `N` number   `I` integer   `D` double   `V` assignable variable
//!   `B` any non-void value
//!   lowercase = optional, trailing digit = repeat count,
//!   `*` = previous spec repeats, `[...]` = all-or-none optional cluster,
//!   `|` = alternative overload, leading `_` = validated elsewhere.

use crate::error::RuntimeError;
use crate::runtime::value::{DataPair, DataType, Value};

// ─── Execution state ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleUnit {
    #[default]
    Radians,
    Degrees,
}

/// Engine-level state threaded into every native call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecState {
    pub angle_unit: AngleUnit,
    pub loop_limit: Option<u64>,
}

impl ExecState {
    /// Convert a trig argument from the active convention to radians.
    fn to_rad(&self, x: f64) -> f64 {
        match self.angle_unit {
            AngleUnit::Radians => x,
            AngleUnit::Degrees => x.to_radians(),
        }
    }

    /// Convert an inverse-trig result from radians to the active convention.
    fn from_rad(&self, x: f64) -> f64 {
        match self.angle_unit {
            AngleUnit::Radians => x,
            AngleUnit::Degrees => x.to_degrees(),
        }
    }
}

// ─── Table ───────────────────────────────────────────────────────────────────

pub type NativeFn = fn(&[Value], &ExecState, usize) -> Result<Value, RuntimeError>;

pub struct FnEntry {
    pub keyword: &'static str,
    pub ret: DataType,
    pub spec: &'static str,
    /// `None` for rows the interpreter executes itself (assignment family).
    pub native: Option<NativeFn>,
}

pub struct FunctionTable {
    entries: Vec<FnEntry>,
}

impl FunctionTable {
    pub fn lookup(&self, keyword: &str) -> Option<&FnEntry> {
        self.entries.iter().find(|e| e.keyword == keyword)
    }

    pub fn standard() -> Self {
        use DataType::{Double, Int};

        fn f(keyword: &'static str, ret: DataType, spec: &'static str, native: NativeFn) -> FnEntry {
            FnEntry { keyword, ret, spec, native: Some(native) }
        }
        fn stub(keyword: &'static str, ret: DataType, spec: &'static str) -> FnEntry {
            FnEntry { keyword, ret, spec, native: None }
        }

        Self {
            entries: vec![
                // ── Math functions ────────────────────────────────────────
                f("sin",   Double, "N",  n_sin),
                f("cos",   Double, "N",  n_cos),
                f("tan",   Double, "N",  n_tan),
                f("asin",  Double, "N",  n_asin),
                f("acos",  Double, "N",  n_acos),
                f("atan",  Double, "N",  n_atan),
                f("atan2", Double, "N2", n_atan2),
                f("sinh",  Double, "N",  n_sinh),
                f("cosh",  Double, "N",  n_cosh),
                f("tanh",  Double, "N",  n_tanh),
                f("abs",   Double, "N",  n_abs),
                f("exp",   Double, "N",  n_exp),
                f("ln",    Double, "N",  n_ln),
                f("log10", Double, "N",  n_log10),
                f("sqrt",  Double, "N",  n_sqrt),
                f("nint",  Int,    "N",  n_nint),
                f("floor", Double, "N",  n_floor),
                f("ceil",  Double, "N",  n_ceil),
                f("min",   Double, "N2", n_min),
                f("max",   Double, "N2", n_max),

                // ── Operators: same table, same dispatch ─────────────────
                f("+",  Double, "N2",   op_add),
                f("-",  Double, "N2|N", op_sub),
                f("*",  Double, "N2",   op_mul),
                f("/",  Double, "N2",   op_div),
                f("%",  Double, "N2",   op_mod),
                f("^",  Double, "N2",   op_pow),
                f("==", Int,    "N2",   op_eq),
                f("!=", Int,    "N2",   op_neq),
                f("<",  Int,    "N2",   op_lt),
                f("<=", Int,    "N2",   op_le),
                f(">",  Int,    "N2",   op_gt),
                f(">=", Int,    "N2",   op_ge),
                f("&&", Int,    "N2",   op_and),
                f("||", Int,    "N2",   op_or),
                f("!",  Int,    "N",    op_not),

                // Assignment family; validated here, executed by the
                // interpreter against variable storage.
                stub("=",  Double, "VB"),
                stub("+=", Double, "VN"),
                stub("-=", Double, "VN"),
                stub("*=", Double, "VN"),
                stub("/=", Double, "VN"),
                stub("++", Double, "V"),
                stub("--", Double, "V"),
            ],
        }
    }
}

// ─── Named constants ─────────────────────────────────────────────────────────

/// Literal keyword constants. The extended physical-constant set is gated by
/// a compile option.
pub fn constant(name: &str, extended: bool) -> Option<Value> {
    match name {
        "true"  => Some(Value::Int(1)),
        "false" => Some(Value::Int(0)),
        "NULL"  => Some(Value::NoData),
        "Pi"    => Some(Value::Double(std::f64::consts::PI)),

        "DegPerRad"  if extended => Some(Value::Double(180.0 / std::f64::consts::PI)),
        "Avogadro"   if extended => Some(Value::Double(6.022_140_76e23)),
        "LightSpeed" if extended => Some(Value::Double(2.997_924_58e8)),
        "Boltzmann"  if extended => Some(Value::Double(1.380_649e-23)),
        "Planck"     if extended => Some(Value::Double(6.626_070_15e-34)),
        "PlanckBar"  if extended => Some(Value::Double(1.054_571_817e-34)),

        _ => None,
    }
}

// ─── Argument-spec validation ─────────────────────────────────────────────────

/// What the validator needs to know about one argument node.
#[derive(Debug, Clone, Copy)]
pub struct ArgInfo {
    pub ty: DataType,
    pub assignable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpecMismatch {
    TooFew { required: usize },
    TooMany { allowed: usize },
    WrongType { index: usize, expected: &'static str },
    NotAssignable { index: usize },
}

impl SpecMismatch {
    pub fn describe(&self, keyword: &str) -> String {
        match self {
            SpecMismatch::TooFew { required } =>
                format!("`{keyword}` requires at least {required} argument{}", plural(*required)),
            SpecMismatch::TooMany { allowed } =>
                format!("`{keyword}` takes at most {allowed} argument{}", plural(*allowed)),
            SpecMismatch::WrongType { index, expected } =>
                format!("argument {} of `{keyword}` must be {expected}", index + 1),
            SpecMismatch::NotAssignable { index } =>
                format!("argument {} of `{keyword}` must be a variable", index + 1),
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

enum SpecAtom {
    One { code: u8, optional: bool },
    /// `*`: the preceding spec letter repeats while arguments remain.
    Repeat { code: u8 },
    /// `[...]`: optional as a group; once entered, every member is required.
    Cluster(Vec<u8>),
}

/// Validate an argument list against a spec string, trying each `|`
/// alternative in turn. On total failure, report the first alternative's
/// mismatch; it is the canonical signature.
pub fn validate_args(spec: &str, args: &[ArgInfo]) -> Result<(), SpecMismatch> {
    let mut first_err = None;
    for alt in spec.split('|') {
        if alt.starts_with('_') {
            return Ok(());
        }
        match check_alternative(alt, args) {
            Ok(()) => return Ok(()),
            Err(e) => {
                if first_err.is_none() { first_err = Some(e); }
            }
        }
    }
    Err(first_err.unwrap_or(SpecMismatch::TooMany { allowed: 0 }))
}

fn parse_alternative(alt: &str) -> Vec<SpecAtom> {
    let mut atoms = Vec::new();
    let bytes = alt.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => {
                let mut cluster = Vec::new();
                i += 1;
                while i < bytes.len() && bytes[i] != b']' {
                    cluster.push(bytes[i].to_ascii_uppercase());
                    i += 1;
                }
                i += 1; // ]
                atoms.push(SpecAtom::Cluster(cluster));
            }
            b'*' => {
                let code = match atoms.last() {
                    Some(SpecAtom::One { code, .. }) => *code,
                    _ => b'B',
                };
                atoms.push(SpecAtom::Repeat { code });
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let code = c.to_ascii_uppercase();
                let optional = c.is_ascii_lowercase();
                i += 1;
                // trailing digit = repeat count
                let mut count = 1;
                if i < bytes.len() && bytes[i].is_ascii_digit() {
                    count = (bytes[i] - b'0') as usize;
                    i += 1;
                }
                for _ in 0..count {
                    atoms.push(SpecAtom::One { code, optional });
                }
            }
            _ => { i += 1; }
        }
    }
    atoms
}

fn check_alternative(alt: &str, args: &[ArgInfo]) -> Result<(), SpecMismatch> {
    let atoms = parse_alternative(alt);
    let required: usize = atoms.iter().map(|a| match a {
        SpecAtom::One { optional: false, .. } => 1,
        _ => 0,
    }).sum();
    let unbounded = atoms.iter().any(|a| matches!(a, SpecAtom::Repeat { .. }));
    let allowed: usize = atoms.iter().map(|a| match a {
        SpecAtom::One { .. } => 1,
        SpecAtom::Cluster(c) => c.len(),
        SpecAtom::Repeat { .. } => 0,
    }).sum();

    let mut i = 0;
    for atom in &atoms {
        match atom {
            SpecAtom::One { code, optional } => {
                if i >= args.len() {
                    if *optional { continue; }
                    return Err(SpecMismatch::TooFew { required });
                }
                check_one(*code, i, &args[i])?;
                i += 1;
            }
            SpecAtom::Repeat { code } => {
                while i < args.len() {
                    check_one(*code, i, &args[i])?;
                    i += 1;
                }
            }
            SpecAtom::Cluster(codes) => {
                if i >= args.len() { continue; }
                for code in codes {
                    if i >= args.len() {
                        return Err(SpecMismatch::TooFew { required: required + codes.len() });
                    }
                    check_one(*code, i, &args[i])?;
                    i += 1;
                }
            }
        }
    }
    if i < args.len() && !unbounded {
        return Err(SpecMismatch::TooMany { allowed });
    }
    Ok(())
}

fn check_one(code: u8, index: usize, arg: &ArgInfo) -> Result<(), SpecMismatch> {
    let numeric = matches!(arg.ty, DataType::Int | DataType::Double);
    match code {
        b'N' if numeric => Ok(()),
        b'N' => Err(SpecMismatch::WrongType { index, expected: "a number" }),
        b'I' if arg.ty == DataType::Int => Ok(()),
        b'I' => Err(SpecMismatch::WrongType { index, expected: "an integer" }),
        b'D' if arg.ty == DataType::Double => Ok(()),
        b'D' => Err(SpecMismatch::WrongType { index, expected: "a double" }),
        b'V' if arg.assignable => Ok(()),
        b'V' => Err(SpecMismatch::NotAssignable { index }),
        b'B' if arg.ty != DataType::NoData => Ok(()),
        b'B' => Err(SpecMismatch::WrongType { index, expected: "a value" }),
        _ => Err(SpecMismatch::WrongType { index, expected: "a value" }),
    }
}

// ─── Native math implementations ─────────────────────────────────────────────

fn n_sin(a: &[Value], st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(st.to_rad(a[0].as_double()).sin()))
}
fn n_cos(a: &[Value], st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(st.to_rad(a[0].as_double()).cos()))
}
fn n_tan(a: &[Value], st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(st.to_rad(a[0].as_double()).tan()))
}
fn n_asin(a: &[Value], st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(st.from_rad(a[0].as_double().asin())))
}
fn n_acos(a: &[Value], st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(st.from_rad(a[0].as_double().acos())))
}
fn n_atan(a: &[Value], st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(st.from_rad(a[0].as_double().atan())))
}
fn n_atan2(a: &[Value], st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(st.from_rad(a[0].as_double().atan2(a[1].as_double()))))
}
fn n_sinh(a: &[Value], _st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(a[0].as_double().sinh()))
}
fn n_cosh(a: &[Value], _st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(a[0].as_double().cosh()))
}
fn n_tanh(a: &[Value], _st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(a[0].as_double().tanh()))
}
fn n_abs(a: &[Value], _st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(a[0].as_double().abs()))
}
fn n_exp(a: &[Value], _st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(a[0].as_double().exp()))
}
fn n_ln(a: &[Value], _st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(a[0].as_double().ln()))
}
fn n_log10(a: &[Value], _st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(a[0].as_double().log10()))
}
fn n_sqrt(a: &[Value], _st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(a[0].as_double().sqrt()))
}
/// Round half up: floor(x + 0.5).
fn n_nint(a: &[Value], _st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Int((a[0].as_double() + 0.5).floor() as i64))
}
fn n_floor(a: &[Value], _st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(a[0].as_double().floor()))
}
fn n_ceil(a: &[Value], _st: &ExecState, _l: usize) -> Result<Value, RuntimeError> {
    Ok(Value::Double(a[0].as_double().ceil()))
}
fn n_min(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    binary("min", a, l, |_, x, y| {
        Ok(Value::Double(x.as_double().min(y.as_double())))
    })
}
fn n_max(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    binary("max", a, l, |_, x, y| {
        Ok(Value::Double(x.as_double().max(y.as_double())))
    })
}

// ─── Native operator implementations ─────────────────────────────────────────

/// Dispatch a binary operator strictly on the operand pair code. A pair
/// involving NoData is unmatched and fails with both type names.
fn binary(
    keyword: &str,
    args: &[Value],
    line: usize,
    f: impl FnOnce(DataPair, &Value, &Value) -> Result<Value, RuntimeError>,
) -> Result<Value, RuntimeError> {
    let (l, r) = (&args[0], &args[1]);
    match l.data_pair(r) {
        Some(pair) => f(pair, l, r),
        None => Err(RuntimeError::new(line, format!(
            "operator `{keyword}` not defined for `{}` and `{}`",
            l.type_name(), r.type_name()
        ))),
    }
}

fn op_add(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    binary("+", a, l, |pair, x, y| Ok(match pair {
        DataPair::IntInt => Value::Int(x.as_int().wrapping_add(y.as_int())),
        _ => Value::Double(x.as_double() + y.as_double()),
    }))
}

fn op_sub(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    // `-` doubles as unary negate.
    if a.len() == 1 {
        return match a[0] {
            Value::Int(i)    => Ok(Value::Int(i.wrapping_neg())),
            Value::Double(d) => Ok(Value::Double(-d)),
            Value::NoData    => Err(RuntimeError::new(l, "operator `-` not defined for `nodata`")),
        };
    }
    binary("-", a, l, |pair, x, y| Ok(match pair {
        DataPair::IntInt => Value::Int(x.as_int().wrapping_sub(y.as_int())),
        _ => Value::Double(x.as_double() - y.as_double()),
    }))
}

fn op_mul(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    binary("*", a, l, |pair, x, y| Ok(match pair {
        DataPair::IntInt => Value::Int(x.as_int().wrapping_mul(y.as_int())),
        _ => Value::Double(x.as_double() * y.as_double()),
    }))
}

/// Division always runs in double precision; `1/2` is 0.5, and division by
/// zero follows IEEE (inf/nan), no explicit guard.
fn op_div(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    binary("/", a, l, |_, x, y| Ok(Value::Double(x.as_double() / y.as_double())))
}

fn op_mod(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    binary("%", a, l, |pair, x, y| match pair {
        DataPair::IntInt => {
            let d = y.as_int();
            if d == 0 {
                return Err(RuntimeError::new(l, "integer modulo by zero"));
            }
            Ok(Value::Int(x.as_int().wrapping_rem(d)))
        }
        _ => Ok(Value::Double(x.as_double() % y.as_double())),
    })
}

fn op_pow(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    binary("^", a, l, |_, x, y| Ok(Value::Double(x.as_double().powf(y.as_double()))))
}

fn compare(
    keyword: &'static str,
    a: &[Value],
    l: usize,
    int_cmp: fn(i64, i64) -> bool,
    dbl_cmp: fn(f64, f64) -> bool,
) -> Result<Value, RuntimeError> {
    binary(keyword, a, l, |pair, x, y| {
        let hit = match pair {
            DataPair::IntInt => int_cmp(x.as_int(), y.as_int()),
            _ => dbl_cmp(x.as_double(), y.as_double()),
        };
        Ok(Value::Int(hit as i64))
    })
}

fn op_eq(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    compare("==", a, l, |x, y| x == y, |x, y| x == y)
}
fn op_neq(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    compare("!=", a, l, |x, y| x != y, |x, y| x != y)
}
fn op_lt(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    compare("<", a, l, |x, y| x < y, |x, y| x < y)
}
fn op_le(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    compare("<=", a, l, |x, y| x <= y, |x, y| x <= y)
}
fn op_gt(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    compare(">", a, l, |x, y| x > y, |x, y| x > y)
}
fn op_ge(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    compare(">=", a, l, |x, y| x >= y, |x, y| x >= y)
}

fn op_and(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    binary("&&", a, l, |_, x, y| Ok(Value::Int((x.as_bool() && y.as_bool()) as i64)))
}
fn op_or(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    binary("||", a, l, |_, x, y| Ok(Value::Int((x.as_bool() || y.as_bool()) as i64)))
}

fn op_not(a: &[Value], _st: &ExecState, l: usize) -> Result<Value, RuntimeError> {
    match a[0] {
        Value::NoData => Err(RuntimeError::new(l, "operator `!` not defined for `nodata`")),
        v => Ok(Value::Int(!v.as_bool() as i64)),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn num() -> ArgInfo { ArgInfo { ty: DataType::Double, assignable: false } }
    fn int() -> ArgInfo { ArgInfo { ty: DataType::Int, assignable: false } }
    fn var() -> ArgInfo { ArgInfo { ty: DataType::Double, assignable: true } }

    #[test]
    fn required_count() {
        assert!(validate_args("N2", &[num(), num()]).is_ok());
        assert_eq!(validate_args("N2", &[num()]), Err(SpecMismatch::TooFew { required: 2 }));
        assert_eq!(
            validate_args("N2", &[num(), num(), num()]),
            Err(SpecMismatch::TooMany { allowed: 2 })
        );
    }

    #[test]
    fn optional_args() {
        assert!(validate_args("Nn", &[num()]).is_ok());
        assert!(validate_args("Nn", &[num(), num()]).is_ok());
        assert_eq!(validate_args("Nn", &[]), Err(SpecMismatch::TooFew { required: 1 }));
    }

    #[test]
    fn integer_spec_rejects_double() {
        assert!(validate_args("I", &[int()]).is_ok());
        assert_eq!(
            validate_args("I", &[num()]),
            Err(SpecMismatch::WrongType { index: 0, expected: "an integer" })
        );
    }

    #[test]
    fn variable_spec_rejects_constant() {
        assert!(validate_args("VN", &[var(), num()]).is_ok());
        assert_eq!(
            validate_args("VN", &[num(), num()]),
            Err(SpecMismatch::NotAssignable { index: 0 })
        );
    }

    #[test]
    fn star_repeats_previous() {
        assert!(validate_args("N*", &[num()]).is_ok());
        assert!(validate_args("N*", &[num(), num(), num(), num()]).is_ok());
        assert!(validate_args("N*", &[]).is_err());
    }

    #[test]
    fn cluster_is_all_or_none() {
        assert!(validate_args("N[NN]", &[num()]).is_ok());
        assert!(validate_args("N[NN]", &[num(), num(), num()]).is_ok());
        assert!(validate_args("N[NN]", &[num(), num()]).is_err());
    }

    #[test]
    fn alternatives() {
        // canonical unary-or-binary minus
        assert!(validate_args("N2|N", &[num()]).is_ok());
        assert!(validate_args("N2|N", &[num(), num()]).is_ok());
        assert!(validate_args("N2|N", &[num(), num(), num()]).is_err());
    }

    #[test]
    fn underscore_skips() {
        assert!(validate_args("_", &[num(), num(), num()]).is_ok());
    }

    #[test]
    fn nint_rounds_half_up() {
        let st = ExecState::default();
        assert_eq!(n_nint(&[Value::Double(0.5)], &st, 0).unwrap(), Value::Int(1));
        assert_eq!(n_nint(&[Value::Double(-0.5)], &st, 0).unwrap(), Value::Int(0));
        assert_eq!(n_nint(&[Value::Double(2.49)], &st, 0).unwrap(), Value::Int(2));
    }

    #[test]
    fn trig_degree_convention() {
        let st = ExecState { angle_unit: AngleUnit::Degrees, ..Default::default() };
        let v = n_sin(&[Value::Double(90.0)], &st, 0).unwrap();
        assert!((v.as_double() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn nodata_pair_is_hard_failure() {
        let st = ExecState::default();
        assert!(op_add(&[Value::NoData, Value::Int(1)], &st, 3).is_err());
    }
}
