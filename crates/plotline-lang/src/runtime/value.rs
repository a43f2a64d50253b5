//! The typed value container every node evaluation produces.
//!
//! Three states only: `NoData` (the failure/untyped sentinel), integer, and
//! double. Binary operator implementations dispatch exclusively on
//! `DataPair`; any pair involving NoData is unmatched and fails.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    NoData,
    Int(i64),
    Double(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    NoData,
    Int,
    Double,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::NoData => "nodata",
            DataType::Int    => "int",
            DataType::Double => "double",
        }
    }
}

/// Which of {int, double} × {int, double} a binary operator's operands form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPair {
    IntInt,
    IntDbl,
    DblInt,
    DblDbl,
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::NoData    => DataType::NoData,
            Value::Int(_)    => DataType::Int,
            Value::Double(_) => DataType::Double,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.data_type().name()
    }

    /// Narrowing read; doubles truncate toward zero, NoData reads as 0.
    pub fn as_int(&self) -> i64 {
        match self {
            Value::NoData    => 0,
            Value::Int(i)    => *i,
            Value::Double(d) => *d as i64,
        }
    }

    /// Widening read; NoData reads as 0.0.
    pub fn as_double(&self) -> f64 {
        match self {
            Value::NoData    => 0.0,
            Value::Int(i)    => *i as f64,
            Value::Double(d) => *d,
        }
    }

    /// True iff the numeric value is strictly positive. Zero and all
    /// negatives are false; this is not a "nonzero is true" language.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::NoData    => false,
            Value::Int(i)    => *i > 0,
            Value::Double(d) => *d > 0.0,
        }
    }

    /// In-place `++`. Returns false on NoData, a usage error the caller
    /// must surface.
    pub fn increase(&mut self) -> bool {
        match self {
            Value::NoData    => false,
            Value::Int(i)    => { *i = i.wrapping_add(1); true }
            Value::Double(d) => { *d += 1.0; true }
        }
    }

    /// In-place `--`. Returns false on NoData.
    pub fn decrease(&mut self) -> bool {
        match self {
            Value::NoData    => false,
            Value::Int(i)    => { *i = i.wrapping_sub(1); true }
            Value::Double(d) => { *d -= 1.0; true }
        }
    }

    /// Pairing code for binary dispatch. `None` when either side is NoData.
    pub fn data_pair(&self, other: &Value) -> Option<DataPair> {
        match (self, other) {
            (Value::Int(_),    Value::Int(_))    => Some(DataPair::IntInt),
            (Value::Int(_),    Value::Double(_)) => Some(DataPair::IntDbl),
            (Value::Double(_), Value::Int(_))    => Some(DataPair::DblInt),
            (Value::Double(_), Value::Double(_)) => Some(DataPair::DblDbl),
            _ => None,
        }
    }

    /// Convert to the storage type of a typed variable slot.
    pub fn coerce(self, ty: DataType) -> Value {
        match ty {
            DataType::NoData => self,
            DataType::Int    => Value::Int(self.as_int()),
            DataType::Double => Value::Double(self.as_double()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Int(v) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Double(v) }
}

/// Diagnostic rendering only; the language has no string type.
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::NoData    => write!(f, "<nodata>"),
            Value::Int(i)    => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_int_truncates_toward_zero() {
        assert_eq!(Value::Double(2.9).as_int(), 2);
        assert_eq!(Value::Double(-2.9).as_int(), -2);
    }

    #[test]
    fn as_bool_is_strictly_positive() {
        assert!(Value::Int(1).as_bool());
        assert!(Value::Double(0.1).as_bool());
        assert!(!Value::Int(0).as_bool());
        assert!(!Value::Double(0.0).as_bool());
        assert!(!Value::Int(-5).as_bool());
        assert!(!Value::Double(-0.1).as_bool());
        assert!(!Value::NoData.as_bool());
    }

    #[test]
    fn pair_codes() {
        assert_eq!(Value::Int(1).data_pair(&Value::Int(2)), Some(DataPair::IntInt));
        assert_eq!(Value::Int(1).data_pair(&Value::Double(2.0)), Some(DataPair::IntDbl));
        assert_eq!(Value::Double(1.0).data_pair(&Value::Int(2)), Some(DataPair::DblInt));
        assert_eq!(Value::Double(1.0).data_pair(&Value::Double(2.0)), Some(DataPair::DblDbl));
        assert_eq!(Value::NoData.data_pair(&Value::Int(2)), None);
        assert_eq!(Value::Int(1).data_pair(&Value::NoData), None);
    }

    #[test]
    fn increase_decrease() {
        let mut v = Value::Int(4);
        assert!(v.increase());
        assert_eq!(v, Value::Int(5));

        let mut v = Value::Double(1.5);
        assert!(v.decrease());
        assert_eq!(v, Value::Double(0.5));

        let mut v = Value::NoData;
        assert!(!v.increase());
    }

    #[test]
    fn coerce_to_slot_type() {
        assert_eq!(Value::Double(2.7).coerce(DataType::Int), Value::Int(2));
        assert_eq!(Value::Int(3).coerce(DataType::Double), Value::Double(3.0));
    }
}
