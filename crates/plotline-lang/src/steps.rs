//! Host accessor hook for path expressions (`base.step.step`).
//!
//! The engine only defines the seam: a compile-time facet that types each
//! step against the declared type of whatever precedes it, and a runtime
//! facet that reads the step's value. Binding onto datasets, panes, and the
//! rest of the host object model lives entirely on the host side.

use crate::error::RuntimeError;
use crate::runtime::value::{DataType, Value};

pub trait StepResolver {
    /// Compile-time: the declared return type of accessor `name` applied to
    /// a value of type `parent`, or `None` if no such accessor exists.
    fn resolve(&self, parent: DataType, name: &str) -> Option<DataType>;

    /// Runtime: read accessor `name` off `parent`.
    fn read(&self, parent: &Value, name: &str, line: usize) -> Result<Value, RuntimeError>;
}

/// Default resolver; no accessors exist. Any path expression fails to
/// compile against this.
pub struct NoSteps;

impl StepResolver for NoSteps {
    fn resolve(&self, _parent: DataType, _name: &str) -> Option<DataType> {
        None
    }

    fn read(&self, parent: &Value, name: &str, line: usize) -> Result<Value, RuntimeError> {
        Err(RuntimeError::new(line, format!(
            "`{}` has no accessor `{name}`", parent.type_name()
        )))
    }
}
