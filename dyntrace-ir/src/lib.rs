//! dyntrace IR definitions.
//!
//! The logical IR describes what to trace; the physical IR is the lowered
//! program handed to the probe bytecode generator.

pub mod logical;
pub mod physical;
pub mod registers;
pub mod types;

pub use registers::Register;
pub use types::{
    BpfHelper, Condition, ConditionOp, DeploymentSpec, FunctionLatency, Language, Printk,
    ScalarType, TracePoint, TracepointType,
};
