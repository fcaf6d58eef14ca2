//! Types shared by the logical input and the physical output.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source language of the traced binary.
///
/// Per-language behavior is confined to the type mapper, the
/// special-variable injector, and the return-value binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    Unknown,
    Go,
    C,
    Cpp,
}

/// Scalar type of a traced variable.
///
/// This is a closed set: aggregates are never traceable leaves, with the
/// exception of the two Go built-ins mapped to `String` and `ByteArray`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    Bool,

    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,

    // Platform-width integers.
    Int,
    UInt,

    // C and C++ spellings.
    Short,
    UShort,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Char,
    UChar,

    Float,
    Double,

    VoidPointer,

    // Go built-ins.
    String,
    ByteArray,
}

/// Fixed helpers exposed by the probe runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BpfHelper {
    Goid,
    Tgid,
    TgidPid,
    TgidStartTime,
    Ktime,
}

impl BpfHelper {
    /// Name of the probe-local variable each helper is materialized into.
    ///
    /// All special variables end with an underscore to limit collisions with
    /// user ids. `time_` is implicitly referenced by the downstream query
    /// engine as the time column and must not be renamed.
    pub fn variable_name(&self) -> &'static str {
        match self {
            BpfHelper::Goid => "goid_",
            BpfHelper::Tgid => "tgid_",
            BpfHelper::TgidPid => "tgid_pid_",
            BpfHelper::TgidStartTime => "tgid_start_time_",
            BpfHelper::Ktime => "time_",
        }
    }
}

/// Whether a probe fires on function entry or return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TracepointType {
    #[default]
    Entry,
    Return,
}

/// Location in the traced binary where a probe attaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TracePoint {
    pub symbol: String,
    pub tracepoint_type: TracepointType,
}

/// Identifies the traced binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeploymentSpec {
    pub binary_path: PathBuf,
}

/// Guard condition on a map stash action, copied through unchanged by the
/// lowering pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub op: ConditionOp,
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOp {
    Equal,
}

/// Request to materialize the entry-to-return latency of the traced
/// function under the given id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionLatency {
    pub id: String,
}

/// Debug-print directive, copied through unchanged by the lowering pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Printk {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_variable_names() {
        assert_eq!(BpfHelper::Goid.variable_name(), "goid_");
        assert_eq!(BpfHelper::Tgid.variable_name(), "tgid_");
        assert_eq!(BpfHelper::TgidPid.variable_name(), "tgid_pid_");
        assert_eq!(BpfHelper::TgidStartTime.variable_name(), "tgid_start_time_");
        assert_eq!(BpfHelper::Ktime.variable_name(), "time_");
    }
}
