//! Logical tracing IR: the authored description of what to trace.
//!
//! Everything here is name-based. Memory offsets, dereference chains, and
//! struct schemas only appear once the lowering pass has produced the
//! physical IR.

use crate::types::{
    BpfHelper, Condition, DeploymentSpec, FunctionLatency, Language, Printk, ScalarType,
    TracePoint,
};
use serde::{Deserialize, Serialize};

/// Top-level input to the lowering pass: one deployment spec plus its
/// tracepoints. Exactly one tracepoint is supported per deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TracepointDeployment {
    pub deployment_spec: DeploymentSpec,
    pub tracepoints: Vec<Tracepoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Tracepoint {
    pub program: TracepointProgram,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TracepointProgram {
    pub language: Language,
    pub maps: Vec<MapSpec>,
    pub outputs: Vec<OutputSpec>,
    pub probes: Vec<Probe>,
}

/// Declares an in-kernel map by name. Key and value types are assigned
/// during lowering, when the first stash fixes the value schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSpec {
    pub name: String,
}

/// Declares a perf-buffer output and its record field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Probe {
    pub name: String,
    pub tracepoint: TracePoint,
    pub consts: Vec<Constant>,
    pub args: Vec<Argument>,
    pub ret_vals: Vec<ReturnValue>,
    pub map_vals: Vec<MapValue>,
    pub function_latency: Option<FunctionLatency>,
    pub map_stash_actions: Vec<MapStashAction>,
    pub map_delete_actions: Vec<MapDeleteAction>,
    pub output_actions: Vec<OutputAction>,
    pub printks: Vec<Printk>,
}

/// A literal value emitted into the probe under the given name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub scalar_type: ScalarType,
    pub value: String,
}

/// A dotted path against a function argument: the first component is the
/// argument name, the rest are struct field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub id: String,
    pub expr: String,
}

/// A dotted path against a return value. The first component is
/// `$<index>`.
///
/// For Go the index follows DWARF's `~r<n>` convention, which counts formal
/// parameters and skips the method receiver; callers must account for this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnValue {
    pub id: String,
    pub expr: String,
}

/// Reads the value stored in a map under a builtin-derived key, unpacking
/// the listed ids from the value struct's leading fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    pub map_name: String,
    pub key: BpfHelper,
    pub value_ids: Vec<String>,
}

/// Writes the named variables into a map under a builtin-derived key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapStashAction {
    pub map_name: String,
    pub key: BpfHelper,
    pub value_variable_names: Vec<String>,
    pub cond: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDeleteAction {
    pub map_name: String,
    pub key: BpfHelper,
}

/// Sends the named variables to a perf-buffer output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputAction {
    pub output_name: String,
    pub variable_names: Vec<String>,
}
