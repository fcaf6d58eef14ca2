//! Physical probe IR: the lowered program consumed by the bytecode
//! generator.
//!
//! Variables reference each other by string name rather than by pointer, and
//! storage is an ordered append list, so definition order is the dependency
//! order and the whole program serializes trivially.

use crate::registers::Register;
use crate::types::{
    BpfHelper, Condition, DeploymentSpec, FunctionLatency, Language, Printk, ScalarType,
    TracePoint,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Program {
    pub deployment_spec: DeploymentSpec,
    pub language: Language,
    pub maps: Vec<Map>,
    pub outputs: Vec<PerfBufferOutput>,
    pub structs: Vec<StructDecl>,
    pub probes: Vec<Probe>,
}

/// An in-kernel map with its key scalar type and value struct assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    pub name: String,
    pub key_type: Option<ScalarType>,
    pub value_struct: Option<String>,
}

/// A perf-buffer output whose record schema is the named struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfBufferOutput {
    pub name: String,
    pub fields: Vec<String>,
    pub struct_type: String,
}

/// A named aggregate with ordered scalar fields. Structs are
/// content-addressed by name; a registered struct is never redefined with a
/// different shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<StructField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub scalar_type: ScalarType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Probe {
    pub name: String,
    pub tracepoint: TracePoint,
    pub vars: Vec<Variable>,
    pub map_stash_actions: Vec<MapStashAction>,
    pub map_delete_actions: Vec<MapDeleteAction>,
    pub output_actions: Vec<OutputAction>,
    pub printks: Vec<Printk>,
    pub function_latency: Option<FunctionLatency>,
}

/// A fully lowered variable. Every variant carries its own access recipe;
/// the downstream generator pattern-matches exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Bound to a machine register.
    Register {
        name: String,
        scalar_type: ScalarType,
        reg: Register,
    },
    /// Bound to a probe-runtime helper.
    Builtin {
        name: String,
        scalar_type: ScalarType,
        builtin: BpfHelper,
    },
    /// A literal of the declared scalar type.
    Constant {
        name: String,
        scalar_type: ScalarType,
        value: String,
    },
    /// A read of `offset` bytes displaced from the address held in `base`.
    /// `base` is always defined earlier in the same probe.
    Memory {
        name: String,
        scalar_type: ScalarType,
        base: String,
        offset: i32,
    },
    /// A pointer into a map's value struct, keyed by a named variable.
    MapLookup {
        name: String,
        struct_type: String,
        map_name: String,
        key_variable_name: String,
    },
    /// A field extracted from a struct-typed variable.
    Member {
        name: String,
        scalar_type: ScalarType,
        struct_base: String,
        is_struct_base_pointer: bool,
        field: String,
    },
    /// A stack-allocated aggregate assembled from named variables.
    StructAlloc {
        name: String,
        struct_type: String,
        field_assignments: Vec<FieldAssignment>,
    },
    /// `lhs <op> rhs` over two named variables.
    BinaryExpr {
        name: String,
        scalar_type: ScalarType,
        op: BinaryOp,
        lhs: String,
        rhs: String,
    },
}

impl Variable {
    pub fn name(&self) -> &str {
        match self {
            Variable::Register { name, .. }
            | Variable::Builtin { name, .. }
            | Variable::Constant { name, .. }
            | Variable::Memory { name, .. }
            | Variable::MapLookup { name, .. }
            | Variable::Member { name, .. }
            | Variable::StructAlloc { name, .. }
            | Variable::BinaryExpr { name, .. } => name,
        }
    }

    /// Scalar type of the variable; struct-typed variants have none.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Variable::Register { scalar_type, .. }
            | Variable::Builtin { scalar_type, .. }
            | Variable::Constant { scalar_type, .. }
            | Variable::Memory { scalar_type, .. }
            | Variable::Member { scalar_type, .. }
            | Variable::BinaryExpr { scalar_type, .. } => Some(*scalar_type),
            Variable::MapLookup { .. } | Variable::StructAlloc { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAssignment {
    pub field_name: String,
    pub variable_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Sub,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapStashAction {
    pub map_name: String,
    pub key_variable_name: String,
    pub value_variable_name: String,
    pub cond: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDeleteAction {
    pub map_name: String,
    pub key_variable_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputAction {
    pub perf_buffer_name: String,
    pub variable_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_name_and_scalar_type() {
        let var = Variable::Memory {
            name: "x_X_".to_string(),
            scalar_type: ScalarType::VoidPointer,
            base: "sp_".to_string(),
            offset: 16,
        };
        assert_eq!(var.name(), "x_X_");
        assert_eq!(var.scalar_type(), Some(ScalarType::VoidPointer));

        let var = Variable::StructAlloc {
            name: "out_value".to_string(),
            struct_type: "out_value_t".to_string(),
            field_assignments: vec![],
        };
        assert_eq!(var.name(), "out_value");
        assert_eq!(var.scalar_type(), None);
    }

    #[test]
    fn test_program_json_round_trip() {
        let program = Program {
            language: Language::Go,
            structs: vec![StructDecl {
                name: "out_value_t".to_string(),
                fields: vec![StructField {
                    name: "time_".to_string(),
                    scalar_type: ScalarType::UInt64,
                }],
            }],
            ..Default::default()
        };

        let json = serde_json::to_string(&program).unwrap();
        let parsed: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, program);
    }
}
