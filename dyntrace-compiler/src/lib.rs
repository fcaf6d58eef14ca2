//! Probe lowering compiler.
//!
//! Takes a logical tracing specification and produces a physical probe
//! program in which every variable has an explicit memory-access recipe and
//! every map and output has a concrete struct schema. The pass is
//! single-threaded and fail-fast: the first error aborts assembly and no
//! partial program is returned.

mod lower;

use dyntrace_dwarf::{DwarfError, VarKind};
use dyntrace_ir::{physical, Language};

pub use lower::lower_deployment;

/// Errors produced by the lowering pass.
#[derive(Debug, thiserror::Error)]
pub enum LowerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown argument '{name}' for symbol '{symbol}'")]
    UnknownArgument { symbol: String, name: String },

    #[error("unknown field '{field}' on type '{type_name}'")]
    UnknownField { type_name: String, field: String },

    #[error("unknown variable '{name}' ({context})")]
    UnknownVariable { name: String, context: String },

    #[error("reference to undeclared map '{name}' [probe={probe}]")]
    UnknownMap { probe: String, name: String },

    #[error("reference to undeclared output '{name}' [probe={probe}]")]
    UnknownOutput { probe: String, name: String },

    #[error("unsupported type: kind={kind:?} name='{type_name}' [language={language:?}]")]
    TypeUnsupported {
        language: Language,
        kind: VarKind,
        type_name: String,
    },

    #[error("DWARF error: {0}")]
    Dwarf(#[from] DwarfError),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("not implemented: {0}")]
    Unimplemented(String),
}

pub type Result<T> = std::result::Result<T, LowerError>;

/// Serialize a lowered program to `<filename>.json` for inspection.
pub fn save_program_to_file(program: &physical::Program, filename: &str) -> std::io::Result<()> {
    let file_path = format!("{filename}.json");
    let json = serde_json::to_vec_pretty(program)?;
    std::fs::write(&file_path, json)
}
