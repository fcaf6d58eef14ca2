//! Error type for the DWARF adapter.

use std::path::PathBuf;

/// Errors surfaced by a DWARF reader implementation.
#[derive(thiserror::Error, Debug)]
pub enum DwarfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no debug info for binary: {path}")]
    MissingDebugInfo { path: PathBuf },
    #[error("function not found: {symbol}")]
    FunctionNotFound { symbol: String },
    #[error("struct member not found: {type_name}.{member}")]
    MemberNotFound { type_name: String, member: String },
    #[error("DWARF read error: {0}")]
    ReadError(String),
}

/// Result type used throughout the adapter.
pub type Result<T> = std::result::Result<T, DwarfError>;
