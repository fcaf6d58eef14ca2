//! Reader traits: the interface the lowering pass drives.

use crate::errors::Result;
use crate::types::{ArgInfo, MemberInfo, RetValInfo};
use std::collections::BTreeMap;
use std::path::Path;

/// Query interface over one binary's debug info.
///
/// The pass calls `function_arg_info` and `function_ret_info` once per
/// probe, and `struct_member_info` once per field hop while chasing an
/// expression; implementations may parse lazily.
pub trait DwarfReader {
    /// Argument layout of `symbol`, keyed by argument name.
    ///
    /// For Go binaries this also covers return values, which DWARF names
    /// `~r0`, `~r1`, ... in the argument frame.
    fn function_arg_info(&mut self, symbol: &str) -> Result<BTreeMap<String, ArgInfo>>;

    /// Return-value layout of `symbol`.
    fn function_ret_info(&mut self, symbol: &str) -> Result<RetValInfo>;

    /// Kind, type name, and byte offset of `member` within `type_name`.
    fn struct_member_info(&mut self, type_name: &str, member: &str) -> Result<MemberInfo>;
}

/// Opens readers for traced binaries.
pub trait DwarfSource {
    type Reader: DwarfReader;

    fn open(&self, binary_path: &Path) -> Result<Self::Reader>;
}
