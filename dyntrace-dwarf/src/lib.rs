//! Narrow DWARF adapter for the dyntrace lowering pass.
//!
//! The concrete reader (ELF parsing, DWARF walking) lives outside this
//! crate; the pass depends only on the traits and plain data types defined
//! here.

mod errors;
mod reader;
mod types;

pub use errors::{DwarfError, Result};
pub use reader::{DwarfReader, DwarfSource};
pub use types::{ArgInfo, MemberInfo, RetValInfo, VarKind};
