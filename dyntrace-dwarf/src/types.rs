//! Plain data returned by the adapter's queries.

/// DWARF classification of a variable or member type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Base,
    Pointer,
    Struct,
    Void,
}

/// Layout of one function argument.
///
/// `offset` is relative to the frame base. For `Pointer` kinds, `type_name`
/// names the pointee type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgInfo {
    pub kind: VarKind,
    pub type_name: String,
    pub offset: i32,
}

/// Layout of a function's return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetValInfo {
    pub kind: VarKind,
    pub type_name: String,
}

impl RetValInfo {
    /// Return info for a function with no return value.
    pub fn void() -> Self {
        Self {
            kind: VarKind::Void,
            type_name: String::new(),
        }
    }
}

/// Layout of one struct member. `offset` is relative to the start of the
/// parent struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub kind: VarKind,
    pub type_name: String,
    pub offset: i32,
}
