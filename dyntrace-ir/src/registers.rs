//! Machine registers the physical IR can name.
//!
//! The downstream generator reads registers out of pt_regs; byte offsets are
//! computed from the kernel bindings so both sides agree on the layout.

use serde::{Deserialize, Serialize};

/// pt_regs byte offsets for the named registers (x86_64).
pub mod pt_regs_offsets {
    use aya_ebpf_bindings::bindings::pt_regs;

    /// Stack pointer.
    pub const RSP: usize = core::mem::offset_of!(pt_regs, rsp);
    /// Return-value register.
    pub const RAX: usize = core::mem::offset_of!(pt_regs, rax);
}

/// Register a physical variable can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Register {
    /// Stack pointer (RSP on x86_64).
    SP,
    /// Return-value register (RAX on x86_64).
    RC,
}

impl Register {
    pub fn name(&self) -> &'static str {
        match self {
            Register::SP => "SP",
            Register::RC => "RC",
        }
    }

    /// Byte offset of the register within pt_regs on x86_64.
    pub fn pt_regs_byte_offset(&self) -> usize {
        match self {
            Register::SP => pt_regs_offsets::RSP,
            Register::RC => pt_regs_offsets::RAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pt_regs_byte_offsets() {
        // pt_regs layout on x86_64: rax at 80, rsp at 152.
        assert_eq!(Register::RC.pt_regs_byte_offset(), 80);
        assert_eq!(Register::SP.pt_regs_byte_offset(), 152);
    }

    #[test]
    fn test_register_names() {
        assert_eq!(Register::SP.name(), "SP");
        assert_eq!(Register::RC.name(), "RC");
    }
}
