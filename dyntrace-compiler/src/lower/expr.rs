//! Expression lowering: dotted paths against argument and return layouts.
//!
//! Interior hops accumulate a byte offset; pointer hops materialize a
//! dereference variable and restart the offset from its value.

use super::type_map::scalar_type_for;
use super::{Lowerer, RC_VAR_NAME, SP_VAR_NAME};
use crate::{LowerError, Result};
use dyntrace_dwarf::{ArgInfo, DwarfError, DwarfReader, MemberInfo, VarKind};
use dyntrace_ir::physical::{self, Variable};
use dyntrace_ir::{logical, Language, Register};
use tracing::debug;

/// Token appended to a lowered variable name for a field selection hop.
const DOT_TOKEN: &str = "_D_";
/// Token appended to a lowered variable name for a dereference hop.
const DEREF_TOKEN: &str = "_X_";

// DWARF and the probe runtime disagree by 8 bytes on where the stack
// pointer is; frame-base offsets are shifted to the runtime's view.
const STACK_POINTER_BIAS: i32 = 8;

impl<R: DwarfReader> Lowerer<R> {
    pub(super) fn lower_arg_expr(
        &mut self,
        arg: &logical::Argument,
        probe: &mut physical::Probe,
    ) -> Result<()> {
        if arg.expr.is_empty() {
            return Err(LowerError::InvalidArgument(format!(
                "argument '{}' expression cannot be empty",
                arg.id
            )));
        }

        let components: Vec<&str> = arg.expr.split('.').collect();
        let root = self.root_arg_info(&probe.tracepoint.symbol, components[0])?;

        self.lower_var_expr(&arg.id, &root, SP_VAR_NAME, &components, probe)
    }

    pub(super) fn lower_ret_val_expr(
        &mut self,
        ret_val: &logical::ReturnValue,
        probe: &mut physical::Probe,
    ) -> Result<()> {
        if ret_val.expr.is_empty() {
            return Err(LowerError::InvalidArgument(format!(
                "return value '{}' expression cannot be empty",
                ret_val.id
            )));
        }

        let mut components: Vec<String> = ret_val.expr.split('.').map(str::to_string).collect();

        let index: i32 = components[0]
            .strip_prefix('$')
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(|| {
                LowerError::InvalidArgument(format!(
                    "return value expression '{}' invalid, first component must be `$<index>`",
                    ret_val.expr
                ))
            })?;

        match self.language {
            Language::Go => {
                // DWARF names Go return values ~r0, ~r1, ... in the argument
                // frame, with indexing that counts formal parameters and
                // skips the method receiver; the caller carries that burden.
                // TODO: support named return variables.
                components[0] = format!("~r{index}");
                let root = self.root_arg_info(&probe.tracepoint.symbol, &components[0])?;

                let components: Vec<&str> = components.iter().map(String::as_str).collect();
                self.lower_var_expr(&ret_val.id, &root, SP_VAR_NAME, &components, probe)
            }
            Language::C | Language::Cpp => {
                if index != 0 {
                    return Err(LowerError::Unimplemented(format!(
                        "C/C++ only supports a single return value [index={index}]"
                    )));
                }

                match self.retval_info.kind {
                    VarKind::Base => {
                        // A base return is passed directly in the return
                        // register.
                        let scalar_type = scalar_type_for(
                            self.language,
                            self.retval_info.kind,
                            &self.retval_info.type_name,
                        )?;
                        self.add_variable(
                            probe,
                            Variable::Register {
                                name: ret_val.id.clone(),
                                scalar_type,
                                reg: Register::RC,
                            },
                        );
                        Ok(())
                    }
                    VarKind::Pointer => {
                        // An aggregate return comes back as a pointer in the
                        // return register; chase it like an argument rooted
                        // at rc_.
                        let root = ArgInfo {
                            kind: VarKind::Pointer,
                            type_name: self.retval_info.type_name.clone(),
                            offset: 0,
                        };
                        let components: Vec<&str> =
                            components.iter().map(String::as_str).collect();
                        self.lower_var_expr(&ret_val.id, &root, RC_VAR_NAME, &components, probe)
                    }
                    VarKind::Void => Err(LowerError::Unimplemented(format!(
                        "return value '{}' requested, but '{}' returns void",
                        ret_val.id, probe.tracepoint.symbol
                    ))),
                    VarKind::Struct => Err(LowerError::InvariantViolation(format!(
                        "unexpected return kind for '{}': {:?}",
                        probe.tracepoint.symbol, self.retval_info.kind
                    ))),
                }
            }
            _ => Err(LowerError::Unimplemented(format!(
                "return expressions not supported for language {:?}",
                self.language
            ))),
        }
    }

    /// Lower a dotted path into a chain of typed variables ending in a
    /// scalar leaf named `id`.
    ///
    /// `components[0]` is the root, already resolved into `root`; the rest
    /// are struct field names. Intermediate names are seeded from the root
    /// component and decorated per hop, so references in the logical probe
    /// cannot collide with them.
    fn lower_var_expr(
        &mut self,
        id: &str,
        root: &ArgInfo,
        base_var: &str,
        components: &[&str],
        probe: &mut physical::Probe,
    ) -> Result<()> {
        let mut kind = root.kind;
        let mut type_name = root.type_name.clone();
        let mut offset = STACK_POINTER_BIAS + root.offset;
        let mut base = base_var.to_string();
        let mut name = components[0].to_string();

        // components[0] seeded the state above; walk the field hops.
        for field in &components[1..] {
            // A pointer parent becomes a dereference variable the next hop
            // reads through.
            if kind == VarKind::Pointer {
                let scalar_type = scalar_type_for(self.language, kind, &type_name)?;
                name.push_str(DEREF_TOKEN);
                self.add_variable(
                    probe,
                    Variable::Memory {
                        name: name.clone(),
                        scalar_type,
                        base,
                        offset,
                    },
                );
                base = name.clone();
                offset = 0;
            }

            let member = self.member_info(&type_name, field)?;
            offset += member.offset;
            type_name = member.type_name;
            kind = member.kind;
            name.push_str(DOT_TOKEN);
            name.push_str(field);
        }

        // A pointer leaf gets one final dereference. Forcing the kind to
        // base afterwards makes the type mapper reject any pointee that is
        // not a traceable base type.
        if kind == VarKind::Pointer {
            let scalar_type = scalar_type_for(self.language, kind, &type_name)?;
            name.push_str(DEREF_TOKEN);
            self.add_variable(
                probe,
                Variable::Memory {
                    name: name.clone(),
                    scalar_type,
                    base,
                    offset,
                },
            );
            base = name;
            offset = 0;
            kind = VarKind::Base;
        }

        let scalar_type = scalar_type_for(self.language, kind, &type_name)?;

        // The leaf keeps the caller-supplied id so references in the
        // logical probe stay valid.
        self.add_variable(
            probe,
            Variable::Memory {
                name: id.to_string(),
                scalar_type,
                base,
                offset,
            },
        );

        debug!(leaf = id, ?scalar_type, "lowered expression");
        Ok(())
    }

    fn root_arg_info(&self, symbol: &str, name: &str) -> Result<ArgInfo> {
        self.args_map
            .get(name)
            .cloned()
            .ok_or_else(|| LowerError::UnknownArgument {
                symbol: symbol.to_string(),
                name: name.to_string(),
            })
    }

    fn member_info(&mut self, type_name: &str, field: &str) -> Result<MemberInfo> {
        self.reader
            .struct_member_info(type_name, field)
            .map_err(|err| match err {
                DwarfError::MemberNotFound { .. } => LowerError::UnknownField {
                    type_name: type_name.to_string(),
                    field: field.to_string(),
                },
                other => LowerError::Dwarf(other),
            })
    }
}
