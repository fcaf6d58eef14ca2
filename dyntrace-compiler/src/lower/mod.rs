//! The lowering pass: logical probes to physical probes.
//!
//! One `Lowerer` instance serves one deployment. Per-probe symbol state is
//! reset at the start of each probe; the struct registry and the map/output
//! indices persist for the whole assembly.

mod expr;
mod maps;
mod output;
mod symbols;
mod type_map;

use crate::{LowerError, Result};
use dyntrace_dwarf::{ArgInfo, DwarfReader, DwarfSource, RetValInfo};
use dyntrace_ir::physical::{self, BinaryOp, Variable};
use dyntrace_ir::{logical, BpfHelper, FunctionLatency, Language, Register, ScalarType, TracepointType};
use std::collections::{BTreeMap, HashMap};
use symbols::{StructRegistry, SymbolTable};
use tracing::{debug, info};

// Special variables all end with an underscore to limit collisions with
// user ids.
pub(crate) const SP_VAR_NAME: &str = "sp_";
pub(crate) const RC_VAR_NAME: &str = "rc_";
pub(crate) const START_KTIME_NS_VAR_NAME: &str = "start_ktime_ns";

/// Name of the struct type backing a map or output.
pub(crate) fn struct_type_name(object_name: &str) -> String {
    format!("{object_name}_value_t")
}

/// Lower a logical deployment into a physical program.
///
/// The deployment must contain exactly one tracepoint. The DWARF reader is
/// opened once here and dropped when the pass returns, on success or error.
pub fn lower_deployment<S: DwarfSource>(
    input: &logical::TracepointDeployment,
    dwarf: &S,
) -> Result<physical::Program> {
    if input.tracepoints.len() != 1 {
        return Err(LowerError::InvalidArgument(format!(
            "expected exactly 1 tracepoint, got {}",
            input.tracepoints.len()
        )));
    }

    let program_in = &input.tracepoints[0].program;

    info!(
        binary = %input.deployment_spec.binary_path.display(),
        language = ?program_in.language,
        probes = program_in.probes.len(),
        "lowering tracepoint deployment"
    );

    let reader = dwarf.open(&input.deployment_spec.binary_path)?;
    let mut lowerer = Lowerer::new(input, program_in, reader);
    for probe in &program_in.probes {
        lowerer.lower_probe(probe)?;
    }
    Ok(lowerer.finish())
}

/// State of one lowering pass.
pub(crate) struct Lowerer<R: DwarfReader> {
    reader: R,
    language: Language,
    /// Fixed prefix of every output record, in order.
    implicit_columns: Vec<&'static str>,

    program: physical::Program,
    map_index: HashMap<String, usize>,
    output_index: HashMap<String, usize>,
    structs: StructRegistry,

    // Per-probe state, reset by `lower_probe`.
    symbols: SymbolTable,
    args_map: BTreeMap<String, ArgInfo>,
    retval_info: RetValInfo,
}

impl<R: DwarfReader> Lowerer<R> {
    fn new(
        input: &logical::TracepointDeployment,
        program_in: &logical::TracepointProgram,
        reader: R,
    ) -> Self {
        let language = program_in.language;

        let mut implicit_columns = vec![
            BpfHelper::Tgid.variable_name(),
            BpfHelper::TgidStartTime.variable_name(),
            BpfHelper::Ktime.variable_name(),
        ];
        if language == Language::Go {
            implicit_columns.push(BpfHelper::Goid.variable_name());
        }

        let mut program = physical::Program {
            deployment_spec: input.deployment_spec.clone(),
            language,
            ..Default::default()
        };

        // Index maps and outputs for quick lookups.
        let mut map_index = HashMap::new();
        for map in &program_in.maps {
            map_index.insert(map.name.clone(), program.maps.len());
            program.maps.push(physical::Map {
                name: map.name.clone(),
                key_type: None,
                value_struct: None,
            });
        }

        let mut output_index = HashMap::new();
        for out in &program_in.outputs {
            output_index.insert(out.name.clone(), program.outputs.len());
            program.outputs.push(physical::PerfBufferOutput {
                name: out.name.clone(),
                fields: out.fields.clone(),
                struct_type: struct_type_name(&out.name),
            });
        }

        Self {
            reader,
            language,
            implicit_columns,
            program,
            map_index,
            output_index,
            structs: StructRegistry::new(),
            symbols: SymbolTable::new(),
            args_map: BTreeMap::new(),
            retval_info: RetValInfo::void(),
        }
    }

    fn lower_probe(&mut self, input: &logical::Probe) -> Result<()> {
        debug!(probe = %input.name, symbol = %input.tracepoint.symbol, "lowering probe");

        self.args_map = self.reader.function_arg_info(&input.tracepoint.symbol)?;
        self.retval_info = self.reader.function_ret_info(&input.tracepoint.symbol)?;
        self.symbols.clear();

        let mut probe = physical::Probe {
            name: input.name.clone(),
            tracepoint: input.tracepoint.clone(),
            ..Default::default()
        };

        self.add_special_variables(input, &mut probe);

        for constant in &input.consts {
            self.lower_constant(constant, &mut probe);
        }
        for arg in &input.args {
            self.lower_arg_expr(arg, &mut probe)?;
        }
        for ret_val in &input.ret_vals {
            self.lower_ret_val_expr(ret_val, &mut probe)?;
        }
        for map_val in &input.map_vals {
            self.lower_map_value(map_val, &mut probe)?;
        }
        if let Some(latency) = &input.function_latency {
            self.lower_function_latency(latency, &mut probe)?;
        }
        for stash in &input.map_stash_actions {
            self.lower_stash_action(stash, &mut probe)?;
        }
        for delete in &input.map_delete_actions {
            self.lower_delete_action(delete, &mut probe);
        }
        for action in &input.output_actions {
            self.lower_output_action(action, &mut probe)?;
        }
        probe.printks = input.printks.clone();

        self.program.probes.push(probe);
        Ok(())
    }

    fn finish(self) -> physical::Program {
        let mut program = self.program;
        program.structs = self.structs.into_decls();
        program
    }

    /// Append a variable to the probe, recording scalar-typed ones in the
    /// symbol table.
    fn add_variable(&mut self, probe: &mut physical::Probe, var: Variable) {
        if let Some(scalar_type) = var.scalar_type() {
            self.symbols.define(var.name(), scalar_type);
        }
        probe.vars.push(var);
    }

    fn add_special_variables(&mut self, input: &logical::Probe, probe: &mut physical::Probe) {
        self.add_standard_variables(probe);
        if input.tracepoint.tracepoint_type == TracepointType::Return {
            self.add_ret_probe_variables(probe);
        }
    }

    // TODO: emit only the helpers a probe actually references; for now every
    // probe carries the full set.
    fn add_standard_variables(&mut self, probe: &mut physical::Probe) {
        self.add_variable(
            probe,
            Variable::Register {
                name: SP_VAR_NAME.to_string(),
                scalar_type: ScalarType::VoidPointer,
                reg: Register::SP,
            },
        );

        for (builtin, scalar_type) in [
            (BpfHelper::Tgid, ScalarType::Int32),
            (BpfHelper::TgidPid, ScalarType::UInt64),
            (BpfHelper::TgidStartTime, ScalarType::UInt64),
            (BpfHelper::Ktime, ScalarType::UInt64),
        ] {
            self.add_variable(
                probe,
                Variable::Builtin {
                    name: builtin.variable_name().to_string(),
                    scalar_type,
                    builtin,
                },
            );
        }

        if self.language == Language::Go {
            self.add_variable(
                probe,
                Variable::Builtin {
                    name: BpfHelper::Goid.variable_name().to_string(),
                    scalar_type: ScalarType::Int64,
                    builtin: BpfHelper::Goid,
                },
            );
        }
    }

    /// On return probes for C and C++, the return value register is exposed
    /// for pointer-return chasing.
    fn add_ret_probe_variables(&mut self, probe: &mut physical::Probe) {
        if matches!(self.language, Language::C | Language::Cpp) {
            self.add_variable(
                probe,
                Variable::Register {
                    name: RC_VAR_NAME.to_string(),
                    scalar_type: ScalarType::VoidPointer,
                    reg: Register::RC,
                },
            );
        }
    }

    fn lower_constant(&mut self, constant: &logical::Constant, probe: &mut physical::Probe) {
        self.add_variable(
            probe,
            Variable::Constant {
                name: constant.name.clone(),
                scalar_type: constant.scalar_type,
                value: constant.value.clone(),
            },
        );
    }

    /// Latency is the kernel time at this probe minus the entry time read
    /// back out of a map, so the stashed start time must already have been
    /// unpacked into the probe.
    fn lower_function_latency(
        &mut self,
        latency: &FunctionLatency,
        probe: &mut physical::Probe,
    ) -> Result<()> {
        if !self.symbols.contains(START_KTIME_NS_VAR_NAME) {
            return Err(LowerError::UnknownVariable {
                name: START_KTIME_NS_VAR_NAME.to_string(),
                context: format!(
                    "function latency '{}' requires a prior map read of the stashed start time",
                    latency.id
                ),
            });
        }

        self.add_variable(
            probe,
            Variable::BinaryExpr {
                name: latency.id.clone(),
                scalar_type: ScalarType::Int64,
                op: BinaryOp::Sub,
                lhs: BpfHelper::Ktime.variable_name().to_string(),
                rhs: START_KTIME_NS_VAR_NAME.to_string(),
            },
        );
        probe.function_latency = Some(latency.clone());
        Ok(())
    }
}
