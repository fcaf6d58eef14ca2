#![allow(dead_code)]

//! Common test utilities: an in-memory DWARF source and logical-IR builders.

use dyntrace_dwarf::{ArgInfo, DwarfError, DwarfReader, DwarfSource, MemberInfo, RetValInfo, VarKind};
use dyntrace_ir::physical::{self, Variable};
use dyntrace_ir::{logical, DeploymentSpec, Language, TracePoint, TracepointType};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging for tests (call once per test).
pub fn init() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("off")
            .try_init()
            .ok();
    });
}

/// One function's debug info.
#[derive(Debug, Clone, Default)]
pub struct FakeFunction {
    pub args: BTreeMap<String, ArgInfo>,
    pub ret: Option<RetValInfo>,
}

/// In-memory DWARF source with symbol and struct layouts registered up
/// front.
#[derive(Debug, Clone, Default)]
pub struct FakeDwarf {
    functions: HashMap<String, FakeFunction>,
    members: HashMap<(String, String), MemberInfo>,
}

impl FakeDwarf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(mut self, symbol: &str, args: &[(&str, ArgInfo)], ret: Option<RetValInfo>) -> Self {
        let function = FakeFunction {
            args: args
                .iter()
                .map(|(name, info)| (name.to_string(), info.clone()))
                .collect(),
            ret,
        };
        self.functions.insert(symbol.to_string(), function);
        self
    }

    pub fn member(mut self, type_name: &str, field: &str, info: MemberInfo) -> Self {
        self.members
            .insert((type_name.to_string(), field.to_string()), info);
        self
    }
}

impl DwarfSource for FakeDwarf {
    type Reader = FakeDwarf;

    fn open(&self, _binary_path: &Path) -> dyntrace_dwarf::Result<Self::Reader> {
        Ok(self.clone())
    }
}

impl DwarfReader for FakeDwarf {
    fn function_arg_info(&mut self, symbol: &str) -> dyntrace_dwarf::Result<BTreeMap<String, ArgInfo>> {
        self.functions
            .get(symbol)
            .map(|function| function.args.clone())
            .ok_or_else(|| DwarfError::FunctionNotFound {
                symbol: symbol.to_string(),
            })
    }

    fn function_ret_info(&mut self, symbol: &str) -> dyntrace_dwarf::Result<RetValInfo> {
        let function =
            self.functions
                .get(symbol)
                .ok_or_else(|| DwarfError::FunctionNotFound {
                    symbol: symbol.to_string(),
                })?;
        Ok(function.ret.clone().unwrap_or_else(RetValInfo::void))
    }

    fn struct_member_info(&mut self, type_name: &str, member: &str) -> dyntrace_dwarf::Result<MemberInfo> {
        self.members
            .get(&(type_name.to_string(), member.to_string()))
            .cloned()
            .ok_or_else(|| DwarfError::MemberNotFound {
                type_name: type_name.to_string(),
                member: member.to_string(),
            })
    }
}

pub fn arg_info(kind: VarKind, type_name: &str, offset: i32) -> ArgInfo {
    ArgInfo {
        kind,
        type_name: type_name.to_string(),
        offset,
    }
}

pub fn ret_info(kind: VarKind, type_name: &str) -> RetValInfo {
    RetValInfo {
        kind,
        type_name: type_name.to_string(),
    }
}

pub fn member_info(kind: VarKind, type_name: &str, offset: i32) -> MemberInfo {
    MemberInfo {
        kind,
        type_name: type_name.to_string(),
        offset,
    }
}

/// A deployment with a single tracepoint, which is the only supported
/// shape.
pub fn deployment(
    language: Language,
    maps: &[&str],
    outputs: &[(&str, &[&str])],
    probes: Vec<logical::Probe>,
) -> logical::TracepointDeployment {
    logical::TracepointDeployment {
        deployment_spec: DeploymentSpec {
            binary_path: PathBuf::from("/usr/bin/traced"),
        },
        tracepoints: vec![logical::Tracepoint {
            program: logical::TracepointProgram {
                language,
                maps: maps
                    .iter()
                    .map(|name| logical::MapSpec {
                        name: name.to_string(),
                    })
                    .collect(),
                outputs: outputs
                    .iter()
                    .map(|(name, fields)| logical::OutputSpec {
                        name: name.to_string(),
                        fields: fields.iter().map(|field| field.to_string()).collect(),
                    })
                    .collect(),
                probes,
            },
        }],
    }
}

pub fn probe(name: &str, symbol: &str, tracepoint_type: TracepointType) -> logical::Probe {
    logical::Probe {
        name: name.to_string(),
        tracepoint: TracePoint {
            symbol: symbol.to_string(),
            tracepoint_type,
        },
        ..Default::default()
    }
}

pub fn argument(id: &str, expr: &str) -> logical::Argument {
    logical::Argument {
        id: id.to_string(),
        expr: expr.to_string(),
    }
}

pub fn ret_val(id: &str, expr: &str) -> logical::ReturnValue {
    logical::ReturnValue {
        id: id.to_string(),
        expr: expr.to_string(),
    }
}

pub fn find_var<'a>(probe: &'a physical::Probe, name: &str) -> Option<&'a Variable> {
    probe.vars.iter().find(|var| var.name() == name)
}

pub fn var_position(probe: &physical::Probe, name: &str) -> Option<usize> {
    probe.vars.iter().position(|var| var.name() == name)
}

/// Every memory variable's base must be defined strictly earlier in the
/// same probe.
pub fn assert_topological(probe: &physical::Probe) {
    for (position, var) in probe.vars.iter().enumerate() {
        if let Variable::Memory { name, base, .. } = var {
            let base_position = var_position(probe, base).unwrap_or_else(|| {
                panic!("memory variable '{name}' references undefined base '{base}'")
            });
            assert!(
                base_position < position,
                "memory variable '{name}' defined before its base '{base}'"
            );
        }
    }
}
