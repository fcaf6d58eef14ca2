//! Per-probe symbol table and program-wide struct registry.

use crate::{LowerError, Result};
use dyntrace_ir::physical::StructDecl;
use dyntrace_ir::ScalarType;
use std::collections::HashMap;

/// Name to scalar type for every variable emitted into the current probe.
#[derive(Debug, Default)]
pub(crate) struct SymbolTable {
    types: HashMap<String, ScalarType>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.types.clear();
    }

    pub fn define(&mut self, name: &str, scalar_type: ScalarType) {
        self.types.insert(name.to_string(), scalar_type);
    }

    pub fn lookup(&self, name: &str) -> Option<ScalarType> {
        self.types.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}

/// Ordered struct registry shared across probes.
///
/// Structs are content-addressed by name. Re-registering an identical shape
/// is idempotent; a different shape is rejected, which is what keeps map
/// value schemas consistent across stashes from different probes.
#[derive(Debug, Default)]
pub(crate) struct StructRegistry {
    decls: Vec<StructDecl>,
    index: HashMap<String, usize>,
}

impl StructRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, decl: StructDecl) -> Result<()> {
        if let Some(&i) = self.index.get(&decl.name) {
            if self.decls[i] != decl {
                return Err(LowerError::InvariantViolation(format!(
                    "struct '{}' redefined with a different shape",
                    decl.name
                )));
            }
            return Ok(());
        }
        self.index.insert(decl.name.clone(), self.decls.len());
        self.decls.push(decl);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&StructDecl> {
        self.index.get(name).map(|&i| &self.decls[i])
    }

    pub fn into_decls(self) -> Vec<StructDecl> {
        self.decls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyntrace_ir::physical::StructField;

    fn decl(name: &str, fields: &[(&str, ScalarType)]) -> StructDecl {
        StructDecl {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(f, t)| StructField {
                    name: f.to_string(),
                    scalar_type: *t,
                })
                .collect(),
        }
    }

    #[test]
    fn test_register_identical_shape_is_idempotent() {
        let mut registry = StructRegistry::new();
        registry
            .register(decl("m_value_t", &[("time_", ScalarType::UInt64)]))
            .unwrap();
        registry
            .register(decl("m_value_t", &[("time_", ScalarType::UInt64)]))
            .unwrap();

        assert_eq!(registry.into_decls().len(), 1);
    }

    #[test]
    fn test_register_conflicting_shape_is_rejected() {
        let mut registry = StructRegistry::new();
        registry
            .register(decl("m_value_t", &[("time_", ScalarType::UInt64)]))
            .unwrap();

        let err = registry
            .register(decl("m_value_t", &[("tgid_", ScalarType::Int32)]))
            .unwrap_err();
        assert!(matches!(err, LowerError::InvariantViolation(_)));
    }

    #[test]
    fn test_symbol_table_clear() {
        let mut symbols = SymbolTable::new();
        symbols.define("a", ScalarType::Int);
        assert_eq!(symbols.lookup("a"), Some(ScalarType::Int));

        symbols.clear();
        assert!(!symbols.contains("a"));
    }
}
