//! Map access lowering: reads, stash writes, deletes.

use super::{struct_type_name, Lowerer};
use crate::{LowerError, Result};
use dyntrace_dwarf::DwarfReader;
use dyntrace_ir::physical::{self, StructDecl, StructField, Variable};
use dyntrace_ir::{logical, ScalarType};
use tracing::debug;

impl<R: DwarfReader> Lowerer<R> {
    /// Lower a map read into a lookup pointer plus typed member extraction
    /// for each requested id.
    pub(super) fn lower_map_value(
        &mut self,
        map_val: &logical::MapValue,
        probe: &mut physical::Probe,
    ) -> Result<()> {
        if !self.map_index.contains_key(&map_val.map_name) {
            return Err(LowerError::UnknownMap {
                probe: probe.name.clone(),
                name: map_val.map_name.clone(),
            });
        }

        // The value struct is fixed by the stash that populated the map; a
        // read before any stash has nothing to unpack.
        let struct_type = struct_type_name(&map_val.map_name);
        let Some(decl) = self.structs.get(&struct_type) else {
            return Err(LowerError::InvariantViolation(format!(
                "map '{}' read before any stash registered struct '{}' [probe={}]",
                map_val.map_name, struct_type, probe.name
            )));
        };

        if map_val.value_ids.len() > decl.fields.len() {
            return Err(LowerError::InvariantViolation(format!(
                "map '{}' read extracts {} values, but struct '{}' has {} fields",
                map_val.map_name,
                map_val.value_ids.len(),
                struct_type,
                decl.fields.len()
            )));
        }
        let fields: Vec<StructField> = decl.fields[..map_val.value_ids.len()].to_vec();

        let ptr_name = format!("{}_ptr", map_val.map_name);
        self.add_variable(
            probe,
            Variable::MapLookup {
                name: ptr_name.clone(),
                struct_type,
                map_name: map_val.map_name.clone(),
                key_variable_name: map_val.key.variable_name().to_string(),
            },
        );

        // Unpack the requested ids from the struct's leading fields.
        for (value_id, field) in map_val.value_ids.iter().zip(fields) {
            self.add_variable(
                probe,
                Variable::Member {
                    name: value_id.clone(),
                    scalar_type: field.scalar_type,
                    struct_base: ptr_name.clone(),
                    is_struct_base_pointer: true,
                    field: field.name,
                },
            );
        }

        Ok(())
    }

    /// Lower a stash: build and register the value struct, type the map,
    /// materialize the value aggregate, and emit the action.
    pub(super) fn lower_stash_action(
        &mut self,
        stash: &logical::MapStashAction,
        probe: &mut physical::Probe,
    ) -> Result<()> {
        let value_name = format!("{}_value", stash.map_name);
        let struct_type = struct_type_name(&stash.map_name);

        debug!(map = %stash.map_name, value_struct = %struct_type, "lowering stash action");

        let decl = self.map_value_struct(stash, &struct_type)?;
        self.structs.register(decl)?;
        self.populate_map_types(&stash.map_name, &struct_type, probe)?;

        self.add_variable(
            probe,
            Variable::StructAlloc {
                name: value_name.clone(),
                struct_type,
                field_assignments: stash
                    .value_variable_names
                    .iter()
                    .map(|name| physical::FieldAssignment {
                        field_name: name.clone(),
                        variable_name: name.clone(),
                    })
                    .collect(),
            },
        );

        probe.map_stash_actions.push(physical::MapStashAction {
            map_name: stash.map_name.clone(),
            key_variable_name: stash.key.variable_name().to_string(),
            value_variable_name: value_name,
            cond: stash.cond.clone(),
        });

        Ok(())
    }

    pub(super) fn lower_delete_action(
        &mut self,
        delete: &logical::MapDeleteAction,
        probe: &mut physical::Probe,
    ) {
        probe.map_delete_actions.push(physical::MapDeleteAction {
            map_name: delete.map_name.clone(),
            key_variable_name: delete.key.variable_name().to_string(),
        });
    }

    /// One struct field per stashed variable, typed from the symbol table.
    fn map_value_struct(
        &self,
        stash: &logical::MapStashAction,
        struct_type: &str,
    ) -> Result<StructDecl> {
        let mut fields = Vec::with_capacity(stash.value_variable_names.len());
        for name in &stash.value_variable_names {
            let scalar_type =
                self.symbols
                    .lookup(name)
                    .ok_or_else(|| LowerError::UnknownVariable {
                        name: name.clone(),
                        context: format!("stash to map '{}'", stash.map_name),
                    })?;
            fields.push(StructField {
                name: name.clone(),
                scalar_type,
            });
        }
        Ok(StructDecl {
            name: struct_type.to_string(),
            fields,
        })
    }

    /// Maps are keyed by the builtin-derived u64 and hold the stashed value
    /// struct; the struct registry has already rejected any schema conflict.
    fn populate_map_types(
        &mut self,
        map_name: &str,
        struct_type: &str,
        probe: &physical::Probe,
    ) -> Result<()> {
        let Some(&index) = self.map_index.get(map_name) else {
            return Err(LowerError::UnknownMap {
                probe: probe.name.clone(),
                name: map_name.to_string(),
            });
        };

        let map = &mut self.program.maps[index];
        map.key_type = Some(ScalarType::UInt64);
        map.value_struct = Some(struct_type.to_string());
        Ok(())
    }
}
