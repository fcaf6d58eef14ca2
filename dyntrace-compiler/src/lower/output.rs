//! Output record emission: implicit columns plus the output's declared
//! fields, packed into one struct per output.

use super::{struct_type_name, Lowerer};
use crate::{LowerError, Result};
use dyntrace_dwarf::DwarfReader;
use dyntrace_ir::logical;
use dyntrace_ir::physical::{self, StructDecl, StructField, Variable};
use tracing::debug;

impl<R: DwarfReader> Lowerer<R> {
    pub(super) fn lower_output_action(
        &mut self,
        action: &logical::OutputAction,
        probe: &mut physical::Probe,
    ) -> Result<()> {
        let value_name = format!("{}_value", action.output_name);
        let struct_type = struct_type_name(&action.output_name);

        debug!(output = %action.output_name, value_struct = %struct_type, "lowering output action");

        let decl = self.output_struct(action, &struct_type, probe)?;
        let field_names: Vec<String> = decl.fields.iter().map(|f| f.name.clone()).collect();
        self.structs.register(decl)?;
        self.populate_output_type(&action.output_name, &struct_type, probe)?;

        // Assign struct fields back to their sources: implicit columns
        // first, then the user-supplied variables.
        let sources: Vec<String> = self
            .implicit_columns
            .iter()
            .map(|col| col.to_string())
            .chain(action.variable_names.iter().cloned())
            .collect();
        let field_assignments = field_names
            .into_iter()
            .zip(sources)
            .map(|(field_name, variable_name)| physical::FieldAssignment {
                field_name,
                variable_name,
            })
            .collect();

        self.add_variable(
            probe,
            Variable::StructAlloc {
                name: value_name.clone(),
                struct_type,
                field_assignments,
            },
        );

        probe.output_actions.push(physical::OutputAction {
            perf_buffer_name: action.output_name.clone(),
            variable_name: value_name,
        });

        Ok(())
    }

    /// Build `<output>_value_t`: implicit columns first, then the declared
    /// output fields typed from their source variables.
    fn output_struct(
        &self,
        action: &logical::OutputAction,
        struct_type: &str,
        probe: &physical::Probe,
    ) -> Result<StructDecl> {
        let mut fields = Vec::new();

        // The special-variable injector runs before any action, so the
        // implicit columns are always resolvable.
        for col in &self.implicit_columns {
            let scalar_type =
                self.symbols
                    .lookup(col)
                    .ok_or_else(|| LowerError::UnknownVariable {
                        name: col.to_string(),
                        context: format!("implicit column for output '{}'", action.output_name),
                    })?;
            fields.push(StructField {
                name: col.to_string(),
                scalar_type,
            });
        }

        let Some(&index) = self.output_index.get(&action.output_name) else {
            return Err(LowerError::UnknownOutput {
                probe: probe.name.clone(),
                name: action.output_name.clone(),
            });
        };
        let output = &self.program.outputs[index];

        if output.fields.len() != action.variable_names.len() {
            return Err(LowerError::InvalidArgument(format!(
                "output action to '{}' writes {} variables, but the output has {} fields",
                action.output_name,
                action.variable_names.len(),
                output.fields.len()
            )));
        }

        // Field names come from the output declaration, types from the
        // variables feeding them.
        for (field_name, var_name) in output.fields.iter().zip(&action.variable_names) {
            let scalar_type =
                self.symbols
                    .lookup(var_name)
                    .ok_or_else(|| LowerError::UnknownVariable {
                        name: var_name.clone(),
                        context: format!("output action to '{}'", action.output_name),
                    })?;
            fields.push(StructField {
                name: field_name.clone(),
                scalar_type,
            });
        }

        Ok(StructDecl {
            name: struct_type.to_string(),
            fields,
        })
    }

    fn populate_output_type(
        &mut self,
        output_name: &str,
        struct_type: &str,
        probe: &physical::Probe,
    ) -> Result<()> {
        let Some(&index) = self.output_index.get(output_name) else {
            return Err(LowerError::UnknownOutput {
                probe: probe.name.clone(),
                name: output_name.to_string(),
            });
        };

        let output = &mut self.program.outputs[index];
        if !output.struct_type.is_empty() && output.struct_type != struct_type {
            return Err(LowerError::InvariantViolation(format!(
                "output '{}' struct type already set to '{}', expected '{}'",
                output_name, output.struct_type, struct_type
            )));
        }
        output.struct_type = struct_type.to_string();
        Ok(())
    }
}
