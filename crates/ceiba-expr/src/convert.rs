//! Schema adaptation: build a DAG that reshapes one column header into
//! another: casts for type changes, materialization for constants that
//! must become full columns, aliases for renames.

use std::collections::{HashMap, VecDeque};

use ceiba_core::error::{Error, Result};
use ceiba_core::schema::{ColumnWithType, DataType};
use ceiba_core::types::{Column, Scalar};
use ceiba_funcs::{cast_with_diagnostic, materialize, Diagnostic};

use crate::dag::ExprDag;

/// How source columns are matched to result slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnMatchMode {
    /// i-th source feeds the i-th result; cardinalities must agree.
    Position,
    /// Match by name; duplicate result names consume successive source
    /// occurrences of that name.
    Name,
}

impl ExprDag {
    /// Build a fresh DAG taking `source` as inputs and emitting exactly
    /// `result`, in order, in type and constness.
    pub fn make_converting(
        source: &[ColumnWithType],
        result: &[ColumnWithType],
        mode: ColumnMatchMode,
        ignore_constant_values: bool,
    ) -> Result<ExprDag> {
        if mode == ColumnMatchMode::Position && source.len() != result.len() {
            return Err(Error::ColumnCountMismatch {
                source_count: source.len(),
                result: result.len(),
            });
        }

        let mut dag = ExprDag::from_columns(source.to_vec());
        let mut projection = Vec::with_capacity(result.len());

        let mut positions_by_name: HashMap<String, VecDeque<usize>> = HashMap::new();
        if mode == ColumnMatchMode::Name {
            for (pos, &input) in dag.inputs.iter().enumerate() {
                positions_by_name
                    .entry(dag.nodes.get(input).result_name.clone())
                    .or_default()
                    .push_back(pos);
            }
        }

        for (result_col_num, res_elem) in result.iter().enumerate() {
            let mut src = match mode {
                ColumnMatchMode::Position => dag.inputs[result_col_num],
                ColumnMatchMode::Name => {
                    let pos = positions_by_name
                        .get_mut(&res_elem.name)
                        .and_then(VecDeque::pop_front)
                        .ok_or_else(|| Error::NoSuchColumn(res_elem.name.clone()))?;
                    dag.inputs[pos]
                }
            };

            // Constant discipline first: a constant result slot requires a
            // constant source with the same value (unless told to ignore).
            if let Some(res_const) = res_elem.column.as_ref().filter(|c| c.is_const()) {
                let src_const = dag.nodes.get(src).column.clone().filter(Column::is_const);
                match src_const {
                    Some(src_const) => {
                        if ignore_constant_values {
                            src = dag.add_column_impl(res_elem.clone(), true)?;
                        } else if res_const.const_value() != src_const.const_value() {
                            return Err(Error::IllegalColumn(format!(
                                "cannot convert column '{}' because it is constant but values \
                                 of constants are different in source and result",
                                res_elem.name
                            )));
                        }
                    }
                    None => {
                        return Err(Error::IllegalColumn(format!(
                            "cannot convert column '{}' because it is non constant in source \
                             stream but must be constant in result",
                            res_elem.name
                        )))
                    }
                }
            }

            // Cast when the type differs. The target type travels as a
            // string-typed constant argument.
            if res_elem.data_type != dag.nodes.get(src).result_type {
                let type_name = res_elem.data_type.to_string();
                let type_arg = ColumnWithType::with_column(
                    type_name.clone(),
                    DataType::Utf8,
                    Column::constant_with_rows(Scalar::Str(type_name), 0),
                );
                let right = dag.add_column_impl(type_arg, true)?;

                let resolver = cast_with_diagnostic(Diagnostic {
                    source_name: dag.nodes.get(src).result_name.clone(),
                    result_name: res_elem.name.clone(),
                });
                src = dag.add_function_nodes(&resolver, vec![src, right], None, true)?;
            }

            // A constant source feeding a non-constant slot must be
            // expanded at evaluation time.
            let src_is_const = dag.nodes.get(src).is_const_column();
            let res_is_const = res_elem.column.as_ref().is_some_and(Column::is_const);
            if src_is_const && !res_is_const {
                let resolver = materialize();
                src = dag.add_function_nodes(&resolver, vec![src], None, true)?;
            }

            if dag.nodes.get(src).result_name != res_elem.name {
                src = dag.alias_node(src, res_elem.name.clone(), true)?;
            }

            projection.push(src);
        }

        dag.prune_to(projection);
        dag.settings.project_input = true;
        Ok(dag)
    }
}
