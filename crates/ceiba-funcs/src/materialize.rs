//! materialize: expand a constant column into a full vector.
//!
//! Not suitable for constant folding: folding it would collapse the
//! expansion straight back into a constant.

use std::sync::Arc;

use ceiba_core::error::Result;
use ceiba_core::function::{
    FunctionBase, FunctionBaseRef, FunctionResolver, PreparedFunction, PreparedRef, ResolverRef,
};
use ceiba_core::schema::{ColumnWithType, DataType};
use ceiba_core::types::Column;

use crate::{argument_column, expect_arity};

pub const MATERIALIZE_NAME: &str = "materialize";

pub fn materialize() -> ResolverRef {
    Arc::new(MaterializeResolver)
}

struct MaterializeResolver;

impl FunctionResolver for MaterializeResolver {
    fn name(&self) -> &str {
        MATERIALIZE_NAME
    }

    fn build(&self, args: &[ColumnWithType]) -> Result<FunctionBaseRef> {
        expect_arity(MATERIALIZE_NAME, args, 1)?;
        Ok(Arc::new(MaterializeBase {
            result_type: args[0].data_type.clone(),
        }))
    }
}

struct MaterializeBase {
    result_type: DataType,
}

impl FunctionBase for MaterializeBase {
    fn name(&self) -> &str {
        MATERIALIZE_NAME
    }

    fn result_type(&self) -> &DataType {
        &self.result_type
    }

    fn prepare(&self, _args: &[ColumnWithType]) -> Result<PreparedRef> {
        Ok(Arc::new(MaterializeExec))
    }

    fn is_suitable_for_constant_folding(&self) -> bool {
        false
    }
}

struct MaterializeExec;

impl PreparedFunction for MaterializeExec {
    fn execute(
        &self,
        args: &[ColumnWithType],
        _result_type: &DataType,
        rows: usize,
        _dry_run: bool,
    ) -> Result<Column> {
        let input = argument_column(MATERIALIZE_NAME, args, 0)?;
        match input {
            Column::Const { value, .. } => Ok(Column::Vector(vec![value.clone(); rows])),
            full @ Column::Vector(_) => Ok(full.clone()),
        }
    }
}
