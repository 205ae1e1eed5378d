//! Small functions that exercise the corners of the runtime contract:
//! always-constant results, empty-argument folding, non-determinism, and
//! statefulness.

use std::f64::consts::PI;
use std::sync::Arc;

use ceiba_core::error::Result;
use ceiba_core::function::{
    FunctionBase, FunctionBaseRef, FunctionResolver, PreparedFunction, PreparedRef, ResolverRef,
};
use ceiba_core::schema::{ColumnWithType, DataType};
use ceiba_core::types::{Column, Scalar};

use crate::{argument_column, expect_arity};

/// `ignore(...)`: swallows any arguments, always returns Boolean false.
/// Reports an always-constant result so the DAG can mark the node constant
/// without folding its subtree away.
pub fn ignore() -> ResolverRef {
    Arc::new(IgnoreResolver)
}

struct IgnoreResolver;

impl FunctionResolver for IgnoreResolver {
    fn name(&self) -> &str {
        "ignore"
    }

    fn build(&self, _args: &[ColumnWithType]) -> Result<FunctionBaseRef> {
        Ok(Arc::new(IgnoreBase))
    }
}

struct IgnoreBase;

impl FunctionBase for IgnoreBase {
    fn name(&self) -> &str {
        "ignore"
    }

    fn result_type(&self) -> &DataType {
        &DataType::Boolean
    }

    fn prepare(&self, _args: &[ColumnWithType]) -> Result<PreparedRef> {
        Ok(Arc::new(ConstExec {
            value: Scalar::Bool(false),
        }))
    }

    fn constant_result_with_args(&self, args: &[ColumnWithType]) -> Option<Column> {
        (!args.is_empty()).then(|| Column::constant(Scalar::Bool(false)))
    }
}

/// `type_name_of(x)`: Utf8 constant holding the argument's type name.
pub fn type_name_of() -> ResolverRef {
    Arc::new(TypeNameResolver)
}

struct TypeNameResolver;

impl FunctionResolver for TypeNameResolver {
    fn name(&self) -> &str {
        "type_name_of"
    }

    fn build(&self, args: &[ColumnWithType]) -> Result<FunctionBaseRef> {
        expect_arity("type_name_of", args, 1)?;
        Ok(Arc::new(TypeNameBase {
            argument_type: args[0].data_type.clone(),
        }))
    }
}

struct TypeNameBase {
    argument_type: DataType,
}

impl FunctionBase for TypeNameBase {
    fn name(&self) -> &str {
        "type_name_of"
    }

    fn result_type(&self) -> &DataType {
        &DataType::Utf8
    }

    fn prepare(&self, _args: &[ColumnWithType]) -> Result<PreparedRef> {
        Ok(Arc::new(ConstExec {
            value: Scalar::Str(self.argument_type.to_string()),
        }))
    }

    fn constant_result_with_args(&self, args: &[ColumnWithType]) -> Option<Column> {
        (!args.is_empty())
            .then(|| Column::constant(Scalar::Str(self.argument_type.to_string())))
    }
}

/// `pi()`: zero-argument Float64 constant.
pub fn pi() -> ResolverRef {
    Arc::new(PiResolver)
}

struct PiResolver;

impl FunctionResolver for PiResolver {
    fn name(&self) -> &str {
        "pi"
    }

    fn build(&self, args: &[ColumnWithType]) -> Result<FunctionBaseRef> {
        expect_arity("pi", args, 0)?;
        Ok(Arc::new(PiBase))
    }
}

struct PiBase;

impl FunctionBase for PiBase {
    fn name(&self) -> &str {
        "pi"
    }

    fn result_type(&self) -> &DataType {
        &DataType::Float64
    }

    fn prepare(&self, _args: &[ColumnWithType]) -> Result<PreparedRef> {
        Ok(Arc::new(ConstExec {
            value: Scalar::F64(PI),
        }))
    }
}

/// `noise(x)`: identity, but flagged non-deterministic. Exists so the
/// fold-versus-compile coupling has something to bite on.
pub fn noise() -> ResolverRef {
    Arc::new(NoiseResolver)
}

struct NoiseResolver;

impl FunctionResolver for NoiseResolver {
    fn name(&self) -> &str {
        "noise"
    }

    fn build(&self, args: &[ColumnWithType]) -> Result<FunctionBaseRef> {
        expect_arity("noise", args, 1)?;
        Ok(Arc::new(NoiseBase {
            result_type: args[0].data_type.clone(),
        }))
    }
}

struct NoiseBase {
    result_type: DataType,
}

impl FunctionBase for NoiseBase {
    fn name(&self) -> &str {
        "noise"
    }

    fn result_type(&self) -> &DataType {
        &self.result_type
    }

    fn prepare(&self, _args: &[ColumnWithType]) -> Result<PreparedRef> {
        Ok(Arc::new(NoiseExec))
    }

    fn is_deterministic(&self) -> bool {
        false
    }
}

struct NoiseExec;

impl PreparedFunction for NoiseExec {
    fn execute(
        &self,
        args: &[ColumnWithType],
        _result_type: &DataType,
        _rows: usize,
        _dry_run: bool,
    ) -> Result<Column> {
        argument_column("noise", args, 0).cloned()
    }
}

/// `running_count(x)`: 1..=n counter over the block; stateful.
pub fn running_count() -> ResolverRef {
    Arc::new(RunningCountResolver)
}

struct RunningCountResolver;

impl FunctionResolver for RunningCountResolver {
    fn name(&self) -> &str {
        "running_count"
    }

    fn build(&self, args: &[ColumnWithType]) -> Result<FunctionBaseRef> {
        expect_arity("running_count", args, 1)?;
        Ok(Arc::new(RunningCountBase))
    }
}

struct RunningCountBase;

impl FunctionBase for RunningCountBase {
    fn name(&self) -> &str {
        "running_count"
    }

    fn result_type(&self) -> &DataType {
        &DataType::Int64
    }

    fn prepare(&self, _args: &[ColumnWithType]) -> Result<PreparedRef> {
        Ok(Arc::new(RunningCountExec))
    }

    fn is_stateful(&self) -> bool {
        true
    }

    fn is_suitable_for_constant_folding(&self) -> bool {
        false
    }
}

struct RunningCountExec;

impl PreparedFunction for RunningCountExec {
    fn execute(
        &self,
        _args: &[ColumnWithType],
        _result_type: &DataType,
        rows: usize,
        _dry_run: bool,
    ) -> Result<Column> {
        Ok(Column::Vector(
            (1..=rows as i64).map(Scalar::I64).collect(),
        ))
    }
}

/// Shared executor for functions whose result is a fixed constant.
struct ConstExec {
    value: Scalar,
}

impl PreparedFunction for ConstExec {
    fn execute(
        &self,
        _args: &[ColumnWithType],
        _result_type: &DataType,
        rows: usize,
        _dry_run: bool,
    ) -> Result<Column> {
        Ok(Column::Const {
            value: self.value.clone(),
            rows,
        })
    }
}
