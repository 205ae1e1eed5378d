//! Comparison functions producing Boolean columns.
//!
//! Numerics compare after promotion to Float64; strings and booleans
//! compare directly. A NULL on either side compares as false.

use std::sync::Arc;

use ceiba_core::error::{Error, Result};
use ceiba_core::function::{
    FunctionBase, FunctionBaseRef, FunctionResolver, PreparedFunction, PreparedRef, ResolverRef,
};
use ceiba_core::schema::{ColumnWithType, DataType};
use ceiba_core::types::{Column, Scalar};

use crate::arithmetic::as_f64;
use crate::{argument_column, expect_arity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComparisonOp {
    Greater,
    Equals,
}

impl ComparisonOp {
    fn name(self) -> &'static str {
        match self {
            ComparisonOp::Greater => "greater",
            ComparisonOp::Equals => "equals",
        }
    }
}

pub fn greater() -> ResolverRef {
    Arc::new(Comparison {
        op: ComparisonOp::Greater,
    })
}

pub fn equals() -> ResolverRef {
    Arc::new(Comparison {
        op: ComparisonOp::Equals,
    })
}

struct Comparison {
    op: ComparisonOp,
}

impl FunctionResolver for Comparison {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn build(&self, args: &[ColumnWithType]) -> Result<FunctionBaseRef> {
        expect_arity(self.op.name(), args, 2)?;
        let comparable = (args[0].data_type.is_numeric() && args[1].data_type.is_numeric())
            || args[0].data_type == args[1].data_type;
        if !comparable {
            return Err(Error::TypeMismatch(format!(
                "{} cannot compare {} with {}",
                self.op.name(),
                args[0].data_type,
                args[1].data_type
            )));
        }
        Ok(Arc::new(ComparisonBase { op: self.op }))
    }
}

struct ComparisonBase {
    op: ComparisonOp,
}

impl FunctionBase for ComparisonBase {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn result_type(&self) -> &DataType {
        &DataType::Boolean
    }

    fn prepare(&self, _args: &[ColumnWithType]) -> Result<PreparedRef> {
        Ok(Arc::new(ComparisonExec { op: self.op }))
    }
}

struct ComparisonExec {
    op: ComparisonOp,
}

impl PreparedFunction for ComparisonExec {
    fn execute(
        &self,
        args: &[ColumnWithType],
        _result_type: &DataType,
        rows: usize,
        _dry_run: bool,
    ) -> Result<Column> {
        let name = self.op.name();
        let lhs = argument_column(name, args, 0)?;
        let rhs = argument_column(name, args, 1)?;

        if let (Some(a), Some(b)) = (lhs.const_value(), rhs.const_value()) {
            let value = compare(self.op, a, b, name)?;
            return Ok(Column::Const { value, rows });
        }

        let mut out = Vec::with_capacity(rows);
        for row in 0..rows {
            let a = lhs.scalar_at(row).ok_or_else(|| {
                Error::Execution(format!("function {}: argument 0 is too short", name))
            })?;
            let b = rhs.scalar_at(row).ok_or_else(|| {
                Error::Execution(format!("function {}: argument 1 is too short", name))
            })?;
            out.push(compare(self.op, a, b, name)?);
        }
        Ok(Column::Vector(out))
    }
}

fn compare(op: ComparisonOp, a: &Scalar, b: &Scalar, name: &str) -> Result<Scalar> {
    if matches!(a, Scalar::Null) || matches!(b, Scalar::Null) {
        return Ok(Scalar::Bool(false));
    }
    let outcome = match (a, b) {
        (Scalar::Str(x), Scalar::Str(y)) => match op {
            ComparisonOp::Greater => x > y,
            ComparisonOp::Equals => x == y,
        },
        (Scalar::Bool(x), Scalar::Bool(y)) => match op {
            ComparisonOp::Greater => x > y,
            ComparisonOp::Equals => x == y,
        },
        _ => {
            let x = as_f64(a, name)?;
            let y = as_f64(b, name)?;
            match op {
                ComparisonOp::Greater => x > y,
                ComparisonOp::Equals => x == y,
            }
        }
    };
    Ok(Scalar::Bool(outcome))
}
