//! Binary arithmetic with the usual numeric promotion ladder.
//!
//! Int32 × Int32 → Int32; mixed integers → Int64; anything with a
//! Float64 → Float64. Non-numeric operands fail overload resolution.

use std::sync::Arc;

use ceiba_core::error::{Error, Result};
use ceiba_core::function::{
    FunctionBase, FunctionBaseRef, FunctionResolver, PreparedFunction, PreparedRef, ResolverRef,
};
use ceiba_core::schema::{ColumnWithType, DataType};
use ceiba_core::types::{Column, Scalar};

use crate::{argument_column, expect_arity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithmeticOp {
    Plus,
    Minus,
    Multiply,
}

impl ArithmeticOp {
    fn name(self) -> &'static str {
        match self {
            ArithmeticOp::Plus => "plus",
            ArithmeticOp::Minus => "minus",
            ArithmeticOp::Multiply => "multiply",
        }
    }

    fn apply_i64(self, a: i64, b: i64) -> i64 {
        match self {
            ArithmeticOp::Plus => a.wrapping_add(b),
            ArithmeticOp::Minus => a.wrapping_sub(b),
            ArithmeticOp::Multiply => a.wrapping_mul(b),
        }
    }

    fn apply_f64(self, a: f64, b: f64) -> f64 {
        match self {
            ArithmeticOp::Plus => a + b,
            ArithmeticOp::Minus => a - b,
            ArithmeticOp::Multiply => a * b,
        }
    }
}

pub fn plus() -> ResolverRef {
    Arc::new(Arithmetic {
        op: ArithmeticOp::Plus,
    })
}

pub fn minus() -> ResolverRef {
    Arc::new(Arithmetic {
        op: ArithmeticOp::Minus,
    })
}

pub fn multiply() -> ResolverRef {
    Arc::new(Arithmetic {
        op: ArithmeticOp::Multiply,
    })
}

struct Arithmetic {
    op: ArithmeticOp,
}

impl FunctionResolver for Arithmetic {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn build(&self, args: &[ColumnWithType]) -> Result<FunctionBaseRef> {
        expect_arity(self.op.name(), args, 2)?;
        let result_type = promote(&args[0].data_type, &args[1].data_type).ok_or_else(|| {
            Error::TypeMismatch(format!(
                "{} expects numeric arguments, got {} and {}",
                self.op.name(),
                args[0].data_type,
                args[1].data_type
            ))
        })?;
        Ok(Arc::new(ArithmeticBase {
            op: self.op,
            result_type,
        }))
    }
}

struct ArithmeticBase {
    op: ArithmeticOp,
    result_type: DataType,
}

impl FunctionBase for ArithmeticBase {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn result_type(&self) -> &DataType {
        &self.result_type
    }

    fn prepare(&self, _args: &[ColumnWithType]) -> Result<PreparedRef> {
        Ok(Arc::new(ArithmeticExec { op: self.op }))
    }
}

struct ArithmeticExec {
    op: ArithmeticOp,
}

impl PreparedFunction for ArithmeticExec {
    fn execute(
        &self,
        args: &[ColumnWithType],
        result_type: &DataType,
        rows: usize,
        _dry_run: bool,
    ) -> Result<Column> {
        let name = self.op.name();
        let lhs = argument_column(name, args, 0)?;
        let rhs = argument_column(name, args, 1)?;

        if let (Some(a), Some(b)) = (lhs.const_value(), rhs.const_value()) {
            let value = binary_scalar(self.op, a, b, result_type, name)?;
            return Ok(Column::Const { value, rows });
        }

        let mut out = Vec::with_capacity(rows);
        for row in 0..rows {
            let a = lhs.scalar_at(row).ok_or_else(|| short_column(name, 0))?;
            let b = rhs.scalar_at(row).ok_or_else(|| short_column(name, 1))?;
            out.push(binary_scalar(self.op, a, b, result_type, name)?);
        }
        Ok(Column::Vector(out))
    }
}

fn short_column(name: &str, i: usize) -> Error {
    Error::Execution(format!("function {}: argument {} is too short", name, i))
}

fn promote(a: &DataType, b: &DataType) -> Option<DataType> {
    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }
    if *a == DataType::Float64 || *b == DataType::Float64 {
        Some(DataType::Float64)
    } else if *a == DataType::Int32 && *b == DataType::Int32 {
        Some(DataType::Int32)
    } else {
        Some(DataType::Int64)
    }
}

fn binary_scalar(
    op: ArithmeticOp,
    a: &Scalar,
    b: &Scalar,
    result_type: &DataType,
    name: &str,
) -> Result<Scalar> {
    if matches!(a, Scalar::Null) || matches!(b, Scalar::Null) {
        return Ok(Scalar::Null);
    }
    match result_type {
        DataType::Int32 => {
            let v = op.apply_i64(as_i64(a, name)?, as_i64(b, name)?);
            Ok(Scalar::I32(v as i32))
        }
        DataType::Int64 => Ok(Scalar::I64(op.apply_i64(as_i64(a, name)?, as_i64(b, name)?))),
        DataType::Float64 => Ok(Scalar::F64(op.apply_f64(as_f64(a, name)?, as_f64(b, name)?))),
        other => Err(Error::Execution(format!(
            "function {}: unexpected result type {}",
            name, other
        ))),
    }
}

pub(crate) fn as_i64(s: &Scalar, name: &str) -> Result<i64> {
    match s {
        Scalar::I32(v) => Ok(*v as i64),
        Scalar::I64(v) => Ok(*v),
        other => Err(Error::Execution(format!(
            "function {}: {} is not an integer",
            name, other
        ))),
    }
}

pub(crate) fn as_f64(s: &Scalar, name: &str) -> Result<f64> {
    match s {
        Scalar::I32(v) => Ok(*v as f64),
        Scalar::I64(v) => Ok(*v as f64),
        Scalar::F64(v) => Ok(*v),
        other => Err(Error::Execution(format!(
            "function {}: {} is not numeric",
            name, other
        ))),
    }
}
