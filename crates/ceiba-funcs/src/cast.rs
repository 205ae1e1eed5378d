//! CAST: convert a column to the type named by a constant string argument.
//!
//! The second argument carries the target type's textual name; it must be
//! a Utf8 constant. Schema adaptation builds these nodes with a
//! `Diagnostic` naming the source and result columns so conversion errors
//! point at the stream slot, not just the value.

use std::sync::Arc;

use ceiba_core::error::{Error, Result};
use ceiba_core::function::{
    FunctionBase, FunctionBaseRef, FunctionResolver, PreparedFunction, PreparedRef, ResolverRef,
};
use ceiba_core::schema::{ColumnWithType, DataType};
use ceiba_core::types::{Column, Scalar};

use crate::{argument_column, expect_arity};

pub const CAST_NAME: &str = "CAST";

/// Names carried into conversion error messages.
#[derive(Debug, Clone, Default)]
pub struct Diagnostic {
    pub source_name: String,
    pub result_name: String,
}

impl Diagnostic {
    fn describe(&self) -> Option<String> {
        if self.source_name.is_empty() && self.result_name.is_empty() {
            return None;
        }
        Some(format!(
            "while converting source column '{}' to '{}'",
            self.source_name, self.result_name
        ))
    }
}

pub fn cast() -> ResolverRef {
    Arc::new(CastResolver {
        diagnostic: Diagnostic::default(),
    })
}

pub fn cast_with_diagnostic(diagnostic: Diagnostic) -> ResolverRef {
    Arc::new(CastResolver { diagnostic })
}

struct CastResolver {
    diagnostic: Diagnostic,
}

impl FunctionResolver for CastResolver {
    fn name(&self) -> &str {
        CAST_NAME
    }

    fn build(&self, args: &[ColumnWithType]) -> Result<FunctionBaseRef> {
        expect_arity(CAST_NAME, args, 2)?;

        let target_name = match args[1].column.as_ref().and_then(Column::const_value) {
            Some(Scalar::Str(name)) => name,
            _ => {
                return Err(Error::Execution(
                    "CAST expects a constant string as its target type argument".into(),
                ))
            }
        };

        let target = DataType::parse(target_name).ok_or_else(|| {
            Error::TypeMismatch(format!("CAST to unknown type '{}'", target_name))
        })?;

        Ok(Arc::new(CastBase {
            target,
            diagnostic: self.diagnostic.clone(),
        }))
    }
}

struct CastBase {
    target: DataType,
    diagnostic: Diagnostic,
}

impl FunctionBase for CastBase {
    fn name(&self) -> &str {
        CAST_NAME
    }

    fn result_type(&self) -> &DataType {
        &self.target
    }

    fn prepare(&self, _args: &[ColumnWithType]) -> Result<PreparedRef> {
        Ok(Arc::new(CastExec {
            target: self.target.clone(),
            diagnostic: self.diagnostic.clone(),
        }))
    }
}

struct CastExec {
    target: DataType,
    diagnostic: Diagnostic,
}

impl PreparedFunction for CastExec {
    fn execute(
        &self,
        args: &[ColumnWithType],
        _result_type: &DataType,
        rows: usize,
        _dry_run: bool,
    ) -> Result<Column> {
        let input = argument_column(CAST_NAME, args, 0)?;

        let out = match input {
            Column::Const { value, .. } => convert_scalar(value, &self.target).map(|value| {
                Column::Const { value, rows }
            }),
            Column::Vector(values) => values
                .iter()
                .map(|v| convert_scalar(v, &self.target))
                .collect::<Result<Vec<_>>>()
                .map(Column::Vector),
        };

        out.map_err(|e| match self.diagnostic.describe() {
            Some(context) => Error::Execution(format!("{}: {}", context, e)),
            None => e,
        })
    }
}

fn convert_scalar(value: &Scalar, target: &DataType) -> Result<Scalar> {
    if matches!(value, Scalar::Null) {
        return Ok(Scalar::Null);
    }
    match target {
        DataType::Boolean => match value {
            Scalar::Bool(v) => Ok(Scalar::Bool(*v)),
            Scalar::I32(v) => Ok(Scalar::Bool(*v != 0)),
            Scalar::I64(v) => Ok(Scalar::Bool(*v != 0)),
            Scalar::Str(s) => s
                .parse::<bool>()
                .map(Scalar::Bool)
                .map_err(|_| cannot_convert(value, target)),
            _ => Err(cannot_convert(value, target)),
        },
        DataType::Int32 => match value {
            Scalar::Bool(v) => Ok(Scalar::I32(*v as i32)),
            Scalar::I32(v) => Ok(Scalar::I32(*v)),
            Scalar::I64(v) => Ok(Scalar::I32(*v as i32)),
            Scalar::F64(v) => Ok(Scalar::I32(*v as i32)),
            Scalar::Str(s) => s
                .parse::<i32>()
                .map(Scalar::I32)
                .map_err(|_| cannot_convert(value, target)),
            _ => Err(cannot_convert(value, target)),
        },
        DataType::Int64 => match value {
            Scalar::Bool(v) => Ok(Scalar::I64(*v as i64)),
            Scalar::I32(v) => Ok(Scalar::I64(*v as i64)),
            Scalar::I64(v) => Ok(Scalar::I64(*v)),
            Scalar::F64(v) => Ok(Scalar::I64(*v as i64)),
            Scalar::Str(s) => s
                .parse::<i64>()
                .map(Scalar::I64)
                .map_err(|_| cannot_convert(value, target)),
            _ => Err(cannot_convert(value, target)),
        },
        DataType::Float64 => match value {
            Scalar::I32(v) => Ok(Scalar::F64(*v as f64)),
            Scalar::I64(v) => Ok(Scalar::F64(*v as f64)),
            Scalar::F64(v) => Ok(Scalar::F64(*v)),
            Scalar::Str(s) => s
                .parse::<f64>()
                .map(Scalar::F64)
                .map_err(|_| cannot_convert(value, target)),
            _ => Err(cannot_convert(value, target)),
        },
        DataType::Utf8 => Ok(Scalar::Str(plain_text(value))),
        DataType::Array(element) => match value {
            Scalar::Array(items) => items
                .iter()
                .map(|item| convert_scalar(item, element))
                .collect::<Result<Vec<_>>>()
                .map(Scalar::Array),
            _ => Err(cannot_convert(value, target)),
        },
    }
}

/// Unquoted rendering for cast-to-string (Display quotes strings).
fn plain_text(value: &Scalar) -> String {
    match value {
        Scalar::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cannot_convert(value: &Scalar, target: &DataType) -> Error {
    Error::Execution(format!("cannot convert {} to {}", value, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_arg(name: &str) -> ColumnWithType {
        ColumnWithType::with_column(
            name,
            DataType::Utf8,
            Column::constant(Scalar::Str(name.into())),
        )
    }

    #[test]
    fn test_cast_int_widening() {
        let resolver = cast();
        let args = [
            ColumnWithType::with_column("a", DataType::Int32, Column::constant(Scalar::I32(7))),
            target_arg("Int64"),
        ];
        let base = resolver.build(&args).unwrap();
        assert_eq!(*base.result_type(), DataType::Int64);
        let out = base
            .prepare(&args)
            .unwrap()
            .execute(&args, base.result_type(), 1, true)
            .unwrap();
        assert_eq!(out, Column::constant(Scalar::I64(7)));
    }

    #[test]
    fn test_cast_string_parse_failure_names_columns() {
        let resolver = cast_with_diagnostic(Diagnostic {
            source_name: "raw".into(),
            result_name: "parsed".into(),
        });
        let args = [
            ColumnWithType::with_column(
                "raw",
                DataType::Utf8,
                Column::constant(Scalar::Str("xyz".into())),
            ),
            target_arg("Int32"),
        ];
        let base = resolver.build(&args).unwrap();
        let err = base
            .prepare(&args)
            .unwrap()
            .execute(&args, base.result_type(), 1, true)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("raw"));
        assert!(message.contains("parsed"));
    }

    #[test]
    fn test_cast_unknown_target_type() {
        let resolver = cast();
        let args = [
            ColumnWithType::new("a", DataType::Int32),
            target_arg("Decimal"),
        ];
        assert!(matches!(resolver.build(&args), Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn test_cast_array_elementwise() {
        let resolver = cast();
        let args = [
            ColumnWithType::with_column(
                "xs",
                DataType::Array(Box::new(DataType::Int32)),
                Column::constant(Scalar::Array(vec![Scalar::I32(1), Scalar::I32(2)])),
            ),
            target_arg("Array(Int64)"),
        ];
        let base = resolver.build(&args).unwrap();
        let out = base
            .prepare(&args)
            .unwrap()
            .execute(&args, base.result_type(), 1, true)
            .unwrap();
        assert_eq!(
            out,
            Column::constant(Scalar::Array(vec![Scalar::I64(1), Scalar::I64(2)]))
        );
    }
}
