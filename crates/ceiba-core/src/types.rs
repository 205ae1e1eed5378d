//! Scalar values and the column model shared by the DAG and the function runtime.
//!
//! Constness is structural: a `Column::Const` stands for `rows` identical
//! values. Constant folding, the conversion rules, and `materialize` all
//! pivot on that distinction, so it is not an afterthought flag.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::DataType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
    Array(Vec<Scalar>),
}

impl Scalar {
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::Null => DataType::Utf8, // TODO: carry an explicit Null type if needed
            Scalar::Bool(_) => DataType::Boolean,
            Scalar::I32(_) => DataType::Int32,
            Scalar::I64(_) => DataType::Int64,
            Scalar::F64(_) => DataType::Float64,
            Scalar::Str(_) => DataType::Utf8,
            Scalar::Array(items) => {
                let element = items
                    .first()
                    .map(Scalar::data_type)
                    .unwrap_or(DataType::Utf8);
                DataType::Array(Box::new(element))
            }
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "NULL"),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::I32(v) => write!(f, "{}", v),
            Scalar::I64(v) => write!(f, "{}", v),
            Scalar::F64(v) => write!(f, "{}", v),
            Scalar::Str(v) => write!(f, "'{}'", v),
            Scalar::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A materialized column: either a constant standing for `rows` identical
/// values, or a fully realized vector of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Const { value: Scalar, rows: usize },
    Vector(Vec<Scalar>),
}

impl Column {
    /// Single-row constant. Literals enter the DAG in this form.
    pub fn constant(value: Scalar) -> Self {
        Column::Const { value, rows: 1 }
    }

    pub fn constant_with_rows(value: Scalar, rows: usize) -> Self {
        Column::Const { value, rows }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Const { rows, .. } => *rows,
            Column::Vector(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Column::Const { .. })
    }

    pub fn const_value(&self) -> Option<&Scalar> {
        match self {
            Column::Const { value, .. } => Some(value),
            Column::Vector(_) => None,
        }
    }

    pub fn scalar_at(&self, row: usize) -> Option<&Scalar> {
        match self {
            Column::Const { value, rows } => (row < *rows).then_some(value),
            Column::Vector(values) => values.get(row),
        }
    }

    /// Same content logically resized to `rows`. Vectors are truncated or
    /// padded with nulls; constants just change their row count.
    pub fn clone_resized(&self, rows: usize) -> Column {
        match self {
            Column::Const { value, .. } => Column::Const {
                value: value.clone(),
                rows,
            },
            Column::Vector(values) => {
                let mut out = values.clone();
                out.resize(rows, Scalar::Null);
                Column::Vector(out)
            }
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Const { value, rows } => write!(f, "Const(size = {}, value = {})", rows, value),
            Column::Vector(values) => write!(f, "Vector(size = {})", values.len()),
        }
    }
}
