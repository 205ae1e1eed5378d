//! Data types, fields, and the column-with-type triple carried on DAG edges.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Column;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float64,
    Utf8,
    Array(Box<DataType>),
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64 | DataType::Float64)
    }

    /// Element type for arrays, `None` for everything else.
    pub fn nested_element_type(&self) -> Option<&DataType> {
        match self {
            DataType::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Inverse of `Display`. Cast targets travel as string constants, so
    /// the textual form is part of the contract.
    pub fn parse(s: &str) -> Option<DataType> {
        let s = s.trim();
        match s {
            "Boolean" => Some(DataType::Boolean),
            "Int32" => Some(DataType::Int32),
            "Int64" => Some(DataType::Int64),
            "Float64" => Some(DataType::Float64),
            "Utf8" => Some(DataType::Utf8),
            _ => {
                let inner = s.strip_prefix("Array(")?.strip_suffix(')')?;
                Some(DataType::Array(Box::new(DataType::parse(inner)?)))
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "Boolean"),
            DataType::Int32 => write!(f, "Int32"),
            DataType::Int64 => write!(f, "Int64"),
            DataType::Float64 => write!(f, "Float64"),
            DataType::Utf8 => write!(f, "Utf8"),
            DataType::Array(element) => write!(f, "Array({})", element),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A named, typed column slot. The column itself is present only when the
/// value is known (constants, folded results).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnWithType {
    pub column: Option<Column>,
    pub data_type: DataType,
    pub name: String,
}

impl ColumnWithType {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            column: None,
            data_type,
            name: name.into(),
        }
    }

    pub fn with_column(name: impl Into<String>, data_type: DataType, column: Column) -> Self {
        Self {
            column: Some(column),
            data_type,
            name: name.into(),
        }
    }

    pub fn is_const(&self) -> bool {
        self.column.as_ref().is_some_and(Column::is_const)
    }
}
