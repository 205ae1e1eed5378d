//! Convenient re-exports for downstream crates.

pub use crate::error::{Error, Result};
pub use crate::function::{
    FunctionBase, FunctionBaseRef, FunctionResolver, PreparedFunction, PreparedRef, ResolverRef,
};
pub use crate::id::NodeId;
pub use crate::schema::{ColumnWithType, DataType, Field};
pub use crate::types::{Column, Scalar};
