//! Interfaces the expression DAG uses to talk to the function runtime.
//!
//! The DAG never executes anything on its own: overload resolution,
//! typing, and evaluation all flow through these object-safe traits.
//! Concrete implementations live in `ceiba-funcs`; the evaluator that
//! eventually runs a finished DAG brings its own.

use std::sync::Arc;

use crate::error::Result;
use crate::schema::{ColumnWithType, DataType};
use crate::types::Column;

pub type ResolverRef = Arc<dyn FunctionResolver>;
pub type FunctionBaseRef = Arc<dyn FunctionBase>;
pub type PreparedRef = Arc<dyn PreparedFunction>;

/// Chooses a concrete overload for a set of argument slots.
pub trait FunctionResolver: Send + Sync {
    /// Stable function name; used for default result naming and dumps.
    fn name(&self) -> &str;

    /// Resolve the overload for these arguments and bind its result type.
    fn build(&self, args: &[ColumnWithType]) -> Result<FunctionBaseRef>;
}

/// A typed, overload-resolved function.
pub trait FunctionBase: Send + Sync {
    fn name(&self) -> &str;

    fn result_type(&self) -> &DataType;

    /// Specialize for execution against the given argument slots.
    fn prepare(&self, args: &[ColumnWithType]) -> Result<PreparedRef>;

    /// May the DAG evaluate this function at construction time when every
    /// argument is constant?
    fn is_suitable_for_constant_folding(&self) -> bool {
        true
    }

    fn is_deterministic(&self) -> bool {
        true
    }

    fn is_stateful(&self) -> bool {
        false
    }

    /// Some functions produce the same constant no matter what their
    /// arguments hold (only what types they have). Returning `Some` here
    /// lets the DAG record the result without folding the subtree away.
    fn constant_result_with_args(&self, args: &[ColumnWithType]) -> Option<Column> {
        let _ = args;
        None
    }
}

/// An executable function instance.
pub trait PreparedFunction: Send + Sync {
    /// `dry_run` marks construction-time evaluation (constant folding);
    /// implementations with side effects must skip them.
    fn execute(
        &self,
        args: &[ColumnWithType],
        result_type: &DataType,
        rows: usize,
        dry_run: bool,
    ) -> Result<Column>;
}
