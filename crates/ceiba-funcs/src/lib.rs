#![forbid(unsafe_code)]
//! ceiba-funcs: built-in functions implementing the runtime interfaces
//! declared in `ceiba-core::function`.
//!
//! Each module exposes resolver constructors (`plus()`, `cast()`, ...)
//! returning `ResolverRef` trait objects the expression DAG consumes.
//! The DAG layer itself reaches for `cast` and `materialize` when adapting
//! schemas; everything else is here for callers and tests.

pub mod arithmetic;
pub mod cast;
pub mod comparison;
pub mod materialize;
pub mod misc;

pub use arithmetic::{minus, multiply, plus};
pub use cast::{cast, cast_with_diagnostic, Diagnostic};
pub use comparison::{equals, greater};
pub use materialize::materialize;
pub use misc::{ignore, noise, pi, running_count, type_name_of};

use ceiba_core::error::{Error, Result};
use ceiba_core::schema::ColumnWithType;

pub(crate) fn expect_arity(name: &str, args: &[ColumnWithType], arity: usize) -> Result<()> {
    if args.len() != arity {
        return Err(Error::Execution(format!(
            "function {} expects {} argument(s), got {}",
            name,
            arity,
            args.len()
        )));
    }
    Ok(())
}

/// Argument columns must be present at execution time; the DAG guarantees
/// this for constant folding and evaluators guarantee it at runtime.
pub(crate) fn argument_column<'a>(
    name: &str,
    args: &'a [ColumnWithType],
    i: usize,
) -> Result<&'a ceiba_core::types::Column> {
    args.get(i)
        .and_then(|arg| arg.column.as_ref())
        .ok_or_else(|| {
            Error::Execution(format!(
                "function {}: argument {} has no materialized column",
                name, i
            ))
        })
}
