#![forbid(unsafe_code)]
//! ceiba-expr: the expression-action DAG a planner hands to the evaluator.
//!
//! The DAG takes named input columns, applies functions, aliases,
//! array-unnesting and constant nodes, and exposes a chosen subset of
//! nodes as the stage's result columns. The interesting machinery is all
//! graph-shaped:
//!
//! - construction with constant folding ([`ExprDag::add_function_nodes`])
//! - pruning of unused work ([`ExprDag::prune`])
//! - projection and schema conversion ([`ExprDag::project`],
//!   [`ExprDag::make_converting`])
//! - composition of stages ([`ExprDag::merge`])
//! - partitioning along a frontier ([`ExprDag::split`],
//!   [`ExprDag::split_before_array_join`], [`ExprDag::split_for_filter`])
//!
//! Functions are opaque: the DAG drives them only through the traits in
//! `ceiba-core::function`, and reaches into `ceiba-funcs` solely for the
//! cast/materialize nodes schema conversion plants.

pub mod compile;
pub mod convert;
pub mod dag;
pub mod index;
pub mod node;
pub mod settings;
pub mod split;
pub mod store;

pub use compile::{CompilerRef, ExpressionCompiler};
pub use convert::ColumnMatchMode;
pub use dag::{ExprDag, NamesWithAliases};
pub use index::NameIndex;
pub use node::{Node, NodeKind};
pub use settings::DagSettings;
pub use store::NodeStore;
