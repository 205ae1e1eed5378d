//! Hook for an external expression compiler.
//!
//! The DAG never compiles anything itself; it only invites an opaque
//! compiler to rewrite function nodes and then prunes whatever became
//! unreachable. The compiler (and its cache) is shared by reference and
//! travels across `merge`.

use std::sync::Arc;

use crate::dag::ExprDag;

pub trait ExpressionCompiler: Send + Sync {
    /// Rewrite eligible function nodes in place (e.g. replace a fused
    /// subtree with one compiled function node). Returns whether anything
    /// changed.
    fn compile(&self, dag: &mut ExprDag) -> bool;
}

pub type CompilerRef = Arc<dyn ExpressionCompiler>;
