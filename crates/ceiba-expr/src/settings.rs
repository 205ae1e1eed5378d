//! Per-DAG settings carried through construction, merge, and the
//! compile hook.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DagSettings {
    /// When set, this stage's inputs are a strict contract: merging a
    /// consumer whose inputs don't all match these outputs is an error.
    pub project_input: bool,

    /// The exposed columns are exactly a projection (set by `project` and
    /// schema conversion).
    pub projected_output: bool,

    /// Evaluator knobs: carried and merged (by max), not enforced here.
    pub max_temporary_columns: usize,
    pub max_temporary_non_const_columns: usize,

    /// When on, non-deterministic functions are excluded from constant
    /// folding so the compiler's cache keys stay stable.
    pub compile_expressions: bool,
    pub min_count_to_compile_expression: u64,
}
