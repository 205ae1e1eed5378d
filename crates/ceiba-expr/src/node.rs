//! Nodes of the expression-action DAG.
//!
//! All five kinds share one flat struct; which fields are meaningful
//! depends on the kind:
//!
//! | kind      | children | column            | function handles |
//! |-----------|----------|-------------------|------------------|
//! | Input     | none     | optional constant | none             |
//! | Column    | none     | required          | none             |
//! | Alias     | one      | copied from child | none             |
//! | ArrayJoin | one      | none              | none             |
//! | Function  | arity    | optional (folded) | required         |

use std::fmt;

use ceiba_core::function::{FunctionBaseRef, PreparedRef, ResolverRef};
use ceiba_core::id::NodeId;
use ceiba_core::schema::DataType;
use ceiba_core::types::Column;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Input,
    Column,
    Alias,
    ArrayJoin,
    Function,
}

#[derive(Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub result_name: String,
    pub result_type: DataType,
    /// Present iff this node has a known constant materialization.
    pub column: Option<Column>,
    /// Conservative marker: downstream passes may elide this node when its
    /// column is constant.
    pub allow_constant_folding: bool,
    /// References into the owning DAG's node store. Children always
    /// predate this node, so the graph is acyclic by construction.
    pub children: Vec<NodeId>,
    pub function_resolver: Option<ResolverRef>,
    pub function_base: Option<FunctionBaseRef>,
    pub function: Option<PreparedRef>,
}

impl Node {
    pub fn new(kind: NodeKind, result_name: String, result_type: DataType) -> Self {
        Self {
            kind,
            result_name,
            result_type,
            column: None,
            allow_constant_folding: true,
            children: Vec::new(),
            function_resolver: None,
            function_base: None,
            function: None,
        }
    }

    pub fn input(result_name: String, result_type: DataType) -> Self {
        Self::new(NodeKind::Input, result_name, result_type)
    }

    pub fn input_with_column(result_name: String, result_type: DataType, column: Column) -> Self {
        Self {
            column: Some(column),
            ..Self::new(NodeKind::Input, result_name, result_type)
        }
    }

    /// A `Column` node: a constant the DAG carries by value.
    pub fn constant(result_name: String, result_type: DataType, column: Column) -> Self {
        Self {
            column: Some(column),
            ..Self::new(NodeKind::Column, result_name, result_type)
        }
    }

    pub fn is_const_column(&self) -> bool {
        self.column.as_ref().is_some_and(Column::is_const)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Node");
        s.field("kind", &self.kind)
            .field("result_name", &self.result_name)
            .field("result_type", &self.result_type)
            .field("column", &self.column)
            .field("allow_constant_folding", &self.allow_constant_folding)
            .field("children", &self.children);
        if let Some(base) = &self.function_base {
            s.field("function", &base.name());
        }
        s.finish()
    }
}
