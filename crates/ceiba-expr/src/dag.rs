//! The expression-action DAG.
//!
//! A DAG owns every node it creates. Nodes reference each other through
//! ids into an append-only arena, so references stay valid for the DAG's
//! lifetime and new nodes can only point at nodes that already exist,
//! so the graph is acyclic by construction.
//!
//! The `index` is the set of columns the DAG currently exposes; a node
//! can live in the store without being exposed (intermediate results).
//! Construction is single-writer; a finished DAG may be read from many
//! threads if the function runtime allows it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Write as _;

use ceiba_core::error::{Error, Result};
use ceiba_core::function::ResolverRef;
use ceiba_core::id::NodeId;
use ceiba_core::schema::{ColumnWithType, DataType, Field};
use ceiba_core::types::Column;

use crate::compile::CompilerRef;
use crate::index::NameIndex;
use crate::node::{Node, NodeKind};
use crate::settings::DagSettings;
use crate::store::NodeStore;

/// `(existing_name, new_name)` pairs; `None` keeps the original name.
pub type NamesWithAliases = [(String, Option<String>)];

#[derive(Clone, Default)]
pub struct ExprDag {
    pub(crate) nodes: NodeStore,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) index: NameIndex,
    pub settings: DagSettings,
    pub(crate) compiler: Option<CompilerRef>,
}

impl std::fmt::Debug for ExprDag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExprDag")
            .field("nodes", &self.nodes)
            .field("inputs", &self.inputs)
            .field("index", &self.index)
            .field("settings", &self.settings)
            .field("compiler", &self.compiler.is_some())
            .finish()
    }
}

impl ExprDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one input per field, in order. Re-declared names replace
    /// earlier index entries.
    pub fn from_fields(fields: &[Field]) -> Self {
        let mut dag = Self::new();
        for field in fields {
            dag.insert_node(Node::input(field.name.clone(), field.data_type.clone()));
        }
        dag
    }

    /// Declare inputs from a column header. Constant columns ride along on
    /// their input nodes so later folding can see them.
    pub fn from_columns(columns: Vec<ColumnWithType>) -> Self {
        let mut dag = Self::new();
        for column in columns {
            let node = match column.column {
                Some(col) if col.is_const() => {
                    Node::input_with_column(column.name, column.data_type, col)
                }
                _ => Node::input(column.name, column.data_type),
            };
            dag.insert_node(node);
        }
        dag
    }

    // ---- builder surface ----------------------------------------------

    /// Infallible insert: push, register inputs, re-bind the name.
    fn insert_node(&mut self, node: Node) -> NodeId {
        let name = node.result_name.clone();
        let is_input = node.kind == NodeKind::Input;
        let id = self.nodes.push(node);
        if is_input {
            self.inputs.push(id);
        }
        self.index.replace(name, id);
        id
    }

    fn add_node(&mut self, node: Node, can_replace: bool) -> Result<NodeId> {
        if !can_replace && self.index.contains(&node.result_name) {
            return Err(Error::DuplicateColumn(node.result_name.clone()));
        }
        Ok(self.insert_node(node))
    }

    pub fn add_input(&mut self, name: impl Into<String>, data_type: DataType) -> Result<NodeId> {
        self.add_node(Node::input(name.into(), data_type), false)
    }

    /// Input that carries a constant value (constants passed in from the
    /// outside keep their column).
    pub fn add_input_column(&mut self, column: ColumnWithType) -> Result<NodeId> {
        let node = match column.column {
            Some(col) => Node::input_with_column(column.name, column.data_type, col),
            None => Node::input(column.name, column.data_type),
        };
        self.add_node(node, false)
    }

    pub fn add_column(&mut self, column: ColumnWithType) -> Result<NodeId> {
        self.add_column_impl(column, false)
    }

    pub(crate) fn add_column_impl(
        &mut self,
        column: ColumnWithType,
        can_replace: bool,
    ) -> Result<NodeId> {
        let col = column.column.ok_or_else(|| {
            Error::Invariant(format!(
                "cannot add column {} because it has no value",
                column.name
            ))
        })?;
        self.add_node(Node::constant(column.name, column.data_type, col), can_replace)
    }

    pub fn add_alias(&mut self, name: &str, alias: impl Into<String>) -> Result<NodeId> {
        let child = self.node_id(name)?;
        self.alias_node(child, alias.into(), false)
    }

    /// Aliases inherit type, constant, and foldability from their child.
    pub(crate) fn alias_node(
        &mut self,
        child: NodeId,
        alias: String,
        can_replace: bool,
    ) -> Result<NodeId> {
        let child_node = self.nodes.get(child);
        let mut node = Node::new(NodeKind::Alias, alias, child_node.result_type.clone());
        node.column = child_node.column.clone();
        node.allow_constant_folding = child_node.allow_constant_folding;
        node.children = vec![child];
        self.add_node(node, can_replace)
    }

    /// Unnest an array column. The result type is the element type, and
    /// the node is never constant-folded, since it changes the row count.
    pub fn add_array_join(
        &mut self,
        source_name: &str,
        result_name: impl Into<String>,
    ) -> Result<NodeId> {
        let child = self.node_id(source_name)?;
        let child_node = self.nodes.get(child);
        let element = child_node
            .result_type
            .nested_element_type()
            .ok_or_else(|| {
                Error::TypeMismatch(format!(
                    "array unnest requires an array argument, '{}' is {}",
                    source_name, child_node.result_type
                ))
            })?
            .clone();
        let mut node = Node::new(NodeKind::ArrayJoin, result_name.into(), element);
        node.children = vec![child];
        self.add_node(node, false)
    }

    pub fn add_function(
        &mut self,
        resolver: &ResolverRef,
        argument_names: &[&str],
        result_name: Option<String>,
    ) -> Result<NodeId> {
        let mut children = Vec::with_capacity(argument_names.len());
        for name in argument_names {
            children.push(self.node_id(name)?);
        }
        self.add_function_nodes(resolver, children, result_name, false)
    }

    /// The core function builder: resolve the overload, try constant
    /// folding, fall back to the always-constant probe, synthesize the
    /// default name, insert.
    pub fn add_function_nodes(
        &mut self,
        resolver: &ResolverRef,
        children: Vec<NodeId>,
        result_name: Option<String>,
        can_replace: bool,
    ) -> Result<NodeId> {
        let mut all_const = true;
        let mut allow_constant_folding = true;
        let mut arguments = Vec::with_capacity(children.len());
        for &child in &children {
            let child_node = self.nodes.get(child);
            allow_constant_folding = allow_constant_folding && child_node.allow_constant_folding;
            if !child_node.is_const_column() {
                all_const = false;
            }
            arguments.push(ColumnWithType {
                column: child_node.column.clone(),
                data_type: child_node.result_type.clone(),
                name: child_node.result_name.clone(),
            });
        }

        let function_base = resolver.build(&arguments)?;
        let result_type = function_base.result_type().clone();
        let function = function_base.prepare(&arguments)?;

        // Execute now if every argument is a known constant. When the
        // compiler is on, non-deterministic results must not be folded:
        // the compiled cache key is built from the un-folded subgraph.
        let mut column = None;
        if all_const
            && function_base.is_suitable_for_constant_folding()
            && (!self.settings.compile_expressions || function_base.is_deterministic())
        {
            let rows = arguments
                .first()
                .and_then(|arg| arg.column.as_ref())
                .map_or(0, Column::len);
            match function.execute(&arguments, &result_type, rows, true) {
                Ok(col) if col.is_const() => {
                    // Literal columns are carried with size 1; if the
                    // inputs were empty the produced constant still is.
                    column = Some(if col.is_empty() { col.clone_resized(1) } else { col });
                }
                Ok(_) => {}
                Err(_e) => {
                    // Folding is best-effort; the node stays unfolded.
                    #[cfg(feature = "tracing")]
                    tracing::trace!(
                        function = function_base.name(),
                        error = %_e,
                        "constant folding skipped"
                    );
                }
            }
        }

        // Some functions return a constant even over non-constant
        // arguments. Record the value, but forbid folding through it.
        if column.is_none() && function_base.is_suitable_for_constant_folding() {
            if let Some(col) = function_base.constant_result_with_args(&arguments) {
                column = Some(col);
                allow_constant_folding = false;
            }
        }

        let result_name = match result_name {
            Some(name) if !name.is_empty() => name,
            _ => {
                let mut name = format!("{}(", resolver.name());
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        name.push_str(", ");
                    }
                    name.push_str(&arg.name);
                }
                name.push(')');
                name
            }
        };

        let node = Node {
            kind: NodeKind::Function,
            result_name,
            result_type,
            column,
            allow_constant_folding,
            children,
            function_resolver: Some(resolver.clone()),
            function_base: Some(function_base),
            function: Some(function),
        };
        self.add_node(node, can_replace)
    }

    // ---- lookup & observation -----------------------------------------

    pub fn node_id(&self, name: &str) -> Result<NodeId> {
        self.index
            .find(name)
            .ok_or_else(|| Error::UnknownIdentifier(name.to_string()))
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.index.find(name)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(id)
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn index(&self) -> &NameIndex {
        &self.index
    }

    /// Live nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter()
    }

    pub fn compiler(&self) -> Option<&CompilerRef> {
        self.compiler.as_ref()
    }

    /// `{name, type}` per declared input, in declaration order.
    pub fn required_columns(&self) -> Vec<Field> {
        self.inputs
            .iter()
            .map(|&id| {
                let node = self.nodes.get(id);
                Field::new(node.result_name.clone(), node.result_type.clone())
            })
            .collect()
    }

    /// The exposed columns, in index order.
    pub fn result_columns(&self) -> Vec<ColumnWithType> {
        self.index
            .ids()
            .map(|id| {
                let node = self.nodes.get(id);
                ColumnWithType {
                    column: node.column.clone(),
                    data_type: node.result_type.clone(),
                    name: node.result_name.clone(),
                }
            })
            .collect()
    }

    pub fn names_and_types(&self) -> Vec<Field> {
        self.index
            .ids()
            .map(|id| {
                let node = self.nodes.get(id);
                Field::new(node.result_name.clone(), node.result_type.clone())
            })
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.index
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Every node's result name in store order; used in error messages.
    pub fn dump_names(&self) -> String {
        let mut out = String::new();
        for (i, (_, node)) in self.nodes.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&node.result_name);
        }
        out
    }

    // ---- pruning ------------------------------------------------------

    pub fn prune_to_names<S: AsRef<str>>(&mut self, required: &[S]) -> Result<()> {
        let mut seen = HashSet::new();
        let mut required_nodes = Vec::with_capacity(required.len());
        for name in required {
            let name = name.as_ref();
            let id = self.index.find(name).ok_or_else(|| {
                Error::UnknownIdentifier(format!(
                    "{}, there are only columns {}",
                    name,
                    self.dump_names()
                ))
            })?;
            if seen.insert(id) {
                required_nodes.push(id);
            }
        }
        self.prune_to(required_nodes);
        Ok(())
    }

    /// The given nodes become the exposed columns, then everything not
    /// needed for them goes away.
    pub fn prune_to(&mut self, required: Vec<NodeId>) {
        self.index.clear();
        for id in required {
            let name = self.nodes.get(id).result_name.clone();
            self.index.insert(name, id);
        }
        self.prune();
    }

    /// Reachability from the index, folding constants in place on the way.
    /// Array-unnest nodes are always kept; dropping one would silently
    /// change the row count.
    pub fn prune(&mut self) {
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut stack: Vec<NodeId> = Vec::new();

        for id in self.index.ids() {
            if visited.insert(id) {
                stack.push(id);
            }
        }
        for (id, node) in self.nodes.iter() {
            if node.kind == NodeKind::ArrayJoin && visited.insert(id) {
                stack.push(id);
            }
        }

        while let Some(id) = stack.pop() {
            let node = self.nodes.get_mut(id);
            if !node.children.is_empty() && node.is_const_column() && node.allow_constant_folding {
                node.kind = NodeKind::Column;
                node.children.clear();
                node.function_resolver = None;
                node.function_base = None;
                node.function = None;
            }
            let children = self.nodes.get(id).children.clone();
            for child in children {
                if visited.insert(child) {
                    stack.push(child);
                }
            }
        }

        #[cfg(feature = "tracing")]
        let before = self.nodes.len();
        self.nodes.retain(|id, _| visited.contains(&id));
        self.inputs.retain(|id| visited.contains(id));
        #[cfg(feature = "tracing")]
        tracing::trace!(removed = before - self.nodes.len(), "pruned unused nodes");
    }

    /// Drop one input nothing references. Refuses if anything still
    /// consumes it.
    pub fn remove_unused_input(&mut self, name: &str) -> Result<()> {
        let position = self
            .inputs
            .iter()
            .position(|&id| self.nodes.get(id).result_name == name)
            .ok_or_else(|| {
                Error::Invariant(format!("input {} not found in DAG\n{}", name, self.dump()))
            })?;
        let input = self.inputs[position];

        for (_, node) in self.nodes.iter() {
            if node.children.contains(&input) {
                return Err(Error::Invariant(format!(
                    "cannot remove input {} because it has dependent nodes in DAG\n{}",
                    name,
                    self.dump()
                )));
            }
        }

        if let Some(entry) = self.index.iter().position(|&(_, id)| id == input) {
            self.index.remove_at(entry);
        }
        self.nodes.remove(input);
        self.inputs.remove(position);
        Ok(())
    }

    // ---- projection ---------------------------------------------------

    fn add_aliases_impl(&mut self, aliases: &NamesWithAliases) -> Result<Vec<NodeId>> {
        let mut children = Vec::with_capacity(aliases.len());
        for (name, _) in aliases {
            children.push(self.node_id(name)?);
        }

        let mut result = Vec::with_capacity(aliases.len());
        for ((name, alias), child) in aliases.iter().zip(children) {
            match alias {
                Some(alias) if alias != name => {
                    result.push(self.alias_node(child, alias.clone(), true)?);
                }
                _ => result.push(child),
            }
        }
        Ok(result)
    }

    /// Renames without pruning.
    pub fn add_aliases(&mut self, aliases: &NamesWithAliases) -> Result<()> {
        self.add_aliases_impl(aliases).map(|_| ())
    }

    /// The projection becomes the exposed columns; everything else is
    /// pruned and the stage boundary becomes strict.
    pub fn project(&mut self, projection: &NamesWithAliases) -> Result<()> {
        let result = self.add_aliases_impl(projection)?;
        self.prune_to(result);
        self.settings.project_input = true;
        self.settings.projected_output = true;
        Ok(())
    }

    pub fn set_project_input(&mut self) {
        self.settings.project_input = true;
    }

    /// Re-expose a node by name. When several nodes carry the name, the
    /// most recently added one wins.
    pub fn try_restore_column(&mut self, name: &str) -> bool {
        if self.index.contains(name) {
            return true;
        }
        let found = self
            .nodes
            .iter_rev()
            .find(|(_, node)| node.result_name == name)
            .map(|(id, _)| id);
        match found {
            Some(id) => {
                self.index.replace(name.to_string(), id);
                true
            }
            None => false,
        }
    }

    // ---- merge --------------------------------------------------------

    /// Compose `second ∘ first`: feed `first`'s outputs into `second`'s
    /// inputs by name, in order, consuming duplicate-name occurrences one
    /// at a time. Node references from the originals do not survive.
    pub fn merge(mut first: ExprDag, second: ExprDag) -> Result<ExprDag> {
        let mut first_result: HashMap<String, VecDeque<NodeId>> = HashMap::new();
        for (name, id) in first.index.iter() {
            first_result.entry(name.clone()).or_default().push_back(*id);
        }

        // Map each input of `second` to a first-output, or keep it as an
        // input of the combined DAG.
        let mut inputs_map: HashMap<NodeId, NodeId> = HashMap::new();
        let mut removed_first_result: HashMap<NodeId, usize> = HashMap::new();
        let mut unmatched_inputs: Vec<NodeId> = Vec::new();
        for &input in &second.inputs {
            let name = &second.nodes.get(input).result_name;
            match first_result.get_mut(name).and_then(VecDeque::pop_front) {
                Some(mapped) => {
                    inputs_map.insert(input, mapped);
                    *removed_first_result.entry(mapped).or_default() += 1;
                }
                None => {
                    if first.settings.project_input {
                        return Err(Error::Invariant(format!(
                            "cannot find column {} in DAG result",
                            name
                        )));
                    }
                    unmatched_inputs.push(input);
                }
            }
        }

        let ExprDag {
            nodes: second_nodes,
            index: second_index,
            settings: second_settings,
            compiler: second_compiler,
            ..
        } = second;

        let base = first.nodes.splice(second_nodes);
        let map_id = |id: NodeId| match inputs_map.get(&id) {
            Some(&mapped) => mapped,
            None => NodeId::from_index(id.index() + base),
        };

        // Children of the spliced nodes: consumed inputs now point into
        // `first`, everything else just shifts.
        for (id, node) in first.nodes.iter_mut() {
            if id.index() < base {
                continue;
            }
            for child in &mut node.children {
                *child = map_id(*child);
            }
        }

        if second_settings.project_input {
            first.index.clear();
            for (name, id) in second_index.iter() {
                first.index.insert(name.clone(), map_id(*id));
            }
            first.settings.project_input = true;
        } else {
            // A consumed first-output is no longer published.
            first.index.retain(|&(_, id)| match removed_first_result.get_mut(&id) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    false
                }
                _ => true,
            });
            for (name, id) in second_index.iter().rev() {
                first.index.prepend(name.clone(), map_id(*id));
            }
        }

        for input in unmatched_inputs {
            first.inputs.push(NodeId::from_index(input.index() + base));
        }

        // Rebuild so every entry's key is owned by the merged store's node.
        let rebuilt: Vec<(String, NodeId)> = first
            .index
            .ids()
            .map(|id| (first.nodes.get(id).result_name.clone(), id))
            .collect();
        first.index = NameIndex::from_entries(rebuilt);

        if first.compiler.is_none() {
            first.compiler = second_compiler;
        }
        first.settings.max_temporary_columns = first
            .settings
            .max_temporary_columns
            .max(second_settings.max_temporary_columns);
        first.settings.max_temporary_non_const_columns = first
            .settings
            .max_temporary_non_const_columns
            .max(second_settings.max_temporary_non_const_columns);
        first.settings.min_count_to_compile_expression = first
            .settings
            .min_count_to_compile_expression
            .max(second_settings.min_count_to_compile_expression);
        first.settings.projected_output = second_settings.projected_output;

        first.prune();
        Ok(first)
    }

    // ---- predicates ---------------------------------------------------

    pub fn has_array_join(&self) -> bool {
        self.nodes
            .iter()
            .any(|(_, node)| node.kind == NodeKind::ArrayJoin)
    }

    pub fn has_stateful_functions(&self) -> bool {
        self.nodes.iter().any(|(_, node)| {
            node.function_base
                .as_ref()
                .is_some_and(|base| base.is_stateful())
        })
    }

    /// True when the DAG does no work at all (only declared inputs).
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|(_, node)| node.kind == NodeKind::Input)
    }

    // ---- compile hook -------------------------------------------------

    pub fn set_compiler(&mut self, compiler: CompilerRef) {
        self.compiler = Some(compiler);
    }

    /// Invite the attached compiler to rewrite function nodes, then drop
    /// whatever the rewrite orphaned.
    pub fn compile_expressions(&mut self) {
        if !self.settings.compile_expressions {
            return;
        }
        let Some(compiler) = self.compiler.clone() else {
            return;
        };
        let _changed = compiler.compile(self);
        #[cfg(feature = "tracing")]
        tracing::trace!(changed = _changed, "expression compilation finished");
        self.prune();
    }

    // ---- dump ---------------------------------------------------------

    /// Deterministic textual form: nodes renumbered densely in insertion
    /// order, then the index.
    pub fn dump(&self) -> String {
        let mut numbering: HashMap<NodeId, usize> = HashMap::new();
        for (id, _) in self.nodes.iter() {
            let n = numbering.len();
            numbering.insert(id, n);
        }

        let mut out = String::new();
        for (id, node) in self.nodes.iter() {
            let kind = match node.kind {
                NodeKind::Input => "INPUT",
                NodeKind::Column => "COLUMN",
                NodeKind::Alias => "ALIAS",
                NodeKind::ArrayJoin => "ARRAY JOIN",
                NodeKind::Function => "FUNCTION",
            };
            let _ = write!(out, "{} : {} (", numbering[&id], kind);
            for (i, child) in node.children.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}", numbering[child]);
            }
            out.push(')');
            match &node.column {
                Some(column) => {
                    let _ = write!(out, " {}", column);
                }
                None => out.push_str(" (no column)"),
            }
            let _ = write!(out, " {}", node.result_type);
            if node.result_name.is_empty() {
                out.push_str(" (no name)");
            } else {
                let _ = write!(out, " {}", node.result_name);
            }
            if let Some(base) = &node.function_base {
                let _ = write!(out, " [{}]", base.name());
            }
            out.push('\n');
        }

        out.push_str("Index:");
        for id in self.index.ids() {
            let _ = write!(out, " {}", numbering[&id]);
        }
        out.push('\n');
        out
    }
}
