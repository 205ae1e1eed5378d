//! Partitioning a DAG into two stages that merge back into the original.
//!
//! Both passes use explicit stacks: expression trees out of generated
//! queries get deep enough to blow the call stack.

use std::collections::{HashMap, HashSet};

use ceiba_core::error::{Error, Result};
use ceiba_core::id::NodeId;

use crate::dag::ExprDag;
use crate::index::NameIndex;
use crate::node::{Node, NodeKind};
use crate::store::NodeStore;

#[derive(Default)]
struct SplitData {
    /// In `split_nodes` or an ancestor of one; lands in the first stage.
    needed_by_split_node: bool,
    visited: bool,
    used_in_result: bool,
    /// Copies in either half. Both can exist for inputs and constants.
    to_first: Option<NodeId>,
    to_second: Option<NodeId>,
}

struct Frame {
    id: NodeId,
    next_child: usize,
}

impl ExprDag {
    /// Split so that `split_nodes` (and everything they need) land in the
    /// first DAG, with the rest stacked on top of it in the second.
    /// Boundary nodes become the first DAG's outputs and the second's
    /// inputs; merging the two halves reproduces this DAG's semantics.
    pub fn split(&self, split_nodes: &HashSet<NodeId>) -> (ExprDag, ExprDag) {
        let mut data: HashMap<NodeId, SplitData> = HashMap::new();
        for id in self.index.ids() {
            data.entry(id).or_default().used_in_result = true;
        }

        // Pass 1: close `split_nodes` downward over children.
        let mut mark_stack: Vec<NodeId> = Vec::new();
        for (id, _) in self.nodes.iter() {
            if !split_nodes.contains(&id) {
                continue;
            }
            let entry = data.entry(id).or_default();
            if entry.needed_by_split_node {
                continue;
            }
            entry.needed_by_split_node = true;
            mark_stack.push(id);

            while let Some(cur) = mark_stack.pop() {
                for &child in &self.nodes.get(cur).children {
                    let child_data = data.entry(child).or_default();
                    if !child_data.needed_by_split_node {
                        child_data.needed_by_split_node = true;
                        mark_stack.push(child);
                    }
                }
            }
        }

        // Pass 2: post-order copy into the two halves.
        let mut first_nodes = NodeStore::new();
        let mut second_nodes = NodeStore::new();
        // Nodes of this DAG that must cross the boundary, discovery order.
        let mut new_inputs: Vec<NodeId> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();

        for (root, _) in self.nodes.iter() {
            if data.entry(root).or_default().visited {
                continue;
            }
            stack.push(Frame {
                id: root,
                next_child: 0,
            });

            loop {
                let (id, pending_child) = {
                    let Some(frame) = stack.last_mut() else { break };
                    let node = self.nodes.get(frame.id);
                    if frame.next_child < node.children.len() {
                        let child = node.children[frame.next_child];
                        frame.next_child += 1;
                        (frame.id, Some(child))
                    } else {
                        (frame.id, None)
                    }
                };

                if let Some(child) = pending_child {
                    if !data.entry(child).or_default().visited {
                        stack.push(Frame {
                            id: child,
                            next_child: 0,
                        });
                    }
                    continue;
                }

                // Children are done; materialize this node's copies.
                stack.pop();
                let node = self.nodes.get(id);
                let cur = data.entry(id).or_default();
                cur.visited = true;
                let needed_by_first = cur.needed_by_split_node;
                let used_in_result = cur.used_in_result;

                if !needed_by_first {
                    let mut copy = node.clone();
                    for child in &mut copy.children {
                        let to_second = match data.get(child).and_then(|d| d.to_second) {
                            Some(existing) => existing,
                            None => {
                                // The child stayed in the first half.
                                // Constants are cheap: replicate instead
                                // of re-declaring them as inputs.
                                let child_node = self.nodes.get(*child);
                                let created = if child_node.kind == NodeKind::Column {
                                    second_nodes.push(child_node.clone())
                                } else {
                                    new_inputs.push(*child);
                                    second_nodes.push(Node::input(
                                        child_node.result_name.clone(),
                                        child_node.result_type.clone(),
                                    ))
                                };
                                data.entry(*child).or_default().to_second = Some(created);
                                created
                            }
                        };
                        *child = to_second;
                    }
                    let copy_id = second_nodes.push(copy);
                    let cur = data.entry(id).or_default();
                    cur.to_second = Some(copy_id);

                    // Inputs used by the second half must also be declared
                    // by the first, so the boundary re-exposes them.
                    if node.kind == NodeKind::Input {
                        let first_copy = first_nodes.push(node.clone());
                        data.entry(id).or_default().to_first = Some(first_copy);
                        new_inputs.push(id);
                    }
                } else {
                    let mut copy = node.clone();
                    for child in &mut copy.children {
                        *child = data
                            .get(child)
                            .and_then(|d| d.to_first)
                            .expect("children of first-half nodes are copied first");
                    }
                    let copy_id = first_nodes.push(copy);
                    let cur = data.entry(id).or_default();
                    cur.to_first = Some(copy_id);

                    if used_in_result {
                        let input = Node::input(node.result_name.clone(), node.result_type.clone());
                        let second_copy = second_nodes.push(input);
                        data.entry(id).or_default().to_second = Some(second_copy);
                        new_inputs.push(id);
                    }
                }
            }
        }

        // The second half mirrors the original's exposed columns.
        let mut second_index = NameIndex::new();
        for (name, id) in self.index.iter() {
            let copy = data[id]
                .to_second
                .expect("every exposed node has a copy in the second half");
            second_index.insert(name.clone(), copy);
        }

        let mut first_index = NameIndex::new();
        let mut first_inputs = Vec::with_capacity(self.inputs.len());
        let mut second_inputs = Vec::with_capacity(new_inputs.len());

        for input in &self.inputs {
            first_inputs.push(
                data[input]
                    .to_first
                    .expect("declared inputs are copied into the first half"),
            );
        }
        for original in &new_inputs {
            let cur = &data[original];
            let to_first = cur.to_first.expect("boundary nodes exist in the first half");
            let to_second = cur
                .to_second
                .expect("boundary nodes are declared in the second half");
            second_inputs.push(to_second);
            first_index.insert(first_nodes.get(to_first).result_name.clone(), to_first);
        }

        let first = ExprDag {
            nodes: first_nodes,
            inputs: first_inputs,
            index: first_index,
            settings: self.settings.clone(),
            compiler: self.compiler.clone(),
        };
        let second = ExprDag {
            nodes: second_nodes,
            inputs: second_inputs,
            index: second_index,
            settings: self.settings.clone(),
            compiler: self.compiler.clone(),
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(
            first = first.nodes.len(),
            second = second.nodes.len(),
            boundary = new_inputs.len(),
            "split DAG"
        );

        (first, second)
    }

    /// Split away everything that can run before array unnesting. A node
    /// depends on the unnest frontier iff it is an input named in
    /// `array_joined_columns` or any child does.
    pub fn split_before_array_join(
        &self,
        array_joined_columns: &HashSet<String>,
    ) -> (ExprDag, ExprDag) {
        let mut split_set: HashSet<NodeId> = HashSet::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut stack: Vec<Frame> = Vec::new();

        for (root, _) in self.nodes.iter() {
            if !visited.insert(root) {
                continue;
            }
            stack.push(Frame {
                id: root,
                next_child: 0,
            });

            loop {
                let (id, pending_child) = {
                    let Some(frame) = stack.last_mut() else { break };
                    let node = self.nodes.get(frame.id);
                    if frame.next_child < node.children.len() {
                        let child = node.children[frame.next_child];
                        frame.next_child += 1;
                        (frame.id, Some(child))
                    } else {
                        (frame.id, None)
                    }
                };

                if let Some(child) = pending_child {
                    if visited.insert(child) {
                        stack.push(Frame {
                            id: child,
                            next_child: 0,
                        });
                    }
                    continue;
                }

                let node = self.nodes.get(id);
                let depends_on_array_join = (node.kind == NodeKind::Input
                    && array_joined_columns.contains(&node.result_name))
                    || node.children.iter().any(|child| !split_set.contains(child));
                if !depends_on_array_join {
                    split_set.insert(id);
                }
                stack.pop();
            }
        }

        let (mut first, second) = self.split(&split_set);
        // Array-joined columns must survive through the first stage even
        // if nothing in it uses them.
        first.settings.project_input = false;
        (first, second)
    }

    /// Carve out the sub-DAG computing one exposed filter column.
    pub fn split_for_filter(&self, column_name: &str) -> Result<(ExprDag, ExprDag)> {
        let id = self.index.find(column_name).ok_or_else(|| {
            Error::Invariant(format!(
                "index does not contain filter column {}; DAG:\n{}",
                column_name,
                self.dump()
            ))
        })?;
        let mut split_nodes = HashSet::new();
        split_nodes.insert(id);
        Ok(self.split(&split_nodes))
    }
}
