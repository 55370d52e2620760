use log::trace;
use rustc_hash::FxHashSet;

use crate::{
    error::{TileError, TileResult},
    tree::{
        node::{NodeId, TreeNode, ValueNode},
        op::{TensorOp, ValueKind},
    },
};

/// Canonical binary operator/value tree of one kernel.
///
/// Besides the nodes, the tree records how its tensor terms are classified:
/// exactly one output, the defined variables (intermediates inlined through
/// `ElementwiseAssign`) and the input variables. Each tensor term is
/// represented in these lists by its first occurrence in reading order.
#[derive(Debug, Clone)]
pub struct ExpressionTree {
    nodes: Vec<TreeNode>,
    root: NodeId,
    output: NodeId,
    output_value: ValueNode,
    tensors: Vec<NodeId>,
    index_sets: Vec<NodeId>,
    defined: Vec<NodeId>,
    inputs: Vec<NodeId>,
}

impl ExpressionTree {
    /// Validates and classifies a node arena. Used by [`TreeBuilder::build`](crate::tree::TreeBuilder::build).
    pub(crate) fn from_nodes(nodes: Vec<TreeNode>, root: NodeId) -> TileResult<Self> {
        let mut tree = ExpressionTree {
            nodes,
            root,
            output: root,
            output_value: ValueNode::tensor(""),
            tensors: Vec::new(),
            index_sets: Vec::new(),
            defined: Vec::new(),
            inputs: Vec::new(),
        };

        let order = tree.reading_order()?;
        let output = tree.find_output()?;
        for &id in &order {
            if tree.op(id) == Some(TensorOp::Index) {
                tree.index_target(id)?;
            }
        }

        let output_value = tree
            .value(output)
            .cloned()
            .ok_or_else(|| TileError::malformed("the output is not a value node"))?;
        let output_label = output_value.label.clone();

        let mut defined = Vec::new();
        let mut defined_labels = FxHashSet::default();
        for &id in &order {
            if let Some((TensorOp::ElementwiseAssign, Some(left), _)) = tree.operator(id) {
                match tree.value(left) {
                    Some(v) if v.kind.is_tensor_like() && v.label != output_label => {
                        if defined_labels.insert(v.label.clone()) {
                            defined.push(left);
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut tensors = Vec::new();
        let mut index_sets = Vec::new();
        let mut inputs = Vec::new();
        let mut seen = FxHashSet::default();
        for &id in &order {
            let Some(value) = tree.value(id) else {
                continue;
            };
            match value.kind {
                ValueKind::IndexSet => index_sets.push(id),
                ValueKind::Tensor | ValueKind::Scalar => {
                    if seen.insert(value.label.clone()) {
                        tensors.push(id);
                        if value.label != output_label && !defined_labels.contains(&value.label) {
                            inputs.push(id);
                        }
                    }
                }
                ValueKind::Constant => {}
            }
        }

        trace!(
            "classified tree: output {}, {} defined, {} inputs",
            output_label,
            defined.len(),
            inputs.len()
        );
        tree.output = output;
        tree.output_value = output_value;
        tree.tensors = tensors;
        tree.index_sets = index_sets;
        tree.defined = defined;
        tree.inputs = inputs;
        Ok(tree)
    }

    /// Nodes reachable from the root in pre-order, left before right.
    fn reading_order(&self) -> TileResult<Vec<NodeId>> {
        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self
                .nodes
                .get(id.0)
                .ok_or_else(|| TileError::malformed(format!("node {} does not exist", id.0)))?;
            if !visited.insert(id) {
                return Err(TileError::malformed(format!(
                    "node {} is reachable through more than one parent",
                    id.0
                )));
            }
            order.push(id);
            for child in node.children().into_iter().rev() {
                stack.push(child);
            }
        }
        Ok(order)
    }

    fn find_output(&self) -> TileResult<NodeId> {
        let tensor_leaf = |id: Option<NodeId>| {
            id.filter(|&id| matches!(self.value(id), Some(v) if v.kind.is_tensor_like()))
        };
        let output = match self.operator(self.root) {
            Some((TensorOp::Assign, Some(left), _)) => match self.operator(left) {
                Some((TensorOp::Index, target, _)) => tensor_leaf(target),
                Some(_) => None,
                None => tensor_leaf(Some(left)),
            },
            Some((TensorOp::ElementwiseAssign, left, _)) => tensor_leaf(left),
            _ => None,
        };
        output.ok_or_else(|| TileError::malformed("the root does not assign an output tensor"))
    }

    /// Resolves the tensor read by an `Index` node: a tensor leaf, or the
    /// tensor of an `ElementwiseAssign` wrapper.
    pub fn index_target(&self, index: NodeId) -> TileResult<&ValueNode> {
        let invalid = |reason: &str| TileError::InvalidIndexTarget {
            node: format!("node {}", index.0),
            reason: reason.to_string(),
        };
        let left = match self.operator(index) {
            Some((TensorOp::Index, Some(left), _)) => left,
            _ => return Err(invalid("could not determine LHS of Index")),
        };
        let target = match self.node(left) {
            Some(TreeNode::Value(_)) => left,
            Some(TreeNode::Operator {
                op: TensorOp::ElementwiseAssign,
                left: Some(inner),
                ..
            }) => *inner,
            _ => return Err(invalid("could not determine LHS of Index")),
        };
        match self.value(target) {
            Some(v) if v.kind == ValueKind::Tensor => Ok(v),
            Some(_) => Err(invalid("LHS of Index is not a tensor")),
            None => Err(invalid("could not determine LHS of Index")),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn value(&self, id: NodeId) -> Option<&ValueNode> {
        self.node(id).and_then(TreeNode::value)
    }

    pub fn op(&self, id: NodeId) -> Option<TensorOp> {
        self.node(id).and_then(TreeNode::op)
    }

    /// Operator kind and children of an operator node.
    pub fn operator(&self, id: NodeId) -> Option<(TensorOp, Option<NodeId>, Option<NodeId>)> {
        match self.node(id)? {
            TreeNode::Operator { op, left, right } => Some((*op, *left, *right)),
            TreeNode::Value(_) => None,
        }
    }

    pub fn output_id(&self) -> NodeId {
        self.output
    }

    pub fn output_node(&self) -> &ValueNode {
        &self.output_value
    }

    fn values<'a>(&'a self, ids: &'a [NodeId]) -> impl Iterator<Item = &'a ValueNode> + 'a {
        ids.iter().filter_map(|&id| self.value(id))
    }

    /// Every tensor term of the tree: output, defined and input variables.
    pub fn tensor_nodes(&self) -> impl Iterator<Item = &ValueNode> {
        self.values(&self.tensors)
    }

    pub fn index_set_nodes(&self) -> impl Iterator<Item = &ValueNode> {
        self.values(&self.index_sets)
    }

    pub fn defined_variable_nodes(&self) -> impl Iterator<Item = &ValueNode> {
        self.values(&self.defined)
    }

    pub fn input_variable_nodes(&self) -> impl Iterator<Item = &ValueNode> {
        self.values(&self.inputs)
    }

    pub fn is_input_variable(&self, label: &str) -> bool {
        self.input_variable_nodes().any(|v| v.label == label)
    }

    pub fn is_defined_variable(&self, label: &str) -> bool {
        self.defined_variable_nodes().any(|v| v.label == label)
    }

    /// Labels of the tensors that index sets of this tree were declared for.
    pub fn index_set_parents(&self) -> Vec<&str> {
        let mut parents: Vec<&str> = Vec::new();
        for parent in self.index_set_nodes().filter_map(|v| v.parent.as_deref()) {
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }
        parents
    }

    /// Number of operator nodes of kind `op` on the path from the root to `id`.
    pub fn count_on_path(&self, id: NodeId, op: TensorOp) -> usize {
        fn walk(tree: &ExpressionTree, at: NodeId, target: NodeId, op: TensorOp, acc: usize) -> Option<usize> {
            let here = acc + usize::from(tree.op(at) == Some(op));
            if at == target {
                return Some(here);
            }
            tree.node(at)?
                .children()
                .into_iter()
                .find_map(|child| walk(tree, child, target, op, here))
        }
        walk(self, self.root, id, op, 0).unwrap_or(0)
    }
}
