use crate::{
    dtype::Const,
    error::TileResult,
    tree::{
        expression_tree::ExpressionTree,
        node::{NodeId, TreeNode, ValueNode},
        op::TensorOp,
    },
};

/// Assembles an [`ExpressionTree`] node by node.
///
/// Nodes are appended to an arena and referenced by [`NodeId`]; [`build`]
/// validates the shape of the result and classifies its tensor terms.
///
/// [`build`]: TreeBuilder::build
///
/// # Examples
///
/// ```
/// use tilegen::tree::{TensorOp, TreeBuilder};
///
/// let mut b = TreeBuilder::new();
/// let c = b.tensor("C");
/// let a = b.tensor("A");
/// let k = b.constant("2");
/// let rhs = b.binary(TensorOp::Mul, a, k);
/// let root = b.binary(TensorOp::ElementwiseAssign, c, rhs);
/// let tree = b.build(root).unwrap();
/// assert_eq!(tree.output_node().label, "C");
/// ```
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<TreeNode>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: TreeNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Adds an operator node with arbitrary (possibly missing) children.
    pub fn operator(&mut self, op: TensorOp, left: Option<NodeId>, right: Option<NodeId>) -> NodeId {
        self.push(TreeNode::Operator { op, left, right })
    }

    pub fn binary(&mut self, op: TensorOp, left: NodeId, right: NodeId) -> NodeId {
        self.operator(op, Some(left), Some(right))
    }

    pub fn unary(&mut self, op: TensorOp, operand: NodeId) -> NodeId {
        self.operator(op, Some(operand), None)
    }

    pub fn value(&mut self, value: ValueNode) -> NodeId {
        self.push(TreeNode::Value(value))
    }

    pub fn tensor(&mut self, label: &str) -> NodeId {
        self.value(ValueNode::tensor(label))
    }

    pub fn scalar(&mut self, label: &str) -> NodeId {
        self.value(ValueNode::scalar(label))
    }

    pub fn index_set(&mut self, label: &str, parent: Option<&str>) -> NodeId {
        self.value(ValueNode::index_set(label, parent.map(str::to_string)))
    }

    pub fn constant(&mut self, label: &str) -> NodeId {
        self.value(ValueNode::constant(label))
    }

    pub fn literal(&mut self, value: Const) -> NodeId {
        self.value(ValueNode::constant(value.to_string()))
    }

    /// Finishes the tree rooted at `root`.
    ///
    /// The root must assign an output tensor, every node must have at most one
    /// parent, and every `Index` must read a tensor.
    pub fn build(self, root: NodeId) -> TileResult<ExpressionTree> {
        ExpressionTree::from_nodes(self.nodes, root)
    }
}
