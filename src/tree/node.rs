use crate::{
    notation::TensorId,
    tree::op::{TensorOp, ValueKind},
};

/// Position of a node in its [`ExpressionTree`](crate::tree::ExpressionTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A leaf of the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueNode {
    pub kind: ValueKind,
    /// Display name of the term, or the literal text of a constant.
    pub label: String,
    /// Tensor term this leaf stands for, when built from a session.
    pub tensor: Option<TensorId>,
    /// For index-set leaves, the label of the tensor the set was declared for.
    pub parent: Option<String>,
}

impl ValueNode {
    pub fn tensor(label: impl Into<String>) -> Self {
        Self::new(ValueKind::Tensor, label)
    }

    pub fn scalar(label: impl Into<String>) -> Self {
        Self::new(ValueKind::Scalar, label)
    }

    pub fn index_set(label: impl Into<String>, parent: Option<String>) -> Self {
        ValueNode {
            parent,
            ..Self::new(ValueKind::IndexSet, label)
        }
    }

    pub fn constant(label: impl Into<String>) -> Self {
        Self::new(ValueKind::Constant, label)
    }

    fn new(kind: ValueKind, label: impl Into<String>) -> Self {
        ValueNode {
            kind,
            label: label.into(),
            tensor: None,
            parent: None,
        }
    }

    pub fn with_term(mut self, tensor: TensorId) -> Self {
        self.tensor = Some(tensor);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Operator {
        op: TensorOp,
        left: Option<NodeId>,
        right: Option<NodeId>,
    },
    Value(ValueNode),
}

impl TreeNode {
    pub fn op(&self) -> Option<TensorOp> {
        match self {
            TreeNode::Operator { op, .. } => Some(*op),
            TreeNode::Value(_) => None,
        }
    }

    pub fn value(&self) -> Option<&ValueNode> {
        match self {
            TreeNode::Value(v) => Some(v),
            TreeNode::Operator { .. } => None,
        }
    }

    /// Children in left, right order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            TreeNode::Operator { left, right, .. } => left.iter().chain(right.iter()).copied().collect(),
            TreeNode::Value(_) => Vec::new(),
        }
    }
}
