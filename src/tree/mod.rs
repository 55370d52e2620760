//! Canonical expression tree and the translator that produces it.

pub mod builder;
pub mod expression_tree;
pub mod node;
pub mod op;
pub mod translator;
pub mod visualization;

pub use builder::TreeBuilder;
pub use expression_tree::ExpressionTree;
pub use node::{NodeId, TreeNode, ValueNode};
pub use op::{TensorOp, ValueKind};
pub use translator::translate;
