//! Graphviz DOT rendering of expression trees.

use crate::{
    dot::ToDot,
    tree::{
        expression_tree::ExpressionTree,
        node::TreeNode,
        op::ValueKind,
    },
};

impl ToDot for ExpressionTree {
    fn to_dot(&self) -> String {
        let mut dot = String::from("digraph ExpressionTree {\n");
        dot.push_str("  node [shape=box];\n\n");

        for (id, node) in self.nodes() {
            let (label, style) = match node {
                TreeNode::Operator { op, .. } => (op.to_string(), "shape=ellipse"),
                TreeNode::Value(value) => {
                    let role = match value.kind {
                        ValueKind::Tensor | ValueKind::Scalar if id == self.output_id() => "output",
                        ValueKind::Tensor | ValueKind::Scalar
                            if self.is_defined_variable(&value.label) =>
                        {
                            "defined"
                        }
                        ValueKind::Tensor | ValueKind::Scalar => "input",
                        ValueKind::IndexSet => "indices",
                        ValueKind::Constant => "constant",
                    };
                    (
                        format!("{}\\n{}", escape(&value.label), role),
                        "shape=box",
                    )
                }
            };
            dot.push_str(&format!("  n{} [label=\"{}\", {}];\n", id.0, label, style));
        }

        dot.push('\n');
        for (id, node) in self.nodes() {
            if let TreeNode::Operator { left, right, .. } = node {
                if let Some(left) = left {
                    dot.push_str(&format!("  n{} -> n{} [label=\"L\"];\n", id.0, left.0));
                }
                if let Some(right) = right {
                    dot.push_str(&format!("  n{} -> n{} [label=\"R\"];\n", id.0, right.0));
                }
            }
        }

        dot.push_str("}\n");
        dot
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use crate::dot::ToDot;
    use crate::tree::{TensorOp, TreeBuilder};

    #[test]
    fn test_to_dot() {
        let mut b = TreeBuilder::new();
        let c = b.tensor("C");
        let a = b.tensor("A");
        let neg = b.unary(TensorOp::Neg, a);
        let root = b.binary(TensorOp::ElementwiseAssign, c, neg);
        let dot = b.build(root).unwrap().to_dot();

        assert!(dot.starts_with("digraph ExpressionTree {"));
        assert!(dot.contains("n0 [label=\"C\\noutput\", shape=box];"));
        assert!(dot.contains("n1 [label=\"A\\ninput\", shape=box];"));
        assert!(dot.contains("n2 [label=\"Neg\", shape=ellipse];"));
        assert!(dot.contains("n3 -> n0 [label=\"L\"];"));
        assert!(dot.contains("n3 -> n2 [label=\"R\"];"));
    }
}
