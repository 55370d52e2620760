use crate::{
    generator::LanguageWriter,
    tree::{TensorOp, ValueKind, ValueNode},
};

/// Tile syntax for operators and leaf values.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileWriter;

impl LanguageWriter for TileWriter {
    fn template(&self, op: TensorOp) -> Option<&'static str> {
        let template = match op {
            TensorOp::Assign => "{0} = {1};",
            TensorOp::ElementwiseAssign => "{0}",
            TensorOp::Index => "{0}[{1}]",
            TensorOp::Add => "{0} + {1}",
            TensorOp::Sub => "{0} - {1}",
            TensorOp::Mul => "{0} * {1}",
            TensorOp::Div => "{0} / {1}",
            TensorOp::Pow => "pow({0}, {1})",
            TensorOp::Neg => "-{0}",
            TensorOp::Square => "{0} * {0}",
            TensorOp::Sqrt => "sqrt({0})",
            TensorOp::Exp => "exp({0})",
            TensorOp::Log => "log({0})",
            TensorOp::Sin => "sin({0})",
            TensorOp::Cos => "cos({0})",
            TensorOp::Tanh => "tanh({0})",
            TensorOp::Summation => "+({0})",
            TensorOp::Product => "*({0})",
            TensorOp::Maximum => ">({0})",
            TensorOp::Minimum => "<({0})",
        };
        Some(template)
    }

    /// Tensors are upper-case and index names lower-case in Tile.
    fn write_value(&self, node: &ValueNode) -> String {
        match node.kind {
            ValueKind::Tensor | ValueKind::Scalar => node.label.to_uppercase(),
            ValueKind::IndexSet => node.label.to_lowercase(),
            ValueKind::Constant => node.label.clone(),
        }
    }
}
