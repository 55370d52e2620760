use log::{debug, trace};
use rustc_hash::FxHashSet;

use crate::{
    error::{TileError, TileResult},
    notation::{
        Aggregation, BinaryKind, ExprId, ExprNode, IndexId, Session, Tensor, TensorDefinition,
        TensorId, UnaryKind,
    },
    tree::{
        builder::TreeBuilder,
        expression_tree::ExpressionTree,
        node::{NodeId, ValueNode},
        op::TensorOp,
    },
};

/// Translates the definition of `output` into its canonical expression tree.
///
/// Contraction definitions become `Assign(Index(output, indices), rhs)` with
/// implicit summations pushed down to the additive terms that need them;
/// elementwise definitions become `ElementwiseAssign(output, rhs)`. Referenced
/// tensors with an elementwise definition are inlined.
pub fn translate(output: Tensor<'_>) -> TileResult<ExpressionTree> {
    Translator::new(output).run()
}

struct Translator<'s> {
    session: &'s Session,
    output: TensorId,
    builder: TreeBuilder,
    inlined: FxHashSet<TensorId>,
    inlining: Vec<TensorId>,
}

impl<'s> Translator<'s> {
    fn new(output: Tensor<'s>) -> Self {
        Translator {
            session: output.session,
            output: output.id,
            builder: TreeBuilder::new(),
            inlined: FxHashSet::default(),
            inlining: Vec::new(),
        }
    }

    fn run(mut self) -> TileResult<ExpressionTree> {
        let output = self.session.tensor_view(self.output);
        let root = match output.definition() {
            TensorDefinition::Undefined => {
                return Err(TileError::UndefinedOutput {
                    tensor: output.name(),
                })
            }
            TensorDefinition::Contraction { indices, rhs } => {
                let rhs = self.expr(rhs)?;
                let target = self.tensor_leaf(self.output);
                let ids = self.session.index_sets.borrow()[indices.0].indices.clone();
                let lhs = if ids.is_empty() {
                    target
                } else {
                    let set = self.index_set_leaf(&ids);
                    self.builder.binary(TensorOp::Index, target, set)
                };
                self.builder.binary(TensorOp::Assign, lhs, rhs)
            }
            TensorDefinition::Elementwise { rhs, .. } => {
                let rhs = self.expr(rhs)?;
                let target = self.tensor_leaf(self.output);
                self.builder.binary(TensorOp::ElementwiseAssign, target, rhs)
            }
        };
        let tree = self.builder.build(root)?;
        debug!(
            "translated {} into a tree of {} nodes",
            output.name(),
            tree.len()
        );
        Ok(tree)
    }

    // Right operands are translated before left ones so the first reference to
    // an inlined tensor is also the first one the generator visits.
    fn expr(&mut self, id: ExprId) -> TileResult<NodeId> {
        let node = self.session.expr_node(id);
        trace!("translating {:?}", node);
        match node {
            ExprNode::Tensor(tensor) => self.tensor_reference(tensor),
            ExprNode::Constant(value) => Ok(self.builder.literal(value)),
            ExprNode::Access { tensor, indices } => {
                if indices.is_empty() {
                    return self.tensor_reference(tensor);
                }
                let set = self.index_set_leaf(&indices);
                let target = self.tensor_reference(tensor)?;
                Ok(self.builder.binary(TensorOp::Index, target, set))
            }
            ExprNode::Binary { op, lhs, rhs } => {
                let op = match op {
                    BinaryKind::Add => TensorOp::Add,
                    BinaryKind::Sub => TensorOp::Sub,
                    BinaryKind::Mul => TensorOp::Mul,
                    BinaryKind::Div => TensorOp::Div,
                    BinaryKind::Pow => TensorOp::Pow,
                    BinaryKind::Rem => return Err(TileError::unsupported("remainder operator `%`")),
                };
                let right = self.expr(rhs)?;
                let left = self.expr(lhs)?;
                Ok(self.builder.binary(op, left, right))
            }
            ExprNode::Unary {
                op: UnaryKind::Neg,
                operand,
            } => {
                let operand = self.expr(operand)?;
                Ok(self.builder.unary(TensorOp::Neg, operand))
            }
            ExprNode::Call { name, args } => {
                let op = TensorOp::from_call_name(&name)
                    .ok_or_else(|| TileError::unsupported(format!("call to `{name}`")))?;
                let [arg] = args.as_slice() else {
                    return Err(TileError::unsupported(format!(
                        "call to `{name}` with {} arguments",
                        args.len()
                    )));
                };
                let operand = self.expr(*arg)?;
                Ok(self.builder.unary(op, operand))
            }
            ExprNode::Contraction {
                operand,
                implicit: true,
                ..
            } => {
                let free = self.session.free_indices(operand);
                self.place_summations(operand, &free)
            }
            ExprNode::Contraction {
                aggregation,
                operand,
                implicit: false,
            } => {
                let op = match aggregation {
                    Aggregation::Sum => TensorOp::Summation,
                    Aggregation::Product => TensorOp::Product,
                    Aggregation::Max => TensorOp::Maximum,
                    Aggregation::Min => TensorOp::Minimum,
                };
                let operand = self.expr(operand)?;
                Ok(self.builder.unary(op, operand))
            }
        }
    }

    /// Descends through additive nodes and wraps every other term that reads
    /// one of the summed indices in a single `Summation`.
    fn place_summations(&mut self, id: ExprId, summed: &[IndexId]) -> TileResult<NodeId> {
        let bound = self.bound_indices();
        let summed: Vec<_> = summed.iter().copied().filter(|i| !bound.contains(i)).collect();
        self.place(id, &summed)
    }

    fn place(&mut self, id: ExprId, summed: &[IndexId]) -> TileResult<NodeId> {
        if let ExprNode::Binary {
            op: op @ (BinaryKind::Add | BinaryKind::Sub),
            lhs,
            rhs,
        } = self.session.expr_node(id)
        {
            let op = if op == BinaryKind::Add {
                TensorOp::Add
            } else {
                TensorOp::Sub
            };
            let right = self.place(rhs, summed)?;
            let left = self.place(lhs, summed)?;
            return Ok(self.builder.binary(op, left, right));
        }

        let term = self.expr(id)?;
        let needs_sum = self
            .session
            .free_indices(id)
            .iter()
            .any(|i| summed.contains(i));
        if needs_sum {
            Ok(self.builder.unary(TensorOp::Summation, term))
        } else {
            Ok(term)
        }
    }

    /// Base indices of the output's left-hand side.
    fn bound_indices(&self) -> Vec<IndexId> {
        let output = self.session.tensor_view(self.output);
        match output.definition() {
            TensorDefinition::Contraction { indices, .. } => self.session.index_sets.borrow()
                [indices.0]
                .indices
                .clone()
                .into_iter()
                .flat_map(|id| self.session.base_indices(id))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn tensor_reference(&mut self, tensor: TensorId) -> TileResult<NodeId> {
        let view = self.session.tensor_view(tensor);
        if tensor == self.output {
            // Reached again from inside one of its own intermediates.
            let elementwise = matches!(view.definition(), TensorDefinition::Elementwise { .. });
            if elementwise && !self.inlining.is_empty() {
                return Err(TileError::unsupported(format!(
                    "cyclic elementwise definition through {}",
                    view.name()
                )));
            }
            return Ok(self.tensor_leaf(tensor));
        }
        if self.inlined.contains(&tensor) {
            return Ok(self.tensor_leaf(tensor));
        }
        match view.definition() {
            TensorDefinition::Undefined => Ok(self.tensor_leaf(tensor)),
            TensorDefinition::Elementwise { rhs, .. } => {
                if self.inlining.contains(&tensor) {
                    return Err(TileError::unsupported(format!(
                        "cyclic elementwise definition through {}",
                        view.name()
                    )));
                }
                self.inlining.push(tensor);
                let rhs = self.expr(rhs)?;
                self.inlining.pop();
                self.inlined.insert(tensor);
                let target = self.tensor_leaf(tensor);
                Ok(self.builder.binary(TensorOp::ElementwiseAssign, target, rhs))
            }
            TensorDefinition::Contraction { .. } => Err(TileError::unsupported(format!(
                "reference to {}, which has a contraction definition; compile it as its own kernel",
                view.name()
            ))),
        }
    }

    fn tensor_leaf(&mut self, tensor: TensorId) -> NodeId {
        let view = self.session.tensor_view(tensor);
        let value = if view.rank() == 0 {
            ValueNode::scalar(view.name())
        } else {
            ValueNode::tensor(view.name())
        };
        self.builder.value(value.with_term(tensor))
    }

    fn index_set_leaf(&mut self, indices: &[IndexId]) -> NodeId {
        let label = indices
            .iter()
            .map(|&id| self.session.index_name(id))
            .collect::<Vec<_>>()
            .join(", ");
        let parent = self.common_parent(indices);
        self.builder.value(ValueNode::index_set(label, parent))
    }

    /// The parent of the declared set every index in `indices` belongs to.
    fn common_parent(&self, indices: &[IndexId]) -> Option<String> {
        let data = self.session.indices.borrow();
        let first = data[indices.first()?.0].set?;
        if indices.iter().any(|id| data[id.0].set != Some(first)) {
            return None;
        }
        let parent = self.session.index_sets.borrow()[first.0].parent?;
        Some(self.session.tensor_view(parent).name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape;

    fn setup_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_contraction_root_shape() {
        setup_logger();
        let session = Session::new();
        let [a, b, c] = session.matrix("A", 4, 4).siblings::<3>();
        let (i, j) = session.index_set("a", shape![4, 4]).split::<2>().unwrap();
        c.define(&[i, j], a.at(&[i, j]).unwrap() * b.at(&[j, i]).unwrap())
            .unwrap();

        let tree = translate(c).unwrap();
        let (op, left, right) = tree.operator(tree.root()).unwrap();
        assert_eq!(op, TensorOp::Assign);
        assert_eq!(tree.op(left.unwrap()), Some(TensorOp::Index));
        assert_eq!(tree.op(right.unwrap()), Some(TensorOp::Mul));
        assert_eq!(tree.output_node().label, "C");
        let labels: Vec<_> = tree.index_set_nodes().map(|v| v.label.as_str()).collect();
        assert_eq!(labels, vec!["a, b", "a, b", "b, a"]);
    }

    #[test]
    fn test_undefined_output() {
        let session = Session::new();
        let a = session.vector("A", 3);
        assert_eq!(
            translate(a).unwrap_err(),
            TileError::UndefinedOutput {
                tensor: "A".to_string()
            }
        );
    }

    #[test]
    fn test_remainder_is_unsupported() {
        let session = Session::new();
        let [a, b, c] = session.vector("A", 3).siblings::<3>();
        c.define_elementwise(a % b).unwrap();
        assert!(matches!(
            translate(c),
            Err(TileError::UnsupportedExpression { construct }) if construct.contains('%')
        ));
    }

    #[test]
    fn test_unknown_call_is_unsupported() {
        let session = Session::new();
        let [a, c] = session.vector("A", 3).siblings::<2>();
        c.define_elementwise(a.expr().call("erf")).unwrap();
        assert!(matches!(
            translate(c),
            Err(TileError::UnsupportedExpression { construct }) if construct.contains("erf")
        ));
    }

    #[test]
    fn test_summation_pushed_below_addition() {
        let session = Session::new();
        let [a, b, c] = session.matrix("A", 4, 4).siblings::<3>();
        let v = session.vector("V", 4);
        let (i, j, k) = session.index_set("i", shape![4, 4, 4]).split::<3>().unwrap();
        // C[i, j] = A[i, k] * B[k, j] + V[i]
        let rhs = a.at(&[i, k]).unwrap() * b.at(&[k, j]).unwrap() + v.at(&[i]).unwrap();
        c.define(&[i, j], rhs).unwrap();

        let tree = translate(c).unwrap();
        let (_, _, rhs) = tree.operator(tree.root()).unwrap();
        let (op, left, right) = tree.operator(rhs.unwrap()).unwrap();
        assert_eq!(op, TensorOp::Add);
        assert_eq!(tree.op(left.unwrap()), Some(TensorOp::Summation));
        assert_eq!(tree.op(right.unwrap()), Some(TensorOp::Index));
    }

    #[test]
    fn test_elementwise_intermediate_is_inlined() {
        let session = Session::new();
        let [a, b, d, e] = session.vector("A", 4).siblings::<4>();
        d.define_elementwise(a + b).unwrap();
        e.define_elementwise(d * 2.0f32).unwrap();

        let tree = translate(e).unwrap();
        let defined: Vec<_> = tree.defined_variable_nodes().map(|v| v.label.as_str()).collect();
        assert_eq!(defined, vec!["D"]);
        let inputs: Vec<_> = tree.input_variable_nodes().map(|v| v.label.as_str()).collect();
        assert_eq!(inputs, vec!["A", "B"]);
    }

    #[test]
    fn test_contraction_intermediate_is_rejected() {
        let session = Session::new();
        let [a, d, e] = session.vector("A", 4).siblings::<3>();
        let (i,) = session.index_set("i", shape![4]).split::<1>().unwrap();
        d.define(&[i], a.at(&[i]).unwrap() * 2.0f32).unwrap();
        e.define(&[i], d.at(&[i]).unwrap() + 1.0f32).unwrap();
        assert!(matches!(
            translate(e),
            Err(TileError::UnsupportedExpression { .. })
        ));
    }

    #[test]
    fn test_cyclic_definitions_are_rejected() {
        let session = Session::new();
        let [d, e, out] = session.vector("D", 4).siblings::<3>();
        d.define_elementwise(e + 1.0f32).unwrap();
        e.define_elementwise(d * 2.0f32).unwrap();
        out.define_elementwise(d - e).unwrap();
        assert!(matches!(
            translate(out),
            Err(TileError::UnsupportedExpression { construct }) if construct.contains("cyclic")
        ));
    }

    #[test]
    fn test_cycle_through_output_is_rejected() {
        let session = Session::new();
        let [d, out] = session.vector("D", 4).siblings::<2>();
        d.define_elementwise(out * 2.0f32).unwrap();
        out.define_elementwise(d + 1.0f32).unwrap();
        assert!(matches!(
            translate(out),
            Err(TileError::UnsupportedExpression { construct })
                if construct == "cyclic elementwise definition through E"
        ));
    }

    #[test]
    fn test_contraction_output_read_through_intermediate() {
        let session = Session::new();
        let [c, d] = session.vector("C", 4).siblings::<2>();
        let [i] = session.index_set("i", shape![4]).take::<1>().unwrap();
        d.define_elementwise(c * 2).unwrap();
        c.define(&[i], d.at(&[i]).unwrap()).unwrap();
        assert!(translate(c).is_ok());
    }

    #[test]
    fn test_parented_index_set_records_parent() {
        let session = Session::new();
        let m = session.matrix("M", 3, 3);
        let [a, c] = session.matrix("A", 3, 3).siblings::<2>();
        let set = session.index_set_for(m, "m0");
        c.define_set(set, a.at_set(set).unwrap()).unwrap();

        let tree = translate(c).unwrap();
        assert_eq!(tree.index_set_parents(), vec!["M"]);
    }

    #[test]
    fn test_scalar_output() {
        let session = Session::new();
        let a = session.vector("A", 4);
        let s = session.scalar("s");
        let (i,) = session.index_set("i", shape![4]).split::<1>().unwrap();
        s.define(&[], a.at(&[i]).unwrap()).unwrap();

        let tree = translate(s).unwrap();
        let (op, left, right) = tree.operator(tree.root()).unwrap();
        assert_eq!(op, TensorOp::Assign);
        assert_eq!(tree.value(left.unwrap()).unwrap().label, "s");
        assert_eq!(tree.op(right.unwrap()), Some(TensorOp::Summation));
    }
}
