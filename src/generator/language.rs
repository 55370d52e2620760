use log::trace;

use crate::{
    error::{TileError, TileResult},
    generator::{context::GeneratorContext, nesting::NestingPolicy, writer::LanguageWriter},
    tree::{ExpressionTree, NodeId, TensorOp},
};

/// Which child slot a node occupies under its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Root,
    Left,
    Right,
}

/// Where a visited node sits: its parent operator (if any) and its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub parent: Option<TensorOp>,
    pub side: Side,
}

impl Position {
    pub fn root() -> Self {
        Position {
            parent: None,
            side: Side::Root,
        }
    }

    pub fn left_of(op: TensorOp) -> Self {
        Position {
            parent: Some(op),
            side: Side::Left,
        }
    }

    pub fn right_of(op: TensorOp) -> Self {
        Position {
            parent: Some(op),
            side: Side::Right,
        }
    }

    /// Whether this is the left child of `op`.
    pub fn is_left_of(&self, op: TensorOp) -> bool {
        self.parent == Some(op) && self.side == Side::Left
    }
}

/// Post-order code generation over an [`ExpressionTree`].
///
/// Implementors provide the tree, a writer, a nesting policy and a context;
/// the default methods walk the tree right child first, then left, and build
/// text bottom-up. Target generators override [`visit_operator`] for the
/// operators that need more than template substitution.
///
/// [`visit_operator`]: LanguageGenerator::visit_operator
pub trait LanguageGenerator {
    type Writer: LanguageWriter;

    fn tree(&self) -> &ExpressionTree;
    fn writer(&self) -> &Self::Writer;
    fn nesting(&self) -> &NestingPolicy;
    fn context(&self) -> &GeneratorContext;
    fn context_mut(&mut self) -> &mut GeneratorContext;

    /// Runs the traversal and returns the single remaining fragment.
    fn visit_tree(&mut self) -> TileResult<String> {
        self.context_mut().clear();
        let root = self.tree().root();
        self.visit(root, Position::root())?;
        self.after_visit_tree()
    }

    fn after_visit_tree(&mut self) -> TileResult<String> {
        match self.context().fragments() {
            [text] => Ok(text.clone()),
            fragments => Err(TileError::malformed(format!(
                "expected one fragment after traversal, found {}",
                fragments.len()
            ))),
        }
    }

    fn visit(&mut self, id: NodeId, position: Position) -> TileResult<()> {
        trace!("visiting node {} at {:?}", id.0, position);
        match self.tree().operator(id) {
            Some((op, left, right)) => self.visit_operator(id, op, left, right, position),
            None => self.visit_value(id),
        }
    }

    fn visit_operator(
        &mut self,
        _id: NodeId,
        op: TensorOp,
        left: Option<NodeId>,
        right: Option<NodeId>,
        _position: Position,
    ) -> TileResult<()> {
        self.visit_operator_default(op, left, right)
    }

    /// Template substitution with nesting applied to each operand.
    fn visit_operator_default(
        &mut self,
        op: TensorOp,
        left: Option<NodeId>,
        right: Option<NodeId>,
    ) -> TileResult<()> {
        let operands = self.visit_children(op, left, right)?;
        let operands = self.nest_operands(op, left, right, operands);
        let text = self.writer().write_operator(op, &operands)?;
        self.context_mut().push(text);
        Ok(())
    }

    /// Visits right then left inside a frame for `op` and returns the operand
    /// texts in left, right order.
    fn visit_children(
        &mut self,
        op: TensorOp,
        left: Option<NodeId>,
        right: Option<NodeId>,
    ) -> TileResult<Vec<String>> {
        self.context_mut().enter(op);
        if let Some(right) = right {
            self.visit(right, Position::right_of(op))?;
        }
        if let Some(left) = left {
            self.visit(left, Position::left_of(op))?;
        }
        let mut operands = Vec::with_capacity(2);
        if left.is_some() {
            operands.push(self.context_mut().pop()?);
        }
        if right.is_some() {
            operands.push(self.context_mut().pop()?);
        }
        self.context_mut().exit()?;
        Ok(operands)
    }

    fn nest_operands(
        &self,
        op: TensorOp,
        left: Option<NodeId>,
        right: Option<NodeId>,
        operands: Vec<String>,
    ) -> Vec<String> {
        let children = left.into_iter().chain(right);
        operands
            .into_iter()
            .zip(children)
            .map(|(text, child)| self.nesting().apply(op, self.tree().op(child), text))
            .collect()
    }

    fn visit_value(&mut self, id: NodeId) -> TileResult<()> {
        let value = self
            .tree()
            .value(id)
            .ok_or_else(|| TileError::malformed(format!("node {} does not exist", id.0)))?;
        let text = self.writer().write_value(value);
        self.context_mut().push(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeBuilder;

    struct Infix;

    impl LanguageWriter for Infix {
        fn template(&self, op: TensorOp) -> Option<&'static str> {
            match op {
                TensorOp::Assign => Some("{0} = {1};"),
                TensorOp::ElementwiseAssign => Some("{0} := {1}"),
                TensorOp::Index => Some("{0}[{1}]"),
                TensorOp::Add => Some("{0} + {1}"),
                TensorOp::Mul => Some("{0} * {1}"),
                TensorOp::Neg => Some("-{0}"),
                _ => None,
            }
        }
    }

    struct Plain<'t> {
        tree: &'t ExpressionTree,
        writer: Infix,
        nesting: NestingPolicy,
        context: GeneratorContext,
    }

    impl<'t> Plain<'t> {
        fn new(tree: &'t ExpressionTree) -> Self {
            Plain {
                tree,
                writer: Infix,
                nesting: NestingPolicy::new()
                    .with_nestable([TensorOp::Add, TensorOp::Mul])
                    .with_exempt(TensorOp::Add, TensorOp::Mul),
                context: GeneratorContext::new(),
            }
        }
    }

    impl LanguageGenerator for Plain<'_> {
        type Writer = Infix;

        fn tree(&self) -> &ExpressionTree {
            self.tree
        }
        fn writer(&self) -> &Infix {
            &self.writer
        }
        fn nesting(&self) -> &NestingPolicy {
            &self.nesting
        }
        fn context(&self) -> &GeneratorContext {
            &self.context
        }
        fn context_mut(&mut self) -> &mut GeneratorContext {
            &mut self.context
        }
    }

    fn assign(b: &mut TreeBuilder, rhs: NodeId) -> NodeId {
        let out = b.tensor("Out");
        b.binary(TensorOp::ElementwiseAssign, out, rhs)
    }

    #[test]
    fn test_nested_product_is_parenthesized() {
        // (A * B) * C
        let mut b = TreeBuilder::new();
        let a = b.tensor("A");
        let bb = b.tensor("B");
        let ab = b.binary(TensorOp::Mul, a, bb);
        let c = b.tensor("C");
        let abc = b.binary(TensorOp::Mul, ab, c);
        let root = assign(&mut b, abc);
        let tree = b.build(root).unwrap();

        assert_eq!(Plain::new(&tree).visit_tree().unwrap(), "Out := (A * B) * C");
    }

    #[test]
    fn test_exempt_pair_is_not_parenthesized() {
        // A * B + C
        let mut b = TreeBuilder::new();
        let a = b.tensor("A");
        let bb = b.tensor("B");
        let ab = b.binary(TensorOp::Mul, a, bb);
        let c = b.tensor("C");
        let sum = b.binary(TensorOp::Add, ab, c);
        let root = assign(&mut b, sum);
        let tree = b.build(root).unwrap();

        assert_eq!(Plain::new(&tree).visit_tree().unwrap(), "Out := A * B + C");
    }

    #[test]
    fn test_sum_under_product_is_parenthesized() {
        // (A + B) * C
        let mut b = TreeBuilder::new();
        let a = b.tensor("A");
        let bb = b.tensor("B");
        let sum = b.binary(TensorOp::Add, a, bb);
        let c = b.tensor("C");
        let product = b.binary(TensorOp::Mul, sum, c);
        let root = assign(&mut b, product);
        let tree = b.build(root).unwrap();

        let mut generator = Plain::new(&tree);
        assert_eq!(generator.visit_tree().unwrap(), "Out := (A + B) * C");
        assert_eq!(generator.context().len(), 1);
        assert_eq!(generator.context().depth(), 0);
    }

    #[test]
    fn test_missing_child_is_malformed() {
        let mut b = TreeBuilder::new();
        let a = b.tensor("A");
        let half = b.operator(TensorOp::Mul, Some(a), None);
        let root = assign(&mut b, half);
        let tree = b.build(root).unwrap();

        assert!(matches!(
            Plain::new(&tree).visit_tree(),
            Err(TileError::MalformedTree { .. })
        ));
    }

    #[test]
    fn test_assign_with_index() {
        let mut b = TreeBuilder::new();
        let c = b.tensor("C");
        let ij = b.index_set("i, j", None);
        let lhs = b.binary(TensorOp::Index, c, ij);
        let a = b.tensor("A");
        let neg = b.unary(TensorOp::Neg, a);
        let root = b.binary(TensorOp::Assign, lhs, neg);
        let tree = b.build(root).unwrap();

        assert_eq!(Plain::new(&tree).visit_tree().unwrap(), "C[i, j] = -A;");
    }
}
