use rustc_hash::FxHashSet;

use crate::tree::TensorOp;

/// Decides when an operand text is wrapped in parentheses.
///
/// A child operand is parenthesized when both the parent and the child
/// operator are nestable, unless the (parent, child) pair is exempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestingPolicy {
    nestable: FxHashSet<TensorOp>,
    exempt: FxHashSet<(TensorOp, TensorOp)>,
}

impl NestingPolicy {
    /// A policy that never adds parentheses.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nestable(mut self, ops: impl IntoIterator<Item = TensorOp>) -> Self {
        self.nestable.extend(ops);
        self
    }

    /// Exempts `child` operands directly under `parent`.
    pub fn with_exempt(mut self, parent: TensorOp, child: TensorOp) -> Self {
        self.exempt.insert((parent, child));
        self
    }

    pub fn is_nestable(&self, op: TensorOp) -> bool {
        self.nestable.contains(&op)
    }

    pub fn wraps(&self, parent: TensorOp, child: TensorOp) -> bool {
        self.is_nestable(parent) && self.is_nestable(child) && !self.exempt.contains(&(parent, child))
    }

    pub fn apply(&self, parent: TensorOp, child: Option<TensorOp>, text: String) -> String {
        match child {
            Some(child) if self.wraps(parent, child) => format!("({text})"),
            _ => text,
        }
    }
}
