use std::fmt;

use log::debug;

use crate::{
    error::{TileError, TileResult},
    notation::{
        expr::{ExprNode, IntoExpr, TensorExpr},
        index::{Index, IndexSet},
        session::{ExprId, IndexSetId, Session, TensorId},
    },
    shape::Expr,
};

/// The single definition slot of a tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorDefinition {
    /// An input variable.
    Undefined,
    /// `T[indices] = rhs`, with implicit summation over free right-hand indices.
    Contraction { indices: IndexSetId, rhs: ExprId },
    /// `T = rhs`, applied element by element.
    Elementwise { dependents: Vec<TensorId>, rhs: ExprId },
}

#[derive(Debug, Clone)]
pub struct TensorData {
    pub name: String,
    pub shape: Vec<Expr>,
    pub definition: TensorDefinition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorKind {
    Scalar,
    Vector,
    Matrix,
    Tensor,
}

/// Handle to a tensor of a [`Session`].
///
/// `Tensor` is a lightweight `Copy` view, in the same way a node id plus a
/// reference to its owning graph would be.
#[derive(Clone, Copy)]
pub struct Tensor<'s> {
    pub id: TensorId,
    pub session: &'s Session,
}

impl<'s> Tensor<'s> {
    pub fn name(&self) -> String {
        self.session.tensors.borrow()[self.id.0].name.clone()
    }

    pub fn shape(&self) -> Vec<Expr> {
        self.session.tensors.borrow()[self.id.0].shape.clone()
    }

    pub fn rank(&self) -> usize {
        self.session.tensors.borrow()[self.id.0].shape.len()
    }

    pub fn kind(&self) -> TensorKind {
        match self.rank() {
            0 => TensorKind::Scalar,
            1 => TensorKind::Vector,
            2 => TensorKind::Matrix,
            _ => TensorKind::Tensor,
        }
    }

    pub fn definition(&self) -> TensorDefinition {
        self.session.tensors.borrow()[self.id.0].definition.clone()
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self.definition(), TensorDefinition::Undefined)
    }

    /// A new tensor with the same shape and the next name in the family.
    pub fn sibling(&self) -> Tensor<'s> {
        self.session.successor_tensor(self.id)
    }

    /// `N` tensors of the same shape, starting with `self`: `A` gives `[A, B, C]`.
    pub fn siblings<const N: usize>(&self) -> [Tensor<'s>; N] {
        let mut previous = *self;
        std::array::from_fn(|n| {
            if n > 0 {
                previous = previous.sibling();
            }
            previous
        })
    }

    /// Whole-tensor reference, for elementwise expressions.
    pub fn expr(&self) -> TensorExpr<'s> {
        self.session.reference(*self)
    }

    /// Indexed read `self[indices]`.
    pub fn at(&self, indices: &[Index<'s>]) -> TileResult<TensorExpr<'s>> {
        self.session.access(*self, indices)
    }

    /// Indexed read over every index of `set`.
    pub fn at_set(&self, set: IndexSet<'s>) -> TileResult<TensorExpr<'s>> {
        self.at(&set.indices())
    }

    /// Contraction definition `self[indices] = rhs`.
    ///
    /// Indices that occur on the right but not on the left are summed over.
    pub fn define(&self, indices: &[Index<'s>], rhs: impl IntoExpr<'s>) -> TileResult<()> {
        self.ensure_undefined()?;
        if indices.len() != self.rank() {
            return Err(TileError::DimensionMismatch {
                tensor: self.name(),
                expected: format!("{} indices", self.rank()),
                got: format!("{} indices", indices.len()),
            });
        }
        for (n, index) in indices.iter().enumerate() {
            if indices[..n].contains(index) {
                return Err(TileError::unsupported(format!(
                    "index {} repeated on the left-hand side of {}",
                    index.name(),
                    self.name()
                )));
            }
        }
        let ids: Vec<_> = indices.iter().map(|i| i.id).collect();
        let set = self.session.adhoc_index_set(&ids);
        self.define_contraction(set, rhs.into_expr(self.session))
    }

    /// Contraction definition over a declared index set.
    pub fn define_set(&self, set: IndexSet<'s>, rhs: impl IntoExpr<'s>) -> TileResult<()> {
        self.ensure_undefined()?;
        if set.dimension_count() != self.rank() {
            return Err(TileError::DimensionMismatch {
                tensor: self.name(),
                expected: format!("{} indices", self.rank()),
                got: format!("{} indices", set.dimension_count()),
            });
        }
        self.define_contraction(set.id, rhs.into_expr(self.session))
    }

    fn define_contraction(&self, set: IndexSetId, rhs: ExprId) -> TileResult<()> {
        let session = self.session;
        let rhs = match session.expr_node(rhs) {
            ExprNode::Contraction { implicit: false, .. } => rhs,
            _ => {
                let bound: Vec<_> = session.index_sets.borrow()[set.0]
                    .indices
                    .clone()
                    .into_iter()
                    .flat_map(|id| session.base_indices(id))
                    .collect();
                let free: Vec<_> = session
                    .free_indices(rhs)
                    .into_iter()
                    .filter(|id| !bound.contains(id))
                    .collect();
                if free.is_empty() {
                    rhs
                } else {
                    debug!(
                        "{}: summing over free indices {:?}",
                        self.name(),
                        free.iter().map(|&id| session.index_name(id)).collect::<Vec<_>>()
                    );
                    session
                        .add_expr(ExprNode::Contraction {
                            aggregation: crate::notation::Aggregation::Sum,
                            operand: rhs,
                            implicit: true,
                        })
                        .id
                }
            }
        };
        self.set_definition(TensorDefinition::Contraction { indices: set, rhs });
        Ok(())
    }

    /// Elementwise definition `self = rhs`.
    ///
    /// Every non-scalar tensor in `rhs` must have the shape of `self`.
    pub fn define_elementwise(&self, rhs: impl IntoExpr<'s>) -> TileResult<()> {
        self.ensure_undefined()?;
        let session = self.session;
        let rhs = rhs.into_expr(session);
        if session.contains_access(rhs) {
            return Err(TileError::unsupported(format!(
                "indexed access in the elementwise definition of {}",
                self.name()
            )));
        }
        let dependents = session.referenced_tensors(rhs);
        let shape = self.shape();
        for &dependent in &dependents {
            let dependent = session.tensor_view(dependent);
            if dependent == *self {
                return Err(TileError::unsupported(format!(
                    "{} refers to itself in its elementwise definition",
                    self.name()
                )));
            }
            if dependent.rank() > 0 && dependent.shape() != shape {
                return Err(TileError::DimensionMismatch {
                    tensor: dependent.name(),
                    expected: format_shape(&shape),
                    got: format_shape(&dependent.shape()),
                });
            }
        }
        self.set_definition(TensorDefinition::Elementwise { dependents, rhs });
        Ok(())
    }

    fn ensure_undefined(&self) -> TileResult<()> {
        if self.is_defined() {
            return Err(TileError::AlreadyDefined {
                tensor: self.name(),
            });
        }
        Ok(())
    }

    fn set_definition(&self, definition: TensorDefinition) {
        self.session.tensors.borrow_mut()[self.id.0].definition = definition;
    }
}

fn format_shape(shape: &[Expr]) -> String {
    let dims: Vec<_> = shape.iter().map(|d| d.to_string()).collect();
    format!("[{}]", dims.join(", "))
}

impl PartialEq for Tensor<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.session, other.session) && self.id == other.id
    }
}

impl Eq for Tensor<'_> {}

impl fmt::Debug for Tensor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor({}{})", self.name(), format_shape(&self.shape()))
    }
}

impl fmt::Display for Tensor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
