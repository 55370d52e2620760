use std::cell::RefCell;

use log::trace;
use rustc_hash::FxHashMap;

use crate::{
    dtype::Const,
    error::{TileError, TileResult},
    notation::{
        expr::{Aggregation, BinaryKind, ExprNode, IntoExpr, TensorExpr, UnaryKind},
        index::{Index, IndexData, IndexKind, IndexSet, IndexSetData},
        naming::{NameAllocator, Namespace},
        tensor::{Tensor, TensorData, TensorDefinition},
    },
    shape::Expr,
};

/// Identifies a tensor inside its [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(pub usize);

/// Identifies an index inside its [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexId(pub usize);

/// Identifies an index set inside its [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexSetId(pub usize);

/// Identifies a host expression node inside its [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

/// A named term, as returned by [`Session::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermRef {
    Tensor(TensorId),
    Index(IndexId),
    IndexSet(IndexSetId),
}

/// Owns every term and host expression node of one authoring session.
///
/// The session uses interior mutability (`RefCell`) so the lightweight handles
/// ([`Tensor`], [`Index`], [`IndexSet`], [`TensorExpr`]) can be `Copy` and only
/// borrow it immutably. Nothing is shared between sessions.
///
/// # Examples
///
/// ```
/// use tilegen::notation::Session;
/// use tilegen::shape;
///
/// let session = Session::new();
/// let [a, b, c] = session.tensor("A", shape![4, 4]).siblings::<3>();
/// let (i, j) = session.index_set("i", shape![4, 4]).split::<2>().unwrap();
/// c.define(&[i, j], a.at(&[i, j]).unwrap() * b.at(&[j, i]).unwrap()).unwrap();
/// assert!(c.is_defined());
/// ```
#[derive(Default, Debug)]
pub struct Session {
    pub(crate) tensors: RefCell<Vec<TensorData>>,
    pub(crate) indices: RefCell<Vec<IndexData>>,
    pub(crate) index_sets: RefCell<Vec<IndexSetData>>,
    pub(crate) exprs: RefCell<Vec<ExprNode>>,
    names: RefCell<NameAllocator>,
    terms: RefCell<FxHashMap<String, TermRef>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a term by its display name.
    pub fn lookup(&self, name: &str) -> Option<TermRef> {
        self.terms.borrow().get(name).copied()
    }

    pub fn find_tensor(&self, name: &str) -> Option<Tensor<'_>> {
        match self.lookup(name)? {
            TermRef::Tensor(id) => Some(self.tensor_view(id)),
            _ => None,
        }
    }

    pub fn find_index(&self, name: &str) -> Option<Index<'_>> {
        match self.lookup(name)? {
            TermRef::Index(id) => Some(self.index_view(id)),
            _ => None,
        }
    }

    fn register(&self, name: &str, term: TermRef) {
        self.terms.borrow_mut().insert(name.to_string(), term);
    }

    // ---- tensors ----

    /// Declares a tensor. The name gets a numeric suffix if it is taken.
    pub fn tensor(&self, name: &str, shape: Vec<Expr>) -> Tensor<'_> {
        let name = self.names.borrow_mut().claim_in(Namespace::Tensor, name);
        self.add_tensor(name, shape)
    }

    /// Declares a tensor with a generated name (`T0`, `T1`, ...).
    pub fn anonymous_tensor(&self, shape: Vec<Expr>) -> Tensor<'_> {
        let base = match shape.len() {
            0 => "S",
            1 => "V",
            2 => "M",
            _ => "T",
        };
        let name = self.names.borrow_mut().fresh_in(Namespace::Tensor, base);
        self.add_tensor(name, shape)
    }

    pub fn scalar(&self, name: &str) -> Tensor<'_> {
        self.tensor(name, Vec::new())
    }

    pub fn vector(&self, name: &str, len: impl Into<Expr>) -> Tensor<'_> {
        self.tensor(name, vec![len.into()])
    }

    pub fn matrix(&self, name: &str, rows: impl Into<Expr>, cols: impl Into<Expr>) -> Tensor<'_> {
        self.tensor(name, vec![rows.into(), cols.into()])
    }

    /// Declares a tensor with a fresh index set spanning its shape.
    ///
    /// The set is not parented, so the tensor stays an ordinary term.
    pub fn tensor_with_indices(
        &self,
        name: &str,
        shape: Vec<Expr>,
        index_base: &str,
    ) -> (Tensor<'_>, IndexSet<'_>) {
        let set = self.index_set(index_base, shape.clone());
        (self.tensor(name, shape), set)
    }

    /// Declares a tensor carrying the name of `like`'s successor and `like`'s shape.
    pub(crate) fn successor_tensor(&self, like: TensorId) -> Tensor<'_> {
        let (name, shape) = {
            let tensors = self.tensors.borrow();
            (tensors[like.0].name.clone(), tensors[like.0].shape.clone())
        };
        let name = self.names.borrow_mut().successor_in(Namespace::Tensor, &name);
        self.add_tensor(name, shape)
    }

    fn add_tensor(&self, name: String, shape: Vec<Expr>) -> Tensor<'_> {
        let id = {
            let mut tensors = self.tensors.borrow_mut();
            let id = TensorId(tensors.len());
            tensors.push(TensorData {
                name: name.clone(),
                shape,
                definition: TensorDefinition::Undefined,
            });
            id
        };
        self.register(&name, TermRef::Tensor(id));
        trace!("declared tensor {name}");
        self.tensor_view(id)
    }

    pub(crate) fn tensor_view(&self, id: TensorId) -> Tensor<'_> {
        Tensor { id, session: self }
    }

    // ---- indices ----

    /// Declares an index set with one index per dimension.
    ///
    /// Index names follow the family of `base` (`i, j, k`, `m0, m1`). An empty
    /// base starts a generated family.
    pub fn index_set(&self, base: &str, dimensions: Vec<Expr>) -> IndexSet<'_> {
        self.add_index_set(base, dimensions, None)
    }

    /// Declares an index set spanning `tensor`'s shape, with `tensor` as parent.
    ///
    /// A parented tensor only provides dimensions and is left out of the
    /// generated function's parameters and return binding.
    pub fn index_set_for<'s>(&'s self, tensor: Tensor<'s>, base: &str) -> IndexSet<'s> {
        self.add_index_set(base, tensor.shape(), Some(tensor.id))
    }

    fn add_index_set(
        &self,
        base: &str,
        dimensions: Vec<Expr>,
        parent: Option<TensorId>,
    ) -> IndexSet<'_> {
        let set_id = IndexSetId(self.index_sets.borrow().len());
        let set_name = self.names.borrow_mut().fresh("I");

        let mut ids = Vec::with_capacity(dimensions.len());
        let mut previous: Option<String> = None;
        for (order, dimension) in dimensions.into_iter().enumerate() {
            let name = {
                let mut names = self.names.borrow_mut();
                match &previous {
                    Some(prev) => names.successor_in(Namespace::Index, prev),
                    None if base.is_empty() => names.fresh_in(Namespace::Index, "i"),
                    None => names.claim_in(Namespace::Index, base),
                }
            };
            let id = self.add_index(IndexData {
                name: name.clone(),
                set: Some(set_id),
                order,
                dimension,
                kind: IndexKind::Constant,
            });
            self.register(&name, TermRef::Index(id));
            ids.push(id);
            previous = Some(name);
        }

        self.index_sets.borrow_mut().push(IndexSetData {
            name: set_name.clone(),
            indices: ids,
            parent,
        });
        self.register(&set_name, TermRef::IndexSet(set_id));
        IndexSet {
            id: set_id,
            session: self,
        }
    }

    /// Groups existing indices into an unparented set, keeping their positions.
    pub(crate) fn adhoc_index_set(&self, indices: &[IndexId]) -> IndexSetId {
        let set_name = self.names.borrow_mut().fresh("I");
        let mut sets = self.index_sets.borrow_mut();
        let id = IndexSetId(sets.len());
        sets.push(IndexSetData {
            name: set_name,
            indices: indices.to_vec(),
            parent: None,
        });
        id
    }

    /// Creates a literal index such as the `6` in `A[6, j]`.
    pub fn index_literal(&self, value: i64) -> Index<'_> {
        let id = self.add_index(IndexData {
            name: value.to_string(),
            set: None,
            order: 0,
            dimension: Expr::Const(1),
            kind: IndexKind::Expression {
                expr: Expr::Const(value),
                bases: Vec::new(),
            },
        });
        self.index_view(id)
    }

    /// Creates an expression index from arithmetic over other indices.
    pub(crate) fn derived_index(
        &self,
        expr: Expr,
        bases: Vec<IndexId>,
        order: usize,
        dimension: Expr,
    ) -> Index<'_> {
        let id = self.add_index(IndexData {
            name: expr.to_string(),
            set: None,
            order,
            dimension,
            kind: IndexKind::Expression { expr, bases },
        });
        self.index_view(id)
    }

    fn add_index(&self, data: IndexData) -> IndexId {
        let mut indices = self.indices.borrow_mut();
        let id = IndexId(indices.len());
        indices.push(data);
        id
    }

    pub(crate) fn index_view(&self, id: IndexId) -> Index<'_> {
        Index { id, session: self }
    }

    /// Base indices an index stands for: itself, or the indices its expression uses.
    pub(crate) fn base_indices(&self, id: IndexId) -> Vec<IndexId> {
        match &self.indices.borrow()[id.0].kind {
            IndexKind::Constant => vec![id],
            IndexKind::Expression { bases, .. } => bases.clone(),
        }
    }

    pub(crate) fn index_name(&self, id: IndexId) -> String {
        self.indices.borrow()[id.0].name.clone()
    }

    // ---- host expression builders ----

    pub(crate) fn add_expr(&self, node: ExprNode) -> TensorExpr<'_> {
        let mut exprs = self.exprs.borrow_mut();
        let id = ExprId(exprs.len());
        exprs.push(node);
        TensorExpr { id, session: self }
    }

    pub(crate) fn expr_node(&self, id: ExprId) -> ExprNode {
        self.exprs.borrow()[id.0].clone()
    }

    /// A whole-tensor reference.
    pub fn reference<'s>(&'s self, tensor: Tensor<'s>) -> TensorExpr<'s> {
        self.add_expr(ExprNode::Tensor(tensor.id))
    }

    pub fn constant(&self, value: impl Into<Const>) -> TensorExpr<'_> {
        self.add_expr(ExprNode::Constant(value.into()))
    }

    /// An indexed read `tensor[indices]`.
    pub fn access<'s>(&'s self, tensor: Tensor<'s>, indices: &[Index<'s>]) -> TileResult<TensorExpr<'s>> {
        let rank = tensor.rank();
        if indices.len() > rank {
            return Err(TileError::DimensionMismatch {
                tensor: tensor.name(),
                expected: format!("at most {rank} indices"),
                got: format!("{} indices", indices.len()),
            });
        }
        let indices = indices.iter().map(|i| i.id).collect();
        Ok(self.add_expr(ExprNode::Access {
            tensor: tensor.id,
            indices,
        }))
    }

    fn binary<'s>(&'s self, op: BinaryKind, lhs: impl IntoExpr<'s>, rhs: impl IntoExpr<'s>) -> TensorExpr<'s> {
        let lhs = lhs.into_expr(self);
        let rhs = rhs.into_expr(self);
        self.add_expr(ExprNode::Binary { op, lhs, rhs })
    }

    pub fn add<'s>(&'s self, lhs: impl IntoExpr<'s>, rhs: impl IntoExpr<'s>) -> TensorExpr<'s> {
        self.binary(BinaryKind::Add, lhs, rhs)
    }

    pub fn sub<'s>(&'s self, lhs: impl IntoExpr<'s>, rhs: impl IntoExpr<'s>) -> TensorExpr<'s> {
        self.binary(BinaryKind::Sub, lhs, rhs)
    }

    pub fn mul<'s>(&'s self, lhs: impl IntoExpr<'s>, rhs: impl IntoExpr<'s>) -> TensorExpr<'s> {
        self.binary(BinaryKind::Mul, lhs, rhs)
    }

    pub fn div<'s>(&'s self, lhs: impl IntoExpr<'s>, rhs: impl IntoExpr<'s>) -> TensorExpr<'s> {
        self.binary(BinaryKind::Div, lhs, rhs)
    }

    pub fn pow<'s>(&'s self, lhs: impl IntoExpr<'s>, rhs: impl IntoExpr<'s>) -> TensorExpr<'s> {
        self.binary(BinaryKind::Pow, lhs, rhs)
    }

    pub fn rem<'s>(&'s self, lhs: impl IntoExpr<'s>, rhs: impl IntoExpr<'s>) -> TensorExpr<'s> {
        self.binary(BinaryKind::Rem, lhs, rhs)
    }

    pub fn neg<'s>(&'s self, operand: impl IntoExpr<'s>) -> TensorExpr<'s> {
        let operand = operand.into_expr(self);
        self.add_expr(ExprNode::Unary {
            op: UnaryKind::Neg,
            operand,
        })
    }

    /// An explicit contraction over the free indices of `operand`.
    pub fn contract<'s>(&'s self, aggregation: Aggregation, operand: impl IntoExpr<'s>) -> TensorExpr<'s> {
        let operand = operand.into_expr(self);
        self.add_expr(ExprNode::Contraction {
            aggregation,
            operand,
            implicit: false,
        })
    }

    /// A method call by name. Recognized contraction names with one argument
    /// become contraction nodes; anything else stays a call and is judged
    /// during translation.
    pub fn call<'s>(&'s self, name: &str, args: Vec<TensorExpr<'s>>) -> TensorExpr<'s> {
        if let (Some(aggregation), [operand]) = (Aggregation::from_call_name(name), args.as_slice()) {
            return self.contract(aggregation, *operand);
        }
        let args = args.into_iter().map(|a| a.id).collect();
        self.add_expr(ExprNode::Call {
            name: name.to_string(),
            args,
        })
    }

    /// Indices read by `expr` that are not bound by an explicit contraction,
    /// expanded to base indices, in first-seen order.
    pub(crate) fn free_indices(&self, expr: ExprId) -> Vec<IndexId> {
        let mut out = Vec::new();
        self.collect_free_indices(expr, &mut out);
        out
    }

    fn collect_free_indices(&self, expr: ExprId, out: &mut Vec<IndexId>) {
        match self.expr_node(expr) {
            ExprNode::Tensor(_) | ExprNode::Constant(_) => {}
            ExprNode::Access { indices, .. } => {
                for index in indices {
                    for base in self.base_indices(index) {
                        if !out.contains(&base) {
                            out.push(base);
                        }
                    }
                }
            }
            ExprNode::Binary { lhs, rhs, .. } => {
                self.collect_free_indices(lhs, out);
                self.collect_free_indices(rhs, out);
            }
            ExprNode::Unary { operand, .. } => self.collect_free_indices(operand, out),
            ExprNode::Call { args, .. } => {
                for arg in args {
                    self.collect_free_indices(arg, out);
                }
            }
            ExprNode::Contraction { implicit, operand, .. } => {
                if implicit {
                    self.collect_free_indices(operand, out);
                }
            }
        }
    }

    /// Tensors referenced by `expr`, deduplicated in first-seen order.
    pub(crate) fn referenced_tensors(&self, expr: ExprId) -> Vec<TensorId> {
        fn collect(session: &Session, expr: ExprId, out: &mut Vec<TensorId>) {
            match session.expr_node(expr) {
                ExprNode::Tensor(t) | ExprNode::Access { tensor: t, .. } => {
                    if !out.contains(&t) {
                        out.push(t);
                    }
                }
                ExprNode::Constant(_) => {}
                ExprNode::Binary { lhs, rhs, .. } => {
                    collect(session, lhs, out);
                    collect(session, rhs, out);
                }
                ExprNode::Unary { operand, .. } | ExprNode::Contraction { operand, .. } => {
                    collect(session, operand, out)
                }
                ExprNode::Call { args, .. } => {
                    for arg in args {
                        collect(session, arg, out);
                    }
                }
            }
        }
        let mut out = Vec::new();
        collect(self, expr, &mut out);
        out
    }

    /// Whether `expr` contains an indexed access anywhere.
    pub(crate) fn contains_access(&self, expr: ExprId) -> bool {
        match self.expr_node(expr) {
            ExprNode::Access { .. } => true,
            ExprNode::Tensor(_) | ExprNode::Constant(_) => false,
            ExprNode::Binary { lhs, rhs, .. } => self.contains_access(lhs) || self.contains_access(rhs),
            ExprNode::Unary { operand, .. } | ExprNode::Contraction { operand, .. } => {
                self.contains_access(operand)
            }
            ExprNode::Call { args, .. } => args.into_iter().any(|a| self.contains_access(a)),
        }
    }
}
