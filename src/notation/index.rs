use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use crate::{
    error::{TileError, TileResult},
    notation::session::{IndexId, IndexSetId, Session, TensorId},
    shape::Expr,
};

#[derive(Debug, Clone, PartialEq)]
pub enum IndexKind {
    /// Bound to one declared axis.
    Constant,
    /// Arithmetic over other indices and integer literals.
    Expression { expr: Expr, bases: Vec<IndexId> },
}

#[derive(Debug, Clone)]
pub struct IndexData {
    pub name: String,
    pub set: Option<IndexSetId>,
    pub order: usize,
    pub dimension: Expr,
    pub kind: IndexKind,
}

#[derive(Debug, Clone)]
pub struct IndexSetData {
    pub name: String,
    pub indices: Vec<IndexId>,
    pub parent: Option<TensorId>,
}

/// Handle to an index of a [`Session`].
///
/// Arithmetic with integers or other indices yields expression indices such
/// as `i + 5`, usable wherever a plain index is.
#[derive(Clone, Copy)]
pub struct Index<'s> {
    pub id: IndexId,
    pub session: &'s Session,
}

impl<'s> Index<'s> {
    pub fn name(&self) -> String {
        self.session.index_name(self.id)
    }

    pub fn order(&self) -> usize {
        self.session.indices.borrow()[self.id.0].order
    }

    pub fn dimension(&self) -> Expr {
        self.session.indices.borrow()[self.id.0].dimension.clone()
    }

    pub fn kind(&self) -> IndexKind {
        self.session.indices.borrow()[self.id.0].kind.clone()
    }

    pub fn is_expression(&self) -> bool {
        matches!(self.kind(), IndexKind::Expression { .. })
    }

    /// The set this index was declared in, if any.
    pub fn index_set(&self) -> Option<IndexSet<'s>> {
        let set = self.session.indices.borrow()[self.id.0].set;
        set.map(|id| IndexSet {
            id,
            session: self.session,
        })
    }

    /// The plain indices this index is built from.
    pub fn bases(&self) -> Vec<Index<'s>> {
        self.session
            .base_indices(self.id)
            .into_iter()
            .map(|id| self.session.index_view(id))
            .collect()
    }

    fn as_expr(&self) -> Expr {
        match self.kind() {
            IndexKind::Constant => Expr::Var(self.name()),
            IndexKind::Expression { expr, .. } => expr,
        }
    }

    fn derive(self, expr: Expr, other: Option<Index<'s>>) -> Index<'s> {
        let mut bases = self.session.base_indices(self.id);
        if let Some(other) = other {
            for base in self.session.base_indices(other.id) {
                if !bases.contains(&base) {
                    bases.push(base);
                }
            }
        }
        self.session
            .derived_index(expr, bases, self.order(), self.dimension())
    }
}

impl PartialEq for Index<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.session, other.session) && self.id == other.id
    }
}

impl Eq for Index<'_> {}

impl PartialOrd for Index<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Index<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order()
            .cmp(&other.order())
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Debug for Index<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index({})", self.name())
    }
}

impl fmt::Display for Index<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl<'s> Add<i64> for Index<'s> {
    type Output = Index<'s>;
    fn add(self, rhs: i64) -> Self::Output {
        let expr = (self.as_expr() + rhs).simplify();
        self.derive(expr, None)
    }
}

impl<'s> Sub<i64> for Index<'s> {
    type Output = Index<'s>;
    fn sub(self, rhs: i64) -> Self::Output {
        let expr = (self.as_expr() - rhs).simplify();
        self.derive(expr, None)
    }
}

impl<'s> Mul<i64> for Index<'s> {
    type Output = Index<'s>;
    fn mul(self, rhs: i64) -> Self::Output {
        let expr = (self.as_expr() * rhs).simplify();
        self.derive(expr, None)
    }
}

impl<'s> Add for Index<'s> {
    type Output = Index<'s>;
    fn add(self, rhs: Index<'s>) -> Self::Output {
        let expr = self.as_expr() + rhs.as_expr();
        self.derive(expr, Some(rhs))
    }
}

impl<'s> Sub for Index<'s> {
    type Output = Index<'s>;
    fn sub(self, rhs: Index<'s>) -> Self::Output {
        let expr = self.as_expr() - rhs.as_expr();
        self.derive(expr, Some(rhs))
    }
}

impl<'s> Neg for Index<'s> {
    type Output = Index<'s>;
    fn neg(self) -> Self::Output {
        let expr = -self.as_expr();
        self.derive(expr, None)
    }
}

/// Handle to an ordered, duplicate-free group of indices.
#[derive(Clone, Copy)]
pub struct IndexSet<'s> {
    pub id: IndexSetId,
    pub session: &'s Session,
}

impl<'s> IndexSet<'s> {
    pub fn name(&self) -> String {
        self.session.index_sets.borrow()[self.id.0].name.clone()
    }

    pub fn indices(&self) -> Vec<Index<'s>> {
        self.session.index_sets.borrow()[self.id.0]
            .indices
            .iter()
            .map(|&id| self.session.index_view(id))
            .collect()
    }

    pub(crate) fn index_ids(&self) -> Vec<IndexId> {
        self.session.index_sets.borrow()[self.id.0].indices.clone()
    }

    pub fn dimension_count(&self) -> usize {
        self.session.index_sets.borrow()[self.id.0].indices.len()
    }

    /// The tensor this set was declared for via [`Session::index_set_for`].
    pub fn parent(&self) -> Option<crate::notation::Tensor<'s>> {
        let parent = self.session.index_sets.borrow()[self.id.0].parent;
        parent.map(|id| self.session.tensor_view(id))
    }

    /// The `n`th index.
    pub fn get(&self, n: usize) -> TileResult<Index<'s>> {
        let ids = self.index_ids();
        ids.get(n)
            .map(|&id| self.session.index_view(id))
            .ok_or_else(|| TileError::IndexOutOfRange {
                set: self.name(),
                requested: n + 1,
                available: ids.len(),
            })
    }

    /// The first `N` indices as an array, for destructuring.
    ///
    /// `N` must be between 1 and 8.
    pub fn take<const N: usize>(&self) -> TileResult<[Index<'s>; N]> {
        let ids = self.index_ids();
        if N == 0 || N > 8 || N > ids.len() {
            return Err(TileError::IndexOutOfRange {
                set: self.name(),
                requested: N,
                available: ids.len(),
            });
        }
        Ok(std::array::from_fn(|n| self.session.index_view(ids[n])))
    }

    /// Tuple-style destructuring: `let (i, j) = set.split::<2>()?`.
    ///
    /// Arities 1 through 8 are available.
    pub fn split<const N: usize>(&self) -> TileResult<<Arity<N> as IndexTuple<'s>>::Output>
    where
        Arity<N>: IndexTuple<'s>,
    {
        Arity::<N>::from_set(self)
    }
}

impl PartialEq for IndexSet<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.session, other.session) && self.id == other.id
    }
}

impl fmt::Debug for IndexSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.indices()).finish()
    }
}

/// Arity marker for [`IndexSet::split`].
pub struct Arity<const N: usize>;

/// Tuples an [`IndexSet`] can be split into.
pub trait IndexTuple<'s> {
    type Output;
    fn from_set(set: &IndexSet<'s>) -> TileResult<Self::Output>;
}

macro_rules! impl_index_tuple {
    ($n:literal; $($name:ident),+) => {
        impl<'s> IndexTuple<'s> for Arity<$n> {
            type Output = ($(impl_index_tuple!(@ty $name),)+);
            fn from_set(set: &IndexSet<'s>) -> TileResult<Self::Output> {
                let [$($name),+] = set.take::<$n>()?;
                Ok(($($name,)+))
            }
        }
    };
    (@ty $name:ident) => { Index<'s> };
}

impl_index_tuple!(1; a);
impl_index_tuple!(2; a, b);
impl_index_tuple!(3; a, b, c);
impl_index_tuple!(4; a, b, c, d);
impl_index_tuple!(5; a, b, c, d, e);
impl_index_tuple!(6; a, b, c, d, e, f);
impl_index_tuple!(7; a, b, c, d, e, f, g);
impl_index_tuple!(8; a, b, c, d, e, f, g, h);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape;

    #[test]
    fn test_index_family_names() {
        let session = Session::new();
        let set = session.index_set("i", shape![2, 3, 4]);
        let names: Vec<_> = set.indices().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["i", "j", "k"]);
        assert_eq!(set.dimension_count(), 3);

        let set = session.index_set("m0", shape![2, 2]);
        let names: Vec<_> = set.indices().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["m0", "m1"]);
    }

    #[test]
    fn test_expression_index() {
        let session = Session::new();
        let (i, n) = session.index_set("i", shape![8, 8]).split::<2>().unwrap();
        let shifted = i + 5;
        assert_eq!(shifted.name(), "i + 5");
        assert!(shifted.is_expression());
        assert_eq!(shifted.bases(), vec![i]);
        assert_eq!((n - 4).name(), "j - 4");
        assert_eq!(session.index_literal(6).name(), "6");
        assert!(session.index_literal(6).bases().is_empty());
        assert_eq!((i + n).bases(), vec![i, n]);
    }

    #[test]
    fn test_index_order() {
        let session = Session::new();
        let (i, j, k) = session.index_set("i", shape![2, 2, 2]).split::<3>().unwrap();
        let mut sorted = vec![k, i, j];
        sorted.sort();
        assert_eq!(sorted, vec![i, j, k]);
    }

    #[test]
    fn test_get_out_of_range() {
        let session = Session::new();
        let set = session.index_set("a", shape![2, 2]);
        assert_eq!(set.get(1).unwrap().name(), "b");
        assert_eq!(
            set.get(2),
            Err(TileError::IndexOutOfRange {
                set: set.name(),
                requested: 3,
                available: 2,
            })
        );
    }

    #[test]
    fn test_split_out_of_range() {
        let session = Session::new();
        let set = session.index_set("a", shape![2, 2]);
        let err = set.split::<3>().unwrap_err();
        assert!(matches!(
            err,
            TileError::IndexOutOfRange {
                requested: 3,
                available: 2,
                ..
            }
        ));
        assert!(set.take::<0>().is_err());
        assert!(set.split::<1>().is_ok());
    }

    #[test]
    fn test_parented_set() {
        let session = Session::new();
        let m = session.matrix("M", 3, 5);
        let set = session.index_set_for(m, "m0");
        assert_eq!(set.parent(), Some(m));
        assert_eq!(set.get(1).unwrap().dimension(), Expr::Const(5));
        assert!(session.index_set("i", m.shape()).parent().is_none());
    }
}
