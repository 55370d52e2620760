use std::fmt;

use crate::{
    dtype::Const,
    notation::{
        session::{ExprId, IndexId, Session, TensorId},
        tensor::Tensor,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryKind {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryKind {
    Neg,
}

/// How a contraction folds the values of its summed-over indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregation {
    Sum,
    Product,
    Max,
    Min,
}

impl Aggregation {
    /// The method name that builds this contraction.
    pub fn call_name(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Product => "prod",
            Aggregation::Max => "max",
            Aggregation::Min => "min",
        }
    }

    pub fn from_call_name(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(Aggregation::Sum),
            "prod" => Some(Aggregation::Product),
            "max" => Some(Aggregation::Max),
            "min" => Some(Aggregation::Min),
            _ => None,
        }
    }
}

/// A node of the host expression graph. Never evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    Tensor(TensorId),
    Constant(Const),
    Access {
        tensor: TensorId,
        indices: Vec<IndexId>,
    },
    Binary {
        op: BinaryKind,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnaryKind,
        operand: ExprId,
    },
    Call {
        name: String,
        args: Vec<ExprId>,
    },
    /// `implicit` marks summations inserted by a contraction definition.
    Contraction {
        aggregation: Aggregation,
        operand: ExprId,
        implicit: bool,
    },
}

/// Handle to a host expression node.
#[derive(Clone, Copy)]
pub struct TensorExpr<'s> {
    pub id: ExprId,
    pub session: &'s Session,
}

impl<'s> TensorExpr<'s> {
    pub fn node(&self) -> ExprNode {
        self.session.expr_node(self.id)
    }

    pub fn sum(self) -> TensorExpr<'s> {
        self.session.contract(Aggregation::Sum, self)
    }

    pub fn prod(self) -> TensorExpr<'s> {
        self.session.contract(Aggregation::Product, self)
    }

    pub fn max(self) -> TensorExpr<'s> {
        self.session.contract(Aggregation::Max, self)
    }

    pub fn min(self) -> TensorExpr<'s> {
        self.session.contract(Aggregation::Min, self)
    }

    pub fn pow(self, exponent: impl IntoExpr<'s>) -> TensorExpr<'s> {
        self.session.pow(self, exponent)
    }

    /// Applies a function by name, e.g. `x.call("sqrt")`.
    pub fn call(self, name: &str) -> TensorExpr<'s> {
        self.session.call(name, vec![self])
    }

    pub fn square(self) -> TensorExpr<'s> {
        self.call("square")
    }

    pub fn sqrt(self) -> TensorExpr<'s> {
        self.call("sqrt")
    }

    pub fn exp(self) -> TensorExpr<'s> {
        self.call("exp")
    }

    pub fn log(self) -> TensorExpr<'s> {
        self.call("log")
    }

    pub fn sin(self) -> TensorExpr<'s> {
        self.call("sin")
    }

    pub fn cos(self) -> TensorExpr<'s> {
        self.call("cos")
    }

    pub fn tanh(self) -> TensorExpr<'s> {
        self.call("tanh")
    }
}

impl fmt::Debug for TensorExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TensorExpr({:?})", self.node())
    }
}

/// Values that can stand as an operand of a host expression.
pub trait IntoExpr<'s> {
    fn into_expr(self, session: &'s Session) -> ExprId;
}

impl<'s> IntoExpr<'s> for TensorExpr<'s> {
    fn into_expr(self, _session: &'s Session) -> ExprId {
        self.id
    }
}

impl<'s> IntoExpr<'s> for Tensor<'s> {
    fn into_expr(self, session: &'s Session) -> ExprId {
        session.reference(self).id
    }
}

macro_rules! impl_into_expr_for_literal {
    ($($t:ty),*) => {
        $(
            impl<'s> IntoExpr<'s> for $t {
                fn into_expr(self, session: &'s Session) -> ExprId {
                    session.constant(self).id
                }
            }
        )*
    };
}

impl_into_expr_for_literal!(i32, i64, f32, f64);
