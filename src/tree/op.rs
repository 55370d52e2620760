use std::fmt;

/// Operator kinds of the canonical expression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorOp {
    /// `Index(tensor, indices) = rhs`
    Assign,
    /// `tensor = rhs`, applied element by element
    ElementwiseAssign,
    /// `tensor[indices]`
    Index,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Neg,
    Square,
    Sqrt,
    Exp,
    Log,
    Sin,
    Cos,
    Tanh,
    Summation,
    Product,
    Maximum,
    Minimum,
}

impl TensorOp {
    /// Number of children an operator node carries. Unary operators use the
    /// left slot only.
    pub fn arity(&self) -> usize {
        match self {
            TensorOp::Assign
            | TensorOp::ElementwiseAssign
            | TensorOp::Index
            | TensorOp::Add
            | TensorOp::Sub
            | TensorOp::Mul
            | TensorOp::Div
            | TensorOp::Pow => 2,
            _ => 1,
        }
    }

    /// Maps a method-call name of the notation layer onto an operator.
    pub fn from_call_name(name: &str) -> Option<Self> {
        let op = match name {
            "sum" => TensorOp::Summation,
            "prod" => TensorOp::Product,
            "max" => TensorOp::Maximum,
            "min" => TensorOp::Minimum,
            "square" => TensorOp::Square,
            "sqrt" => TensorOp::Sqrt,
            "exp" => TensorOp::Exp,
            "log" => TensorOp::Log,
            "sin" => TensorOp::Sin,
            "cos" => TensorOp::Cos,
            "tanh" => TensorOp::Tanh,
            _ => return None,
        };
        Some(op)
    }

    pub fn is_contraction(&self) -> bool {
        matches!(
            self,
            TensorOp::Summation | TensorOp::Product | TensorOp::Maximum | TensorOp::Minimum
        )
    }
}

impl fmt::Display for TensorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Kinds of leaf values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Tensor,
    Scalar,
    IndexSet,
    Constant,
}

impl ValueKind {
    /// Tensor and scalar leaves both name a tensor term.
    pub fn is_tensor_like(&self) -> bool {
        matches!(self, ValueKind::Tensor | ValueKind::Scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("sum", TensorOp::Summation)]
    #[case("prod", TensorOp::Product)]
    #[case("max", TensorOp::Maximum)]
    #[case("min", TensorOp::Minimum)]
    #[case("square", TensorOp::Square)]
    #[case("tanh", TensorOp::Tanh)]
    fn test_call_names(#[case] name: &str, #[case] op: TensorOp) {
        assert_eq!(TensorOp::from_call_name(name), Some(op));
    }

    #[test]
    fn test_unknown_call_name() {
        assert_eq!(TensorOp::from_call_name("erf"), None);
    }

    #[test]
    fn test_arity() {
        assert_eq!(TensorOp::Index.arity(), 2);
        assert_eq!(TensorOp::Summation.arity(), 1);
        assert_eq!(TensorOp::Neg.arity(), 1);
    }
}
