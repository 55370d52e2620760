use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Symbolic integer expression.
///
/// Used for tensor dimensions (which may be symbolic at the notation level) and
/// for index arithmetic such as `i + 5`. `Var` names refer to either a shape
/// variable or an index of the owning session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Const(i64),
    Var(String),
    Add(Box<Self>, Box<Self>),
    Sub(Box<Self>, Box<Self>),
    Mul(Box<Self>, Box<Self>),
    Div(Box<Self>, Box<Self>),
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_string())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(0))
    }

    /// Evaluates a closed expression.
    ///
    /// Fails on variables and on division by zero.
    pub fn evaluate(&self) -> Result<i64, String> {
        match self {
            Expr::Const(v) => Ok(*v),
            Expr::Var(name) => Err(format!("Cannot evaluate variable {}", name)),
            Expr::Add(l, r) => Ok(l.evaluate()? + r.evaluate()?),
            Expr::Sub(l, r) => Ok(l.evaluate()? - r.evaluate()?),
            Expr::Mul(l, r) => Ok(l.evaluate()? * r.evaluate()?),
            Expr::Div(l, r) => {
                let rv = r.evaluate()?;
                if rv == 0 {
                    return Err("Division by zero".to_string());
                }
                Ok(l.evaluate()? / rv)
            }
        }
    }

    /// Collects variable names in first-occurrence order, without duplicates.
    pub fn variables(&self) -> Vec<String> {
        fn collect(expr: &Expr, out: &mut Vec<String>) {
            match expr {
                Expr::Const(_) => {}
                Expr::Var(name) => {
                    if !out.contains(name) {
                        out.push(name.clone());
                    }
                }
                Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) => {
                    collect(l, out);
                    collect(r, out);
                }
            }
        }
        let mut out = Vec::new();
        collect(self, &mut out);
        out
    }

    pub fn simplify(self) -> Self {
        match self {
            Expr::Add(lhs, rhs) => {
                let lhs = lhs.simplify();
                let rhs = rhs.simplify();
                match (lhs, rhs) {
                    (Expr::Const(0), e) | (e, Expr::Const(0)) => e,
                    (Expr::Const(l), Expr::Const(r)) => Expr::Const(l + r),
                    (l, r) => l + r,
                }
            }
            Expr::Sub(lhs, rhs) => {
                let lhs = lhs.simplify();
                let rhs = rhs.simplify();
                match (lhs, rhs) {
                    (e, Expr::Const(0)) => e,
                    (l, r) if l == r => Expr::Const(0),
                    (Expr::Const(l), Expr::Const(r)) => Expr::Const(l - r),
                    (Expr::Add(a, b), r) if *b == r => *a,
                    (Expr::Add(a, b), r) if *a == r => *b,
                    (l, r) => l - r,
                }
            }
            Expr::Mul(lhs, rhs) => {
                let lhs = lhs.simplify();
                let rhs = rhs.simplify();
                match (lhs, rhs) {
                    (Expr::Const(0), _) | (_, Expr::Const(0)) => Expr::Const(0),
                    (Expr::Const(1), e) | (e, Expr::Const(1)) => e,
                    (Expr::Const(l), Expr::Const(r)) => Expr::Const(l * r),
                    (l, r) => l * r,
                }
            }
            Expr::Div(lhs, rhs) => {
                let lhs = lhs.simplify();
                let rhs = rhs.simplify();
                match (lhs, rhs) {
                    (e, Expr::Const(1)) => e,
                    (Expr::Const(l), Expr::Const(r)) if r != 0 => Expr::Const(l / r),
                    (l, r) if l == r => Expr::Const(1),
                    (l, r) => l / r,
                }
            }
            other => other,
        }
    }
}

macro_rules! impl_from_integer_for_expr {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expr {
                fn from(n: $t) -> Self {
                    Expr::Const(n as i64)
                }
            }
        )*
    };
}

impl_from_integer_for_expr!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::var(name)
    }
}

/// Builds a `Vec<Expr>` shape from integers or symbolic names.
///
/// ```
/// use tilegen::shape;
/// use tilegen::shape::Expr;
///
/// let s = shape![2, "N"];
/// assert_eq!(s, vec![Expr::Const(2), Expr::var("N")]);
/// ```
#[macro_export]
macro_rules! shape {
    () => {
        ::std::vec::Vec::<$crate::shape::Expr>::new()
    };
    ($($elem:expr),+ $(,)?) => {
        vec![$(::std::convert::Into::<$crate::shape::Expr>::into($elem)),+]
    };
}

macro_rules! impl_expr_binary_op {
    ($trait:ident, $fname:ident, $variant:expr) => {
        impl<T: Into<Expr>> $trait<T> for Expr {
            type Output = Expr;
            fn $fname(self, rhs: T) -> Self::Output {
                $variant(Box::new(self), Box::new(rhs.into()))
            }
        }
    };
}

impl_expr_binary_op!(Add, add, Expr::Add);
impl_expr_binary_op!(Sub, sub, Expr::Sub);
impl_expr_binary_op!(Mul, mul, Expr::Mul);
impl_expr_binary_op!(Div, div, Expr::Div);

impl Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Const(0) - self
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(n) => write!(f, "{}", n),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Add(lhs, rhs) => write!(f, "{} + {}", lhs, rhs),
            Expr::Sub(lhs, rhs) => {
                if lhs.is_zero() {
                    return write!(f, "-{}", rhs);
                }
                let needs_parens_rhs = matches!(**rhs, Expr::Add(_, _) | Expr::Sub(_, _));
                if needs_parens_rhs {
                    write!(f, "{} - ({})", lhs, rhs)
                } else {
                    write!(f, "{} - {}", lhs, rhs)
                }
            }
            Expr::Mul(lhs, rhs) | Expr::Div(lhs, rhs) => {
                let op = if matches!(self, Expr::Mul(_, _)) { "*" } else { "/" };
                let wrap = |e: &Expr| matches!(e, Expr::Add(_, _) | Expr::Sub(_, _));
                if wrap(lhs) {
                    write!(f, "({})", lhs)?;
                } else {
                    write!(f, "{}", lhs)?;
                }
                write!(f, " {} ", op)?;
                if wrap(rhs) {
                    write!(f, "({})", rhs)
                } else {
                    write!(f, "{}", rhs)
                }
            }
        }
    }
}
