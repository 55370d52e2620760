//! Operator sugar over the explicit builders on [`Session`].

use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

use crate::notation::{
    expr::{IntoExpr, TensorExpr},
    session::Session,
    tensor::Tensor,
};

macro_rules! impl_binary_op {
    ($trait:ident, $fname:ident) => {
        impl<'s, R: IntoExpr<'s>> $trait<R> for TensorExpr<'s> {
            type Output = TensorExpr<'s>;
            fn $fname(self, rhs: R) -> Self::Output {
                Session::$fname(self.session, self, rhs)
            }
        }

        impl<'s, R: IntoExpr<'s>> $trait<R> for Tensor<'s> {
            type Output = TensorExpr<'s>;
            fn $fname(self, rhs: R) -> Self::Output {
                Session::$fname(self.session, self, rhs)
            }
        }

        impl_binary_op!(@literal $trait, $fname, i32, i64, f32, f64);
    };
    (@literal $trait:ident, $fname:ident, $($t:ty),*) => {
        $(
            impl<'s> $trait<TensorExpr<'s>> for $t {
                type Output = TensorExpr<'s>;
                fn $fname(self, rhs: TensorExpr<'s>) -> Self::Output {
                    Session::$fname(rhs.session, self, rhs)
                }
            }

            impl<'s> $trait<Tensor<'s>> for $t {
                type Output = TensorExpr<'s>;
                fn $fname(self, rhs: Tensor<'s>) -> Self::Output {
                    Session::$fname(rhs.session, self, rhs)
                }
            }
        )*
    };
}

impl_binary_op!(Add, add);
impl_binary_op!(Sub, sub);
impl_binary_op!(Mul, mul);
impl_binary_op!(Div, div);
impl_binary_op!(Rem, rem);

impl<'s> Neg for TensorExpr<'s> {
    type Output = TensorExpr<'s>;
    fn neg(self) -> Self::Output {
        self.session.neg(self)
    }
}

impl<'s> Neg for Tensor<'s> {
    type Output = TensorExpr<'s>;
    fn neg(self) -> Self::Output {
        self.session.neg(self)
    }
}
