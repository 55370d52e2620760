//! Symbolic integer expressions for dimensions and index arithmetic.

pub mod expr;

pub use expr::Expr;
