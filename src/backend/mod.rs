//! Code generation backends.

use crate::{error::TileResult, kernel::Kernel};

pub mod tile;

/// A compiler that turns a [`Kernel`] into target code.
pub trait KernelCompiler {
    type Output;
    type Option;
    fn new() -> Self;
    fn with_option(&mut self, option: Self::Option);
    fn compile(&mut self, kernel: &Kernel<'_>) -> TileResult<Self::Output>;
}
