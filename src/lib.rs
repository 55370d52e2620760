//! Tilegen: Einstein-notation tensor kernels to Tile source
//!
//! Tilegen turns tensor expressions written in Einstein summation notation
//! into source text for the Tile array-processing language. Nothing is
//! evaluated; the library only builds, translates and prints expressions.
//!
//! # Architecture
//!
//! - **notation**: sessions, tensors, indices and the host expression graph
//! - **tree**: the canonical operator/value tree and the translator into it
//! - **generator**: target-independent, visitor-based code generation
//! - **backend**: the compiler seam and the Tile backend
//! - **kernel**: an output tensor with its tree and tensor signatures
//! - **shape**: symbolic dimensions and index arithmetic
//!
//! # Example
//!
//! ```
//! use tilegen::prelude::*;
//!
//! let session = Session::new();
//! let [a, b, c] = session.matrix("A", 4, 4).siblings::<3>();
//! let (i, j) = session.index_set("a", shape![4, 4]).split::<2>().unwrap();
//! c.define(&[i, j], a.at(&[i, j]).unwrap() * b.at(&[j, i]).unwrap())
//!     .unwrap();
//!
//! let function = TileCompiler::new().compile(&Kernel::new(c).unwrap()).unwrap();
//! assert_eq!(
//!     function.source,
//!     "function(A, B) -> (C) { C[a, b] = A[a, b:AN] * B[b, a:BN]; }"
//! );
//! ```

// ============================================================================
// Core Modules
// ============================================================================

pub mod backend;
pub mod dot;
pub mod dtype;
pub mod error;
pub mod generator;
pub mod kernel;
pub mod notation;
pub mod shape;
pub mod tree;

// ============================================================================
// Re-exports
// ============================================================================

pub use dtype::{Const, DType, Element};
pub use error::{TileError, TileResult};
pub use kernel::{Kernel, TensorSignature};

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module with commonly used types and traits
pub mod prelude {
    pub use crate::backend::tile::{TileCompiler, TileFunction, TileOptions};
    pub use crate::backend::KernelCompiler;
    pub use crate::dot::ToDot;
    pub use crate::dtype::{Const, DType};
    pub use crate::error::{TileError, TileResult};
    pub use crate::kernel::{Kernel, TensorSignature};
    pub use crate::notation::{Index, IndexSet, Session, Tensor, TensorExpr};
    pub use crate::shape;
    pub use crate::shape::Expr;
}
