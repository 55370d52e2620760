//! Einstein-notation authoring layer.
//!
//! Terms (tensors, indices, index sets) live in a [`Session`] and are handled
//! through `Copy` views. Expressions built from them form a host expression
//! graph that is never evaluated, only translated.

pub mod expr;
pub mod index;
pub mod naming;
pub mod ops;
pub mod session;
pub mod tensor;

pub use expr::{Aggregation, BinaryKind, ExprNode, IntoExpr, TensorExpr, UnaryKind};
pub use index::{Index, IndexKind, IndexSet};
pub use naming::{NameAllocator, Namespace};
pub use session::{ExprId, IndexId, IndexSetId, Session, TensorId, TermRef};
pub use tensor::{Tensor, TensorDefinition, TensorKind};
