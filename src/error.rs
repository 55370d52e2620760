//! Error types for notation, translation and code generation

use thiserror::Error;

/// Errors raised while building, translating or generating a kernel.
///
/// None of these are recoverable: a failed compilation produces no source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TileError {
    /// A second definition was attached to a tensor
    #[error("Tensor {tensor} already has a definition; a tensor can only be defined once")]
    AlreadyDefined { tensor: String },

    /// The expression has no mapping into the tree representation
    #[error("Unsupported expression: {construct}")]
    UnsupportedExpression { construct: String },

    /// The left side of an index operation is not a tensor
    #[error("Invalid index target at {node}: {reason}")]
    InvalidIndexTarget { node: String, reason: String },

    /// The tree could not be reduced to a single text fragment
    #[error("Malformed expression tree: {reason}")]
    MalformedTree { reason: String },

    /// Rank or shape disagreement between a tensor and its indices or operands
    #[error("Dimension mismatch for {tensor}: expected {expected}, got {got}")]
    DimensionMismatch {
        tensor: String,
        expected: String,
        got: String,
    },

    /// More indices were requested from an index set than it holds
    #[error("Index set {set} has {available} indices, {requested} requested")]
    IndexOutOfRange {
        set: String,
        requested: usize,
        available: usize,
    },

    /// A kernel was requested for a tensor without a definition
    #[error("Tensor {tensor} has no definition to compile")]
    UndefinedOutput { tensor: String },

    /// The tensor does not take part in the kernel
    #[error("Tensor {tensor} is not part of this kernel")]
    UnknownTensor { tensor: String },
}

impl TileError {
    pub(crate) fn unsupported(construct: impl Into<String>) -> Self {
        TileError::UnsupportedExpression {
            construct: construct.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        TileError::MalformedTree {
            reason: reason.into(),
        }
    }
}

pub type TileResult<T> = Result<T, TileError>;
