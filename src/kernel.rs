//! The tensors and tree that make up one compilable kernel.

use log::debug;

use crate::{
    dtype::{DType, Element},
    error::{TileError, TileResult},
    notation::{Tensor, TensorId},
    shape::Expr,
    tree::{translate, ExpressionTree, ValueNode},
};

/// Shape and element type of one tensor of a kernel, as a binding layer
/// needs it to allocate buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSignature {
    pub label: String,
    pub shape: Vec<Expr>,
    pub dtype: DType,
}

impl TensorSignature {
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Concrete extents, when no dimension is symbolic.
    pub fn dims(&self) -> Option<Vec<i64>> {
        self.shape.iter().map(|d| d.evaluate().ok()).collect()
    }

    /// Shape variables a binding layer has to supply, in first-seen order.
    pub fn symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for name in self.shape.iter().flat_map(Expr::variables) {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }
}

/// A defined output tensor together with its translated expression tree.
///
/// # Examples
///
/// ```
/// use tilegen::notation::Session;
/// use tilegen::kernel::Kernel;
///
/// let session = Session::new();
/// let [v1, v2, v3] = session.vector("V1", 16).siblings::<3>();
/// v3.define_elementwise(v1 + v2).unwrap();
///
/// let kernel = Kernel::new(v3).unwrap();
/// assert_eq!(kernel.input_tensors().len(), 2);
/// assert_eq!(kernel.tensors().len(), 3);
/// ```
#[derive(Debug)]
pub struct Kernel<'s> {
    output: Tensor<'s>,
    tree: ExpressionTree,
    tensors: Vec<Tensor<'s>>,
    inputs: Vec<Tensor<'s>>,
    dtype: DType,
}

impl<'s> Kernel<'s> {
    pub fn new(output: Tensor<'s>) -> TileResult<Self> {
        let tree = translate(output)?;
        let session = output.session;
        let resolve = |v: &ValueNode| {
            let id: Option<TensorId> = v.tensor;
            id.map(|id| session.tensor_view(id))
        };
        let tensors: Vec<_> = tree.tensor_nodes().filter_map(resolve).collect();
        let inputs: Vec<_> = tree.input_variable_nodes().filter_map(resolve).collect();
        debug!(
            "kernel for {}: {} tensors, {} inputs",
            output.name(),
            tensors.len(),
            inputs.len()
        );
        Ok(Kernel {
            output,
            tree,
            tensors,
            inputs,
            dtype: DType::default(),
        })
    }

    /// A kernel whose tensors hold elements of type `T`.
    pub fn of<T: Element>(output: Tensor<'s>) -> TileResult<Self> {
        Ok(Self::new(output)?.with_dtype(T::DTYPE))
    }

    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn tree(&self) -> &ExpressionTree {
        &self.tree
    }

    pub fn output_tensor(&self) -> Tensor<'s> {
        self.output
    }

    pub fn input_tensors(&self) -> &[Tensor<'s>] {
        &self.inputs
    }

    /// Output, defined and input tensors.
    pub fn tensors(&self) -> &[Tensor<'s>] {
        &self.tensors
    }

    /// Signature of a tensor taking part in this kernel.
    pub fn tensor(&self, tensor: Tensor<'s>) -> TileResult<TensorSignature> {
        if !self.tensors.contains(&tensor) {
            return Err(TileError::UnknownTensor {
                tensor: tensor.name(),
            });
        }
        Ok(self.describe(tensor))
    }

    /// Signature of a tensor of this kernel, by label.
    pub fn signature(&self, label: &str) -> TileResult<TensorSignature> {
        self.tensors
            .iter()
            .find(|t| t.name() == label)
            .map(|&t| self.describe(t))
            .ok_or_else(|| TileError::UnknownTensor {
                tensor: label.to_string(),
            })
    }

    pub fn input_signatures(&self) -> Vec<TensorSignature> {
        self.inputs.iter().map(|&t| self.describe(t)).collect()
    }

    pub fn output_signature(&self) -> TensorSignature {
        self.describe(self.output)
    }

    fn describe(&self, tensor: Tensor<'s>) -> TensorSignature {
        TensorSignature {
            label: tensor.name(),
            shape: tensor.shape(),
            dtype: self.dtype,
        }
    }
}
