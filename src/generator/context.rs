use crate::{
    error::{TileError, TileResult},
    tree::TensorOp,
};

#[derive(Debug, Clone, Copy)]
struct Frame {
    op: TensorOp,
    base: usize,
}

/// Working state of one generation pass: a stack of text fragments and a
/// stack of the operator frames currently open.
#[derive(Debug, Default)]
pub struct GeneratorContext {
    fragments: Vec<String>,
    frames: Vec<Frame>,
}

impl GeneratorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a frame for an operator node before its children are visited.
    pub fn enter(&mut self, op: TensorOp) {
        self.frames.push(Frame {
            op,
            base: self.fragments.len(),
        });
    }

    /// Closes the innermost frame. All operand text pushed inside it must
    /// have been consumed.
    pub fn exit(&mut self) -> TileResult<()> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| TileError::malformed("no operator frame is open"))?;
        if self.fragments.len() != frame.base {
            return Err(TileError::malformed(format!(
                "{} left {} unused operand(s)",
                frame.op,
                self.fragments.len() - frame.base
            )));
        }
        Ok(())
    }

    pub fn push(&mut self, text: String) {
        self.fragments.push(text);
    }

    /// Pops a fragment produced inside the innermost frame.
    pub fn pop(&mut self) -> TileResult<String> {
        let base = self.frames.last().map_or(0, |f| f.base);
        if self.fragments.len() <= base {
            return Err(TileError::malformed("operand stack is empty"));
        }
        self.fragments
            .pop()
            .ok_or_else(|| TileError::malformed("operand stack is empty"))
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether the innermost open frame belongs to `op`.
    pub fn is_op_start(&self, op: TensorOp) -> bool {
        self.frames.last().is_some_and(|f| f.op == op)
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.frames.clear();
    }
}
