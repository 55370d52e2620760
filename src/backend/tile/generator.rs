use std::collections::VecDeque;

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use typed_builder::TypedBuilder;

use crate::{
    backend::tile::writer::TileWriter,
    error::{TileError, TileResult},
    generator::{GeneratorContext, LanguageGenerator, LanguageWriter, NestingPolicy, Position},
    tree::{ExpressionTree, NodeId, TensorOp},
};

/// Operators whose operand text may need parentheses in Tile, and the
/// pairings where precedence already binds correctly.
pub fn tile_nesting() -> NestingPolicy {
    NestingPolicy::new()
        .with_nestable([
            TensorOp::Mul,
            TensorOp::Add,
            TensorOp::Sub,
            TensorOp::Div,
            TensorOp::Square,
            TensorOp::Neg,
        ])
        .with_exempt(TensorOp::Add, TensorOp::Mul)
        .with_exempt(TensorOp::Add, TensorOp::Div)
        .with_exempt(TensorOp::Sub, TensorOp::Mul)
        .with_exempt(TensorOp::Sub, TensorOp::Div)
        .with_exempt(TensorOp::Add, TensorOp::Square)
        .with_exempt(TensorOp::Sub, TensorOp::Square)
}

/// Options for Tile generation.
///
/// # Examples
///
/// ```
/// use tilegen::backend::tile::TileOptions;
///
/// let options = TileOptions::builder().dimension_suffix(false).separator("\n").build();
/// assert!(!options.dimension_suffix);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct TileOptions {
    #[builder(default = tile_nesting())]
    pub nesting: NestingPolicy,
    /// Append `:<DIM>` to the indices of input tensor reads.
    #[builder(default = true)]
    pub dimension_suffix: bool,
    /// Joins the statements of the function body.
    #[builder(default = String::from(" "), setter(into))]
    pub separator: String,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Generates a Tile function from an expression tree.
///
/// Elementwise assignments are hoisted into statements queued ahead of the
/// main expression, and reads of input tensors carry the name of the bound
/// dimension variable.
pub struct TileGenerator<'t> {
    tree: &'t ExpressionTree,
    writer: TileWriter,
    options: TileOptions,
    context: GeneratorContext,
    statements: VecDeque<String>,
    dimensions: Vec<(String, String)>,
    text: Option<String>,
    function_text: Option<String>,
}

impl<'t> TileGenerator<'t> {
    pub fn new(tree: &'t ExpressionTree) -> Self {
        Self::with_options(tree, TileOptions::default())
    }

    pub fn with_options(tree: &'t ExpressionTree, options: TileOptions) -> Self {
        TileGenerator {
            tree,
            writer: TileWriter,
            options,
            context: GeneratorContext::new(),
            statements: VecDeque::new(),
            dimensions: dimension_variables(tree),
            text: None,
            function_text: None,
        }
    }

    /// Runs generation and returns the assembled function text.
    pub fn generate(&mut self) -> TileResult<&str> {
        self.statements.clear();
        self.text = None;
        self.function_text = None;

        let text = self.visit_tree()?;
        debug!("main text: {text}");
        let function = self.assemble(&text)?;
        debug!("generated: {function}");
        self.text = Some(text);
        let function = self.function_text.insert(function);
        Ok(function.as_str())
    }

    pub fn success(&self) -> bool {
        self.function_text.is_some()
    }

    /// The text of the tree itself, without queued statements.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn function_text(&self) -> Option<&str> {
        self.function_text.as_deref()
    }

    /// Statements hoisted from elementwise assignments, in emission order.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.statements.iter().map(String::as_str)
    }

    /// The dimension variable bound to an input tensor.
    pub fn dimension_variable(&self, label: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, dim)| dim.as_str())
    }

    /// Labels of the function parameters, in order.
    pub fn parameters(&self) -> Vec<String> {
        let parents = self.tree.index_set_parents();
        self.tree
            .input_variable_nodes()
            .filter(|v| !parents.contains(&v.label.as_str()))
            .map(|v| v.label.clone())
            .collect()
    }

    /// Label of the returned tensor, unless it only provides dimensions.
    pub fn return_binding(&self) -> Option<String> {
        let output = &self.tree.output_node().label;
        (!self.tree.index_set_parents().contains(&output.as_str())).then(|| output.clone())
    }

    fn assemble(&self, text: &str) -> TileResult<String> {
        self.check_distinct_labels()?;
        let params: Vec<String> = self
            .parameters()
            .iter()
            .map(|p| p.to_uppercase())
            .collect();
        let binding = self
            .return_binding()
            .map(|o| o.to_uppercase())
            .unwrap_or_default();

        let mut body: Vec<&str> = self.statements().collect();
        if self.tree.op(self.tree.root()) == Some(TensorOp::Assign) {
            body.push(text);
        }
        Ok(format!(
            "function({}) -> ({}) {{ {} }}",
            params.join(", "),
            binding,
            body.join(self.options.separator.as_str())
        ))
    }

    /// Tensor labels that differ only in case would print as one identifier.
    fn check_distinct_labels(&self) -> TileResult<()> {
        let mut printed: FxHashMap<String, &str> = FxHashMap::default();
        for node in self.tree.tensor_nodes() {
            let text = self.writer.write_value(node);
            if let Some(&other) = printed.get(text.as_str()) {
                if other != node.label {
                    return Err(TileError::malformed(format!(
                        "tensors {other} and {} both print as {text}",
                        node.label
                    )));
                }
                continue;
            }
            printed.insert(text, node.label.as_str());
        }
        Ok(())
    }

    fn visit_elementwise_assign(&mut self, left: Option<NodeId>, right: Option<NodeId>) -> TileResult<()> {
        let operands = self.visit_children(TensorOp::ElementwiseAssign, left, right)?;
        let [lhs, rhs] = operands.as_slice() else {
            return Err(TileError::malformed(format!(
                "ElementwiseAssign expects 2 operands, found {}",
                operands.len()
            )));
        };
        let statement = format!("{lhs} = {rhs};");
        debug!("queued statement: {statement}");
        self.statements.push_back(statement);
        let text = self
            .writer
            .write_operator(TensorOp::ElementwiseAssign, std::slice::from_ref(lhs))?;
        self.context.push(text);
        Ok(())
    }

    fn visit_index_read(&mut self, id: NodeId, left: Option<NodeId>, right: Option<NodeId>) -> TileResult<()> {
        let target = self.tree.index_target(id)?.label.clone();
        let mut operands = self.visit_children(TensorOp::Index, left, right)?;
        if self.options.dimension_suffix && self.tree.is_input_variable(&target) {
            if let (Some(dim), Some(indices)) = (self.dimension_variable(&target), operands.get(1)) {
                let suffixed = format!("{indices}:{dim}");
                operands[1] = suffixed;
            }
        }
        let text = self.writer.write_operator(TensorOp::Index, &operands)?;
        self.context.push(text);
        Ok(())
    }
}

impl LanguageGenerator for TileGenerator<'_> {
    type Writer = TileWriter;

    fn tree(&self) -> &ExpressionTree {
        self.tree
    }

    fn writer(&self) -> &TileWriter {
        &self.writer
    }

    fn nesting(&self) -> &NestingPolicy {
        &self.options.nesting
    }

    fn context(&self) -> &GeneratorContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut GeneratorContext {
        &mut self.context
    }

    fn visit_operator(
        &mut self,
        id: NodeId,
        op: TensorOp,
        left: Option<NodeId>,
        right: Option<NodeId>,
        position: Position,
    ) -> TileResult<()> {
        match op {
            TensorOp::ElementwiseAssign => self.visit_elementwise_assign(left, right),
            // The binding occurrence `C[i, j] = ...` keeps its indices bare.
            TensorOp::Index if !position.is_left_of(TensorOp::Assign) => {
                self.visit_index_read(id, left, right)
            }
            _ => self.visit_operator_default(op, left, right),
        }
    }
}

/// One dimension variable per input tensor: its upper-cased label followed by
/// `N`, with a numeric suffix when that collides with another name.
fn dimension_variables(tree: &ExpressionTree) -> Vec<(String, String)> {
    let mut taken: FxHashSet<String> = tree
        .tensor_nodes()
        .map(|v| v.label.to_uppercase())
        .collect();
    let mut out = Vec::new();
    for input in tree.input_variable_nodes() {
        let base = format!("{}N", input.label.to_uppercase());
        let mut name = base.clone();
        let mut n = 0;
        while taken.contains(&name) {
            n += 1;
            name = format!("{base}{n}");
        }
        taken.insert(name.clone());
        out.push((input.label.clone(), name));
    }
    out
}
