use crate::{
    error::{TileError, TileResult},
    tree::{TensorOp, ValueNode},
};

/// Target-language formatting used by a [`LanguageGenerator`](crate::generator::LanguageGenerator).
///
/// Templates use `{0}` for the left operand and `{1}` for the right one.
pub trait LanguageWriter {
    fn template(&self, op: TensorOp) -> Option<&'static str>;

    fn write_operator(&self, op: TensorOp, operands: &[String]) -> TileResult<String> {
        let template = self
            .template(op)
            .ok_or_else(|| TileError::unsupported(format!("operator {op} has no template")))?;
        let expected = placeholder_count(template);
        if operands.len() != expected {
            return Err(TileError::malformed(format!(
                "{op} expects {expected} operand(s), found {}",
                operands.len()
            )));
        }
        Ok(substitute(template, operands))
    }

    fn write_value(&self, node: &ValueNode) -> String {
        node.label.clone()
    }
}

// Operand number and byte length of a `{n}` placeholder starting at `at`.
fn placeholder(template: &str, at: usize) -> Option<(usize, usize)> {
    let rest = &template[at..];
    let close = rest.find('}')?;
    let n = rest[1..close].parse().ok()?;
    Some((n, close + 1))
}

/// Number of distinct operands a template refers to.
pub fn placeholder_count(template: &str) -> usize {
    template
        .char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(|(i, _)| placeholder(template, i))
        .map(|(n, _)| n + 1)
        .max()
        .unwrap_or(0)
}

/// Replaces `{n}` with `operands[n]` in a single pass.
pub fn substitute(template: &str, operands: &[String]) -> String {
    let mut out = String::with_capacity(template.len() + operands.iter().map(String::len).sum::<usize>());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        match placeholder(rest, open).and_then(|(n, len)| operands.get(n).map(|o| (o, len))) {
            Some((operand, len)) => {
                out.push_str(operand);
                rest = &rest[open + len..];
            }
            None => {
                out.push('{');
                rest = &rest[open + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}
