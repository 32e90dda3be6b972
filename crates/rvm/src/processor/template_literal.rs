//! `templateLiteral` (`spec.md` §4.3 "Template literals").
//!
//! When every placeholder resolves to a literal string (or a union of
//! them), the result collapses to a union of concrete literal strings -
//! the same distribution [`crate::ir_ops::CartesianProduct`] already
//! drives for `mappedType`'s key renaming. Otherwise the parts are kept
//! structurally as a `templateLiteral` node.

use crate::{
    error::RvmResult,
    ir::{LiteralNode, LiteralValue, Node, TemplateLiteralNode},
    ir_ops::{build_union, CartesianProduct},
    tracer::ProcessorTracer,
};

use super::Processor;

impl<Tr: ProcessorTracer> Processor<'_, Tr> {
    /// `templateLiteral partCount`: pops `partCount` parts (in source
    /// order), pushes either a union of concrete literal strings or a
    /// structural `templateLiteral` node.
    pub(super) fn exec_template_literal(&mut self) -> RvmResult<()> {
        let count = self.fetch_usize()?;
        let parts = self.pop_n(count)?;

        if parts.iter().all(is_concrete_string_axis) {
            let mut product = CartesianProduct::new();
            for part in &parts {
                product.push(part);
            }
            let results = product
                .into_combinations()
                .into_iter()
                .map(|combo| {
                    let mut joined = String::new();
                    for node in combo {
                        if let Node::Literal(LiteralNode { literal: LiteralValue::String(segment) }) = node {
                            joined.push_str(&segment);
                        }
                    }
                    Node::literal_string(joined)
                })
                .collect();
            self.push(build_union(results));
        } else {
            self.push(Node::TemplateLiteral(TemplateLiteralNode { types: parts }));
        }
        Ok(())
    }
}

fn is_concrete_string_axis(node: &Node) -> bool {
    match node {
        Node::Literal(LiteralNode { literal: LiteralValue::String(_) }) => true,
        Node::Union(u) => u.types.iter().all(is_concrete_string_axis),
        _ => false,
    }
}
