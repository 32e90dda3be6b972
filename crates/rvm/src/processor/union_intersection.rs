//! `union` and `intersection` (`spec.md` §4.3).

use crate::{
    ir::{IntersectionNode, Node},
    ir_ops::{build_union, classify_intersection_members, merge},
    error::RvmResult,
    tracer::ProcessorTracer,
};

use super::Processor;

impl<Tr: ProcessorTracer> Processor<'_, Tr> {
    /// `union n`: pops `n` member types, pushes their (flattened,
    /// unboxed) union.
    pub(super) fn exec_union(&mut self) -> RvmResult<()> {
        let count = self.fetch_usize()?;
        let members = self.pop_n(count)?;
        self.push(build_union(members));
        Ok(())
    }

    /// `intersection n`: pops `n` member types, structurally merging any
    /// object-literal/class candidates and keeping irreducible primitives
    /// (e.g. a branded `number & Brand`) as an explicit intersection node.
    ///
    /// This crate has no standalone "decorator" type concept, so the
    /// classifier's decorator bucket is always empty here; every member is
    /// either a primitive kept as-is or a merge candidate.
    pub(super) fn exec_intersection(&mut self) -> RvmResult<()> {
        let count = self.fetch_usize()?;
        let members = self.pop_n(count)?;
        let (primitives, merge_candidates, _decorators) = classify_intersection_members(members, |_| false);

        let mut parts = primitives;
        if !merge_candidates.is_empty() {
            parts.push(merge(merge_candidates));
        }

        let result = match parts.len() {
            0 => Node::Never,
            1 => parts.into_iter().next().expect("checked len == 1"),
            _ => Node::Intersection(IntersectionNode { types: parts }),
        };
        self.push(result);
        Ok(())
    }
}
