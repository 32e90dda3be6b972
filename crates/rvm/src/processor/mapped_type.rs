//! Mapped types (`spec.md` §4.3 "Mapped types").
//!
//! Same loop-by-re-entry shape as `distribute`, but the subprogram is
//! expected to return a `property`/`propertySignature` node per key
//! (rather than an arbitrary type), which this opcode collects into an
//! `objectLiteral`.

use crate::{error::RvmResult, ir::Node, ir::ObjectLiteralNode, tracer::ProcessorTracer};

use super::{MappedLoop, Processor};

impl<Tr: ProcessorTracer> Processor<'_, Tr> {
    /// `mappedType subprogram`: evaluates `subprogram` once per member of
    /// the popped key union, building an object literal from the
    /// resulting property nodes.
    pub(super) fn exec_mapped_type(&mut self) -> RvmResult<()> {
        let subprogram = self.fetch_usize()?;
        let opcode_ip = self.ip - 2;

        if self.current_frame().mapped_loop.is_none() {
            let keys = self.pop()?;
            let keys = match keys {
                Node::Union(u) => u.types,
                other => vec![other],
            };
            self.current_frame_mut().mapped_loop = Some(MappedLoop {
                keys,
                next_index: 0,
                collected: Vec::new(),
                subprogram,
                resume_ip: opcode_ip,
            });
        } else {
            let produced = self.pop()?;
            let member = self.node_into_member(produced)?;
            self.current_frame_mut().mapped_loop.as_mut().expect("checked Some above").collected.push(member);
        }

        let next_key = {
            let loop_state = self.current_frame().mapped_loop.as_ref().expect("set above");
            (loop_state.next_index < loop_state.keys.len()).then(|| loop_state.keys[loop_state.next_index].clone())
        };

        if let Some(key) = next_key {
            let (target, resume_ip) = {
                let loop_state = self.current_frame_mut().mapped_loop.as_mut().expect("set above");
                loop_state.next_index += 1;
                (loop_state.subprogram, loop_state.resume_ip)
            };
            self.call(target, resume_ip, vec![key])?;
        } else {
            let loop_state = self.current_frame_mut().mapped_loop.take().expect("set above");
            self.push(Node::ObjectLiteral(ObjectLiteralNode::new(loop_state.collected)));
        }
        Ok(())
    }
}
