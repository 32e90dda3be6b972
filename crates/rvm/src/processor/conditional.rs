//! Conditional and distributive types (`spec.md` §4.3).
//!
//! `distribute` loops a subprogram over each union member of the type
//! being distributed, the same call/return machinery `processor/mod.rs`
//! defines, just re-entering the same opcode (`resume_ip` points back at
//! `distribute` itself) instead of falling through to the next one.

use crate::{
    error::RvmResult,
    ir::Node,
    ir_ops::build_union,
    tracer::ProcessorTracer,
};

use super::{DistributeLoop, Processor};

impl<Tr: ProcessorTracer> Processor<'_, Tr> {
    /// `distribute subprogram`: evaluates `subprogram` once per union
    /// member of the popped candidate type (or once, for a non-union),
    /// passing the member as the subprogram's sole input, and unions the
    /// non-`never` results.
    pub(super) fn exec_distribute(&mut self) -> RvmResult<()> {
        let subprogram = self.fetch_usize()?;
        let opcode_ip = self.ip - 2;

        if self.current_frame().distribute_loop.is_none() {
            let candidate = self.pop()?;
            let members = match candidate {
                Node::Union(u) => u.types,
                other => vec![other],
            };
            self.current_frame_mut().distribute_loop = Some(DistributeLoop {
                members,
                next_index: 0,
                collected: Vec::new(),
                subprogram,
                resume_ip: opcode_ip,
            });
        } else {
            let value = self.pop()?;
            self.current_frame_mut()
                .distribute_loop
                .as_mut()
                .expect("checked Some above")
                .collected
                .push(value);
        }

        let next_candidate = {
            let loop_state = self.current_frame().distribute_loop.as_ref().expect("set above");
            (loop_state.next_index < loop_state.members.len()).then(|| loop_state.members[loop_state.next_index].clone())
        };

        if let Some(candidate) = next_candidate {
            let (target, resume_ip) = {
                let loop_state = self.current_frame_mut().distribute_loop.as_mut().expect("set above");
                loop_state.next_index += 1;
                (loop_state.subprogram, loop_state.resume_ip)
            };
            self.call(target, resume_ip, vec![candidate])?;
        } else {
            let loop_state = self.current_frame_mut().distribute_loop.take().expect("set above");
            let result = build_union(loop_state.collected.into_iter().filter(|n| !n.is_never()).collect());
            self.push(result);
        }
        Ok(())
    }

    /// `jumpCondition elseTarget`: pops a boolean; jumps to `elseTarget`
    /// when false, otherwise falls through to the "then" branch that
    /// immediately follows in the opcode stream.
    pub(super) fn exec_jump_condition(&mut self) -> RvmResult<()> {
        let else_target = self.fetch_usize()?;
        let Node::Literal(crate::ir::LiteralNode { literal: crate::ir::LiteralValue::Boolean(result) }) = self.pop()? else {
            return Err(self.invalid_program(crate::error::InvalidProgramReason::UnexpectedStackShape {
                expected: "a boolean produced by `extends` for jumpCondition",
            }));
        };
        if !result {
            self.ip = else_target;
        }
        Ok(())
    }

    /// `condition`: a no-op join point where the `then`/`else` branches of
    /// a conditional type converge back onto a single instruction stream.
    pub(super) fn exec_condition(&mut self) -> RvmResult<()> {
        Ok(())
    }
}
