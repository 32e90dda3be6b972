//! `loads` and `arg` (`spec.md` §4.3 "Control flow"). `call`, `return`,
//! `frame`, `moveFrame`, and `jump` are defined directly on [`Processor`]
//! in `processor/mod.rs` since they ARE the calling convention rather
//! than opcodes that merely use it.

use crate::{
    error::{InvalidProgramReason, RvmResult},
    tracer::ProcessorTracer,
};

use super::Processor;

impl<Tr: ProcessorTracer> Processor<'_, Tr> {
    /// `loads frameOffset slotIndex`: reads a local slot from an ancestor
    /// frame (0 = current frame) and pushes a clone of it.
    pub(super) fn exec_loads(&mut self) -> RvmResult<()> {
        let frame_offset = self.fetch_usize()?;
        let slot_index = self.fetch_usize()?;
        let frame = self.frame_at(frame_offset)?;
        let index = frame.local_slot(slot_index);
        let value = self
            .stack
            .get(index)
            .cloned()
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::FrameChainExhausted { offset: frame_offset }))?;
        self.push(value);
        Ok(())
    }

    /// `arg n`: pushes a clone of the `n`-th caller-supplied value sitting
    /// just below the current frame's boundary (1-indexed from the
    /// boundary: `arg 1` is the slot immediately below `start_index`).
    pub(super) fn exec_arg(&mut self) -> RvmResult<()> {
        let n = self.fetch_usize()?;
        let start_index = self.current_frame().start_index;
        let index = start_index
            .checked_sub(n)
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::StackUnderflow { wanted: n, available: start_index }))?;
        let value = self
            .stack
            .get(index)
            .cloned()
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::StackUnderflow { wanted: n, available: start_index }))?;
        self.push(value);
        Ok(())
    }
}
