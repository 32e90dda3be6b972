//! Class references and cross-program inlining (`spec.md` §4.3 "Class
//! references and inlining", §4.4).

use std::rc::Rc;

use crate::{
    error::{InvalidProgramReason, RvmError, RvmResult},
    ir::{Node, ResultAnchorRef},
    program::PoolEntry,
    tracer::ProcessorTracer,
};

use super::Processor;

impl<Tr: ProcessorTracer> Processor<'_, Tr> {
    /// `classReference poolIndex argc`: invokes the class thunk, pops
    /// `argc` generic arguments, resolves the handle's program with them
    /// (through the registry, with the handle's own cache checked first
    /// when no arguments were supplied), pushes the result.
    pub(super) fn exec_class_reference(&mut self) -> RvmResult<()> {
        let pool_index = self.fetch_pool_index()?;
        let argc = self.fetch_usize()?;
        let args = self.pop_n(argc)?;
        let thunk = match &self.program.pool[pool_index] {
            PoolEntry::ClassThunk(thunk) => thunk.clone(),
            _ => {
                return Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape {
                    expected: "a class thunk pool entry for `classReference`",
                }))
            }
        };
        let handle = thunk().map_err(|_| RvmError::ClassResolutionFailure {
            pool_index,
            frame_depth: self.frames.len(),
        })?;
        let result = self.resolve_handle(&handle, args)?;
        self.push(result);
        Ok(())
    }

    /// `inline poolIndex`: resolves a Packed Program (or program thunk)
    /// embedded directly in the pool and pushes the result. A numeric
    /// sentinel pool entry means self-reference: push the result anchor
    /// instead of resolving anything (`spec.md` §4.3).
    pub(super) fn exec_inline(&mut self) -> RvmResult<()> {
        let pool_index = self.fetch_pool_index()?;
        let target = match &self.program.pool[pool_index] {
            PoolEntry::Program(p) => Some(p.clone()),
            PoolEntry::ProgramThunk(thunk) => Some(thunk().map_err(|_| RvmError::ClassResolutionFailure {
                pool_index,
                frame_depth: self.frames.len(),
            })?),
            PoolEntry::Number(_) => None,
            _ => {
                return Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape {
                    expected: "a program, program-thunk, or numeric-sentinel pool entry for `inline`",
                }))
            }
        };
        let result = match target {
            Some(program) => self.resolve_program(&program, Vec::new())?,
            None => Node::SelfReference(ResultAnchorRef(Rc::clone(&self.result_type))),
        };
        self.push(result);
        Ok(())
    }

    /// `inlineCall poolIndex argc`: as `inline`, but passes `argc` popped
    /// type arguments through as the nested program's top-level inputs. A
    /// numeric sentinel pool entry with zero args likewise means
    /// self-reference (`spec.md` §4.3).
    pub(super) fn exec_inline_call(&mut self) -> RvmResult<()> {
        let pool_index = self.fetch_pool_index()?;
        let argc = self.fetch_usize()?;
        let args = self.pop_n(argc)?;
        let target = match &self.program.pool[pool_index] {
            PoolEntry::Program(p) => Some(p.clone()),
            PoolEntry::ProgramThunk(thunk) => Some(thunk().map_err(|_| RvmError::ClassResolutionFailure {
                pool_index,
                frame_depth: self.frames.len(),
            })?),
            PoolEntry::Number(_) if argc == 0 => None,
            _ => {
                return Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape {
                    expected: "a program, program-thunk, or zero-arg numeric-sentinel pool entry for `inlineCall`",
                }))
            }
        };
        let result = match target {
            Some(program) => self.resolve_program(&program, args)?,
            None => Node::SelfReference(ResultAnchorRef(Rc::clone(&self.result_type))),
        };
        self.push(result);
        Ok(())
    }
}
