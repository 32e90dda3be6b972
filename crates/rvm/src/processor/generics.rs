//! Generics and lookups (`spec.md` §4.3 "Generics", "Inference"):
//! `numberBrand`, `typeParameter`, `typeParameterDefault`, `infer`,
//! `extends`, `indexAccess`, `typeof`, `keyof`, `var`.

use crate::{
    error::{InvalidProgramReason, RvmError, RvmResult},
    ir::{InferNode, InferSlot, Node, NumberBrandNode},
    ir_ops::{extends_and_infer, index_access, keyof, type_infer},
    program::PoolEntry,
    tracer::ProcessorTracer,
};

use super::Processor;

impl<Tr: ProcessorTracer> Processor<'_, Tr> {
    /// `numberBrand brandPoolIndex`: pushes a branded number type.
    pub(super) fn exec_number_brand(&mut self) -> RvmResult<()> {
        let index = self.fetch_pool_index()?;
        let brand = self.program.pool[index]
            .as_str()
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "a string pool entry for numberBrand" }))?
            .to_owned();
        self.push(Node::NumberBrand(NumberBrandNode { brand }));
        Ok(())
    }

    /// `typeParameter`: consumes the next positional type argument (or
    /// `unknown` if none was supplied) as a new local slot.
    pub(super) fn exec_type_parameter(&mut self) -> RvmResult<()> {
        let frame = self.current_frame();
        let value = frame.inputs.get(frame.variables).cloned().unwrap_or(Node::Unknown);
        self.alloc_local(value);
        Ok(())
    }

    /// `typeParameterDefault defaultPoolIndex`: as `typeParameter`, but
    /// falls back to resolving a default-value program (instead of
    /// `unknown`) when no argument was supplied at this position.
    pub(super) fn exec_type_parameter_default(&mut self) -> RvmResult<()> {
        let pool_index = self.fetch_pool_index()?;
        let frame = self.current_frame();
        if let Some(value) = frame.inputs.get(frame.variables).cloned() {
            self.alloc_local(value);
            return Ok(());
        }
        let target = match &self.program.pool[pool_index] {
            PoolEntry::Program(p) => p.clone(),
            PoolEntry::ProgramThunk(thunk) => thunk().map_err(|_| RvmError::ClassResolutionFailure {
                pool_index,
                frame_depth: self.frames.len(),
            })?,
            _ => {
                return Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape {
                    expected: "a program or program-thunk pool entry for typeParameterDefault",
                }))
            }
        };
        let value = self.resolve_program(&target, Vec::new())?;
        self.alloc_local(value);
        Ok(())
    }

    /// `infer namePoolIndex`: reserves a local slot (initialized to
    /// `never`, like `var`) and pushes the placeholder that `extends`
    /// binds when it matches this position.
    pub(super) fn exec_infer(&mut self) -> RvmResult<()> {
        let index = self.fetch_pool_index()?;
        let name = self.program.pool[index]
            .as_str()
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "a string pool entry for infer" }))?
            .to_owned();
        let slot_index = self.current_frame().variables;
        self.alloc_local(Node::Never);
        self.push(Node::Infer(InferNode {
            name,
            slot: InferSlot { frame_depth: 0, slot_index },
        }));
        Ok(())
    }

    /// `extends`: pops the pattern then the candidate, pushes a boolean
    /// result and writes any `infer` bindings the match captured.
    pub(super) fn exec_extends(&mut self) -> RvmResult<()> {
        let pattern = self.pop()?;
        let candidate = self.pop()?;
        let mut bindings = Vec::new();
        let matched = extends_and_infer(&candidate, &pattern, &mut bindings);
        for (slot, value) in bindings {
            self.write_slot(slot, value)?;
        }
        self.push(Node::literal_bool(matched));
        Ok(())
    }

    fn write_slot(&mut self, slot: InferSlot, value: Node) -> RvmResult<()> {
        let frame = self.frame_at(slot.frame_depth)?;
        let index = frame.local_slot(slot.slot_index);
        if index >= self.stack.len() {
            return Err(self.invalid_program(InvalidProgramReason::FrameChainExhausted { offset: slot.frame_depth }));
        }
        self.stack[index] = value;
        Ok(())
    }

    /// `indexAccess`: pops the index then the base, pushes `Base[Index]`.
    pub(super) fn exec_index_access(&mut self) -> RvmResult<()> {
        let index = self.pop()?;
        let base = self.pop()?;
        self.push(index_access(&base, &index));
        Ok(())
    }

    /// `typeof valuePoolIndex`: invokes the value thunk and pushes the
    /// inferred type of the runtime value it returns.
    pub(super) fn exec_typeof(&mut self) -> RvmResult<()> {
        let index = self.fetch_pool_index()?;
        let thunk = match &self.program.pool[index] {
            PoolEntry::ValueThunk(thunk) => thunk.clone(),
            _ => {
                return Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape {
                    expected: "a value-thunk pool entry for `typeof`",
                }))
            }
        };
        let value = thunk().map_err(|_| RvmError::ClassResolutionFailure {
            pool_index: index,
            frame_depth: self.frames.len(),
        })?;
        self.push(type_infer(&value));
        Ok(())
    }

    /// `keyof`: pops the base type, pushes the union of its keys.
    pub(super) fn exec_keyof(&mut self) -> RvmResult<()> {
        let base = self.pop()?;
        self.push(keyof(&base));
        Ok(())
    }

    /// `var`: allocates a fresh local slot initialized to `never`.
    pub(super) fn exec_var(&mut self) -> RvmResult<()> {
        self.alloc_local(Node::Never);
        Ok(())
    }
}
