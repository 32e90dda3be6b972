#![doc = include_str!("../../../README.md")]

pub mod error;
pub mod ir;
pub mod ir_ops;
pub mod opcode;
pub mod processor;
pub mod program;
pub mod registry;
pub mod tracer;

pub use crate::{
    error::{InvalidProgramReason, RvmError, RvmResult},
    ir::Node,
    processor::{Processor, DEFAULT_MAX_FRAME_DEPTH},
    program::{decode, PackedProgram, PoolEntry, TypeHandle},
    registry::ProcessorRegistry,
};

/// Resolves a Packed Program to its Type IR (`spec.md` §6: `resolve_type(program,
/// args=[])`).
///
/// Creates a fresh [`ProcessorRegistry`] for this top-level evaluation (`spec.md`
/// §4.4: "created per top-level evaluation; nested evaluations share it by
/// parameter passing") and registers `program` in it before running, so a
/// self-referential program that reaches back into itself via `inline`/
/// `inlineCall`/`classReference` resolves against this call's own anchor
/// rather than recursing forever.
pub fn resolve_type(program: &PackedProgram, args: Vec<Node>) -> RvmResult<Node> {
    let mut registry = ProcessorRegistry::new();
    let anchor = registry.register(program);
    let mut processor = Processor::new(std::rc::Rc::clone(program), &mut registry);
    processor.set_result_type_anchor(std::rc::Rc::clone(&anchor));
    let result = processor.run(args)?;
    *anchor.borrow_mut() = result.clone();
    registry.unregister(program);
    Ok(result)
}

/// Resolves a [`TypeHandle`] to its Type IR (`spec.md` §6: `resolve_type_of(handle,
/// args=[])`), consulting and populating the handle's own result cache first
/// when called with no arguments (`spec.md` §6: "the resulting IR node may be
/// cached on the handle"; a generic handle instantiated with distinct `args`
/// each time must not short-circuit on a stale instantiation, so the cache is
/// skipped whenever `args` is non-empty).
pub fn resolve_type_of(handle: &TypeHandle, args: Vec<Node>) -> RvmResult<Node> {
    let no_args = args.is_empty();
    if no_args {
        if let Some(cached) = handle.cached() {
            return Ok(cached);
        }
    }
    let result = resolve_type(handle.program(), args)?;
    if no_args {
        handle.store_cache(result.clone());
    }
    Ok(result)
}
