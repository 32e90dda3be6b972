//! The Processor: a stack machine that runs one [`PackedProgram`] to
//! produce one [`Node`] (`spec.md` §4.3).
//!
//! Machine state is an operand stack of [`Node`]s and a chain of
//! [`Frame`]s. The chain is a `Vec`, not a linked list - grounded on the
//! teacher's own VM, which keeps `frames: Vec<CallFrame<'a>>` rather than
//! `previous: Option<Box<CallFrame>>` (`examples/parcadei-ouros/crates/ouros/src/bytecode/vm/mod.rs`).
//! Ancestor frames are reached by indexing from the end of the vec, the
//! same way the teacher's `frame_at` style helpers walk it.
//!
//! Dispatch is split by opcode family across sibling files the way the
//! teacher splits `bytecode/vm/{attr,binary,call,collections,...}.rs` -
//! each family's handlers are defined as `impl Processor<Tr> { ... }`
//! blocks in their own file; Rust's privacy rules let a submodule reach a
//! parent module's private fields, so no `pub(crate)` plumbing is needed.

mod aggregate;
mod class_ref;
mod conditional;
mod container;
mod control_flow;
mod generics;
mod mapped_type;
mod member;
mod scalar;
mod template_literal;
mod union_intersection;

use crate::{
    error::{InvalidProgramReason, RvmError, RvmResult},
    ir::{new_anchor, Anchor, Node, ResultAnchorRef},
    ir_ops::narrow_original_literal,
    opcode::Opcode,
    program::{PackedProgram, TypeHandle},
    registry::ProcessorRegistry,
    tracer::{NoopTracer, ProcessorTracer},
};

/// Default ceiling on simultaneous call frames.
///
/// Independent of the Processor Registry's identity-keyed cycle breaker:
/// a program that keeps instantiating distinct subprograms
/// (`Wrap<Wrap<Wrap<...>>>`) never revisits the same program identity, so
/// the registry never sees it as a cycle. This bounds that case, the way
/// the teacher's `ResourceTracker` bounds Python call-stack depth.
pub const DEFAULT_MAX_FRAME_DEPTH: usize = 512;

/// Minimum operand stack capacity reserved up front (`spec.md` §4.3: "an
/// operand stack... at least 128 slots").
const MIN_STACK_CAPACITY: usize = 128;

/// One level of the call-frame chain.
///
/// Local slots (`var`, `typeParameter`, `infer` targets) and the dynamic
/// accumulation region used by `distribute`/`mappedType` all live as plain
/// pushes onto the shared operand stack, starting at `start_index`;
/// `variables` is both "how many locals has this frame allocated" and
/// "the next free slot offset from `start_index`".
struct Frame {
    start_index: usize,
    variables: usize,
    inputs: Vec<Node>,
    /// `None` for the root frame and for bracket-only frames opened by the
    /// `frame` opcode; `Some` for frames entered via `call`.
    return_ip: Option<usize>,
    distribute_loop: Option<DistributeLoop>,
    mapped_loop: Option<MappedLoop>,
}

impl Frame {
    fn root(inputs: Vec<Node>) -> Self {
        Self {
            start_index: 0,
            variables: 0,
            inputs,
            return_ip: None,
            distribute_loop: None,
            mapped_loop: None,
        }
    }

    fn local_slot(&self, offset: usize) -> usize {
        self.start_index + offset
    }
}

/// In-progress state of a `distribute` opcode spanning multiple subprogram
/// calls - one per union member of the type being distributed over.
pub(crate) struct DistributeLoop {
    pub(crate) members: Vec<Node>,
    pub(crate) next_index: usize,
    pub(crate) collected: Vec<Node>,
    pub(crate) subprogram: usize,
    pub(crate) resume_ip: usize,
}

/// In-progress state of a `mappedType` opcode spanning multiple subprogram
/// calls - one per key being mapped over.
pub(crate) struct MappedLoop {
    pub(crate) keys: Vec<Node>,
    pub(crate) next_index: usize,
    pub(crate) collected: Vec<crate::ir::Member>,
    pub(crate) subprogram: usize,
    pub(crate) resume_ip: usize,
}

/// Runs a single [`PackedProgram`] to completion.
///
/// Bound to exactly one program for its whole lifetime: `call` and the
/// looping constructs (`distribute`, `mappedType`) jump within that
/// program's own opcode stream, never to another program. Reaching a
/// *different* program (`inline`, `inlineCall`, `classReference`) spins up
/// a nested `Processor` sharing the same [`ProcessorRegistry`].
pub struct Processor<'r, Tr: ProcessorTracer = NoopTracer> {
    program: PackedProgram,
    stack: Vec<Node>,
    frames: Vec<Frame>,
    ip: usize,
    registry: &'r mut ProcessorRegistry,
    max_frame_depth: usize,
    tracer: Tr,
    /// This program's result anchor (`spec.md` §4.3 machine state). Starts
    /// out privately owned; [`Self::set_result_type_anchor`] and
    /// [`Self::resolve_program`] swap in the anchor the caller already
    /// published in the registry, so the mutation `finish_structured_node`
    /// performs lands on the cell everyone else observes.
    result_type: Anchor,
}

impl<'r> Processor<'r, NoopTracer> {
    #[must_use]
    pub fn new(program: PackedProgram, registry: &'r mut ProcessorRegistry) -> Self {
        Self::with_tracer(program, registry, NoopTracer)
    }
}

impl<'r, Tr: ProcessorTracer> Processor<'r, Tr> {
    #[must_use]
    pub fn with_tracer(program: PackedProgram, registry: &'r mut ProcessorRegistry, tracer: Tr) -> Self {
        Self {
            program,
            stack: Vec::with_capacity(MIN_STACK_CAPACITY),
            frames: Vec::new(),
            ip: 0,
            registry,
            max_frame_depth: DEFAULT_MAX_FRAME_DEPTH,
            tracer,
            result_type: new_anchor(),
        }
    }

    #[must_use]
    pub fn with_max_frame_depth(mut self, max_frame_depth: usize) -> Self {
        self.max_frame_depth = max_frame_depth;
        self
    }

    /// Swaps in the anchor a caller has already published in the registry,
    /// so this Processor's `finish_structured_node` mutations are visible
    /// to whoever is holding that anchor (`spec.md` §4.4).
    pub(crate) fn set_result_type_anchor(&mut self, anchor: Anchor) {
        self.result_type = anchor;
    }

    /// Pushes a freshly-constructed `class`/`objectLiteral` node, aliasing
    /// the result anchor in place of allocating a new node when this
    /// opcode is the final one in the program's instruction stream
    /// (`spec.md` §4.3: "`objectLiteral` consumes a frame of members and
    /// produces an object-literal node; if this is the final opcode of the
    /// program, it mutates `resultType` in place instead of allocating a
    /// fresh node. `class` is analogous").
    pub(super) fn finish_structured_node(&mut self, node: Node) {
        if self.ip == self.program.ops.len() {
            *self.result_type.borrow_mut() = node.clone();
        }
        self.push(node);
    }

    /// Runs the bound program to completion with the given top-level type
    /// arguments (`spec.md` §6: `resolve_type`'s `args`).
    pub fn run(&mut self, initial_inputs: Vec<Node>) -> RvmResult<Node> {
        self.frames.push(Frame::root(initial_inputs));
        self.ip = 0;
        while self.ip < self.program.ops.len() {
            self.step()?;
        }
        let result = self.pop().unwrap_or(Node::Never);
        Ok(narrow_original_literal(result))
    }

    /// Resolves a Packed Program through a nested `Processor`, consulting
    /// the registry first so a self-referential `inline`/`classReference`
    /// reaching back into a program already on the call stack returns the
    /// in-progress anchor instead of recursing forever (`spec.md` §4.4).
    pub(super) fn resolve_program(&mut self, program: &PackedProgram, args: Vec<Node>) -> RvmResult<Node> {
        if let Some(anchor) = self.registry.lookup(program) {
            self.tracer.on_cycle_broken(self.frames.len());
            return Ok(Node::SelfReference(ResultAnchorRef(anchor)));
        }
        let anchor = self.registry.register(program);
        let mut nested =
            Processor::<NoopTracer>::new(program.clone(), self.registry).with_max_frame_depth(self.max_frame_depth);
        nested.set_result_type_anchor(std::rc::Rc::clone(&anchor));
        let result = nested.run(args)?;
        *anchor.borrow_mut() = result.clone();
        self.registry.unregister(program);
        Ok(result)
    }

    /// As [`Self::resolve_program`], but for a [`TypeHandle`] - consults
    /// and populates the handle's own result cache first (`spec.md` §6:
    /// "the resulting IR node may be cached on the handle"). The cache only
    /// applies to the no-argument case: a generic handle instantiated with
    /// different `args` each time must not short-circuit on a stale
    /// instantiation.
    pub(super) fn resolve_handle(&mut self, handle: &TypeHandle, args: Vec<Node>) -> RvmResult<Node> {
        let no_args = args.is_empty();
        if no_args {
            if let Some(cached) = handle.cached() {
                return Ok(cached);
            }
        }
        let result = self.resolve_program(handle.program(), args)?;
        if no_args {
            handle.store_cache(result.clone());
        }
        Ok(result)
    }

    fn step(&mut self) -> RvmResult<()> {
        let byte = self.program.ops[self.ip];
        let opcode = Opcode::from_byte(byte).ok_or_else(|| self.invalid_program(InvalidProgramReason::UnknownOpcode { byte }))?;
        self.tracer.on_dispatch(self.ip, opcode, self.frames.len());
        self.ip += 1;
        self.dispatch(opcode)
    }

    #[allow(clippy::too_many_lines)]
    fn dispatch(&mut self, opcode: Opcode) -> RvmResult<()> {
        match opcode {
            // Scalar types + special classes
            Opcode::String
            | Opcode::Number
            | Opcode::Boolean
            | Opcode::Bigint
            | Opcode::Void
            | Opcode::Unknown
            | Opcode::Object
            | Opcode::Never
            | Opcode::Undefined
            | Opcode::Symbol
            | Opcode::Null
            | Opcode::Any
            | Opcode::Regexp
            | Opcode::Date
            | Opcode::Uint8Array
            | Opcode::Int8Array
            | Opcode::Uint8ClampedArray
            | Opcode::Uint16Array
            | Opcode::Int16Array
            | Opcode::Uint32Array
            | Opcode::Int32Array
            | Opcode::Float32Array
            | Opcode::Float64Array
            | Opcode::BigInt64Array
            | Opcode::ArrayBuffer => self.exec_scalar_constant(opcode),
            Opcode::Literal => self.exec_literal(),
            Opcode::Set => self.exec_set(),
            Opcode::Map => self.exec_map(),
            Opcode::Promise => self.exec_promise(),

            // Container types
            Opcode::Array => self.exec_array(),
            Opcode::Tuple => self.exec_tuple(),
            Opcode::TupleMember => self.exec_tuple_member(false),
            Opcode::NamedTupleMember => self.exec_tuple_member(true),
            Opcode::Rest => self.exec_rest(),
            Opcode::ObjectLiteral => self.exec_object_literal(),
            Opcode::IndexSignature => self.exec_index_signature(),
            Opcode::Optional => self.exec_modifier(container::Modifier::Optional),
            Opcode::Readonly => self.exec_modifier(container::Modifier::Readonly),
            Opcode::Public => self.exec_modifier(container::Modifier::Visibility(crate::ir::Visibility::Public)),
            Opcode::Protected => self.exec_modifier(container::Modifier::Visibility(crate::ir::Visibility::Protected)),
            Opcode::Private => self.exec_modifier(container::Modifier::Visibility(crate::ir::Visibility::Private)),
            Opcode::Abstract => self.exec_modifier(container::Modifier::Abstract),
            Opcode::DefaultValue => self.exec_modifier(container::Modifier::Default),
            Opcode::Description => self.exec_modifier(container::Modifier::Description),

            // Union / intersection
            Opcode::Union => self.exec_union(),
            Opcode::Intersection => self.exec_intersection(),

            // Aggregate types
            Opcode::Class => self.exec_class(),
            Opcode::Enum => self.exec_enum(),
            Opcode::EnumMember => self.exec_enum_member(),
            Opcode::Function => self.exec_function(),

            // Parameter and method construction
            Opcode::Parameter => self.exec_parameter(),
            Opcode::Property => self.exec_property(false),
            Opcode::PropertySignature => self.exec_property(true),
            Opcode::Method => self.exec_method(false),
            Opcode::MethodSignature => self.exec_method(true),

            // Class references and inlining
            Opcode::ClassReference => self.exec_class_reference(),
            Opcode::Inline => self.exec_inline(),
            Opcode::InlineCall => self.exec_inline_call(),

            // Generics and lookups
            Opcode::NumberBrand => self.exec_number_brand(),
            Opcode::TypeParameter => self.exec_type_parameter(),
            Opcode::TypeParameterDefault => self.exec_type_parameter_default(),
            Opcode::Infer => self.exec_infer(),
            Opcode::Extends => self.exec_extends(),
            Opcode::IndexAccess => self.exec_index_access(),
            Opcode::Typeof => self.exec_typeof(),
            Opcode::Keyof => self.exec_keyof(),
            Opcode::Var => self.exec_var(),

            // Mapped types
            Opcode::MappedType => self.exec_mapped_type(),

            // Template literals
            Opcode::TemplateLiteral => self.exec_template_literal(),

            // Conditional / distributive types
            Opcode::Distribute => self.exec_distribute(),
            Opcode::Condition => self.exec_condition(),
            Opcode::JumpCondition => self.exec_jump_condition(),

            // Control flow / calling convention
            Opcode::Loads => self.exec_loads(),
            Opcode::Arg => self.exec_arg(),
            Opcode::Return => self.exec_return(),
            Opcode::Frame => self.exec_frame(),
            Opcode::MoveFrame => self.exec_move_frame(),
            Opcode::Jump => self.exec_jump(),
            Opcode::Call => self.exec_call(),
        }
    }

    // ---- operand fetch helpers ----

    fn fetch_u8(&mut self) -> RvmResult<u8> {
        let byte = self
            .program
            .ops
            .get(self.ip)
            .copied()
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::TruncatedOperand))?;
        self.ip += 1;
        Ok(byte)
    }

    fn fetch_usize(&mut self) -> RvmResult<usize> {
        Ok(usize::from(self.fetch_u8()?))
    }

    fn fetch_pool_index(&mut self) -> RvmResult<usize> {
        let index = self.fetch_usize()?;
        if index >= self.program.pool.len() {
            return Err(self.invalid_program(InvalidProgramReason::PoolIndexOutOfRange {
                index,
                pool_len: self.program.pool.len(),
            }));
        }
        Ok(index)
    }

    // ---- operand stack helpers ----

    fn push(&mut self, node: Node) {
        self.stack.push(node);
    }

    fn pop(&mut self) -> RvmResult<Node> {
        self.stack
            .pop()
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::StackUnderflow { wanted: 1, available: 0 }))
    }

    fn pop_n(&mut self, n: usize) -> RvmResult<Vec<Node>> {
        if self.stack.len() < n {
            return Err(self.invalid_program(InvalidProgramReason::StackUnderflow {
                wanted: n,
                available: self.stack.len(),
            }));
        }
        let at = self.stack.len() - n;
        Ok(self.stack.split_off(at))
    }

    fn peek_mut(&mut self) -> RvmResult<&mut Node> {
        let frame_depth = self.frames.len();
        let ip = self.ip;
        self.stack.last_mut().ok_or(RvmError::InvalidProgram {
            opcode_index: ip,
            opcode: None,
            frame_depth,
            reason: InvalidProgramReason::StackUnderflow { wanted: 1, available: 0 },
        })
    }

    // ---- frame helpers ----

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("run() always seeds the root frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("run() always seeds the root frame")
    }

    /// Walks `offset` ancestors up the frame chain (0 = current frame).
    fn frame_at(&self, offset: usize) -> RvmResult<&Frame> {
        let len = self.frames.len();
        let index = len
            .checked_sub(1 + offset)
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::FrameChainExhausted { offset }))?;
        Ok(&self.frames[index])
    }

    /// Allocates the next sequential local slot in the current frame by
    /// pushing `value` and bumping `variables`.
    fn alloc_local(&mut self, value: Node) {
        self.push(value);
        self.current_frame_mut().variables += 1;
    }

    fn invalid_program(&self, reason: InvalidProgramReason) -> RvmError {
        RvmError::InvalidProgram {
            opcode_index: self.ip,
            opcode: self.program.ops.get(self.ip).copied().and_then(Opcode::from_byte),
            frame_depth: self.frames.len(),
            reason,
        }
    }

    // ---- calling convention ----

    /// Enters `target` as a new frame, resuming at `resume_ip` on return.
    fn call(&mut self, target: usize, resume_ip: usize, inputs: Vec<Node>) -> RvmResult<()> {
        if self.frames.len() >= self.max_frame_depth {
            return Err(RvmError::RecursionLimitExceeded { max_frame_depth: self.max_frame_depth });
        }
        let start_index = self.stack.len();
        self.frames.push(Frame {
            start_index,
            variables: 0,
            inputs,
            return_ip: Some(resume_ip),
            distribute_loop: None,
            mapped_loop: None,
        });
        self.tracer.on_call(target, self.frames.len());
        self.ip = target;
        Ok(())
    }

    fn exec_return(&mut self) -> RvmResult<()> {
        let value = self.pop()?;
        let frame = self.frames.pop().ok_or_else(|| {
            self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "an open call frame" })
        })?;
        self.stack.truncate(frame.start_index);
        let Some(return_ip) = frame.return_ip else {
            return Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape {
                expected: "a frame entered via call (bracket-only frames don't return)",
            }));
        };
        self.push(value);
        self.ip = return_ip;
        self.tracer.on_return(self.frames.len());
        Ok(())
    }

    /// Opens a bracket frame (no call) to accumulate a dynamically-sized
    /// production - used by `distribute`/`mappedType`'s internal loop state.
    fn exec_frame(&mut self) -> RvmResult<()> {
        let start_index = self.stack.len();
        self.frames.push(Frame {
            start_index,
            variables: 0,
            inputs: Vec::new(),
            return_ip: None,
            distribute_loop: None,
            mapped_loop: None,
        });
        Ok(())
    }

    /// Discards the innermost bracket frame, keeping only the value on top
    /// of the stack (`spec.md`: "discards the current frame while
    /// preserving the top value").
    fn exec_move_frame(&mut self) -> RvmResult<()> {
        let value = self.pop()?;
        let frame = self.frames.pop().ok_or_else(|| {
            self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "an open bracket frame" })
        })?;
        self.stack.truncate(frame.start_index);
        self.push(value);
        Ok(())
    }

    fn exec_jump(&mut self) -> RvmResult<()> {
        let target = self.fetch_usize()?;
        self.ip = target;
        Ok(())
    }

    fn exec_call(&mut self) -> RvmResult<()> {
        let target = self.fetch_usize()?;
        let argc = self.fetch_usize()?;
        let inputs = self.pop_n(argc)?;
        let resume_ip = self.ip;
        self.call(target, resume_ip, inputs)
    }
}
