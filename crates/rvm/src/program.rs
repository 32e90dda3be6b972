//! Packed Program: the immutable input to the Processor.
//!
//! `spec.md` §4.1: a Packed Program is an ordered sequence whose last
//! element is an opcode string (each character's codepoint minus 33 is one
//! opcode byte); everything before it is the literal pool. Decoding never
//! fails - a malformed trailing element just yields an empty program. Only
//! *running* a program can fail (see [`crate::error::RvmError`]).

use std::{cell::RefCell, fmt, rc::Rc};

use num_bigint::BigInt;

use crate::{error::RvmResult, ir::Node, ir_ops::RuntimeValue};

/// A decoded Packed Program: a raw opcode byte stream plus its literal pool.
///
/// Opcode bytes are stored undecoded (`u8`, not [`crate::opcode::Opcode`])
/// because decoding never fails at this stage - an unknown byte only
/// becomes an error when the Processor actually fetches and dispatches it
/// (spec.md §7: "Malformed programs manifest as stack underflow or missing
/// pool entries... must surface as a single `RVMInvalidProgram`").
pub struct RawProgram {
    pub ops: Vec<u8>,
    pub pool: Vec<PoolEntry>,
}

impl fmt::Debug for RawProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawProgram")
            .field("ops_len", &self.ops.len())
            .field("pool_len", &self.pool.len())
            .finish()
    }
}

/// A Packed Program, shared by identity.
///
/// `spec.md` §4.1: "Programs are treated as opaque values identified by
/// identity (not value) so the registry can use them as map keys." `Rc`
/// gives us exactly that via [`Rc::ptr_eq`]/[`Rc::as_ptr`].
pub type PackedProgram = Rc<RawProgram>;

/// A boxed literal-pool entry.
///
/// `spec.md` §9: `PoolEntry = String | Int | Bool | BigInt | ClassThunk |
/// NestedProgram | NestedProgramThunk`.
#[derive(Clone)]
pub enum PoolEntry {
    String(String),
    Number(f64),
    Bool(bool),
    BigInt(BigInt),
    /// A nullary accessor yielding a class handle, invoked by `classReference`.
    ClassThunk(ClassThunk),
    /// A Packed Program embedded directly in the pool, resolved by `inline`.
    Program(PackedProgram),
    /// A nullary accessor yielding a nested Packed Program.
    ProgramThunk(ProgramThunk),
    /// A nullary accessor yielding an opaque runtime value, invoked by `typeof`.
    ValueThunk(ValueThunk),
}

pub type ClassThunk = Rc<dyn Fn() -> RvmResult<TypeHandle>>;
pub type ProgramThunk = Rc<dyn Fn() -> RvmResult<PackedProgram>>;
pub type ValueThunk = Rc<dyn Fn() -> RvmResult<RuntimeValue>>;

impl fmt::Debug for PoolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::BigInt(b) => f.debug_tuple("BigInt").field(b).finish(),
            Self::ClassThunk(_) => f.write_str("ClassThunk(..)"),
            Self::Program(p) => f.debug_tuple("Program").field(p).finish(),
            Self::ProgramThunk(_) => f.write_str("ProgramThunk(..)"),
            Self::ValueThunk(_) => f.write_str("ValueThunk(..)"),
        }
    }
}

impl PoolEntry {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Decodes a raw literal-pool-plus-trailer sequence into a [`PackedProgram`].
///
/// If `raw`'s last element is not a [`PoolEntry::String`], the program
/// decodes to empty (`ops = []`, `pool = []`) per spec.md §4.1.
#[must_use]
pub fn decode(mut raw: Vec<PoolEntry>) -> PackedProgram {
    let Some(PoolEntry::String(ops_string)) = raw.last() else {
        return Rc::new(RawProgram { ops: Vec::new(), pool: Vec::new() });
    };
    let ops = ops_string
        .chars()
        .map(|c| u32::from(c).wrapping_sub(33) as u8)
        .collect();
    raw.pop();
    Rc::new(RawProgram { ops, pool: raw })
}

/// Identity comparison for two Packed Programs, used by the registry and
/// by `inline`/`inlineCall` self-reference checks.
#[must_use]
pub fn same_program(a: &PackedProgram, b: &PackedProgram) -> bool {
    Rc::ptr_eq(a, b)
}

/// A handle to a class or function's reflected type.
///
/// `spec.md` §6: "A class or function has an associated property `__type`
/// whose value is the Packed Program array." [`TypeHandle`] is that pair
/// (program + optional name), plus the result cache described in §6
/// ("the resulting IR node may be cached on the handle").
#[derive(Clone)]
pub struct TypeHandle(Rc<TypeHandleInner>);

struct TypeHandleInner {
    name: Option<String>,
    program: PackedProgram,
    cache: RefCell<Option<Node>>,
}

impl TypeHandle {
    #[must_use]
    pub fn new(name: Option<String>, program: PackedProgram) -> Self {
        Self(Rc::new(TypeHandleInner {
            name,
            program,
            cache: RefCell::new(None),
        }))
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    #[must_use]
    pub fn program(&self) -> &PackedProgram {
        &self.0.program
    }

    #[must_use]
    pub fn cached(&self) -> Option<Node> {
        self.0.cache.borrow().clone()
    }

    pub fn store_cache(&self, node: Node) {
        *self.0.cache.borrow_mut() = Some(node);
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("name", &self.0.name)
            .field("cached", &self.0.cache.borrow().is_some())
            .finish()
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for TypeHandle {
    fn default() -> Self {
        Self::new(None, decode(vec![PoolEntry::String(String::new())]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_opcode_string_by_subtracting_33() {
        // '!' (33) -> 0, '"' (34) -> 1
        let program = decode(vec![PoolEntry::String("!\"".to_owned())]);
        assert_eq!(program.ops, vec![0, 1]);
        assert!(program.pool.is_empty());
    }

    #[test]
    fn literal_pool_is_everything_before_the_trailing_opcode_string() {
        let program = decode(vec![
            PoolEntry::String("hello".to_owned()),
            PoolEntry::Number(42.0),
            PoolEntry::String("!".to_owned()),
        ]);
        assert_eq!(program.ops, vec![0]);
        assert_eq!(program.pool.len(), 2);
        assert_eq!(program.pool[0].as_str(), Some("hello"));
    }

    #[test]
    fn non_string_trailer_yields_empty_program() {
        let program = decode(vec![PoolEntry::Number(1.0), PoolEntry::Bool(true)]);
        assert!(program.ops.is_empty());
        assert!(program.pool.is_empty());
    }

    #[test]
    fn empty_input_yields_empty_program() {
        let program = decode(vec![]);
        assert!(program.ops.is_empty());
        assert!(program.pool.is_empty());
    }

    #[test]
    fn programs_are_identified_by_identity_not_value() {
        let a = decode(vec![PoolEntry::String("!".to_owned())]);
        let b = decode(vec![PoolEntry::String("!".to_owned())]);
        assert!(!same_program(&a, &b), "structurally-equal programs are still distinct identities");
        let c = Rc::clone(&a);
        assert!(same_program(&a, &c));
    }
}
