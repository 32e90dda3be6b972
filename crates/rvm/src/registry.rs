//! Processor Registry: the cycle breaker (`spec.md` §4.4).
//!
//! Maps a currently-evaluating Packed Program (identity key) to the Result
//! Anchor it is in the middle of building. A re-entrant evaluation of the
//! same program - `inline`/`inlineCall` reaching back into a program that
//! is already on the call stack - returns the in-progress anchor instead
//! of recursing forever.
//!
//! Adapted from the teacher's `Heap`, which keys mutable per-object state
//! by an identity (`HeapId`) in an `AHashMap`; here the key is a Packed
//! Program's pointer identity rather than a heap slot; the value is just
//! the [`Anchor`] cell, not an entire running Processor, since the anchor
//! is all a re-entrant caller ever needs to observe.

use ahash::AHashMap;

use crate::{
    ir::{new_anchor, Anchor},
    program::PackedProgram,
};

/// Identity key for a Packed Program, usable as a hash map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ProgramKey(usize);

impl ProgramKey {
    fn of(program: &PackedProgram) -> Self {
        Self(std::rc::Rc::as_ptr(program) as usize)
    }
}

/// Tracks in-flight program evaluations for the duration of one top-level
/// [`crate::resolve_type`] call.
///
/// Created per top-level evaluation (`spec.md` §4.4: "created per
/// top-level evaluation; nested evaluations share it by parameter
/// passing"), single-threaded only - see `spec.md` §5.
#[derive(Debug, Default)]
pub struct ProcessorRegistry {
    in_flight: AHashMap<ProgramKey, Anchor>,
}

impl ProcessorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the anchor for a program already being evaluated.
    #[must_use]
    pub fn lookup(&self, program: &PackedProgram) -> Option<Anchor> {
        self.in_flight.get(&ProgramKey::of(program)).cloned()
    }

    /// Registers `program` as in-flight and returns its fresh anchor.
    ///
    /// Panics if `program` is already registered - callers must check
    /// [`Self::lookup`] first, which the Processor's entry points always do.
    pub fn register(&mut self, program: &PackedProgram) -> Anchor {
        let anchor = new_anchor();
        let previous = self.in_flight.insert(ProgramKey::of(program), anchor.clone());
        debug_assert!(previous.is_none(), "program registered twice without unregistering");
        anchor
    }

    /// Unregisters a completed evaluation.
    pub fn unregister(&mut self, program: &PackedProgram) {
        self.in_flight.remove(&ProgramKey::of(program));
    }

    #[must_use]
    pub fn is_in_flight(&self, program: &PackedProgram) -> bool {
        self.in_flight.contains_key(&ProgramKey::of(program))
    }
}
