//! Error kinds surfaced at the `run`/`resolve_type` boundary.
//!
//! The teacher crate hand-writes `Display` for its runtime error types
//! rather than pulling in `thiserror` (there is no `thiserror` dependency
//! anywhere in its `Cargo.toml`), so this module does the same.

use std::fmt;

use crate::opcode::Opcode;

/// Result alias for Processor operations.
pub type RvmResult<T> = Result<T, RvmError>;

/// Why a program was rejected as malformed.
///
/// The Processor trusts its input; these are the only ways a Packed
/// Program can fail to execute to completion (spec.md §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidProgramReason {
    /// An opcode needed more operand stack slots than were available.
    StackUnderflow { wanted: usize, available: usize },
    /// A byte in the opcode stream did not decode to a known [`Opcode`].
    UnknownOpcode { byte: u8 },
    /// A pool index operand fell outside the program's literal pool.
    PoolIndexOutOfRange { index: usize, pool_len: usize },
    /// An opcode expected a different kind of value on the stack than it found.
    UnexpectedStackShape { expected: &'static str },
    /// A frame-chain walk (`loads`) asked for an ancestor frame that doesn't exist.
    FrameChainExhausted { offset: usize },
    /// An opcode's operand byte(s) ran past the end of the opcode stream.
    TruncatedOperand,
}

impl fmt::Display for InvalidProgramReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackUnderflow { wanted, available } => {
                write!(f, "stack underflow: wanted {wanted} slot(s), {available} available")
            }
            Self::UnknownOpcode { byte } => write!(f, "unknown opcode byte {byte}"),
            Self::PoolIndexOutOfRange { index, pool_len } => {
                write!(f, "literal pool index {index} out of range (pool has {pool_len} entries)")
            }
            Self::UnexpectedStackShape { expected } => write!(f, "expected {expected} on the stack"),
            Self::FrameChainExhausted { offset } => {
                write!(f, "frame chain exhausted walking {offset} ancestor(s) up")
            }
            Self::TruncatedOperand => write!(f, "opcode operand ran past the end of the opcode stream"),
        }
    }
}

/// An error produced while running a Packed Program.
#[derive(Debug, Clone, PartialEq)]
pub enum RvmError {
    /// The program is malformed: stack underflow, unknown opcode, or a pool
    /// index out of range.
    InvalidProgram {
        opcode_index: usize,
        opcode: Option<Opcode>,
        frame_depth: usize,
        reason: InvalidProgramReason,
    },
    /// A class thunk in the literal pool threw while being invoked.
    ClassResolutionFailure { pool_index: usize, frame_depth: usize },
    /// A non-cyclic program nested its frames deeper than `max_frame_depth`.
    ///
    /// This is independent of the Processor Registry's cycle breaker: a
    /// program that keeps instantiating new (non-recursive) subprograms,
    /// e.g. `Wrap<Wrap<Wrap<...>>>`, never re-enters the same program
    /// identity, so the registry never sees it as a cycle. This guard
    /// bounds that case the way the teacher's `ResourceTracker` bounds
    /// Python call-stack depth.
    RecursionLimitExceeded { max_frame_depth: usize },
}

impl fmt::Display for RvmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProgram {
                opcode_index,
                opcode,
                frame_depth,
                reason,
            } => {
                let opcode_name = opcode.map_or("<unknown>".to_owned(), |op| op.to_string());
                write!(
                    f,
                    "RVMInvalidProgram: {reason} at opcode #{opcode_index} ({opcode_name}), frame depth {frame_depth}"
                )
            }
            Self::ClassResolutionFailure { pool_index, frame_depth } => {
                write!(
                    f,
                    "RVMClassResolutionFailure: class thunk at pool index {pool_index} threw (frame depth {frame_depth})"
                )
            }
            Self::RecursionLimitExceeded { max_frame_depth } => {
                write!(f, "RVMRecursionLimitExceeded: exceeded max frame depth {max_frame_depth}")
            }
        }
    }
}

impl std::error::Error for RvmError {}
