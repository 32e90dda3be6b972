//! A small test-only bytecode builder, analogous to how the teacher's own
//! `bytecode::builder::CodeBuilder` hand-assembles instruction streams for
//! its VM tests. Packed Programs have no textual assembly form, so
//! integration tests assemble them opcode-by-opcode instead of embedding
//! raw opcode strings.

#![allow(dead_code)]

use rvm::opcode::Opcode;
use rvm::program::{decode, PackedProgram, PoolEntry};

pub struct ProgramBuilder {
    pool: Vec<PoolEntry>,
    ops: Vec<u8>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self { pool: Vec::new(), ops: Vec::new() }
    }

    /// Current opcode-stream length, usable as a jump/call target before
    /// the instructions at that address have been written yet.
    pub fn here(&self) -> u8 {
        u8::try_from(self.ops.len()).expect("test programs stay under 256 opcode bytes")
    }

    pub fn pool_string(&mut self, s: &str) -> u8 {
        self.pool.push(PoolEntry::String(s.to_owned()));
        u8::try_from(self.pool.len() - 1).expect("test pools stay under 256 entries")
    }

    pub fn pool_number(&mut self, n: f64) -> u8 {
        self.pool.push(PoolEntry::Number(n));
        u8::try_from(self.pool.len() - 1).expect("test pools stay under 256 entries")
    }

    pub fn pool_bool(&mut self, b: bool) -> u8 {
        self.pool.push(PoolEntry::Bool(b));
        u8::try_from(self.pool.len() - 1).expect("test pools stay under 256 entries")
    }

    pub fn pool_entry(&mut self, entry: PoolEntry) -> u8 {
        self.pool.push(entry);
        u8::try_from(self.pool.len() - 1).expect("test pools stay under 256 entries")
    }

    /// Appends an opcode with no operands.
    pub fn op(&mut self, opcode: Opcode) -> &mut Self {
        self.ops.push(opcode as u8);
        self
    }

    /// Appends an opcode followed by one single-byte operand.
    pub fn op1(&mut self, opcode: Opcode, a: u8) -> &mut Self {
        self.ops.push(opcode as u8);
        self.ops.push(a);
        self
    }

    /// Appends an opcode followed by two single-byte operands.
    pub fn op2(&mut self, opcode: Opcode, a: u8, b: u8) -> &mut Self {
        self.ops.push(opcode as u8);
        self.ops.push(a);
        self.ops.push(b);
        self
    }

    /// Appends a raw, possibly-unassigned byte - for tests that need to
    /// exercise the "unknown opcode" error path.
    pub fn raw(&mut self, byte: u8) -> &mut Self {
        self.ops.push(byte);
        self
    }

    pub fn build(self) -> PackedProgram {
        let ops_string: String = self
            .ops
            .iter()
            .map(|&byte| char::from_u32(u32::from(byte) + 33).expect("test opcode bytes stay in the printable range"))
            .collect();
        let mut raw = self.pool;
        raw.push(PoolEntry::String(ops_string));
        decode(raw)
    }
}
