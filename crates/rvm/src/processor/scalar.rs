//! Scalar types and special built-in classes (`spec.md` §4.3 "Scalar
//! types", "Special classes").

use crate::{
    error::{InvalidProgramReason, RvmResult},
    ir::{LiteralNode, LiteralValue, Node, PromiseNode, SpecialClassNode},
    opcode::Opcode,
    program::PoolEntry,
    tracer::ProcessorTracer,
};

use super::Processor;

impl<Tr: ProcessorTracer> Processor<'_, Tr> {
    /// Pushes the fixed node a scalar or special-class opcode always produces.
    pub(super) fn exec_scalar_constant(&mut self, opcode: Opcode) -> RvmResult<()> {
        let node = match opcode {
            Opcode::String => Node::String,
            Opcode::Number => Node::Number,
            Opcode::Boolean => Node::Boolean,
            Opcode::Bigint => Node::Bigint,
            Opcode::Void => Node::Void,
            Opcode::Unknown => Node::Unknown,
            Opcode::Object => Node::Object,
            Opcode::Never => Node::Never,
            Opcode::Undefined => Node::Undefined,
            Opcode::Symbol => Node::Symbol,
            Opcode::Null => Node::Null,
            Opcode::Any => Node::Any,
            Opcode::Regexp => Node::Regexp,
            Opcode::Date => Node::SpecialClass(SpecialClassNode::Date),
            Opcode::Uint8Array => Node::SpecialClass(SpecialClassNode::Uint8Array),
            Opcode::Int8Array => Node::SpecialClass(SpecialClassNode::Int8Array),
            Opcode::Uint8ClampedArray => Node::SpecialClass(SpecialClassNode::Uint8ClampedArray),
            Opcode::Uint16Array => Node::SpecialClass(SpecialClassNode::Uint16Array),
            Opcode::Int16Array => Node::SpecialClass(SpecialClassNode::Int16Array),
            Opcode::Uint32Array => Node::SpecialClass(SpecialClassNode::Uint32Array),
            Opcode::Int32Array => Node::SpecialClass(SpecialClassNode::Int32Array),
            Opcode::Float32Array => Node::SpecialClass(SpecialClassNode::Float32Array),
            Opcode::Float64Array => Node::SpecialClass(SpecialClassNode::Float64Array),
            Opcode::BigInt64Array => Node::SpecialClass(SpecialClassNode::BigInt64Array),
            Opcode::ArrayBuffer => Node::SpecialClass(SpecialClassNode::ArrayBuffer),
            other => unreachable!("exec_scalar_constant called with non-scalar opcode {other}"),
        };
        self.push(node);
        Ok(())
    }

    /// `literal poolIndex`: pushes a literal type wrapping the pool entry.
    pub(super) fn exec_literal(&mut self) -> RvmResult<()> {
        let index = self.fetch_pool_index()?;
        let literal = match &self.program.pool[index] {
            PoolEntry::String(s) => LiteralValue::String(s.clone()),
            PoolEntry::Number(n) => LiteralValue::Number(*n),
            PoolEntry::Bool(b) => LiteralValue::Boolean(*b),
            PoolEntry::BigInt(b) => LiteralValue::BigInt(b.clone()),
            _ => {
                return Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape {
                    expected: "a String/Number/Bool/BigInt pool entry for `literal`",
                }))
            }
        };
        self.push(Node::Literal(LiteralNode { literal }));
        Ok(())
    }

    /// `set`: pops the element type, pushes `Set<T>`.
    pub(super) fn exec_set(&mut self) -> RvmResult<()> {
        let argument = self.pop()?;
        self.push(Node::SpecialClass(SpecialClassNode::Set { argument: Box::new(argument) }));
        Ok(())
    }

    /// `map`: pops value then key (push order key, value), pushes `Map<K, V>`.
    pub(super) fn exec_map(&mut self) -> RvmResult<()> {
        let value = self.pop()?;
        let key = self.pop()?;
        self.push(Node::SpecialClass(SpecialClassNode::Map {
            key: Box::new(key),
            value: Box::new(value),
        }));
        Ok(())
    }

    /// `promise`: pops the inner type, pushes `Promise<T>`.
    pub(super) fn exec_promise(&mut self) -> RvmResult<()> {
        let inner = self.pop()?;
        self.push(Node::Promise(PromiseNode { inner: Box::new(inner) }));
        Ok(())
    }
}
