//! Container types and the member-modifier opcodes (`spec.md` §4.3
//! "Container types").
//!
//! `optional`/`readonly`/`public`/`protected`/`private`/`abstract`/
//! `default`/`description` all share one shape: pop the member node built
//! so far, set one field, push it back. [`Modifier`] dispatches that
//! shared shape to the field each opcode actually touches.

use crate::{
    error::{InvalidProgramReason, RvmResult},
    ir::{ArrayNode, Node, ObjectLiteralNode, RestNode, TupleMemberNode, TupleNode, Visibility},
    tracer::ProcessorTracer,
};

use super::Processor;

pub(super) enum Modifier {
    Optional,
    Readonly,
    Visibility(Visibility),
    Abstract,
    Default,
    Description,
}

impl<Tr: ProcessorTracer> Processor<'_, Tr> {
    /// `array`: pops the element type, pushes `T[]`.
    pub(super) fn exec_array(&mut self) -> RvmResult<()> {
        let element = self.pop()?;
        self.push(Node::Array(ArrayNode { element: Box::new(element) }));
        Ok(())
    }

    /// `tuple n`: pops `n` tuple members (in push order), pushes the tuple.
    pub(super) fn exec_tuple(&mut self) -> RvmResult<()> {
        let count = self.fetch_usize()?;
        let members = self
            .pop_n(count)?
            .into_iter()
            .map(|node| match node {
                Node::Rest(RestNode { inner }) => TupleMemberNode {
                    ty: inner,
                    optional: false,
                    name: None,
                    is_rest: true,
                },
                other => TupleMemberNode {
                    ty: Box::new(other),
                    optional: false,
                    name: None,
                    is_rest: false,
                },
            })
            .collect();
        self.push(Node::Tuple(TupleNode { members }));
        Ok(())
    }

    /// `tupleMember` / `namedTupleMember`: wraps the top-of-stack type as a
    /// tuple member, optionally pulling its name from the literal pool.
    pub(super) fn exec_tuple_member(&mut self, named: bool) -> RvmResult<()> {
        let name = if named {
            let index = self.fetch_pool_index()?;
            let name = self.program.pool[index].as_str().ok_or_else(|| {
                self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "a string pool entry for a tuple member name" })
            })?;
            Some(name.to_owned())
        } else {
            None
        };
        let ty = self.pop()?;
        self.push(Node::Tuple(TupleNode {
            members: vec![TupleMemberNode {
                ty: Box::new(ty),
                optional: false,
                name,
                is_rest: false,
            }],
        }));
        Ok(())
    }

    /// `rest`: marks the top-of-stack type as a rest element, for `tuple`
    /// to pick up.
    pub(super) fn exec_rest(&mut self) -> RvmResult<()> {
        let inner = self.pop()?;
        self.push(Node::Rest(RestNode { inner: Box::new(inner) }));
        Ok(())
    }

    /// `objectLiteral n`: pops `n` members, pushes the object literal.
    pub(super) fn exec_object_literal(&mut self) -> RvmResult<()> {
        let count = self.fetch_usize()?;
        let nodes = self.pop_n(count)?;
        let mut members = Vec::with_capacity(nodes.len());
        for node in nodes {
            members.push(self.node_into_member(node)?);
        }
        self.finish_structured_node(Node::ObjectLiteral(ObjectLiteralNode::new(members)));
        Ok(())
    }

    pub(super) fn node_into_member(&self, node: Node) -> RvmResult<crate::ir::Member> {
        match node {
            Node::Property(p) => Ok(crate::ir::Member::Property(p)),
            Node::PropertySignature(p) => Ok(crate::ir::Member::PropertySignature(p)),
            Node::Method(m) => Ok(crate::ir::Member::Method(m)),
            Node::MethodSignature(m) => Ok(crate::ir::Member::MethodSignature(m)),
            Node::IndexSignature(i) => Ok(crate::ir::Member::IndexSignature(i)),
            _ => Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape {
                expected: "a member node inside objectLiteral/class",
            })),
        }
    }

    /// `indexSignature`: pops the value type then the index type, pushes
    /// the index signature member.
    pub(super) fn exec_index_signature(&mut self) -> RvmResult<()> {
        let ty = self.pop()?;
        let index = self.pop()?;
        self.push(Node::IndexSignature(crate::ir::IndexSignatureNode {
            index: Box::new(index),
            ty: Box::new(ty),
        }));
        Ok(())
    }

    pub(super) fn exec_modifier(&mut self, modifier: Modifier) -> RvmResult<()> {
        match modifier {
            Modifier::Default => {
                let default = self.pop()?;
                let mut member = self.pop()?;
                match &mut member {
                    Node::Property(p) | Node::PropertySignature(p) => p.default = Some(Box::new(default)),
                    _ => {
                        return Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape {
                            expected: "a property node for the `default` modifier",
                        }))
                    }
                }
                self.push(member);
                Ok(())
            }
            Modifier::Description => {
                let description = self.pop_description_pool_string()?;
                let mut member = self.pop()?;
                match &mut member {
                    Node::Property(p) | Node::PropertySignature(p) => p.description = Some(description),
                    _ => {
                        return Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape {
                            expected: "a property node for the `description` modifier",
                        }))
                    }
                }
                self.push(member);
                Ok(())
            }
            simple => {
                let top = self.peek_mut()?;
                match (simple, top) {
                    (Modifier::Optional, Node::Property(p) | Node::PropertySignature(p)) => p.optional = true,
                    (Modifier::Optional, Node::Parameter(p)) => p.optional = true,
                    (Modifier::Optional, Node::Tuple(TupleNode { members })) if members.len() == 1 => members[0].optional = true,
                    (Modifier::Readonly, Node::Property(p) | Node::PropertySignature(p)) => p.readonly = true,
                    (Modifier::Readonly, Node::Parameter(p)) => p.readonly = true,
                    (Modifier::Visibility(v), Node::Property(p) | Node::PropertySignature(p)) => p.visibility = Some(v),
                    (Modifier::Visibility(v), Node::Method(m) | Node::MethodSignature(m)) => m.visibility = Some(v),
                    (Modifier::Visibility(v), Node::Parameter(p)) => p.visibility = Some(v),
                    (Modifier::Abstract, Node::Property(p) | Node::PropertySignature(p)) => p.is_abstract = true,
                    (Modifier::Abstract, Node::Method(m) | Node::MethodSignature(m)) => m.is_abstract = true,
                    _ => {
                        return Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape {
                            expected: "a property/method/parameter/tuple-member node for a modifier opcode",
                        }))
                    }
                }
                Ok(())
            }
        }
    }

    fn pop_description_pool_string(&mut self) -> RvmResult<String> {
        let index = self.fetch_pool_index()?;
        self.program.pool[index]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "a string pool entry for `description`" }))
    }
}
