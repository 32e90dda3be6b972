//! Parameter and method construction (`spec.md` §4.3).
//!
//! `property`/`propertySignature` and `method`/`methodSignature` only
//! differ in which [`crate::ir::Member`] variant wraps the identical
//! [`PropertyNode`]/[`MethodNode`] payload - the bare kind for classes, the
//! `*Signature` kind for object literals (`spec.md` §3's member table).

use crate::{
    error::{InvalidProgramReason, RvmResult},
    ir::{MethodNode, Node, ParameterNode, PropertyNode, Visibility},
    ir_ops::reduce_optional_union,
    tracer::ProcessorTracer,
};

use super::Processor;

impl<Tr: ProcessorTracer> Processor<'_, Tr> {
    /// `parameter namePoolIndex`: pops the parameter's type, pushes the
    /// parameter node. Modifier opcodes (`optional`, `readonly`,
    /// visibility) mutate it afterward in place.
    pub(super) fn exec_parameter(&mut self) -> RvmResult<()> {
        let name_index = self.fetch_pool_index()?;
        let name = self.program.pool[name_index]
            .as_str()
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "a string pool entry for a parameter name" }))?
            .to_owned();
        let ty = self.pop()?;
        self.push(Node::Parameter(ParameterNode {
            name,
            ty: Box::new(ty),
            optional: false,
            readonly: false,
            visibility: None,
        }));
        Ok(())
    }

    /// `property`/`propertySignature namePoolIndex`: pops the property's
    /// type, pushes the property node as the requested kind.
    pub(super) fn exec_property(&mut self, is_signature: bool) -> RvmResult<()> {
        let name_index = self.fetch_pool_index()?;
        let name = self.program.pool[name_index]
            .as_str()
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "a string pool entry for a property name" }))?
            .to_owned();
        let ty = self.pop()?;
        let (ty, optional) = reduce_optional_union(ty);
        let property = PropertyNode {
            name,
            ty: Box::new(ty),
            optional,
            readonly: false,
            visibility: if is_signature { None } else { Some(Visibility::Public) },
            description: None,
            default: None,
            is_abstract: false,
        };
        self.push(if is_signature {
            Node::PropertySignature(property)
        } else {
            Node::Property(property)
        });
        Ok(())
    }

    /// `method`/`methodSignature namePoolIndex paramCount`: pops the return
    /// type, then `paramCount` parameter nodes, pushes the method node as
    /// the requested kind.
    pub(super) fn exec_method(&mut self, is_signature: bool) -> RvmResult<()> {
        let name_index = self.fetch_pool_index()?;
        let name = self.program.pool[name_index]
            .as_str()
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "a string pool entry for a method name" }))?
            .to_owned();
        let param_count = self.fetch_usize()?;
        let return_type = self.pop()?;
        let param_nodes = self.pop_n(param_count)?;
        let mut parameters = Vec::with_capacity(param_nodes.len());
        for node in param_nodes {
            parameters.push(self.expect_parameter(node)?);
        }
        let method = MethodNode {
            name,
            return_type: Box::new(return_type),
            parameters,
            visibility: None,
            is_abstract: false,
        };
        self.push(if is_signature { Node::MethodSignature(method) } else { Node::Method(method) });
        Ok(())
    }
}
