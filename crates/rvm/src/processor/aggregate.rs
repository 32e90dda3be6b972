//! Aggregate types (`spec.md` §4.3 "Aggregate types"): `class`, `enum`,
//! `enumMember`, `function`.

use crate::{
    error::{InvalidProgramReason, RvmResult},
    ir::{ClassNode, EnumMemberNode, EnumNode, FunctionNode, LiteralNode, Node, ParameterNode},
    ir_ops::project_constructor_properties,
    tracer::ProcessorTracer,
};

use super::Processor;

impl<Tr: ProcessorTracer> Processor<'_, Tr> {
    /// `class n`: pops `n` member nodes, pushes an anonymous class shape.
    /// `classReference` is what attaches a name/handle to a class that was
    /// reached by identity rather than built inline.
    pub(super) fn exec_class(&mut self) -> RvmResult<()> {
        let count = self.fetch_usize()?;
        let nodes = self.pop_n(count)?;
        let mut types = Vec::with_capacity(nodes.len());
        for node in nodes {
            types.push(self.node_into_member(node)?);
        }
        types.extend(project_constructor_properties(&types));
        let arguments = self.current_frame().inputs.clone();
        let arguments = if arguments.is_empty() { None } else { Some(arguments) };
        self.finish_structured_node(Node::Class(ClassNode {
            class_handle: None,
            types,
            arguments,
            type_name: None,
        }));
        Ok(())
    }

    /// `enum n`: pops `n` `enumMember` nodes, pushes the enum.
    pub(super) fn exec_enum(&mut self) -> RvmResult<()> {
        let count = self.fetch_usize()?;
        let nodes = self.pop_n(count)?;
        let mut members = Vec::with_capacity(nodes.len());
        for node in nodes {
            let Node::EnumMember(member) = node else {
                return Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "an enumMember node inside enum" }));
            };
            members.push(member);
        }
        self.push(Node::Enum(EnumNode { members }));
        Ok(())
    }

    /// `enumMember namePoolIndex`: pops the default literal, pushes the member.
    pub(super) fn exec_enum_member(&mut self) -> RvmResult<()> {
        let name_index = self.fetch_pool_index()?;
        let name = self.program.pool[name_index]
            .as_str()
            .ok_or_else(|| self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "a string pool entry for an enum member name" }))?
            .to_owned();
        let default_node = self.pop()?;
        let Node::Literal(LiteralNode { literal }) = default_node else {
            return Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "a literal default value for enumMember" }));
        };
        self.push(Node::EnumMember(EnumMemberNode { name, default: literal }));
        Ok(())
    }

    /// `function paramCount`: pops the return type, then `paramCount`
    /// parameter nodes below it (pushed in declaration order).
    pub(super) fn exec_function(&mut self) -> RvmResult<()> {
        let param_count = self.fetch_usize()?;
        let return_type = self.pop()?;
        let param_nodes = self.pop_n(param_count)?;
        let mut parameters = Vec::with_capacity(param_nodes.len());
        for node in param_nodes {
            parameters.push(self.expect_parameter(node)?);
        }
        self.push(Node::Function(FunctionNode {
            name: None,
            parameters,
            return_type: Box::new(return_type),
        }));
        Ok(())
    }

    pub(super) fn expect_parameter(&self, node: Node) -> RvmResult<ParameterNode> {
        match node {
            Node::Parameter(p) => Ok(p),
            _ => Err(self.invalid_program(InvalidProgramReason::UnexpectedStackShape { expected: "a parameter node" })),
        }
    }
}
