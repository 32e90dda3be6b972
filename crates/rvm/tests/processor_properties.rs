//! Universal properties of the Processor (`spec.md` §8), each exercised
//! against a hand-assembled Packed Program rather than the teacher's own
//! bytecode fixtures, which run a different machine entirely.

mod common;

use pretty_assertions::assert_eq;
use rvm::ir::{LiteralValue, Visibility};
use rvm::opcode::Opcode;
use rvm::program::{PoolEntry, TypeHandle};
use rvm::{resolve_type, resolve_type_of, InvalidProgramReason, Node, RvmError};

use common::ProgramBuilder;

#[test]
fn literal_opcode_wraps_the_pool_entry() {
    let mut b = ProgramBuilder::new();
    let idx = b.pool_string("hello");
    b.op1(Opcode::Literal, idx);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("literal opcode never errors");
    assert_eq!(result, Node::literal_string("hello"));
}

#[test]
fn array_opcode_wraps_the_popped_element() {
    let mut b = ProgramBuilder::new();
    b.op(Opcode::String).op(Opcode::Array);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("array opcode never errors");
    assert_eq!(result, Node::Array(rvm::ir::ArrayNode { element: Box::new(Node::String) }));
}

#[test]
fn tuple_opcode_wraps_plain_members_without_rest() {
    let mut b = ProgramBuilder::new();
    b.op(Opcode::String).op(Opcode::Number).op1(Opcode::Tuple, 2);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("tuple opcode never errors");
    let rvm::ir::Node::Tuple(tuple) = result else { panic!("expected a tuple") };
    assert_eq!(tuple.members.len(), 2);
    assert!(!tuple.members[0].is_rest);
    assert!(!tuple.members[1].is_rest);
    assert_eq!(*tuple.members[0].ty, Node::String);
    assert_eq!(*tuple.members[1].ty, Node::Number);
}

#[test]
fn rest_opcode_flags_its_member_inside_a_tuple() {
    let mut b = ProgramBuilder::new();
    b.op(Opcode::String);
    b.op(Opcode::Number).op(Opcode::Rest);
    b.op1(Opcode::Tuple, 2);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("tuple opcode never errors");
    let rvm::ir::Node::Tuple(tuple) = result else { panic!("expected a tuple") };
    assert!(!tuple.members[0].is_rest);
    assert!(tuple.members[1].is_rest);
    assert_eq!(*tuple.members[1].ty, Node::Number);
}

#[test]
fn named_tuple_member_reads_its_name_from_the_pool() {
    let mut b = ProgramBuilder::new();
    let name = b.pool_string("first");
    b.op(Opcode::String).op1(Opcode::NamedTupleMember, name);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("namedTupleMember never errors");
    let rvm::ir::Node::Tuple(tuple) = result else { panic!("expected a tuple") };
    assert_eq!(tuple.members.len(), 1);
    assert_eq!(tuple.members[0].name.as_deref(), Some("first"));
}

#[test]
fn union_of_a_single_member_unboxes() {
    let mut b = ProgramBuilder::new();
    b.op(Opcode::String).op1(Opcode::Union, 1);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("union opcode never errors");
    assert_eq!(result, Node::String);
}

#[test]
fn union_of_two_members_stays_a_union() {
    let mut b = ProgramBuilder::new();
    b.op(Opcode::String).op(Opcode::Number).op1(Opcode::Union, 2);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("union opcode never errors");
    assert_eq!(result, Node::Union(rvm::ir::UnionNode { types: vec![Node::String, Node::Number] }));
}

#[test]
fn optional_modifier_sets_the_flag_on_the_top_of_stack_property() {
    let mut b = ProgramBuilder::new();
    let name = b.pool_string("foo");
    b.op(Opcode::String).op1(Opcode::Property, name).op(Opcode::Optional);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("optional modifier never errors");
    let Node::Property(property) = result else { panic!("expected a property") };
    assert_eq!(property.name, "foo");
    assert!(property.optional);
}

#[test]
fn visibility_modifier_sets_the_visibility_field() {
    let mut b = ProgramBuilder::new();
    let name = b.pool_string("foo");
    b.op(Opcode::String).op1(Opcode::Property, name).op(Opcode::Private);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("visibility modifier never errors");
    let Node::Property(property) = result else { panic!("expected a property") };
    assert_eq!(property.visibility, Some(Visibility::Private));
}

#[test]
fn default_modifier_pops_the_value_above_the_member() {
    let mut b = ProgramBuilder::new();
    let name = b.pool_string("foo");
    let default_value = b.pool_string("bar");
    b.op(Opcode::String)
        .op1(Opcode::Property, name)
        .op1(Opcode::Literal, default_value)
        .op(Opcode::DefaultValue);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("default modifier never errors");
    let Node::Property(property) = result else { panic!("expected a property") };
    assert_eq!(property.default, Some(Box::new(Node::literal_string("bar"))));
}

#[test]
fn description_modifier_reads_its_string_from_the_pool() {
    let mut b = ProgramBuilder::new();
    let name = b.pool_string("foo");
    let description = b.pool_string("the foo field");
    b.op(Opcode::String).op1(Opcode::Property, name).op1(Opcode::Description, description);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("description modifier never errors");
    let Node::Property(property) = result else { panic!("expected a property") };
    assert_eq!(property.description.as_deref(), Some("the foo field"));
}

#[test]
fn index_signature_pairs_index_and_value_types() {
    let mut b = ProgramBuilder::new();
    b.op(Opcode::String).op(Opcode::Number).op(Opcode::IndexSignature).op1(Opcode::ObjectLiteral, 1);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("indexSignature never errors");
    let Node::ObjectLiteral(obj) = result else { panic!("expected an object literal") };
    let [rvm::ir::Member::IndexSignature(sig)] = obj.members.as_slice() else { panic!("expected one index signature member") };
    assert_eq!(*sig.index, Node::String);
    assert_eq!(*sig.ty, Node::Number);
}

#[test]
fn keyof_an_array_is_always_number() {
    let mut b = ProgramBuilder::new();
    let foo = b.pool_string("foo");
    b.op(Opcode::String)
        .op1(Opcode::Property, foo)
        .op1(Opcode::ObjectLiteral, 1)
        .op(Opcode::Array)
        .op(Opcode::Keyof);
    let program = b.build();

    // keyof ({ foo: string })[] -> keyof of an Array is always `number`.
    let result = resolve_type(&program, Vec::new()).expect("keyof never errors");
    assert_eq!(result, Node::Number);
}

#[test]
fn type_parameter_falls_back_to_unknown_with_no_matching_argument() {
    let mut b = ProgramBuilder::new();
    b.op(Opcode::TypeParameter);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("typeParameter never errors");
    assert_eq!(result, Node::Unknown);
}

#[test]
fn type_parameter_consumes_the_matching_positional_argument() {
    let mut b = ProgramBuilder::new();
    b.op(Opcode::TypeParameter);
    let program = b.build();

    let result = resolve_type(&program, vec![Node::String]).expect("typeParameter never errors");
    assert_eq!(result, Node::String);
}

#[test]
fn empty_opcode_stream_resolves_to_never() {
    let program = rvm::decode(vec![PoolEntry::String(String::new())]);
    let result = resolve_type(&program, Vec::new()).expect("empty program never errors");
    assert_eq!(result, Node::Never);
}

#[test]
fn stack_underflow_surfaces_as_invalid_program() {
    let mut b = ProgramBuilder::new();
    b.op(Opcode::Array); // pops an element that was never pushed
    let program = b.build();

    let err = resolve_type(&program, Vec::new()).expect_err("popping an empty stack must fail");
    let RvmError::InvalidProgram { reason, .. } = err else { panic!("expected InvalidProgram") };
    assert_eq!(reason, InvalidProgramReason::StackUnderflow { wanted: 1, available: 0 });
}

#[test]
fn unknown_opcode_byte_surfaces_as_invalid_program() {
    let mut b = ProgramBuilder::new();
    b.raw(250);
    let program = b.build();

    let err = resolve_type(&program, Vec::new()).expect_err("an unassigned opcode byte must fail");
    let RvmError::InvalidProgram { reason, .. } = err else { panic!("expected InvalidProgram") };
    assert_eq!(reason, InvalidProgramReason::UnknownOpcode { byte: 250 });
}

#[test]
fn out_of_range_pool_index_surfaces_as_invalid_program() {
    let mut b = ProgramBuilder::new();
    b.op1(Opcode::Literal, 0); // no pool entries exist at all
    let program = b.build();

    let err = resolve_type(&program, Vec::new()).expect_err("an out-of-range pool index must fail");
    let RvmError::InvalidProgram { reason, .. } = err else { panic!("expected InvalidProgram") };
    assert_eq!(reason, InvalidProgramReason::PoolIndexOutOfRange { index: 0, pool_len: 0 });
}

#[test]
fn a_program_that_keeps_calling_itself_hits_the_frame_depth_limit() {
    let mut b = ProgramBuilder::new();
    b.op2(Opcode::Call, 0, 0); // calls its own start forever, never returns
    let program = b.build();

    let mut registry = rvm::ProcessorRegistry::new();
    let mut processor = rvm::Processor::new(program, &mut registry).with_max_frame_depth(3);
    let err = processor.run(Vec::new()).expect_err("unbounded self-calls must hit the frame depth limit");
    assert_eq!(err, RvmError::RecursionLimitExceeded { max_frame_depth: 3 });
}

#[test]
fn resolve_type_of_does_not_cache_across_distinct_argument_lists() {
    // A generic identity handle: `typeParameter` alone, so its result is
    // exactly whatever argument it's called with.
    let mut b = ProgramBuilder::new();
    b.op(Opcode::TypeParameter);
    let program = b.build();
    let handle = TypeHandle::new(Some("Identity".to_owned()), program);

    let as_string = resolve_type_of(&handle, vec![Node::String]).expect("resolves with a string arg");
    assert_eq!(as_string, Node::String);
    assert!(handle.cached().is_none(), "argument-carrying calls must not populate the cache");

    let as_number = resolve_type_of(&handle, vec![Node::Number]).expect("resolves with a number arg");
    assert_eq!(as_number, Node::Number);
    assert!(handle.cached().is_none());
}

#[test]
fn bare_property_carries_public_visibility_by_default() {
    let mut b = ProgramBuilder::new();
    let name = b.pool_string("p");
    b.op(Opcode::String).op1(Opcode::Property, name);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("property opcode never errors");
    let Node::Property(property) = result else { panic!("expected a property") };
    assert_eq!(property.visibility, Some(Visibility::Public));
}

#[test]
fn property_signature_has_no_default_visibility() {
    let mut b = ProgramBuilder::new();
    let name = b.pool_string("p");
    b.op(Opcode::String).op1(Opcode::PropertySignature, name);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("propertySignature opcode never errors");
    let Node::PropertySignature(property) = result else { panic!("expected a property signature") };
    assert_eq!(property.visibility, None);
}

#[test]
fn property_typed_t_or_undefined_reduces_to_optional() {
    let mut b = ProgramBuilder::new();
    let name = b.pool_string("p");
    b.op(Opcode::String).op(Opcode::Undefined).op1(Opcode::Union, 2).op1(Opcode::Property, name);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("property opcode never errors");
    let Node::Property(property) = result else { panic!("expected a property") };
    assert!(property.optional);
    assert_eq!(*property.ty, Node::String);
}

#[test]
fn class_projects_constructor_parameters_with_visibility_into_properties() {
    let mut b = ProgramBuilder::new();
    let ctor_name = b.pool_string("constructor");
    let param_name = b.pool_string("id");
    b.op(Opcode::String).op1(Opcode::Parameter, param_name).op(Opcode::Public);
    b.op(Opcode::Void).op2(Opcode::Method, ctor_name, 1);
    b.op1(Opcode::Class, 1);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("class opcode never errors");
    let Node::Class(class) = result else { panic!("expected a class") };
    assert_eq!(class.types.len(), 2);
    let rvm::ir::Member::Property(projected) = &class.types[1] else { panic!("expected a projected property") };
    assert_eq!(projected.name, "id");
    assert_eq!(*projected.ty, Node::String);
    assert_eq!(projected.visibility, Some(Visibility::Public));
}

#[test]
fn class_attaches_generic_arguments_from_the_top_level_inputs() {
    let mut b = ProgramBuilder::new();
    let data = b.pool_string("data");
    b.op(Opcode::TypeParameter).op1(Opcode::Property, data).op1(Opcode::Class, 1);
    let program = b.build();

    let result = resolve_type(&program, vec![Node::String]).expect("class opcode never errors");
    let Node::Class(class) = result else { panic!("expected a class") };
    assert_eq!(class.arguments, Some(vec![Node::String]));
}

#[test]
fn class_has_no_arguments_when_no_inputs_are_supplied() {
    let mut b = ProgramBuilder::new();
    let name = b.pool_string("p");
    b.op(Opcode::String).op1(Opcode::Property, name).op1(Opcode::Class, 1);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("class opcode never errors");
    let Node::Class(class) = result else { panic!("expected a class") };
    assert_eq!(class.arguments, None);
}

#[test]
fn bigint_literal_round_trips_through_the_pool() {
    let mut b = ProgramBuilder::new();
    let idx = b.pool_entry(PoolEntry::BigInt("123456789012345678901234567890".parse().unwrap()));
    b.op1(Opcode::Literal, idx);
    let program = b.build();

    let result = resolve_type(&program, Vec::new()).expect("bigint literal never errors");
    let Node::Literal(literal) = result else { panic!("expected a literal") };
    let LiteralValue::BigInt(value) = literal.literal else { panic!("expected a bigint literal") };
    assert_eq!(value.to_string(), "123456789012345678901234567890");
}
