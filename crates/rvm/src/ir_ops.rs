//! Pure Type IR utilities the Processor depends on (`spec.md` §4.2).
//!
//! None of these touch machine state (stack, frames, registry) - they are
//! plain functions over [`Node`] trees, the same way the teacher keeps
//! `extends`/`indexAccess`/`merge`-shaped logic out of the VM dispatch loop
//! and in small free functions it calls into.

use std::collections::BTreeMap;

use num_bigint::BigInt;

use crate::ir::{ArrayNode, ClassNode, InferSlot, LiteralValue, Member, Node, ObjectLiteralNode, PropertyNode, TupleNode, UnionNode};

/// Recursively inlines nested unions and drops `never` members.
///
/// `spec.md` §4.2 / Invariant: "Union/intersection never appears nested
/// within itself after evaluation."
#[must_use]
pub fn flatten_union_types(types: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(types.len());
    flatten_into(types, &mut out);
    out
}

fn flatten_into(types: Vec<Node>, out: &mut Vec<Node>) {
    for ty in types {
        match ty {
            Node::Never => {}
            Node::Union(UnionNode { types: inner }) => flatten_into(inner, out),
            other => out.push(other),
        }
    }
}

/// Unboxes a single-member union to its sole member.
///
/// Invariant: "A union of one element is unboxed to that element" - a
/// `{kind: union, types: [T]}` node is never observed as a final result.
#[must_use]
pub fn unbox_union(union: UnionNode) -> Node {
    let mut types = union.types;
    if types.len() == 1 {
        types.pop().expect("checked len == 1")
    } else {
        Node::Union(UnionNode { types })
    }
}

/// Builds a union from parts, flattening and unboxing in one step - the
/// shape every opcode that "accumulates a frame into a union" wants
/// (`union`, `distribute`, `mappedType`'s key iteration, `templateLiteral`).
#[must_use]
pub fn build_union(parts: Vec<Node>) -> Node {
    unbox_union(UnionNode {
        types: flatten_union_types(parts),
    })
}

/// Collapses a property's popped type from `T | undefined` to `T`,
/// reporting whether the collapse happened (`spec.md` §4.3: "`property`/
/// `propertySignature` pops the type and, if the type is a two-member
/// union containing `undefined`, reduces it to the non-undefined member and
/// marks the property optional").
#[must_use]
pub fn reduce_optional_union(ty: Node) -> (Node, bool) {
    match ty {
        Node::Union(UnionNode { mut types }) if types.len() == 2 => {
            let Some(undefined_at) = types.iter().position(Node::is_undefined) else {
                return (Node::Union(UnionNode { types }), false);
            };
            types.remove(undefined_at);
            (types.pop().expect("one member remains after removing the other"), true)
        }
        other => (other, false),
    }
}

/// Projects a class's `constructor` parameters that carry a visibility
/// modifier into synthetic property members (`spec.md` §4.3: "Scans member
/// list for a method named `constructor`. Projects each constructor
/// parameter that carries a visibility modifier into a synthetic property
/// member, preserving optional/readonly").
#[must_use]
pub fn project_constructor_properties(members: &[Member]) -> Vec<Member> {
    let Some(Member::Method(constructor)) = members.iter().find(|m| m.name() == Some("constructor")) else {
        return Vec::new();
    };
    constructor
        .parameters
        .iter()
        .filter(|param| param.visibility.is_some())
        .map(|param| {
            Member::Property(PropertyNode {
                name: param.name.clone(),
                ty: param.ty.clone(),
                optional: param.optional,
                readonly: param.readonly,
                visibility: param.visibility,
                description: None,
                default: None,
                is_abstract: false,
            })
        })
        .collect()
}

/// Returns `t` unchanged.
///
/// Design choice recorded in `spec.md` §4.2: "preserve the caller's
/// explicit literal when the program recorded one" - i.e. this crate does
/// *not* widen `literal "a"` to `string` the way some type systems widen
/// inferred literals at assignment boundaries, because the Packed Program
/// always encodes exactly the literal kind the transformer chose.
#[must_use]
pub fn narrow_original_literal(t: Node) -> Node {
    t
}

/// Structural assignability: does `left` extend `right`?
///
/// `spec.md` §4.2: "primitive subtyping, literal <-> primitive, tuple/
/// array/object-literal structural check, union distribution is performed
/// by the caller via the `distribute` opcode, not here" - so `left` here is
/// always a single candidate, never a union to distribute over.
#[must_use]
pub fn is_extendable(left: &Node, right: &Node) -> bool {
    match (left, right) {
        (_, Node::Any | Node::Unknown) => true,
        (Node::Never, _) => true,
        (_, Node::Never) => matches!(left, Node::Never),

        (Node::Literal(l), Node::Literal(r)) => l.literal == r.literal,
        (Node::Literal(l), _) => is_extendable(&literal_widened(&l.literal), right),

        (Node::Union(u), _) => u.types.iter().all(|member| is_extendable(member, right)),
        (_, Node::Union(u)) => u.types.iter().any(|member| is_extendable(left, member)),

        (Node::Array(a), Node::Array(b)) => is_extendable(&a.element, &b.element),
        (Node::Tuple(a), Node::Tuple(b)) => tuple_extends_tuple(a, b),
        (Node::Tuple(a), Node::Array(b)) => a.members.iter().all(|m| is_extendable(&m.ty, &b.element)),

        (Node::ObjectLiteral(a), Node::ObjectLiteral(b)) => object_extends_object(&a.members, &b.members),
        (Node::Class(a), Node::ObjectLiteral(b)) => object_extends_object(&a.types, &b.members),
        (Node::ObjectLiteral(a), Node::Class(b)) => object_extends_object(&a.members, &b.types),
        (Node::Class(a), Node::Class(b)) => object_extends_object(&a.types, &b.types),

        (Node::Promise(a), Node::Promise(b)) => is_extendable(&a.inner, &b.inner),

        _ => std::mem::discriminant(left) == std::mem::discriminant(right),
    }
}

/// Structural match that also performs `infer T` capture.
///
/// Walks the same shape [`is_extendable`] does, but wherever the pattern
/// (`right`) side is an `Infer` placeholder, records a binding instead of
/// comparing - inference parameters always match. `extends`'s boolean
/// result otherwise means exactly what [`is_extendable`] means.
#[must_use]
pub fn extends_and_infer(left: &Node, right: &Node, bindings: &mut Vec<(InferSlot, Node)>) -> bool {
    match right {
        Node::Infer(infer) => {
            bindings.push((infer.slot, left.clone()));
            true
        }
        Node::Array(b) => match left {
            Node::Array(a) => extends_and_infer(&a.element, &b.element, bindings),
            _ => false,
        },
        Node::Tuple(b) => match left {
            Node::Tuple(a) if a.members.len() == b.members.len() => a
                .members
                .iter()
                .zip(&b.members)
                .all(|(l, r)| extends_and_infer(&l.ty, &r.ty, bindings)),
            _ => false,
        },
        Node::Promise(b) => match left {
            Node::Promise(a) => extends_and_infer(&a.inner, &b.inner, bindings),
            _ => false,
        },
        Node::Union(b) => b.types.iter().any(|member| extends_and_infer(left, member, bindings)),
        _ => is_extendable(left, right),
    }
}

/// `keyof T`: the union of a type's property-key literal types.
///
/// Resolves an Open Question left by the source material: index
/// signatures contribute their index type (not a literal), and tuples
/// contribute one number-literal per element position, matching the
/// common TypeScript behavior this crate's semantics are modeled on.
#[must_use]
pub fn keyof(base: &Node) -> Node {
    match base {
        Node::ObjectLiteral(o) => keyof_members(&o.members),
        Node::Class(c) => keyof_members(&c.types),
        #[allow(clippy::cast_precision_loss)]
        Node::Tuple(t) => build_union((0..t.members.len()).map(|i| Node::literal_number(i as f64)).collect()),
        Node::Array(_) => Node::Number,
        Node::Union(u) => build_union(u.types.iter().map(keyof).collect()),
        _ => Node::Never,
    }
}

fn keyof_members(members: &[Member]) -> Node {
    let mut keys = Vec::new();
    for member in members {
        match member {
            Member::IndexSignature(sig) => keys.push((*sig.index).clone()),
            other => {
                if let Some(name) = other.name() {
                    keys.push(Node::literal_string(name));
                }
            }
        }
    }
    build_union(keys)
}

fn literal_widened(value: &LiteralValue) -> Node {
    match value {
        LiteralValue::String(_) => Node::String,
        LiteralValue::Number(_) => Node::Number,
        LiteralValue::Boolean(_) => Node::Boolean,
        LiteralValue::BigInt(_) => Node::Bigint,
        LiteralValue::Regex(_) => Node::Regexp,
    }
}

fn tuple_extends_tuple(left: &TupleNode, right: &TupleNode) -> bool {
    if left.members.len() != right.members.len() {
        return false;
    }
    left.members
        .iter()
        .zip(&right.members)
        .all(|(l, r)| is_extendable(&l.ty, &r.ty) && (r.optional || !l.optional))
}

fn object_extends_object(left: &[Member], right: &[Member]) -> bool {
    right.iter().all(|needed| match needed {
        Member::IndexSignature(_) => true,
        Member::Property(p) | Member::PropertySignature(p) => left.iter().any(|candidate| match candidate {
            Member::Property(q) | Member::PropertySignature(q) => q.name == p.name && is_extendable(&q.ty, &p.ty),
            _ => false,
        }),
        Member::Method(m) | Member::MethodSignature(m) => left.iter().any(|candidate| match candidate {
            Member::Method(n) | Member::MethodSignature(n) => {
                n.name == m.name && n.parameters.len() == m.parameters.len() && is_extendable(&n.return_type, &m.return_type)
            }
            _ => false,
        }),
    })
}

/// `T[K]` for object/class/tuple/array/union indexers.
///
/// Per spec.md §7 ("RVMUnresolvedIndex... downgrade to `never` rather than
/// erroring"), an unresolvable access yields `never` instead of an error.
#[must_use]
pub fn index_access(base: &Node, index: &Node) -> Node {
    match (base, index) {
        (Node::Union(u), _) => build_union(u.types.iter().map(|member| index_access(member, index)).collect()),
        (_, Node::Union(u)) => build_union(u.types.iter().map(|key| index_access(base, key)).collect()),

        (Node::Array(a), Node::Number) => (*a.element).clone(),
        (Node::Array(a), Node::Literal(l)) if matches!(l.literal, LiteralValue::Number(_)) => (*a.element).clone(),
        (Node::Tuple(t), Node::Literal(l)) => index_into_tuple(t, &l.literal).unwrap_or(Node::Never),
        (Node::Tuple(t), Node::Number) => build_union(t.members.iter().map(|m| (*m.ty).clone()).collect()),

        (Node::ObjectLiteral(o), Node::Literal(l)) => lookup_member_type(&o.members, &l.literal).unwrap_or(Node::Never),
        (Node::Class(c), Node::Literal(l)) => lookup_member_type(&c.types, &l.literal).unwrap_or(Node::Never),
        (Node::ObjectLiteral(o), _) => index_signature_type(&o.members).unwrap_or(Node::Never),
        (Node::Class(c), _) => index_signature_type(&c.types).unwrap_or(Node::Never),

        _ => Node::Never,
    }
}

fn index_into_tuple(tuple: &TupleNode, key: &LiteralValue) -> Option<Node> {
    let LiteralValue::Number(n) = key else { return None };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let idx = if *n >= 0.0 { *n as usize } else { return None };
    tuple.members.get(idx).map(|m| (*m.ty).clone())
}

fn lookup_member_type(members: &[Member], key: &LiteralValue) -> Option<Node> {
    let LiteralValue::String(name) = key else { return None };
    members.iter().find_map(|m| match m {
        Member::Property(p) | Member::PropertySignature(p) if p.name == *name => Some((*p.ty).clone()),
        Member::Method(fun) | Member::MethodSignature(fun) if fun.name == *name => Some(Node::Function(crate::ir::FunctionNode {
            name: Some(fun.name.clone()),
            parameters: fun.parameters.clone(),
            return_type: fun.return_type.clone(),
        })),
        _ => None,
    })
}

fn index_signature_type(members: &[Member]) -> Option<Node> {
    members.iter().find_map(|m| match m {
        Member::IndexSignature(sig) => Some((*sig.ty).clone()),
        _ => None,
    })
}

/// Structural merge of object-literal/class candidates, for `intersection`.
#[must_use]
pub fn merge(candidates: Vec<Node>) -> Node {
    let mut members: Vec<Member> = Vec::new();
    for candidate in candidates {
        let incoming = match candidate {
            Node::ObjectLiteral(ObjectLiteralNode { members, .. }) => members,
            Node::Class(ClassNode { types, .. }) => types,
            _ => continue,
        };
        for member in incoming {
            let name = member.name().map(str::to_owned);
            if let Some(name) = &name {
                members.retain(|existing| existing.name() != Some(name.as_str()));
            }
            members.push(member);
        }
    }
    Node::ObjectLiteral(ObjectLiteralNode::new(members))
}

/// Accumulates parallel lists of union/singleton type lists and produces
/// every combination - the engine behind `templateLiteral`'s distribution
/// over union placeholders.
#[derive(Debug, Default)]
pub struct CartesianProduct {
    combinations: Vec<Vec<Node>>,
}

impl CartesianProduct {
    #[must_use]
    pub fn new() -> Self {
        Self { combinations: vec![Vec::new()] }
    }

    /// Appends one more axis. A union axis multiplies every existing
    /// combination by each of its members; a singleton axis just appends.
    pub fn push(&mut self, axis: &Node) {
        let options: Vec<Node> = match axis {
            Node::Union(u) => u.types.clone(),
            other => vec![other.clone()],
        };
        let mut next = Vec::with_capacity(self.combinations.len() * options.len());
        for combo in &self.combinations {
            for option in &options {
                let mut extended = combo.clone();
                extended.push(option.clone());
                next.push(extended);
            }
        }
        self.combinations = next;
    }

    #[must_use]
    pub fn into_combinations(self) -> Vec<Vec<Node>> {
        self.combinations
    }
}

/// A host runtime value, opaque to the Processor except for `typeof`.
///
/// Stands in for whatever value representation the host language has;
/// this crate only needs enough shape to describe it as a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    String(String),
    Number(f64),
    Boolean(bool),
    BigInt(BigInt),
    Null,
    Undefined,
    Array(Vec<RuntimeValue>),
    Object(BTreeMap<String, RuntimeValue>),
}

/// Infers the best-fit [`Node`] describing a runtime value, for `typeof`.
#[must_use]
pub fn type_infer(value: &RuntimeValue) -> Node {
    match value {
        RuntimeValue::String(s) => Node::literal_string(s.clone()),
        RuntimeValue::Number(n) => Node::literal_number(*n),
        RuntimeValue::Boolean(b) => Node::literal_bool(*b),
        RuntimeValue::BigInt(b) => Node::Literal(crate::ir::LiteralNode {
            literal: LiteralValue::BigInt(b.clone()),
        }),
        RuntimeValue::Null => Node::Null,
        RuntimeValue::Undefined => Node::Undefined,
        RuntimeValue::Array(items) => {
            let element = build_union(items.iter().map(type_infer).collect());
            Node::Array(ArrayNode { element: Box::new(element) })
        }
        RuntimeValue::Object(entries) => {
            let members = entries
                .iter()
                .map(|(name, value)| {
                    Member::PropertySignature(crate::ir::PropertyNode {
                        name: name.clone(),
                        ty: Box::new(type_infer(value)),
                        optional: false,
                        readonly: false,
                        visibility: None,
                        description: None,
                        default: None,
                        is_abstract: false,
                    })
                })
                .collect();
            Node::ObjectLiteral(ObjectLiteralNode::new(members))
        }
    }
}

/// Classifies intersection candidates for the `intersection` opcode.
///
/// Returns `(primitives, merge_candidates, decorators)`.
#[must_use]
pub fn classify_intersection_members(
    members: Vec<Node>,
    is_decorator: impl Fn(&Node) -> bool,
) -> (Vec<Node>, Vec<Node>, Vec<Node>) {
    let mut primitives = Vec::new();
    let mut merge_candidates = Vec::new();
    let mut decorators = Vec::new();
    for member in members {
        if is_decorator(&member) {
            decorators.push(member);
        } else if matches!(member, Node::ObjectLiteral(_) | Node::Class(_)) {
            merge_candidates.push(member);
        } else {
            primitives.push(member);
        }
    }
    (primitives, merge_candidates, decorators)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_nested_unions_and_drops_never() {
        let nested = Node::Union(UnionNode {
            types: vec![Node::String, Node::Union(UnionNode { types: vec![Node::Number, Node::Never] })],
        });
        let Node::Union(flat) = nested else { panic!("expected union") };
        let result = flatten_union_types(flat.types);
        assert_eq!(result, vec![Node::String, Node::Number]);
    }

    #[test]
    fn unboxes_single_member_union() {
        let node = build_union(vec![Node::String]);
        assert_eq!(node, Node::String);
    }

    #[test]
    fn keeps_multi_member_union_boxed() {
        let node = build_union(vec![Node::String, Node::Number]);
        assert_eq!(node, Node::Union(UnionNode { types: vec![Node::String, Node::Number] }));
    }

    #[test]
    fn literal_extends_its_own_widened_primitive() {
        assert!(is_extendable(&Node::literal_string("a"), &Node::String));
        assert!(!is_extendable(&Node::literal_string("a"), &Node::Number));
    }

    #[test]
    fn index_access_on_missing_property_is_never() {
        let obj = Node::ObjectLiteral(ObjectLiteralNode::new(vec![]));
        assert_eq!(index_access(&obj, &Node::literal_string("missing")), Node::Never);
    }

    #[test]
    fn infer_placeholder_always_matches_and_records_a_binding() {
        let slot = InferSlot { frame_depth: 0, slot_index: 2 };
        let mut bindings = Vec::new();
        let matched = extends_and_infer(&Node::String, &Node::Infer(crate::ir::InferNode { name: "T".into(), slot }), &mut bindings);
        assert!(matched);
        assert_eq!(bindings, vec![(slot, Node::String)]);
    }

    #[test]
    fn keyof_object_literal_includes_index_signature_type() {
        let obj = Node::ObjectLiteral(ObjectLiteralNode::new(vec![
            Member::PropertySignature(crate::ir::PropertyNode {
                name: "a".into(),
                ty: Box::new(Node::String),
                optional: false,
                readonly: false,
                visibility: None,
                description: None,
                default: None,
                is_abstract: false,
            }),
            Member::IndexSignature(crate::ir::IndexSignatureNode {
                index: Box::new(Node::Number),
                ty: Box::new(Node::String),
            }),
        ]));
        let keys = keyof(&obj);
        assert_eq!(keys, build_union(vec![Node::literal_string("a"), Node::Number]));
    }

    #[test]
    fn cartesian_product_multiplies_union_axes() {
        let mut product = CartesianProduct::new();
        product.push(&Node::literal_string("a"));
        product.push(&build_union(vec![Node::literal_string("1"), Node::literal_string("2")]));
        let combos = product.into_combinations();
        assert_eq!(combos.len(), 2);
    }
}
