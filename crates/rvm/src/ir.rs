//! Type IR: the tree the Processor produces.
//!
//! Mirrors the teacher's `Object` enum (`object.rs`) in spirit - a single
//! discriminated tree of owned, cloneable nodes, with `serde` derives so a
//! resolved type can be handed to a host process as JSON the same way
//! `Object` documents its own JSON mapping. Unlike `Object`, every variant
//! here is a *type*, not a *value*; the invariants are the ones in
//! `spec.md` §3, enforced by the constructors in this module and by
//! `ir_ops`, not by the caller.

use std::rc::Rc;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::program::TypeHandle;

/// A node in the Type IR tree.
///
/// `kind` is carried implicitly by the enum discriminant; `#[serde(tag =
/// "kind")]` renders it explicitly on the wire, matching the table in
/// `spec.md` §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Node {
    Never,
    Any,
    Unknown,
    Void,
    Object,
    Undefined,
    Null,
    String,
    Number,
    Bigint,
    Boolean,
    Symbol,
    /// Bare `RegExp` class type (no pattern attached).
    Regexp,

    Literal(LiteralNode),
    Union(UnionNode),
    Intersection(IntersectionNode),
    Array(ArrayNode),
    Tuple(TupleNode),
    ObjectLiteral(ObjectLiteralNode),
    Class(ClassNode),
    Property(PropertyNode),
    PropertySignature(PropertyNode),
    Method(MethodNode),
    MethodSignature(MethodNode),
    Parameter(ParameterNode),
    IndexSignature(IndexSignatureNode),
    Enum(EnumNode),
    EnumMember(EnumMemberNode),
    Promise(PromiseNode),
    TemplateLiteral(TemplateLiteralNode),
    TypeParameter(TypeParameterNode),
    Infer(InferNode),
    Function(FunctionNode),
    NumberBrand(NumberBrandNode),
    /// Not yet finalized tuple element; only ever appears transiently on
    /// the operand stack before the `tuple` opcode wraps it or splices it.
    Rest(RestNode),

    /// Special-class nodes produced by the single-opcode "special classes"
    /// family (`date`, `uint8Array`, ..., `arrayBuffer`, `set`, `map`).
    /// These are canonical, argument-free except `Set`/`Map`/`Promise`
    /// (`Promise` has its own variant above since it always wraps exactly
    /// one inner type).
    SpecialClass(SpecialClassNode),

    /// A self-reference to the currently-running program's result anchor
    /// (`spec.md` §4.3 `inline`/`inlineCall` numeric-sentinel form). Holds
    /// the same [`Anchor`] cell the Processor mutates in place at program
    /// completion, so this node and the finished result are one object.
    SelfReference(#[serde(with = "self_reference_marker")] ResultAnchorRef),
}

/// A scalar or structured literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralNode {
    pub literal: LiteralValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    String(String),
    Number(f64),
    Boolean(bool),
    BigInt(#[serde(with = "bigint_as_string")] BigInt),
    Regex(RegexLiteral),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexLiteral {
    pub pattern: String,
    pub flags: String,
}

mod bigint_as_string {
    use num_bigint::BigInt;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionNode {
    pub types: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionNode {
    pub types: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayNode {
    #[serde(rename = "type")]
    pub element: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleNode {
    pub members: Vec<TupleMemberNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleMemberNode {
    #[serde(rename = "type")]
    pub ty: Box<Node>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_rest: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestNode {
    #[serde(rename = "type")]
    pub inner: Box<Node>,
}

/// A member of an object-literal or class member list.
///
/// Object literals use the `*Signature` shapes; classes use the bare
/// `property`/`method` shapes (spec.md §3 "Key fields" table lists both
/// pairs with identical fields - the split is which opcode produced them,
/// not a structural difference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Member {
    Property(PropertyNode),
    PropertySignature(PropertyNode),
    Method(MethodNode),
    MethodSignature(MethodNode),
    IndexSignature(IndexSignatureNode),
}

impl Member {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Property(p) | Self::PropertySignature(p) => Some(&p.name),
            Self::Method(m) | Self::MethodSignature(m) => Some(&m.name),
            Self::IndexSignature(_) => None,
        }
    }

    #[must_use]
    pub fn is_index_signature(&self) -> bool {
        matches!(self, Self::IndexSignature(_))
    }

    /// Wraps `self` back into a full [`Node`], preserving which concrete
    /// kind (signature vs. bare) produced it.
    #[must_use]
    pub fn into_node(self) -> Node {
        match self {
            Self::Property(p) => Node::Property(p),
            Self::PropertySignature(p) => Node::PropertySignature(p),
            Self::Method(m) => Node::Method(m),
            Self::MethodSignature(m) => Node::MethodSignature(m),
            Self::IndexSignature(i) => Node::IndexSignature(i),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Default for Visibility {
    fn default() -> Self {
        Self::Public
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectLiteralNode {
    pub members: Vec<Member>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<Node>,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub annotations: std::collections::BTreeMap<String, Node>,
}

impl ObjectLiteralNode {
    #[must_use]
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members,
            decorators: Vec::new(),
            annotations: std::collections::BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassNode {
    /// The class this node describes, for identity, caching, and diagnostics.
    #[serde(skip)]
    pub class_handle: Option<TypeHandle>,
    pub types: Vec<Member>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyNode {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Box<Node>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub readonly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodNode {
    pub name: String,
    #[serde(rename = "return")]
    pub return_type: Box<Node>,
    pub parameters: Vec<ParameterNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterNode {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Box<Node>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub readonly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSignatureNode {
    pub index: Box<Node>,
    #[serde(rename = "type")]
    pub ty: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumNode {
    pub members: Vec<EnumMemberNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMemberNode {
    pub name: String,
    pub default: LiteralValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromiseNode {
    #[serde(rename = "type")]
    pub inner: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLiteralNode {
    pub types: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParameterNode {
    pub name: String,
}

/// Where an `infer T` placeholder binds its result.
///
/// The source language stores a closure that captures the frame and
/// writes into it; `spec.md` §9 "Design Notes" calls for the
/// language-neutral redesign instead: a `(frame_depth, slot_index)` pair
/// naming an ancestor frame slot, with the interpreter performing the
/// write rather than an embedded closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferSlot {
    pub frame_depth: usize,
    pub slot_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferNode {
    pub name: String,
    pub slot: InferSlot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub parameters: Vec<ParameterNode>,
    #[serde(rename = "return")]
    pub return_type: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberBrandNode {
    pub brand: String,
}

/// Special, argument-free (or fixed-shape) built-in classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum SpecialClassNode {
    Date,
    Uint8Array,
    Int8Array,
    Uint8ClampedArray,
    Uint16Array,
    Int16Array,
    Uint32Array,
    Int32Array,
    Float32Array,
    Float64Array,
    BigInt64Array,
    ArrayBuffer,
    Set { argument: Box<Node> },
    Map { key: Box<Node>, value: Box<Node> },
}

impl Node {
    #[must_use]
    pub fn literal_string(value: impl Into<String>) -> Self {
        Node::Literal(LiteralNode {
            literal: LiteralValue::String(value.into()),
        })
    }

    #[must_use]
    pub fn literal_number(value: f64) -> Self {
        Node::Literal(LiteralNode {
            literal: LiteralValue::Number(value),
        })
    }

    #[must_use]
    pub fn literal_bool(value: bool) -> Self {
        Node::Literal(LiteralNode {
            literal: LiteralValue::Boolean(value),
        })
    }

    /// `true` if this node is exactly `{kind: never}`.
    #[must_use]
    pub fn is_never(&self) -> bool {
        matches!(self, Node::Never)
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Node::Undefined)
    }
}

/// Shared mutable cell backing a Result Anchor (`spec.md` §3, §4.3, §9).
///
/// The Processor pre-allocates an anchor of kind `any`, publishes it in
/// the [`crate::registry::ProcessorRegistry`] before running, and the
/// outermost `class`/`objectLiteral` opcode of the program mutates it in
/// place instead of allocating a fresh node. `Rc<RefCell<Node>>` is this
/// crate's two-phase-construction answer to the Design Notes' "in a
/// strictly immutable language, use a two-phase construction with a
/// shared mutable cell."
pub type Anchor = Rc<std::cell::RefCell<Node>>;

#[must_use]
pub fn new_anchor() -> Anchor {
    Rc::new(std::cell::RefCell::new(Node::Any))
}

/// Wraps an [`Anchor`] for embedding inside [`Node::SelfReference`].
///
/// A resolved self-referential shape can contain this node pointing back at
/// an anchor whose own borrowed content contains the very same
/// `SelfReference` - a genuine cycle in the value graph, not a bug. `Debug`
/// and `PartialEq` are hand-written rather than derived so they never
/// recurse into that borrowed content: `Debug` prints an opaque
/// placeholder, and `PartialEq` compares pointer identity, matching the
/// `===` identity check `spec.md` §8's cycle-safety property demands.
/// `Clone` is still derived safely - it only bumps the `Rc` refcount.
#[derive(Clone)]
pub struct ResultAnchorRef(pub Anchor);

impl std::fmt::Debug for ResultAnchorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ResultAnchorRef(..)")
    }
}

impl PartialEq for ResultAnchorRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// JSON has no way to represent a true cycle, so a `SelfReference` node
/// serializes to an empty marker object and deserializes to a fresh,
/// unshared anchor - round-tripping through JSON never happens on the
/// paths this crate exercises (the CLI only serializes resolved types).
mod self_reference_marker {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{new_anchor, ResultAnchorRef};

    #[derive(Serialize, Deserialize)]
    struct Marker {}

    pub fn serialize<S: Serializer>(_value: &ResultAnchorRef, serializer: S) -> Result<S::Ok, S::Error> {
        Marker {}.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ResultAnchorRef, D::Error> {
        Marker::deserialize(deserializer)?;
        Ok(ResultAnchorRef(new_anchor()))
    }
}
