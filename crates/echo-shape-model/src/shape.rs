// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shape nodes and member edges.
use std::collections::BTreeMap;

use serde_json::Value;

use crate::ident::{ShapeId, TraitId};

/// Trait set attached to a shape or member: trait id to opaque payload.
///
/// BTreeMap so trait iteration (and therefore emitted trait tables) is
/// deterministic.
pub type TraitMap = BTreeMap<TraitId, Value>;

/// The kind of a shape node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeKind {
    /// Boolean scalar.
    Boolean,
    /// UTF-8 string scalar.
    String,
    /// 8-bit integer scalar.
    Byte,
    /// 16-bit integer scalar.
    Short,
    /// 32-bit integer scalar.
    Integer,
    /// 64-bit integer scalar.
    Long,
    /// 32-bit float scalar.
    Float,
    /// 64-bit float scalar.
    Double,
    /// Arbitrary-precision integer scalar.
    BigInteger,
    /// Arbitrary-precision decimal scalar.
    BigDecimal,
    /// String enumeration.
    Enum,
    /// Integer enumeration.
    IntEnum,
    /// Untyped document value.
    Document,
    /// Binary payload.
    Blob,
    /// Instant in time.
    Timestamp,
    /// Ordered collection with one element member.
    List,
    /// Unique collection with one element member.
    Set,
    /// String-keyed map with key and value members.
    Map,
    /// Record with named members.
    Structure,
    /// Tagged variant with named members.
    Union,
    /// Service operation with input/output/error bindings.
    Operation,
}

impl ShapeKind {
    /// The IR spelling of this kind (`shape-ir/v1` `type` field).
    #[must_use]
    pub fn ir_name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::BigInteger => "big_integer",
            Self::BigDecimal => "big_decimal",
            Self::Enum => "enum",
            Self::IntEnum => "int_enum",
            Self::Document => "document",
            Self::Blob => "blob",
            Self::Timestamp => "timestamp",
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "map",
            Self::Structure => "structure",
            Self::Union => "union",
            Self::Operation => "operation",
        }
    }

    /// Parses the IR spelling; `None` for unknown kinds.
    #[must_use]
    pub fn from_ir_name(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => Self::Boolean,
            "string" => Self::String,
            "byte" => Self::Byte,
            "short" => Self::Short,
            "integer" => Self::Integer,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "big_integer" => Self::BigInteger,
            "big_decimal" => Self::BigDecimal,
            "enum" => Self::Enum,
            "int_enum" => Self::IntEnum,
            "document" => Self::Document,
            "blob" => Self::Blob,
            "timestamp" => Self::Timestamp,
            "list" => Self::List,
            "set" => Self::Set,
            "map" => Self::Map,
            "structure" => Self::Structure,
            "union" => Self::Union,
            "operation" => Self::Operation,
            _ => return None,
        })
    }
}

/// A named, typed edge from a parent shape to a target shape.
///
/// Members carry their own trait set, distinct from the target shape's
/// traits (a trait can apply to one occurrence of a type without applying
/// to the type itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    id: ShapeId,
    name: String,
    target: ShapeId,
    traits: TraitMap,
}

impl Member {
    /// Creates a member edge. `owner` is the parent shape's id; the member's
    /// own id becomes `owner$name`.
    #[must_use]
    pub fn new(owner: &ShapeId, name: impl Into<String>, target: ShapeId) -> Self {
        let name = name.into();
        Self {
            id: owner.member_of(name.clone()),
            name,
            target,
            traits: TraitMap::new(),
        }
    }

    /// Attaches a trait to this member.
    #[must_use]
    pub fn with_trait(mut self, id: TraitId, payload: Value) -> Self {
        self.traits.insert(id, payload);
        self
    }

    /// The member's own id (`owner$name`), used as a cache key.
    #[must_use]
    pub fn id(&self) -> &ShapeId {
        &self.id
    }

    /// Member name within the parent shape.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the target shape this member resolves to.
    #[must_use]
    pub fn target(&self) -> &ShapeId {
        &self.target
    }

    /// Traits attached to this member occurrence.
    #[must_use]
    pub fn traits(&self) -> &TraitMap {
        &self.traits
    }

    /// True when the member carries the given trait.
    #[must_use]
    pub fn has_trait(&self, id: &TraitId) -> bool {
        self.traits.contains_key(id)
    }
}

/// Input/output/error bindings carried by operation shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationBinding {
    /// Input structure id.
    pub input: ShapeId,
    /// Output structure id.
    pub output: ShapeId,
    /// Declared error structure ids.
    pub errors: Vec<ShapeId>,
}

/// A node in the shape graph.
///
/// Member layout by kind: structures and unions hold named members in
/// declaration order; lists and sets hold a single synthetic `member`;
/// maps hold `key` then `value`; every other kind has no members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    id: ShapeId,
    kind: ShapeKind,
    traits: TraitMap,
    members: Vec<Member>,
    is_error: bool,
    operation: Option<OperationBinding>,
}

impl Shape {
    /// Creates a shape with no members (scalars, enums, document, blob,
    /// timestamp).
    #[must_use]
    pub fn simple(id: ShapeId, kind: ShapeKind) -> Self {
        Self {
            id,
            kind,
            traits: TraitMap::new(),
            members: Vec::new(),
            is_error: false,
            operation: None,
        }
    }

    /// Creates a list shape with the given element target.
    #[must_use]
    pub fn list(id: ShapeId, element: ShapeId) -> Self {
        let member = Member::new(&id, "member", element);
        Self::list_with_member(id, member)
    }

    /// Creates a list shape from a prebuilt element member (carrying traits).
    #[must_use]
    pub fn list_with_member(id: ShapeId, element: Member) -> Self {
        Self {
            members: vec![element],
            ..Self::simple(id, ShapeKind::List)
        }
    }

    /// Creates a set shape with the given element target.
    #[must_use]
    pub fn set(id: ShapeId, element: ShapeId) -> Self {
        let member = Member::new(&id, "member", element);
        Self::set_with_member(id, member)
    }

    /// Creates a set shape from a prebuilt element member (carrying traits).
    #[must_use]
    pub fn set_with_member(id: ShapeId, element: Member) -> Self {
        Self {
            members: vec![element],
            ..Self::simple(id, ShapeKind::Set)
        }
    }

    /// Creates a map shape with the given key and value targets.
    #[must_use]
    pub fn map(id: ShapeId, key: ShapeId, value: ShapeId) -> Self {
        let key = Member::new(&id, "key", key);
        let value = Member::new(&id, "value", value);
        Self::map_with_members(id, key, value)
    }

    /// Creates a map shape from prebuilt key/value members (carrying traits).
    #[must_use]
    pub fn map_with_members(id: ShapeId, key: Member, value: Member) -> Self {
        Self {
            members: vec![key, value],
            ..Self::simple(id, ShapeKind::Map)
        }
    }

    /// Creates a structure shape from members in declaration order.
    #[must_use]
    pub fn structure(id: ShapeId, members: Vec<Member>) -> Self {
        Self {
            members,
            ..Self::simple(id, ShapeKind::Structure)
        }
    }

    /// Creates a union shape from members in declaration order.
    #[must_use]
    pub fn union(id: ShapeId, members: Vec<Member>) -> Self {
        Self {
            members,
            ..Self::simple(id, ShapeKind::Union)
        }
    }

    /// Creates an operation shape with its bindings.
    #[must_use]
    pub fn operation(id: ShapeId, binding: OperationBinding) -> Self {
        Self {
            operation: Some(binding),
            ..Self::simple(id, ShapeKind::Operation)
        }
    }

    /// Attaches a trait to this shape.
    #[must_use]
    pub fn with_trait(mut self, id: TraitId, payload: Value) -> Self {
        self.traits.insert(id, payload);
        self
    }

    /// Marks a structure as an error type.
    #[must_use]
    pub fn with_error_marking(mut self) -> Self {
        self.is_error = true;
        self
    }

    /// The shape's globally unique id.
    #[must_use]
    pub fn id(&self) -> &ShapeId {
        &self.id
    }

    /// The shape's kind.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Traits attached to this shape.
    #[must_use]
    pub fn traits(&self) -> &TraitMap {
        &self.traits
    }

    /// True when the shape carries the given trait.
    #[must_use]
    pub fn has_trait(&self, id: &TraitId) -> bool {
        self.traits.contains_key(id)
    }

    /// Payload of the given trait, when attached.
    #[must_use]
    pub fn get_trait(&self, id: &TraitId) -> Option<&Value> {
        self.traits.get(id)
    }

    /// Members in declaration order (empty for kinds without members).
    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Looks up a member by name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name() == name)
    }

    /// The element member of a list or set.
    #[must_use]
    pub fn element_member(&self) -> Option<&Member> {
        match self.kind {
            ShapeKind::List | ShapeKind::Set => self.members.first(),
            _ => None,
        }
    }

    /// The value member of a map.
    #[must_use]
    pub fn value_member(&self) -> Option<&Member> {
        match self.kind {
            ShapeKind::Map => self.member("value"),
            _ => None,
        }
    }

    /// True for structures carrying the error marking.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Operation bindings, for operation shapes.
    #[must_use]
    pub fn operation_binding(&self) -> Option<&OperationBinding> {
        self.operation.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            ShapeKind::Boolean,
            ShapeKind::BigDecimal,
            ShapeKind::IntEnum,
            ShapeKind::Set,
            ShapeKind::Operation,
        ] {
            assert_eq!(ShapeKind::from_ir_name(kind.ir_name()), Some(kind));
        }
        assert_eq!(ShapeKind::from_ir_name("service"), None);
    }

    #[test]
    fn member_id_is_owner_scoped() {
        let owner = ShapeId::new("ns", "Foo");
        let member = Member::new(&owner, "bar", ShapeId::new("ns", "Str"));
        assert_eq!(member.id().to_string(), "ns#Foo$bar");
        assert_eq!(member.name(), "bar");
    }

    #[test]
    fn map_members_are_key_then_value() {
        let id = ShapeId::new("ns", "M");
        let map = Shape::map(id, ShapeId::new("ns", "Str"), ShapeId::new("ns", "Int"));
        let names: Vec<_> = map.members().iter().map(Member::name).collect();
        assert_eq!(names, ["key", "value"]);
        assert_eq!(map.value_member().unwrap().name(), "value");
    }
}
