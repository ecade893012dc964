// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The elision index: decides which schemas can be left out.
//!
//! A shape whose runtime behavior is indistinguishable from the generic
//! untyped value needs no full descriptor; the emitter replaces it with a
//! kind-tagged sentinel. The index answers three questions, memoizing the
//! first: does a shape match the default schema, may its emission be
//! elided entirely, and is its value kind discernible at runtime without a
//! schema.
//!
//! All state is scoped to one generation session: the memo table is built
//! fresh per run and never shared across runs.
use echo_shape_model::{
    error_trait_id, Member, Model, ModelError, Shape, ShapeId, ShapeKind, TraitMap,
};
use rustc_hash::FxHashMap;

use crate::traits::TraitPolicy;

/// Recursion bound for both equivalence tests.
///
/// The cutoff behavior is deliberately asymmetric: at or beyond this depth
/// `matches_default_schema` treats the shape as matching (while caching the
/// conservative answer), whereas `omit_schema` refuses to omit. Cached
/// answers computed through a truncated path are kept as-is; which path
/// reaches a shape first is fixed by the sorted prepopulation pass, so the
/// approximation is at least reproducible.
pub const MAX_DEPTH: usize = 20;

/// A shape or one of its member edges, as the subject of an elision query.
#[derive(Debug, Clone, Copy)]
pub enum SchemaSubject<'m> {
    /// A top-level shape.
    Shape(&'m Shape),
    /// A member edge (queries consider both its own traits and its target).
    Member(&'m Member),
}

impl<'m> SchemaSubject<'m> {
    /// Identity used as the memoization key.
    #[must_use]
    pub fn id(&self) -> &'m ShapeId {
        match self {
            Self::Shape(s) => s.id(),
            Self::Member(m) => m.id(),
        }
    }

    /// Traits attached to the subject itself.
    #[must_use]
    pub fn traits(&self) -> &'m TraitMap {
        match self {
            Self::Shape(s) => s.traits(),
            Self::Member(m) => m.traits(),
        }
    }
}

impl<'m> From<&'m Shape> for SchemaSubject<'m> {
    fn from(shape: &'m Shape) -> Self {
        Self::Shape(shape)
    }
}

impl<'m> From<&'m Member> for SchemaSubject<'m> {
    fn from(member: &'m Member) -> Self {
        Self::Member(member)
    }
}

/// Memoized elision queries over one model.
pub struct ElisionIndex<'m> {
    model: &'m Model,
    policy: &'m dyn TraitPolicy,
    default_cache: FxHashMap<ShapeId, bool>,
}

impl<'m> ElisionIndex<'m> {
    /// Builds the index and prepopulates the default-schema memo table for
    /// every shape and member, in sorted id order.
    pub fn new(model: &'m Model, policy: &'m dyn TraitPolicy) -> Result<Self, ModelError> {
        let mut index = Self {
            model,
            policy,
            default_cache: FxHashMap::default(),
        };
        for shape in model.iter_shapes() {
            let matched = index.matches_at(shape.into(), 0)?;
            index.default_cache.insert(shape.id().clone(), matched);
            for member in shape.members() {
                let matched = index.matches_at(member.into(), 0)?;
                index.default_cache.insert(member.id().clone(), matched);
            }
        }
        Ok(index)
    }

    /// True when the subject's runtime representation is indistinguishable
    /// from a generic untyped value.
    pub fn matches_default_schema(
        &mut self,
        subject: impl Into<SchemaSubject<'m>>,
    ) -> Result<bool, ModelError> {
        self.matches_at(subject.into(), 0)
    }

    /// True when the subject's schema can be omitted entirely: it matches
    /// the default schema and carries no schema-relevant traits or error
    /// marking anywhere the emitter would have to represent.
    pub fn omit_schema(
        &mut self,
        subject: impl Into<SchemaSubject<'m>>,
    ) -> Result<bool, ModelError> {
        self.omit_at(subject.into(), 0)
    }

    /// True unless the subject (or a member's resolved target) is of a kind
    /// whose raw runtime form is ambiguous: aggregates, blob, timestamp.
    pub fn is_runtime_discernible_simple_type(
        &self,
        subject: impl Into<SchemaSubject<'m>>,
    ) -> Result<bool, ModelError> {
        let shape = self.resolve(subject.into())?;
        Ok(!matches!(
            shape.kind(),
            ShapeKind::List
                | ShapeKind::Set
                | ShapeKind::Map
                | ShapeKind::Structure
                | ShapeKind::Union
                | ShapeKind::Timestamp
                | ShapeKind::Blob
        ))
    }

    /// Resolves a member subject to its target shape; shape subjects pass
    /// through.
    pub fn resolve(&self, subject: SchemaSubject<'m>) -> Result<&'m Shape, ModelError> {
        match subject {
            SchemaSubject::Shape(s) => Ok(s),
            SchemaSubject::Member(m) => self.model.resolve_target(m),
        }
    }

    fn matches_at(&mut self, subject: SchemaSubject<'m>, depth: usize) -> Result<bool, ModelError> {
        if let Some(&cached) = self.default_cache.get(subject.id()) {
            return Ok(cached);
        }
        if depth >= MAX_DEPTH {
            // Past the cutoff the shape is treated as matching, but the
            // cached answer stays conservative.
            self.default_cache.insert(subject.id().clone(), false);
            return Ok(true);
        }

        let shape = match subject {
            // Member results are not cached here; the prepopulation pass
            // records them under the member id.
            SchemaSubject::Member(m) => {
                let target = self.model.resolve_target(m)?;
                return self.matches_at(target.into(), depth + 1);
            }
            SchemaSubject::Shape(s) => s,
        };

        let matched = match shape.kind() {
            ShapeKind::Boolean
            | ShapeKind::String
            | ShapeKind::Byte
            | ShapeKind::Short
            | ShapeKind::Integer
            | ShapeKind::Long
            | ShapeKind::Float
            | ShapeKind::Double
            | ShapeKind::BigInteger
            | ShapeKind::BigDecimal
            | ShapeKind::Enum
            | ShapeKind::IntEnum
            | ShapeKind::Document => true,
            ShapeKind::List | ShapeKind::Set => match shape.element_member() {
                Some(element) => self.matches_at(element.into(), depth + 1)?,
                None => false,
            },
            ShapeKind::Map => match shape.value_member() {
                Some(value) => self.matches_at(value.into(), depth + 1)?,
                None => false,
            },
            ShapeKind::Structure | ShapeKind::Union => {
                let mut all = true;
                for member in shape.members() {
                    if !self.matches_at(member.into(), depth + 1)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            ShapeKind::Blob | ShapeKind::Timestamp | ShapeKind::Operation => false,
        };
        self.default_cache.insert(shape.id().clone(), matched);
        Ok(matched)
    }

    fn omit_at(&mut self, subject: SchemaSubject<'m>, depth: usize) -> Result<bool, ModelError> {
        if depth >= MAX_DEPTH {
            return Ok(false);
        }
        if self.is_error_marked(subject) {
            return Ok(false);
        }
        if self.policy.has_schema_traits(subject.traits()) {
            return Ok(false);
        }
        if let SchemaSubject::Shape(shape) = subject {
            for member in shape.members() {
                if !self.omit_at(member.into(), depth + 1)? {
                    return Ok(false);
                }
            }
        }
        if let SchemaSubject::Member(member) = subject {
            let target = self.model.resolve_target(member)?;
            if !self.omit_at(target.into(), depth + 1)? {
                return Ok(false);
            }
        }
        self.matches_at(subject, depth + 1)
    }

    fn is_error_marked(&self, subject: SchemaSubject<'m>) -> bool {
        match subject {
            SchemaSubject::Shape(s) => s.is_error() || s.has_trait(&error_trait_id()),
            SchemaSubject::Member(m) => m.has_trait(&error_trait_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::PreludeTraitPolicy;
    use echo_shape_model::{ModelBuilder, TraitId};
    use serde_json::Value;

    fn scalar(ns: &str, name: &str, kind: ShapeKind) -> Shape {
        Shape::simple(ShapeId::new(ns, name), kind)
    }

    #[test]
    fn scalars_match_default_schema() {
        let kinds = [
            ShapeKind::Boolean,
            ShapeKind::String,
            ShapeKind::Byte,
            ShapeKind::Short,
            ShapeKind::Integer,
            ShapeKind::Long,
            ShapeKind::Float,
            ShapeKind::Double,
            ShapeKind::BigInteger,
            ShapeKind::BigDecimal,
            ShapeKind::Enum,
            ShapeKind::IntEnum,
            ShapeKind::Document,
        ];
        let mut builder = ModelBuilder::new();
        for (i, kind) in kinds.iter().enumerate() {
            builder = builder.shape(scalar("ns", &format!("S{i}"), *kind));
        }
        let model = builder.build().unwrap();
        let policy = PreludeTraitPolicy::default();
        let mut index = ElisionIndex::new(&model, &policy).unwrap();
        for (i, kind) in kinds.iter().enumerate() {
            let shape = model.shape(&ShapeId::new("ns", format!("S{i}"))).unwrap();
            assert!(
                index.matches_default_schema(shape).unwrap(),
                "{kind:?} should match the default schema"
            );
        }
    }

    #[test]
    fn blob_and_timestamp_never_match() {
        let model = ModelBuilder::new()
            .shape(scalar("ns", "B", ShapeKind::Blob))
            .shape(scalar("ns", "T", ShapeKind::Timestamp))
            .build()
            .unwrap();
        let policy = PreludeTraitPolicy::default();
        let mut index = ElisionIndex::new(&model, &policy).unwrap();
        for name in ["B", "T"] {
            let shape = model.shape(&ShapeId::new("ns", name)).unwrap();
            assert!(!index.matches_default_schema(shape).unwrap());
            assert!(!index.omit_schema(shape).unwrap());
        }
    }

    #[test]
    fn list_of_strings_matches_but_list_of_blobs_does_not() {
        let model = ModelBuilder::new()
            .shape(scalar("ns", "Str", ShapeKind::String))
            .shape(scalar("ns", "Bin", ShapeKind::Blob))
            .shape(Shape::list(ShapeId::new("ns", "Strings"), ShapeId::new("ns", "Str")))
            .shape(Shape::list(ShapeId::new("ns", "Blobs"), ShapeId::new("ns", "Bin")))
            .build()
            .unwrap();
        let policy = PreludeTraitPolicy::default();
        let mut index = ElisionIndex::new(&model, &policy).unwrap();
        let strings = model.shape(&ShapeId::new("ns", "Strings")).unwrap();
        let blobs = model.shape(&ShapeId::new("ns", "Blobs")).unwrap();
        assert!(index.matches_default_schema(strings).unwrap());
        assert!(!index.matches_default_schema(blobs).unwrap());
    }

    #[test]
    fn trivial_structure_omits_but_error_structure_never_does() {
        let str_id = ShapeId::new("ns", "Str");
        let plain_id = ShapeId::new("ns", "Plain");
        let broken_id = ShapeId::new("ns", "Broken");
        let model = ModelBuilder::new()
            .shape(scalar("ns", "Str", ShapeKind::String))
            .shape(Shape::structure(
                plain_id.clone(),
                vec![Member::new(&plain_id, "value", str_id.clone())],
            ))
            .shape(
                Shape::structure(broken_id.clone(), Vec::new())
                    .with_trait(error_trait_id(), Value::String("client".into()))
                    .with_error_marking(),
            )
            .build()
            .unwrap();
        let policy = PreludeTraitPolicy::default();
        let mut index = ElisionIndex::new(&model, &policy).unwrap();
        let plain = model.shape(&plain_id).unwrap();
        let broken = model.shape(&broken_id).unwrap();
        assert!(index.omit_schema(plain).unwrap());
        assert!(!index.omit_schema(broken).unwrap());
    }

    #[test]
    fn schema_relevant_member_trait_blocks_omission() {
        let str_id = ShapeId::new("ns", "Str");
        let holder_id = ShapeId::new("ns", "Holder");
        let member = Member::new(&holder_id, "value", str_id.clone())
            .with_trait(TraitId::new("echo.api#jsonName"), Value::String("v".into()));
        let model = ModelBuilder::new()
            .shape(scalar("ns", "Str", ShapeKind::String))
            .shape(Shape::structure(holder_id.clone(), vec![member]))
            .build()
            .unwrap();
        let policy = PreludeTraitPolicy::default();
        let mut index = ElisionIndex::new(&model, &policy).unwrap();
        let holder = model.shape(&holder_id).unwrap();
        // The member still matches the default schema (its target is a
        // string), but the occurrence trait forbids omission.
        assert!(index.matches_default_schema(holder).unwrap());
        assert!(!index.omit_schema(holder).unwrap());
    }

    #[test]
    fn excluded_trait_does_not_block_omission() {
        let holder_id = ShapeId::new("ns", "Holder");
        let model = ModelBuilder::new()
            .shape(
                Shape::structure(holder_id.clone(), Vec::new())
                    .with_trait(TraitId::new("custom#internal"), Value::Null),
            )
            .build()
            .unwrap();
        let policy = PreludeTraitPolicy::default();
        let mut index = ElisionIndex::new(&model, &policy).unwrap();
        assert!(index.omit_schema(model.shape(&holder_id).unwrap()).unwrap());
    }

    #[test]
    fn self_referential_structure_terminates() {
        let node_id = ShapeId::new("ns", "Node");
        let model = ModelBuilder::new()
            .shape(Shape::structure(
                node_id.clone(),
                vec![Member::new(&node_id, "next", node_id.clone())],
            ))
            .build()
            .unwrap();
        let policy = PreludeTraitPolicy::default();
        let mut index = ElisionIndex::new(&model, &policy).unwrap();
        let node = model.shape(&node_id).unwrap();
        // Both queries must return a defined boolean rather than recurse
        // unboundedly. The cycle resolves through the asymmetric depth
        // cutoff: treated as matching, but never omittable.
        let matches = index.matches_default_schema(node).unwrap();
        let omit = index.omit_schema(node).unwrap();
        assert!(matches);
        assert!(!omit);
    }

    #[test]
    fn runtime_discernibility_follows_target_kind() {
        let holder_id = ShapeId::new("ns", "Holder");
        let model = ModelBuilder::new()
            .shape(scalar("ns", "Str", ShapeKind::String))
            .shape(scalar("ns", "Big", ShapeKind::BigDecimal))
            .shape(scalar("ns", "Bin", ShapeKind::Blob))
            .shape(scalar("ns", "When", ShapeKind::Timestamp))
            .shape(Shape::structure(
                holder_id.clone(),
                vec![
                    Member::new(&holder_id, "s", ShapeId::new("ns", "Str")),
                    Member::new(&holder_id, "d", ShapeId::new("ns", "Big")),
                    Member::new(&holder_id, "b", ShapeId::new("ns", "Bin")),
                    Member::new(&holder_id, "t", ShapeId::new("ns", "When")),
                    Member::new(&holder_id, "h", holder_id.clone()),
                ],
            ))
            .build()
            .unwrap();
        let policy = PreludeTraitPolicy::default();
        let index = ElisionIndex::new(&model, &policy).unwrap();
        let holder = model.shape(&holder_id).unwrap();
        let check = |name: &str| {
            index
                .is_runtime_discernible_simple_type(holder.member(name).unwrap())
                .unwrap()
        };
        assert!(check("s"));
        assert!(check("d"), "big decimals read as plain values at runtime");
        assert!(!check("b"), "blobs are format-ambiguous");
        assert!(!check("t"), "timestamps are format-ambiguous");
        assert!(!check("h"), "aggregates need a schema pointer");
        assert!(!index.is_runtime_discernible_simple_type(holder).unwrap());
    }
}
