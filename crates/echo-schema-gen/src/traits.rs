// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Trait filtering and serialization collaborators.
//!
//! Traits are opaque key/value metadata: the engine never interprets a
//! payload, it only decides whether a trait is schema-relevant (policy)
//! and turns included payloads into emitted literal text (serializer).
use std::collections::BTreeSet;

use echo_shape_model::{TraitId, TraitMap};
use serde_json::Value;

use crate::store::StringStore;

/// Policy deciding which traits influence runtime (de)serialization.
///
/// Traits excluded by the policy are invisible to the engine: they neither
/// block schema omission nor appear in emitted trait tables.
pub trait TraitPolicy {
    /// True when the trait is schema-relevant and must be emitted.
    fn include_trait(&self, id: &TraitId) -> bool;

    /// True when any trait in the set is schema-relevant.
    fn has_schema_traits(&self, traits: &TraitMap) -> bool {
        traits.keys().any(|id| self.include_trait(id))
    }
}

/// Default policy: a fixed allowlist of the serialization-relevant prelude
/// traits.
#[derive(Debug)]
pub struct PreludeTraitPolicy {
    allowlist: BTreeSet<TraitId>,
}

impl Default for PreludeTraitPolicy {
    fn default() -> Self {
        let allowlist = [
            "echo.api#endpoint",
            "echo.api#error",
            "echo.api#hostLabel",
            "echo.api#httpHeader",
            "echo.api#httpLabel",
            "echo.api#httpPayload",
            "echo.api#httpPrefixHeaders",
            "echo.api#httpQuery",
            "echo.api#httpQueryParams",
            "echo.api#httpResponseCode",
            "echo.api#idempotencyToken",
            "echo.api#jsonName",
            "echo.api#mediaType",
            "echo.api#sparse",
            "echo.api#streaming",
            "echo.api#timestampFormat",
            "echo.api#xmlAttribute",
            "echo.api#xmlFlattened",
            "echo.api#xmlName",
            "echo.api#xmlNamespace",
        ]
        .into_iter()
        .map(TraitId::new)
        .collect();
        Self { allowlist }
    }
}

impl TraitPolicy for PreludeTraitPolicy {
    fn include_trait(&self, id: &TraitId) -> bool {
        self.allowlist.contains(id)
    }
}

/// Serializes an included trait payload into emitted literal text.
pub trait TraitSerializer {
    /// Renders the payload; implementations may intern repeated strings
    /// through the namespace's store.
    fn serialize(&self, payload: &Value, store: &mut StringStore) -> String;
}

/// Default serializer: the opaque JSON payload rendered as a JS literal.
///
/// serde_json maps iterate in key order, so rendering is deterministic.
#[derive(Debug, Default)]
pub struct JsTraitSerializer;

impl TraitSerializer for JsTraitSerializer {
    fn serialize(&self, payload: &Value, _store: &mut StringStore) -> String {
        serde_json::to_string(payload).unwrap_or_else(|_| "null".to_owned())
    }
}
