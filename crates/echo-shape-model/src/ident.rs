// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier types for shapes and traits.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when parsing a textual shape or trait identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeIdError {
    /// The identifier is missing the `#` namespace separator.
    #[error("shape id `{0}` is missing a `#` namespace separator")]
    MissingNamespace(String),
    /// The namespace or name component is empty.
    #[error("shape id `{0}` has an empty namespace or name")]
    EmptyComponent(String),
}

/// Globally unique identity of a shape: `namespace#Name`, optionally
/// narrowed to a member as `namespace#Name$member`.
///
/// Member ids are never separately addressable in the model map; they exist
/// so per-member results (elision memoization, visited tracking) can be
/// keyed without holding a reference to the owning shape.
///
/// Ordering is lexicographic over (namespace, name, member), which gives
/// every sorted collection of ids a stable, reproducible iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShapeId {
    namespace: String,
    name: String,
    member: Option<String>,
}

impl ShapeId {
    /// Creates a shape id from a namespace and name.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            member: None,
        }
    }

    /// Returns the id of a member owned by this shape.
    #[must_use]
    pub fn member_of(&self, member: impl Into<String>) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            member: Some(member.into()),
        }
    }

    /// Namespace component.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Shape name component (without namespace or member).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member component, when this id addresses a member.
    #[must_use]
    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    /// True when this id addresses a member rather than a top-level shape.
    #[must_use]
    pub fn is_member(&self) -> bool {
        self.member.is_some()
    }

    /// The owning shape's id, stripping any member component.
    #[must_use]
    pub fn without_member(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            member: None,
        }
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.name)?;
        if let Some(member) = &self.member {
            write!(f, "${member}")?;
        }
        Ok(())
    }
}

impl FromStr for ShapeId {
    type Err = ShapeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((namespace, rest)) = s.split_once('#') else {
            return Err(ShapeIdError::MissingNamespace(s.to_owned()));
        };
        let (name, member) = match rest.split_once('$') {
            Some((name, member)) => (name, Some(member)),
            None => (rest, None),
        };
        if namespace.is_empty() || name.is_empty() || member.is_some_and(str::is_empty) {
            return Err(ShapeIdError::EmptyComponent(s.to_owned()));
        }
        Ok(Self {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            member: member.map(str::to_owned),
        })
    }
}

/// Identity of a trait: `namespace#name`, stored as one string.
///
/// Trait payloads are opaque to the model; the id is the only part the
/// generator inspects (filter policy, string-store keying by [`Self::name`]).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraitId(String);

impl TraitId {
    /// Creates a trait id from its full `namespace#name` form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The full `namespace#name` form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name component (after `#`), used as the emitted trait key.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.split_once('#').map_or(self.0.as_str(), |(_, n)| n)
    }
}

impl fmt::Display for TraitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TraitId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
