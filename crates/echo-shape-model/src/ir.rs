// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON IR loader (`shape-ir/v1`).
//!
//! The IR is a flat map of shape definitions keyed by absolute shape id,
//! plus service declarations. Structure/union members are a JSON array so
//! declaration order survives deserialization.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::ident::{ShapeId, ShapeIdError, TraitId};
use crate::model::{error_trait_id, unit_shape_id, Model, ModelBuilder, ModelError};
use crate::shape::{Member, OperationBinding, Shape, ShapeKind, TraitMap};

/// IR version tag accepted by [`load_model`].
const IR_VERSION: &str = "shape-ir/v1";

/// Error raised while loading a model from JSON IR.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The document is not valid JSON or does not match the IR schema.
    #[error("malformed shape IR: {0}")]
    Json(#[from] serde_json::Error),
    /// The document declares an unsupported IR version.
    #[error("unsupported IR version `{0}` (expected `{IR_VERSION}`)")]
    UnsupportedVersion(String),
    /// A shape id or target could not be parsed.
    #[error(transparent)]
    Id(#[from] ShapeIdError),
    /// A shape declares a kind the model does not know.
    #[error("shape {id} has unknown kind `{kind}`")]
    UnknownKind {
        /// Offending shape id.
        id: ShapeId,
        /// Unrecognized kind spelling.
        kind: String,
    },
    /// A list or set definition is missing its element member.
    #[error("collection shape {0} is missing its `member` entry")]
    MissingElement(ShapeId),
    /// A map definition is missing its key or value member.
    #[error("map shape {0} is missing its `key` or `value` entry")]
    MissingMapEntry(ShapeId),
    /// The assembled graph failed validation.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Root IR document.
#[derive(Debug, Deserialize)]
pub struct ShapeIr {
    /// Version tag; must equal `shape-ir/v1`.
    pub version: String,
    /// Shape definitions keyed by absolute shape id.
    #[serde(default)]
    pub shapes: BTreeMap<String, ShapeDef>,
    /// Service declarations.
    #[serde(default)]
    pub services: Vec<ServiceDef>,
}

/// One shape definition.
#[derive(Debug, Deserialize)]
pub struct ShapeDef {
    /// Kind spelling (see [`ShapeKind::from_ir_name`]).
    #[serde(rename = "type")]
    pub kind: String,
    /// Traits attached to the shape (opaque payloads).
    #[serde(default)]
    pub traits: BTreeMap<String, Value>,
    /// Named members in declaration order (structures, unions).
    #[serde(default)]
    pub members: Vec<MemberDef>,
    /// Element member (lists, sets).
    #[serde(default)]
    pub member: Option<TargetDef>,
    /// Key member (maps).
    #[serde(default)]
    pub key: Option<TargetDef>,
    /// Value member (maps).
    #[serde(default)]
    pub value: Option<TargetDef>,
    /// Input structure id (operations); defaults to the prelude unit.
    #[serde(default)]
    pub input: Option<String>,
    /// Output structure id (operations); defaults to the prelude unit.
    #[serde(default)]
    pub output: Option<String>,
    /// Declared error structure ids (operations).
    #[serde(default)]
    pub errors: Vec<String>,
}

/// A named member definition.
#[derive(Debug, Deserialize)]
pub struct MemberDef {
    /// Member name.
    pub name: String,
    /// Target shape id.
    pub target: String,
    /// Traits attached to the member occurrence.
    #[serde(default)]
    pub traits: BTreeMap<String, Value>,
}

/// An anonymous member definition (list element, map key/value).
#[derive(Debug, Deserialize)]
pub struct TargetDef {
    /// Target shape id.
    pub target: String,
    /// Traits attached to the member occurrence.
    #[serde(default)]
    pub traits: BTreeMap<String, Value>,
}

/// A service declaration.
#[derive(Debug, Deserialize)]
pub struct ServiceDef {
    /// Service id.
    pub id: String,
    /// Exported operation ids.
    #[serde(default)]
    pub operations: Vec<String>,
}

fn trait_map(raw: BTreeMap<String, Value>) -> TraitMap {
    raw.into_iter()
        .map(|(id, payload)| (TraitId::new(id), payload))
        .collect()
}

fn apply_traits(mut shape: Shape, traits: TraitMap) -> Shape {
    let error_id = error_trait_id();
    for (id, payload) in traits {
        if id == error_id {
            shape = shape.with_error_marking();
        }
        shape = shape.with_trait(id, payload);
    }
    shape
}

fn member_with_traits(owner: &ShapeId, name: &str, def: TargetDef) -> Result<Member, LoadError> {
    let target: ShapeId = def.target.parse()?;
    let mut member = Member::new(owner, name, target);
    for (id, payload) in trait_map(def.traits) {
        member = member.with_trait(id, payload);
    }
    Ok(member)
}

fn build_shape(id: ShapeId, def: ShapeDef) -> Result<Shape, LoadError> {
    let Some(kind) = ShapeKind::from_ir_name(&def.kind) else {
        return Err(LoadError::UnknownKind { id, kind: def.kind });
    };

    let shape = match kind {
        ShapeKind::List | ShapeKind::Set => {
            let element = def.member.ok_or_else(|| LoadError::MissingElement(id.clone()))?;
            let member = member_with_traits(&id, "member", element)?;
            if kind == ShapeKind::List {
                Shape::list_with_member(id, member)
            } else {
                Shape::set_with_member(id, member)
            }
        }
        ShapeKind::Map => {
            let key = def.key.ok_or_else(|| LoadError::MissingMapEntry(id.clone()))?;
            let value = def
                .value
                .ok_or_else(|| LoadError::MissingMapEntry(id.clone()))?;
            let key = member_with_traits(&id, "key", key)?;
            let value = member_with_traits(&id, "value", value)?;
            Shape::map_with_members(id, key, value)
        }
        ShapeKind::Structure | ShapeKind::Union => {
            let mut members = Vec::with_capacity(def.members.len());
            for m in def.members {
                let target: ShapeId = m.target.parse()?;
                let mut member = Member::new(&id, m.name, target);
                for (tid, payload) in trait_map(m.traits) {
                    member = member.with_trait(tid, payload);
                }
                members.push(member);
            }
            if kind == ShapeKind::Structure {
                Shape::structure(id, members)
            } else {
                Shape::union(id, members)
            }
        }
        ShapeKind::Operation => {
            let input = def
                .input
                .as_deref()
                .map_or_else(|| Ok(unit_shape_id()), str::parse)?;
            let output = def
                .output
                .as_deref()
                .map_or_else(|| Ok(unit_shape_id()), str::parse)?;
            let errors = def
                .errors
                .iter()
                .map(|e| e.parse())
                .collect::<Result<Vec<_>, _>>()?;
            Shape::operation(
                id,
                OperationBinding {
                    input,
                    output,
                    errors,
                },
            )
        }
        _ => Shape::simple(id, kind),
    };

    Ok(apply_traits(shape, trait_map(def.traits)))
}

/// Loads and validates a model from `shape-ir/v1` JSON.
pub fn load_model(json: &str) -> Result<Model, LoadError> {
    let ir: ShapeIr = serde_json::from_str(json)?;
    if ir.version != IR_VERSION {
        return Err(LoadError::UnsupportedVersion(ir.version));
    }

    let mut builder = ModelBuilder::new();
    for (raw_id, def) in ir.shapes {
        let id: ShapeId = raw_id.parse()?;
        builder = builder.shape(build_shape(id, def)?);
    }
    for service in ir.services {
        let id: ShapeId = service.id.parse()?;
        let operations = service
            .operations
            .iter()
            .map(|op| op.parse())
            .collect::<Result<Vec<_>, ShapeIdError>>()?;
        builder = builder.service(id, operations);
    }
    Ok(builder.build()?)
}
