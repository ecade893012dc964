// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! echo-shape-model: typed API shape graph consumed by the schema generator.
//!
//! The graph is immutable once built: the loader (or [`ModelBuilder`])
//! validates every member target up front, and all downstream passes read
//! the same `Model` for the duration of one generation run. Shapes are
//! addressed by [`ShapeId`]; members are owned by exactly one parent shape
//! and are reachable only through it.

mod ident;
mod ir;
mod model;
mod shape;

pub use ident::{ShapeId, ShapeIdError, TraitId};
pub use ir::{load_model, LoadError, MemberDef, ServiceDef, ShapeDef, ShapeIr, TargetDef};
pub use model::{
    error_trait_id, streaming_trait_id, timestamp_format_trait_id, unit_shape_id, Model,
    ModelBuilder, ModelError, Service, PRELUDE_NAMESPACE,
};
pub use shape::{Member, OperationBinding, Shape, ShapeKind, TraitMap};
