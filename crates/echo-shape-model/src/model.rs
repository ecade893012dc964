// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The immutable model: all shapes plus the services that export them.
use std::collections::BTreeMap;

use thiserror::Error;

use crate::ident::{ShapeId, TraitId};
use crate::shape::{Member, Shape, ShapeKind};

/// Namespace of the built-in prelude shapes and traits.
pub const PRELUDE_NAMESPACE: &str = "echo.api";

/// Id of the sentinel unit structure used as the default operation
/// input/output.
#[must_use]
pub fn unit_shape_id() -> ShapeId {
    ShapeId::new(PRELUDE_NAMESPACE, "Unit")
}

/// Id of the error-marking trait.
#[must_use]
pub fn error_trait_id() -> TraitId {
    TraitId::new("echo.api#error")
}

/// Id of the streaming trait carried by streaming blobs.
#[must_use]
pub fn streaming_trait_id() -> TraitId {
    TraitId::new("echo.api#streaming")
}

/// Id of the timestamp format trait.
#[must_use]
pub fn timestamp_format_trait_id() -> TraitId {
    TraitId::new("echo.api#timestampFormat")
}

/// Error raised while resolving or assembling a model.
///
/// An unresolved reference is fatal: the model is malformed and generation
/// must abort rather than emit partial output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A referenced shape id does not exist in the graph.
    #[error("unresolved shape reference: {0}")]
    UnresolvedShape(ShapeId),
    /// Two shapes were registered under the same id.
    #[error("duplicate shape id: {0}")]
    DuplicateShape(ShapeId),
    /// A service exports an id that is not an operation shape.
    #[error("service operation {0} is not an operation shape")]
    NotAnOperation(ShapeId),
}

/// A service: the set of exported operations generation starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Service identity.
    pub id: ShapeId,
    /// Exported operation shape ids.
    pub operations: Vec<ShapeId>,
}

/// The immutable shape graph plus its services.
///
/// Built once (loader or [`ModelBuilder`]), consumed read-only during one
/// generation pass, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    shapes: BTreeMap<ShapeId, Shape>,
    services: Vec<Service>,
}

impl Model {
    /// Looks up a shape, or `None` when absent.
    #[must_use]
    pub fn shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    /// Looks up a shape; a missing id is a fatal model error.
    pub fn expect_shape(&self, id: &ShapeId) -> Result<&Shape, ModelError> {
        self.shapes
            .get(id)
            .ok_or_else(|| ModelError::UnresolvedShape(id.clone()))
    }

    /// Resolves a member edge to its target shape.
    pub fn resolve_target(&self, member: &Member) -> Result<&Shape, ModelError> {
        self.expect_shape(member.target())
    }

    /// All shapes, in sorted id order.
    pub fn iter_shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    /// Services declared by the model.
    #[must_use]
    pub fn services(&self) -> &[Service] {
        &self.services
    }
}

/// Assembles a validated [`Model`].
///
/// `build` inserts the prelude unit structure when absent and verifies that
/// every member target, operation binding, and service operation resolves.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    shapes: Vec<Shape>,
    services: Vec<Service>,
}

impl ModelBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a shape.
    #[must_use]
    pub fn shape(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }

    /// Adds a service.
    #[must_use]
    pub fn service(mut self, id: ShapeId, operations: Vec<ShapeId>) -> Self {
        self.services.push(Service { id, operations });
        self
    }

    /// Validates references and produces the immutable model.
    pub fn build(self) -> Result<Model, ModelError> {
        let mut shapes = BTreeMap::new();
        for shape in self.shapes {
            let id = shape.id().clone();
            if shapes.insert(id.clone(), shape).is_some() {
                return Err(ModelError::DuplicateShape(id));
            }
        }
        shapes
            .entry(unit_shape_id())
            .or_insert_with(|| Shape::structure(unit_shape_id(), Vec::new()));

        let model = Model {
            shapes,
            services: self.services,
        };
        model.validate()?;
        Ok(model)
    }
}

impl Model {
    fn validate(&self) -> Result<(), ModelError> {
        for shape in self.shapes.values() {
            for member in shape.members() {
                self.expect_shape(member.target())?;
            }
            if let Some(binding) = shape.operation_binding() {
                self.expect_shape(&binding.input)?;
                self.expect_shape(&binding.output)?;
                for error in &binding.errors {
                    self.expect_shape(error)?;
                }
            }
        }
        for service in &self.services {
            for op in &service.operations {
                let shape = self.expect_shape(op)?;
                if shape.kind() != ShapeKind::Operation {
                    return Err(ModelError::NotAnOperation(op.clone()));
                }
            }
        }
        Ok(())
    }
}
