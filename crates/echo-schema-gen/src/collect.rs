// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reachability walk: discover and classify every shape the exported
//! operations can touch.
//!
//! Termination on cyclic graphs comes from the visited set, not from a
//! depth bound. Buckets are sorted sets so the emitter's phase iteration
//! is deterministic; deferred name registrations keep the collector's
//! visit order, which fixes string-store allocation order.
use std::collections::{BTreeMap, BTreeSet};

use echo_shape_model::{Model, ModelError, Service, Shape, ShapeId, ShapeKind};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::elision::ElisionIndex;

/// Value-kind names registered for simple shapes.
const SIMPLE_NUMBER: &str = "number";
const SIMPLE_BIGINT: &str = "bigint";
const SIMPLE_BIGDECIMAL: &str = "bigdecimal";
const SIMPLE_BOOLEAN: &str = "boolean";

/// Everything the walk discovered, bucketed for phased emission.
#[derive(Debug, Default)]
pub struct CollectedShapes {
    /// Structure shapes, sorted by identity.
    pub structures: BTreeSet<ShapeId>,
    /// List and set shapes, sorted by identity.
    pub collections: BTreeSet<ShapeId>,
    /// Map shapes, sorted by identity.
    pub maps: BTreeSet<ShapeId>,
    /// Union shapes, sorted by identity.
    pub unions: BTreeSet<ShapeId>,
    /// Operation shapes, sorted by identity.
    pub operations: BTreeSet<ShapeId>,
    /// Simple shapes mapped to their registered value-kind name.
    pub simple: BTreeMap<ShapeId, &'static str>,
    /// Every namespace touched by the walk (including operation
    /// namespaces), sorted.
    pub namespaces: BTreeSet<String>,
    /// `(namespace, shape name)` registrations for non-omitted shapes, in
    /// visit order.
    pub deferred_names: Vec<(String, String)>,
}

/// Walks the graph from a set of services.
pub struct ReachabilityCollector<'m> {
    model: &'m Model,
    visited: FxHashSet<ShapeId>,
    out: CollectedShapes,
}

impl<'m> ReachabilityCollector<'m> {
    /// Creates a collector over the model.
    #[must_use]
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            visited: FxHashSet::default(),
            out: CollectedShapes::default(),
        }
    }

    /// Runs the walk over `services` and returns the buckets.
    pub fn collect(
        mut self,
        services: &[&'m Service],
        elision: &mut ElisionIndex<'m>,
    ) -> Result<CollectedShapes, ModelError> {
        for service in services {
            debug!(service = %service.id, operations = service.operations.len(), "collecting service");
            for op_id in &service.operations {
                let op = self.model.expect_shape(op_id)?;
                let Some(binding) = op.operation_binding() else {
                    continue;
                };
                self.visit(self.model.expect_shape(&binding.input)?, elision)?;
                self.visit(self.model.expect_shape(&binding.output)?, elision)?;
                for error in &binding.errors {
                    self.visit(self.model.expect_shape(error)?, elision)?;
                }
                self.out.operations.insert(op_id.clone());
                self.out.namespaces.insert(op_id.namespace().to_owned());
            }
        }
        Ok(self.out)
    }

    fn visit(
        &mut self,
        shape: &'m Shape,
        elision: &mut ElisionIndex<'m>,
    ) -> Result<(), ModelError> {
        let id = shape.id();
        if !self.visited.insert(id.clone()) {
            return Ok(());
        }
        self.out.namespaces.insert(id.namespace().to_owned());

        if !elision.omit_schema(shape)? {
            self.out
                .deferred_names
                .push((id.namespace().to_owned(), id.name().to_owned()));
        }

        match shape.kind() {
            ShapeKind::List | ShapeKind::Set => {
                self.out.collections.insert(id.clone());
            }
            ShapeKind::Map => {
                self.out.maps.insert(id.clone());
            }
            ShapeKind::Structure => {
                self.out.structures.insert(id.clone());
            }
            ShapeKind::Union => {
                self.out.unions.insert(id.clone());
            }
            ShapeKind::Byte
            | ShapeKind::Short
            | ShapeKind::Integer
            | ShapeKind::Long
            | ShapeKind::Float
            | ShapeKind::Double => {
                self.out.simple.insert(id.clone(), SIMPLE_NUMBER);
            }
            ShapeKind::BigInteger => {
                self.out.simple.insert(id.clone(), SIMPLE_BIGINT);
            }
            ShapeKind::BigDecimal => {
                self.out.simple.insert(id.clone(), SIMPLE_BIGDECIMAL);
            }
            ShapeKind::Boolean => {
                self.out.simple.insert(id.clone(), SIMPLE_BOOLEAN);
            }
            // Inlined where referenced, never separately classified.
            _ => {}
        }
        debug!(shape = %id, kind = ?shape.kind(), "visited");

        // Distinct member targets, declaration order, first occurrence wins.
        let mut seen: FxHashSet<&ShapeId> = FxHashSet::default();
        for member in shape.members() {
            if seen.insert(member.target()) {
                let target = self.model.expect_shape(member.target())?;
                self.visit(target, elision)?;
            }
        }
        Ok(())
    }
}
