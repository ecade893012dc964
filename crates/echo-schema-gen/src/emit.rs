// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema emission: classified shapes into per-namespace source units.
//!
//! Emission runs in a fixed phase order across the whole run (structures,
//! collections, maps, unions, operations), each phase iterating its bucket
//! sorted by shape identity, so repeated runs over an unchanged model
//! produce byte-identical units. Cross-namespace references become imports
//! of the target's generated symbol; omitted shapes collapse to
//! kind-tagged sentinels.
use std::collections::BTreeMap;

use echo_shape_model::{
    streaming_trait_id, timestamp_format_trait_id, unit_shape_id, Member, Model, ModelError,
    Service, Shape, ShapeId, ShapeKind, TraitMap,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::collect::{CollectedShapes, ReachabilityCollector};
use crate::elision::ElisionIndex;
use crate::output::{OutputSink, SinkError};
use crate::reserved::escape_symbol;
use crate::store::StringStore;
use crate::traits::{TraitPolicy, TraitSerializer};
use crate::writer::CodeWriter;

/// Module the schema runtime primitives are imported from.
pub const RUNTIME_MODULE: &str = "@echo/runtime-schema";

/// Relative module exporting generated exception constructors.
const MODELS_MODULE: &str = "../models/index";

/// Error produced by a generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The model contained an unresolvable reference.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// The output sink failed.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Run-level configuration.
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Services to generate for; empty selects every service in the model.
    pub services: Vec<ShapeId>,
}

/// One namespace's output state: its writer and its string store.
struct NamespaceUnit {
    writer: CodeWriter,
    store: StringStore,
}

/// One generation session.
///
/// Owns all per-run state (elision memo table, namespace units); construct
/// fresh for every run, never reuse across runs.
pub struct SchemaGenerator<'m> {
    model: &'m Model,
    elision: ElisionIndex<'m>,
    policy: &'m dyn TraitPolicy,
    serializer: &'m dyn TraitSerializer,
    config: GeneratorConfig,
    units: BTreeMap<String, NamespaceUnit>,
}

impl<'m> SchemaGenerator<'m> {
    /// Creates a session over the model, building the elision index.
    pub fn new(
        model: &'m Model,
        policy: &'m dyn TraitPolicy,
        serializer: &'m dyn TraitSerializer,
        config: GeneratorConfig,
    ) -> Result<Self, GenerateError> {
        let elision = ElisionIndex::new(model, policy)?;
        Ok(Self {
            model,
            elision,
            policy,
            serializer,
            config,
            units: BTreeMap::new(),
        })
    }

    /// Runs the full generation pass, writing one unit per namespace plus
    /// the index unit into `sink`.
    pub fn run(mut self, sink: &mut dyn OutputSink) -> Result<(), GenerateError> {
        let services: Vec<&Service> = if self.config.services.is_empty() {
            self.model.services().iter().collect()
        } else {
            self.model
                .services()
                .iter()
                .filter(|s| self.config.services.contains(&s.id))
                .collect()
        };

        let collected = ReachabilityCollector::new(self.model).collect(&services, &mut self.elision)?;
        info!(
            structures = collected.structures.len(),
            collections = collected.collections.len(),
            maps = collected.maps.len(),
            unions = collected.unions.len(),
            operations = collected.operations.len(),
            namespaces = collected.namespaces.len(),
            "reachability walk complete"
        );

        // Namespace registry assembled upfront, iterated in sorted order.
        for ns in &collected.namespaces {
            self.ensure_unit(ns);
        }
        // Deferred name registrations replay in visit order so identifier
        // assignment is stable.
        for (ns, name) in &collected.deferred_names {
            self.ensure_unit(ns).store.var(name);
        }

        for id in &collected.structures {
            let shape = self.model.expect_shape(id)?;
            self.write_structure_schema(shape)?;
        }
        for id in &collected.collections {
            let shape = self.model.expect_shape(id)?;
            self.write_collection_schema(shape)?;
        }
        for id in &collected.maps {
            let shape = self.model.expect_shape(id)?;
            self.write_map_schema(shape)?;
        }
        for id in &collected.unions {
            let shape = self.model.expect_shape(id)?;
            self.write_union_schema(shape)?;
        }
        for id in &collected.operations {
            let shape = self.model.expect_shape(id)?;
            self.write_operation_schema(shape)?;
        }

        for ns in &collected.namespaces {
            self.register_simple_types(ns, &collected);
            let reg = registry_symbol(ns);
            self.ensure_unit(ns)
                .writer
                .write(format!("{reg}.stopCapture();"));
        }

        for (ns, unit) in &self.units {
            let mut text = unit.store.flush();
            if !unit.store.is_empty() {
                text.push('\n');
            }
            text.push_str(&unit.writer.render());
            sink.write_unit(&format!("{ns}.ts"), &text)?;
        }
        let mut index = String::new();
        for ns in self.units.keys() {
            index.push_str(&format!("export * from \"./{ns}\";\n"));
        }
        sink.write_unit("index.ts", &index)?;
        info!(units = self.units.len() + 1, "schema generation complete");
        Ok(())
    }

    fn ensure_unit(&mut self, ns: &str) -> &mut NamespaceUnit {
        self.units
            .entry(ns.to_owned())
            .or_insert_with(|| new_unit(ns))
    }

    /// Handles the unit sentinel and omitted shapes. Returns true when the
    /// shape was fully handled and needs no full descriptor.
    fn write_special_or_sentinel(&mut self, shape: &'m Shape) -> Result<bool, GenerateError> {
        if *shape.id() == unit_shape_id() {
            // Special signal value for operation input/output.
            let ns = shape.id().namespace().to_owned();
            let writer = &mut self.ensure_unit(&ns).writer;
            writer.write("export var Unit = \"unit\";");
            writer.write("");
            return Ok(true);
        }
        if self.elision.omit_schema(shape)? {
            let symbol = escape_symbol(shape.id().name());
            let line = match shape.kind() {
                ShapeKind::Map => format!("export var {symbol} = 4 as const;"),
                ShapeKind::List | ShapeKind::Set => format!("export var {symbol} = 2 as const;"),
                ShapeKind::Structure | ShapeKind::Union => {
                    format!("export var {symbol} = 8 as const;")
                }
                _ => format!("export var {symbol}: undefined;"),
            };
            let ns = shape.id().namespace().to_owned();
            let writer = &mut self.ensure_unit(&ns).writer;
            writer.write(line);
            writer.write("");
            debug!(shape = %shape.id(), "emitted sentinel");
            return Ok(true);
        }
        Ok(false)
    }

    fn write_structure_schema(&mut self, shape: &'m Shape) -> Result<(), GenerateError> {
        if self.write_special_or_sentinel(shape)? {
            return Ok(());
        }
        let ns = shape.id().namespace().to_owned();
        let symbol = escape_symbol(shape.id().name());
        let name_var = self.ensure_unit(&ns).store.var(shape.id().name());
        let traits = self.render_trait_table(&ns, shape.traits());
        let member_lines = self.member_entry_lines(shape)?;

        let unit = self.ensure_unit(&ns);
        if shape.is_error() {
            // Error structures bind their descriptor to the generated
            // exception constructor.
            let ctor = format!("__{symbol}");
            unit.writer.add_import("error", Some("__error"), RUNTIME_MODULE);
            unit.writer.add_import(&symbol, Some(&ctor), MODELS_MODULE);
            write_member_table(
                &mut unit.writer,
                &format!("export var {symbol} = __error({name_var}, {traits}, "),
                &member_lines,
                &format!(", {ctor});"),
            );
        } else {
            unit.writer.add_import("struct", Some("__struct"), RUNTIME_MODULE);
            write_member_table(
                &mut unit.writer,
                &format!("export var {symbol} = __struct({name_var}, {traits}, "),
                &member_lines,
                ");",
            );
        }
        unit.writer.write("");
        debug!(shape = %shape.id(), "emitted structure schema");
        Ok(())
    }

    fn write_union_schema(&mut self, shape: &'m Shape) -> Result<(), GenerateError> {
        if self.write_special_or_sentinel(shape)? {
            return Ok(());
        }
        let ns = shape.id().namespace().to_owned();
        let symbol = escape_symbol(shape.id().name());
        let name_var = self.ensure_unit(&ns).store.var(shape.id().name());
        let traits = self.render_trait_table(&ns, shape.traits());
        let member_lines = self.member_entry_lines(shape)?;

        let unit = self.ensure_unit(&ns);
        unit.writer.add_import("struct", Some("__uni"), RUNTIME_MODULE);
        write_member_table(
            &mut unit.writer,
            &format!("export var {symbol} = __uni({name_var}, {traits}, "),
            &member_lines,
            ");",
        );
        unit.writer.write("");
        debug!(shape = %shape.id(), "emitted union schema");
        Ok(())
    }

    fn write_collection_schema(&mut self, shape: &'m Shape) -> Result<(), GenerateError> {
        let Some(element) = shape.element_member() else {
            return Ok(());
        };
        self.write_single_member_schema(shape, element, "list", "__list")
    }

    fn write_map_schema(&mut self, shape: &'m Shape) -> Result<(), GenerateError> {
        let Some(value) = shape.value_member() else {
            return Ok(());
        };
        self.write_single_member_schema(shape, value, "map", "__map")
    }

    /// Shared emission for lists/sets (element member) and maps (value
    /// member). The key member of a map is always a string and is never
    /// represented.
    fn write_single_member_schema(
        &mut self,
        shape: &'m Shape,
        member: &'m Member,
        import_name: &str,
        ctor: &str,
    ) -> Result<(), GenerateError> {
        if self.write_special_or_sentinel(shape)? {
            return Ok(());
        }
        let ns = shape.id().namespace().to_owned();
        let symbol = escape_symbol(shape.id().name());
        let name_var = self.ensure_unit(&ns).store.var(shape.id().name());
        let shape_traits = self.render_trait_table(&ns, shape.traits());

        let entry = if self.elision.omit_schema(member)? {
            let target = self.model.resolve_target(member)?;
            format!("/* {} */", target.id().name())
        } else {
            self.record_cross_namespace_import(shape.id(), member.target())?;
            let reference = self.member_reference(member)?;
            let member_traits = self.render_trait_table(&ns, member.traits());
            format!("[{reference}, {member_traits}]")
        };

        let unit = self.ensure_unit(&ns);
        unit.writer.add_import(import_name, Some(ctor), RUNTIME_MODULE);
        unit.writer.write(format!(
            "export var {symbol} = {ctor}({name_var}, {shape_traits}, {entry});"
        ));
        unit.writer.write("");
        debug!(shape = %shape.id(), "emitted collection schema");
        Ok(())
    }

    fn write_operation_schema(&mut self, shape: &'m Shape) -> Result<(), GenerateError> {
        let Some(binding) = shape.operation_binding() else {
            return Ok(());
        };
        let ns = shape.id().namespace().to_owned();
        let symbol = escape_symbol(shape.id().name());
        let name_var = self.ensure_unit(&ns).store.var(shape.id().name());
        let traits = self.render_trait_table(&ns, shape.traits());
        self.record_cross_namespace_import(shape.id(), &binding.input)?;
        self.record_cross_namespace_import(shape.id(), &binding.output)?;
        let input_symbol = escape_symbol(binding.input.name());
        let output_symbol = escape_symbol(binding.output.name());

        let unit = self.ensure_unit(&ns);
        unit.writer.add_import("op", Some("__op"), RUNTIME_MODULE);
        unit.writer.write(format!(
            "export var {symbol} = __op({name_var}, {traits}, () => {input_symbol}, () => {output_symbol});"
        ));
        unit.writer.write("");
        debug!(shape = %shape.id(), "emitted operation schema");
        Ok(())
    }

    /// Member entries for structures and unions.
    ///
    /// Struct members that qualify for omission are dropped entirely. For
    /// unions every member is emitted so downstream code can positively
    /// identify all known variants (and thereby detect unknown ones).
    fn member_entry_lines(&mut self, shape: &'m Shape) -> Result<Vec<String>, GenerateError> {
        let ns = shape.id().namespace().to_owned();
        let is_union = shape.kind() == ShapeKind::Union;
        let mut lines = Vec::new();
        for member in shape.members() {
            let omit = self.elision.omit_schema(member)?;
            if omit && !is_union {
                continue;
            }
            self.record_cross_namespace_import(shape.id(), member.target())?;
            let reference = self.member_reference(member)?;
            let traits = self.render_trait_table(&ns, member.traits());
            let name_var = self.ensure_unit(&ns).store.var(member.name());
            lines.push(format!("[{name_var}]: [{reference}, {traits}],"));
        }
        Ok(lines)
    }

    /// The lazily-evaluated reference slot of a member entry; empty when
    /// the target is discernible at runtime without a schema.
    fn member_reference(&mut self, member: &'m Member) -> Result<String, GenerateError> {
        if self.elision.is_runtime_discernible_simple_type(member)? {
            return Ok(String::new());
        }
        Ok(format!("() => {}", self.resolve_schema_ref(member)?))
    }

    /// Generally the target's symbol name; blob and timestamp targets
    /// inline a literal tag instead of a descriptor pointer.
    fn resolve_schema_ref(&mut self, member: &'m Member) -> Result<String, GenerateError> {
        let target = self.model.resolve_target(member)?;
        Ok(match target.kind() {
            ShapeKind::Timestamp => target
                .get_trait(&timestamp_format_trait_id())
                .and_then(Value::as_str)
                .map_or_else(|| "\"time\"".to_owned(), |format| format!("\"{format}\"")),
            ShapeKind::Blob => {
                if target.has_trait(&streaming_trait_id()) {
                    "\"streaming-blob\"".to_owned()
                } else {
                    "\"blob\"".to_owned()
                }
            }
            _ => escape_symbol(target.id().name()),
        })
    }

    /// Records an import when the target lives in another namespace and is
    /// a reference schema (scalars, enums, blob, and timestamp are inlined
    /// or registered in their own namespace, never imported).
    fn record_cross_namespace_import(
        &mut self,
        context: &ShapeId,
        target_id: &ShapeId,
    ) -> Result<(), GenerateError> {
        if context.namespace() == target_id.namespace() {
            return Ok(());
        }
        let target = self.model.expect_shape(target_id)?;
        if !is_reference_schema(target.kind()) {
            return Ok(());
        }
        let symbol = escape_symbol(target_id.name());
        let module = format!("./{}", target_id.namespace());
        self.ensure_unit(context.namespace())
            .writer
            .add_import(&symbol, None, &module);
        Ok(())
    }

    /// Renders a trait table: policy-filtered, keys interned through the
    /// namespace store, payloads serialized to literals.
    fn render_trait_table(&mut self, ns: &str, traits: &TraitMap) -> String {
        let policy = self.policy;
        let serializer = self.serializer;
        let mut entries = Vec::new();
        for (id, payload) in traits {
            if !policy.include_trait(id) {
                continue;
            }
            let unit = self.ensure_unit(ns);
            let key = unit.store.var(id.name());
            let value = serializer.serialize(payload, &mut unit.store);
            entries.push(format!("[{key}]: {value}"));
        }
        if entries.is_empty() {
            "{}".to_owned()
        } else {
            format!("{{ {} }}", entries.join(", "))
        }
    }

    fn register_simple_types(&mut self, ns: &str, collected: &CollectedShapes) {
        let reg = registry_symbol(ns);
        let mut entries = Vec::new();
        for (id, simple_type) in &collected.simple {
            if id.namespace() != ns {
                continue;
            }
            let unit = self.ensure_unit(ns);
            let key = unit.store.var(id.name());
            let value = unit.store.var(simple_type);
            entries.push(format!("[{key}]: {value},"));
        }
        let writer = &mut self.ensure_unit(ns).writer;
        if entries.is_empty() {
            writer.write(format!("{reg}.registerSimpleTypes({{}});"));
        } else {
            writer.open_block(&format!("{reg}.registerSimpleTypes({{"), "});", |w| {
                for entry in &entries {
                    w.write(entry);
                }
            });
        }
    }
}

/// Writes `open` + member lines + `close`, collapsing to one line when the
/// member table is empty.
fn write_member_table(writer: &mut CodeWriter, open: &str, lines: &[String], close: &str) {
    if lines.is_empty() {
        writer.write(format!("{open}{{}}{close}"));
    } else {
        writer.open_block(&format!("{open}{{"), &format!("}}{close}"), |w| {
            for line in lines {
                w.write(line);
            }
        });
    }
}

fn new_unit(ns: &str) -> NamespaceUnit {
    let mut writer = CodeWriter::new();
    writer.add_import("TypeRegistry", None, RUNTIME_MODULE);
    writer.write("/* eslint no-var: 0 */");
    writer.write("");
    let reg = registry_symbol(ns);
    writer.write(format!("export const {reg} = TypeRegistry.for(\"{ns}\");"));
    writer.write(format!("{reg}.startCapture();"));
    writer.write("");
    NamespaceUnit {
        writer,
        store: StringStore::new(),
    }
}

/// Registry binding symbol for a namespace.
fn registry_symbol(ns: &str) -> String {
    format!("{}Registry", ns.replace('.', "_"))
}

/// Whether a shape of this kind is referenced through its generated
/// descriptor symbol (as opposed to being inlined as a literal or
/// registered as a simple value kind).
fn is_reference_schema(kind: ShapeKind) -> bool {
    !matches!(
        kind,
        ShapeKind::Boolean
            | ShapeKind::String
            | ShapeKind::Byte
            | ShapeKind::Short
            | ShapeKind::Integer
            | ShapeKind::Long
            | ShapeKind::Float
            | ShapeKind::Double
            | ShapeKind::Enum
            | ShapeKind::IntEnum
            | ShapeKind::Timestamp
            | ShapeKind::Blob
    )
}
