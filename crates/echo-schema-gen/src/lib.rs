// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! echo-schema-gen: schema compaction and code generation.
//!
//! Walks an API shape graph from its exported service operations, decides
//! per shape whether a full runtime descriptor must be emitted or a
//! minimal sentinel suffices, and emits deduplicated TypeScript schema
//! modules, one per namespace, for the `@echo/runtime-schema` runtime.
//!
//! The pipeline is a single-threaded batch pass: reachability walk →
//! elision queries (memoized per session) → phased, deterministic
//! emission. Running it twice over an unchanged model produces
//! byte-identical output.

mod collect;
mod elision;
mod emit;
mod output;
mod reserved;
mod store;
mod traits;
mod writer;

/// Reachability walk results and the collector that produces them.
pub use collect::{CollectedShapes, ReachabilityCollector};
/// Elision queries (default-schema equivalence, omission, discernibility).
pub use elision::{ElisionIndex, SchemaSubject, MAX_DEPTH};
/// The generation session and its configuration.
pub use emit::{GenerateError, GeneratorConfig, SchemaGenerator, RUNTIME_MODULE};
/// Output sinks for emitted units.
pub use output::{DirSink, MemorySink, OutputSink, SinkError};
/// Reserved-word escaping applied to emitted symbols.
pub use reserved::escape_symbol;
/// Per-namespace literal interning.
pub use store::StringStore;
/// Trait filter/serializer collaborator seams and their defaults.
pub use traits::{JsTraitSerializer, PreludeTraitPolicy, TraitPolicy, TraitSerializer};
/// Block-structured unit writer.
pub use writer::CodeWriter;
