// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CLI: load a `shape-ir/v1` model and emit per-namespace schema modules.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use echo_schema_gen::{
    DirSink, GeneratorConfig, JsTraitSerializer, PreludeTraitPolicy, SchemaGenerator,
};
use echo_shape_model::{load_model, ShapeId};
use tracing::info;

/// Generate runtime schema modules from a shape IR document.
#[derive(Debug, Parser)]
#[command(name = "echo-schema-gen", version, about)]
struct Args {
    /// Path to the `shape-ir/v1` JSON document.
    #[arg(long)]
    model: PathBuf,

    /// Output source root; units land under `<out-dir>/schemas/`.
    #[arg(long, default_value = "src")]
    out_dir: PathBuf,

    /// Restrict generation to these services (absolute ids, repeatable).
    /// Default: every service in the model.
    #[arg(long = "service")]
    services: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let json = fs::read_to_string(&args.model)
        .with_context(|| format!("reading model {}", args.model.display()))?;
    let model = load_model(&json).context("loading shape IR")?;

    let services = args
        .services
        .iter()
        .map(|s| {
            s.parse::<ShapeId>()
                .with_context(|| format!("bad service id `{s}`"))
        })
        .collect::<Result<Vec<_>>>()?;

    let policy = PreludeTraitPolicy::default();
    let serializer = JsTraitSerializer;
    let generator = SchemaGenerator::new(&model, &policy, &serializer, GeneratorConfig { services })
        .context("building generation session")?;

    let schemas_dir = args.out_dir.join("schemas");
    let mut sink = DirSink::new(&schemas_dir);
    generator.run(&mut sink).context("generating schemas")?;

    info!(out = %schemas_dir.display(), "schemas written");
    Ok(())
}
