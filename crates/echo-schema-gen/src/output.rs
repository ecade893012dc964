// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Output sinks for emitted units.
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error writing an emitted unit.
#[derive(Debug, Error)]
#[error("failed to write unit `{unit}`")]
pub struct SinkError {
    /// Unit name passed to the sink.
    pub unit: String,
    /// Underlying I/O error.
    #[source]
    pub source: io::Error,
}

/// Receives named text units (one per namespace, plus the index).
pub trait OutputSink {
    /// Writes one unit.
    fn write_unit(&mut self, name: &str, contents: &str) -> Result<(), SinkError>;
}

/// In-memory sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    units: BTreeMap<String, String>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of a unit, when written.
    #[must_use]
    pub fn unit(&self, name: &str) -> Option<&str> {
        self.units.get(name).map(String::as_str)
    }

    /// Names of all written units, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }
}

impl OutputSink for MemorySink {
    fn write_unit(&mut self, name: &str, contents: &str) -> Result<(), SinkError> {
        self.units.insert(name.to_owned(), contents.to_owned());
        Ok(())
    }
}

/// Filesystem sink: units become files under a root directory.
#[derive(Debug)]
pub struct DirSink {
    root: PathBuf,
}

impl DirSink {
    /// Creates a sink rooted at `root` (created on first write).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory units are written under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OutputSink for DirSink {
    fn write_unit(&mut self, name: &str, contents: &str) -> Result<(), SinkError> {
        let wrap = |source: io::Error| SinkError {
            unit: name.to_owned(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(wrap)?;
        fs::write(self.root.join(name), contents).map_err(wrap)
    }
}
