// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Block-structured text writer with an import ledger.
//!
//! Assembles one namespace unit's body: plain lines, nested indented
//! blocks, and `import` declarations that render ahead of the body. Import
//! bookkeeping is deduplicated and sorted so a unit's header never depends
//! on emission order.
use std::collections::{BTreeMap, BTreeSet};

const INDENT: &str = "  ";

/// One imported symbol: exported name plus optional local alias.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ImportedSymbol {
    name: String,
    alias: Option<String>,
}

/// Writer for one emitted source unit.
#[derive(Debug, Default)]
pub struct CodeWriter {
    imports: BTreeMap<String, BTreeSet<ImportedSymbol>>,
    lines: Vec<String>,
    indent: usize,
}

impl CodeWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one line at the current indentation. Embedded newlines
    /// split into multiple lines.
    pub fn write(&mut self, text: impl AsRef<str>) {
        for raw in text.as_ref().split('\n') {
            if raw.is_empty() {
                self.lines.push(String::new());
            } else {
                let mut line = INDENT.repeat(self.indent);
                line.push_str(raw);
                self.lines.push(line);
            }
        }
    }

    /// Writes `open`, runs `body` one level deeper, then writes `close`.
    pub fn open_block(&mut self, open: &str, close: &str, body: impl FnOnce(&mut Self)) {
        self.write(open);
        self.indent += 1;
        body(self);
        self.indent -= 1;
        self.write(close);
    }

    /// Records an import of `name` (optionally aliased) from `module`.
    /// Duplicate records collapse.
    pub fn add_import(&mut self, name: &str, alias: Option<&str>, module: &str) {
        self.imports
            .entry(module.to_owned())
            .or_default()
            .insert(ImportedSymbol {
                name: name.to_owned(),
                alias: alias.map(str::to_owned),
            });
    }

    /// Renders the import header followed by the body.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (module, symbols) in &self.imports {
            out.push_str("import { ");
            let rendered: Vec<String> = symbols
                .iter()
                .map(|s| match &s.alias {
                    Some(alias) => format!("{} as {alias}", s.name),
                    None => s.name.clone(),
                })
                .collect();
            out.push_str(&rendered.join(", "));
            out.push_str(" } from \"");
            out.push_str(module);
            out.push_str("\";\n");
        }
        if !self.imports.is_empty() {
            out.push('\n');
        }
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}
