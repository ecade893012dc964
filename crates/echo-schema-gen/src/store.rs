// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-namespace string interning for emitted literals.
use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

/// Interns repeated literal strings into short generated identifiers.
///
/// One store exists per namespace unit. Identifiers derive from the
/// literal's initials (uppercase letters and digits, else the leading
/// character), prefixed with `_`; collisions between distinct literals get
/// a numeric suffix in allocation order. Allocation is first-seen-order
/// deterministic, which [`Self::flush`] preserves so identical input
/// graphs always produce identical declaration blocks.
#[derive(Debug, Default)]
pub struct StringStore {
    by_literal: FxHashMap<String, String>,
    taken: BTreeSet<String>,
    order: Vec<(String, String)>,
}

impl StringStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier assigned to `literal`, allocating one on
    /// first sight.
    pub fn var(&mut self, literal: &str) -> String {
        if let Some(ident) = self.by_literal.get(literal) {
            return ident.clone();
        }
        let ident = self.allocate(literal);
        self.by_literal.insert(literal.to_owned(), ident.clone());
        self.taken.insert(ident.clone());
        self.order.push((ident.clone(), literal.to_owned()));
        ident
    }

    /// True when no literal has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Renders every allocation as a `const` declaration block, one line
    /// per literal in first-seen order.
    #[must_use]
    pub fn flush(&self) -> String {
        let mut out = String::new();
        for (ident, literal) in &self.order {
            out.push_str("const ");
            out.push_str(ident);
            out.push_str(" = \"");
            out.push_str(literal);
            out.push_str("\";\n");
        }
        out
    }

    fn allocate(&self, literal: &str) -> String {
        let base = initials(literal);
        let candidate = format!("_{base}");
        if !self.taken.contains(&candidate) {
            return candidate;
        }
        let mut n = 1_u32;
        loop {
            let candidate = format!("_{base}{n}");
            if !self.taken.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Initials of a literal: its uppercase letters and digits, or the first
/// alphanumeric character when it has none, or `v` as a last resort.
fn initials(literal: &str) -> String {
    let caps: String = literal
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect();
    if !caps.is_empty() {
        return caps;
    }
    literal
        .chars()
        .find(char::is_ascii_alphanumeric)
        .map_or_else(|| "v".to_owned(), |c| c.to_string())
}
