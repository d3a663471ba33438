//! Symbol extraction from Slate directives

use crate::directive::{DirectiveKind, DirectiveMatcher, Occurrence};
use std::collections::HashMap;

/// Symbol kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Constant,
}

/// A named entity extracted from a directive occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Byte offset of the declaring name token
    pub declared_at: usize,
    pub raw_value: String,
}

/// Per-document symbol table.
///
/// Holds at most one entry per name; a later declaration overwrites an
/// earlier one. The table is rebuilt from scratch on every scan and
/// discarded when the owning document closes.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Symbol>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Build a table from a full scan of `text`.
    ///
    /// Occurrences of both directive kinds are merged in ascending offset
    /// order so that "later declaration wins" holds across kinds, not just
    /// within one. Empty captures are skipped.
    pub fn rebuild(matcher: &DirectiveMatcher, text: &str) -> Self {
        let mut occurrences: Vec<(Occurrence, SymbolKind)> = matcher
            .occurrences(text, DirectiveKind::Set)
            .map(|o| (o, SymbolKind::Variable))
            .chain(
                matcher
                    .occurrences(text, DirectiveKind::Define)
                    .map(|o| (o, SymbolKind::Constant)),
            )
            .filter(|(o, _)| !o.name.is_empty())
            .collect();
        occurrences.sort_by_key(|(o, _)| o.offset);

        let mut entries = HashMap::new();
        for (occurrence, kind) in occurrences {
            entries.insert(
                occurrence.name.clone(),
                Symbol {
                    name: occurrence.name,
                    kind,
                    declared_at: occurrence.offset,
                    raw_value: occurrence.raw_value,
                },
            );
        }

        Self { entries }
    }

    /// Look up a symbol by name
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    /// Iterate all symbols
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.values()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
