//! Completion synthesis for Slate documents
//!
//! Two sources merge into one candidate list: symbols from the document's
//! table (recomputed per request, never accumulated across scans or
//! documents) and the two builtin pseudo-registers, which are present
//! regardless of table state. Builtins carry their documentation lazily -
//! the bulk listing ships labels only, and `resolve` fills in detail for
//! the one candidate the editor asks about.

use crate::protocol::CompletionItem;
use crate::symbols::{SymbolKind, SymbolTable};

/// Resolve discriminator for the `$val` pseudo-register
const DATA_VAL_REGISTER: i64 = 1;
/// Resolve discriminator for the `$ret` pseudo-register
const DATA_RET_REGISTER: i64 = 2;

/// Completion candidate kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Variable,
    Constant,
    BuiltinConstant,
}

impl CandidateKind {
    /// Numeric LSP CompletionItemKind code
    pub fn lsp_kind(self) -> u8 {
        match self {
            Self::Variable => 6,         // Variable
            Self::Constant => 21,        // Constant
            Self::BuiltinConstant => 14, // Keyword
        }
    }
}

/// Completion provider for Slate
pub struct CompletionProvider {}

impl CompletionProvider {
    /// Create a new completion provider
    pub fn new() -> Self {
        Self {}
    }

    /// Synthesize candidates from the table plus the builtin
    /// pseudo-registers, filtered by the word prefix at the cursor
    /// (case-insensitive; an empty prefix keeps everything).
    pub fn completions(&self, table: &SymbolTable, prefix: &str) -> Vec<CompletionItem> {
        let prefix = prefix.to_lowercase();

        let mut items: Vec<CompletionItem> = table
            .symbols()
            .map(|symbol| {
                let kind = match symbol.kind {
                    SymbolKind::Variable => CandidateKind::Variable,
                    SymbolKind::Constant => CandidateKind::Constant,
                };
                CompletionItem {
                    label: symbol.name.clone(),
                    kind: Some(kind.lsp_kind()),
                    detail: None,
                    documentation: None,
                    data: None,
                }
            })
            .chain(self.builtins())
            .filter(|item| prefix.is_empty() || item.label.to_lowercase().starts_with(&prefix))
            .collect();

        items.sort_by(|a, b| a.label.cmp(&b.label));
        items
    }

    /// The two fixed pseudo-register candidates
    fn builtins(&self) -> impl Iterator<Item = CompletionItem> {
        [
            CompletionItem {
                label: "$val".to_string(),
                kind: Some(CandidateKind::BuiltinConstant.lsp_kind()),
                detail: None,
                documentation: None,
                data: Some(DATA_VAL_REGISTER),
            },
            CompletionItem {
                label: "$ret".to_string(),
                kind: Some(CandidateKind::BuiltinConstant.lsp_kind()),
                detail: None,
                documentation: None,
                data: Some(DATA_RET_REGISTER),
            },
        ]
        .into_iter()
    }

    /// Fill in detail and documentation for a builtin candidate.
    ///
    /// Resolution is keyed by the item's integer discriminator; any other
    /// key returns the item unchanged.
    pub fn resolve(&self, mut item: CompletionItem) -> CompletionItem {
        match item.data {
            Some(DATA_VAL_REGISTER) => {
                item.detail = Some("Set-value pseudo-register".to_string());
                item.documentation = Some(
                    "Reads back the value written by the most recent @set directive."
                        .to_string(),
                );
            }
            Some(DATA_RET_REGISTER) => {
                item.detail = Some("Return-value pseudo-register".to_string());
                item.documentation =
                    Some("Holds the value a routine hands back to its caller.".to_string());
            }
            _ => {}
        }
        item
    }
}

impl Default for CompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}
