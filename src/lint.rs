//! Naming lint over Slate variable declarations
//!
//! One policy is enforced: variable names declared with `@set` must not be
//! written entirely in uppercase (that spelling is reserved for `@define`
//! constants by convention).

use crate::directive::{DirectiveKind, DirectiveMatcher};

/// A single naming violation, spanning the name token in bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub name: String,
    /// Start byte offset of the name token
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Violation {
    /// Diagnostic message for this violation
    pub fn message(&self) -> String {
        format!("{} is all uppercase.", self.name)
    }
}

/// Linter over variable-directive occurrences
pub struct NamingLinter {}

impl NamingLinter {
    /// Create a new linter
    pub fn new() -> Self {
        Self {}
    }

    /// Scan `text` for ALL-CAPS variable names, in ascending offset order.
    ///
    /// Emission stops once `max_problems` violations have been produced,
    /// which bounds scan cost on pathological documents. Empty captures are
    /// never flagged.
    pub fn lint(
        &self,
        matcher: &DirectiveMatcher,
        text: &str,
        max_problems: usize,
    ) -> Vec<Violation> {
        matcher
            .occurrences(text, DirectiveKind::Set)
            .filter(|o| is_all_uppercase(&o.name))
            .take(max_problems)
            .map(|o| Violation {
                start: o.offset,
                end: o.offset + o.name.len(),
                name: o.name,
            })
            .collect()
    }
}

impl Default for NamingLinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-empty and made up solely of ASCII uppercase letters, digits, and
/// underscores.
fn is_all_uppercase(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
