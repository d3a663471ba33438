//! Directive matching for Slate source text
//!
//! Slate introduces symbols with line-level directives rather than a full
//! grammar: `@set <name> <value>` declares a variable and
//! `@define <NAME> <value>` declares a constant. Matching is lexical; it
//! never looks at surrounding syntax.

use regex::Regex;

/// The two directive kinds that introduce symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// `@set` / `@Set` / `@SET` - variable declaration
    Set,
    /// `@define` / `@Define` / `@DEFINE` - constant declaration
    Define,
}

/// One textual match of a directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// The captured name token. Empty when the keyword has no following
    /// token; consumers skip empty captures.
    pub name: String,
    /// The rest of the line after the name token
    pub raw_value: String,
    /// Byte offset of the name token in the scanned text
    pub offset: usize,
}

/// Matcher over Slate directive occurrences.
///
/// Holds compiled patterns only; each `occurrences` call produces a fresh
/// sequence over the given text.
pub struct DirectiveMatcher {
    set: Regex,
    define: Regex,
}

impl DirectiveMatcher {
    /// Create a new matcher
    pub fn new() -> Self {
        // The variable capture accepts any token; constant names are
        // restricted to uppercase/digit/underscore by the pattern itself.
        Self {
            set: Regex::new(r"@(?:set|Set|SET)\b[ \t]*(\S*)[ \t]*([^\r\n]*)").unwrap(),
            define: Regex::new(r"@(?:define|Define|DEFINE)\b[ \t]*([A-Z0-9_]*)[ \t]*([^\r\n]*)")
                .unwrap(),
        }
    }

    /// Lazily iterate directive occurrences in `text`, in ascending offset
    /// order. The sequence is finite and restartable; the matcher keeps no
    /// state between calls.
    pub fn occurrences<'a>(
        &'a self,
        text: &'a str,
        kind: DirectiveKind,
    ) -> impl Iterator<Item = Occurrence> + 'a {
        let pattern = match kind {
            DirectiveKind::Set => &self.set,
            DirectiveKind::Define => &self.define,
        };

        pattern.captures_iter(text).filter_map(|caps| {
            let name = caps.get(1)?;
            let raw_value = caps
                .get(2)
                .map(|m| m.as_str().trim_end().to_string())
                .unwrap_or_default();
            Some(Occurrence {
                name: name.as_str().to_string(),
                raw_value,
                offset: name.start(),
            })
        })
    }
}

impl Default for DirectiveMatcher {
    fn default() -> Self {
        Self::new()
    }
}
