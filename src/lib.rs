//! Slate Language Server
//!
//! Language intelligence for the Slate assembly language:
//!
//! - Symbol extraction from `@set` (variable) and `@define` (constant)
//!   directives
//! - Naming diagnostics: ALL-CAPS variable names are flagged
//! - Completion for declared symbols plus the builtin pseudo-registers
//!   `$val` and `$ret`
//!
//! Symbols are recognized lexically over raw document text; there is no
//! AST, scoping, or type checking. Every content change triggers a full
//! re-scan so diagnostics and completions always reflect the current text.

pub mod completion;
pub mod config;
pub mod directive;
pub mod error;
pub mod lint;
pub mod protocol;
pub mod server;
pub mod symbols;

pub use error::{Result, SlateError};
pub use server::SlateLanguageServer;
