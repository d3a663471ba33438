//! Slate language server sessions
//!
//! `SlateLanguageServer` owns one `DocumentState` per open URI and runs a
//! full re-scan (symbol table + diagnostics) on every content change.
//! Outbound traffic is returned as `ServerAction`s for the transport to
//! deliver, which keeps the server testable without a wire.

use crate::completion::CompletionProvider;
use crate::config::{SettingsCache, SlateSettings, SETTINGS_SECTION};
use crate::directive::DirectiveMatcher;
use crate::lint::NamingLinter;
use crate::protocol::{
    offset_to_position, position_to_offset, CompletionItem, CompletionOptions, CompletionParams,
    ConfigurationItem, ConfigurationParams, Diagnostic, DiagnosticRelatedInformation,
    DidChangeParams, DidCloseParams, DidOpenParams, InitializeParams, InitializeResult, Location,
    PublishDiagnosticsParams, Range, ServerCapabilities, TextDocumentSyncOptions,
};
use crate::symbols::SymbolTable;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Remediation hint attached as related information
const REMEDIATION_HINT: &str = "make the variable name lower case or lower style";

/// Per-document state, exclusively owned by its session
struct DocumentState {
    text: String,
    version: i64,
    table: SymbolTable,
}

/// Outbound call for the transport to deliver
#[derive(Debug)]
pub enum ServerAction {
    /// Send a textDocument/publishDiagnostics notification
    PublishDiagnostics(PublishDiagnosticsParams),
    /// Send a workspace/configuration request with the given id
    RequestConfiguration {
        id: i64,
        params: ConfigurationParams,
    },
}

/// Slate language server
pub struct SlateLanguageServer {
    documents: HashMap<String, DocumentState>,
    matcher: DirectiveMatcher,
    linter: NamingLinter,
    completion: CompletionProvider,
    settings: SettingsCache,
    /// Outstanding workspace/configuration requests: id -> document URI
    pending_configuration: HashMap<i64, String>,
    next_request_id: i64,
    configuration_support: bool,
    related_information_support: bool,
}

impl SlateLanguageServer {
    /// Create a new language server
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            matcher: DirectiveMatcher::new(),
            linter: NamingLinter::new(),
            completion: CompletionProvider::new(),
            settings: SettingsCache::new(),
            pending_configuration: HashMap::new(),
            next_request_id: 1,
            configuration_support: false,
            related_information_support: false,
        }
    }

    /// Handle initialize request
    pub fn initialize(&mut self, params: &InitializeParams) -> InitializeResult {
        self.configuration_support = params
            .capabilities
            .workspace
            .as_ref()
            .and_then(|w| w.configuration)
            .unwrap_or(false);
        self.related_information_support = params
            .capabilities
            .text_document
            .as_ref()
            .and_then(|td| td.publish_diagnostics.as_ref())
            .and_then(|pd| pd.related_information)
            .unwrap_or(false);

        InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: TextDocumentSyncOptions {
                    open_close: true,
                    change: 1, // Full sync
                },
                completion_provider: Some(CompletionOptions {
                    trigger_characters: vec!["@".to_string(), "$".to_string()],
                    resolve_provider: true,
                }),
            },
        }
    }

    /// Handle document open
    pub fn did_open(&mut self, params: DidOpenParams) -> Vec<ServerAction> {
        let uri = params.text_document.uri;
        info!("Opened {}", uri);
        self.documents.insert(
            uri.clone(),
            DocumentState {
                text: params.text_document.text,
                version: params.text_document.version,
                table: SymbolTable::new(),
            },
        );
        self.schedule_scan(uri)
    }

    /// Handle document change (full text replacement)
    pub fn did_change(&mut self, params: DidChangeParams) -> Vec<ServerAction> {
        let Some(change) = params.content_changes.into_iter().next() else {
            return Vec::new();
        };
        let uri = params.text_document.uri;

        match self.documents.get_mut(&uri) {
            Some(doc) => {
                doc.text = change.text;
                doc.version = params.text_document.version;
            }
            None => {
                self.documents.insert(
                    uri.clone(),
                    DocumentState {
                        text: change.text,
                        version: params.text_document.version,
                        table: SymbolTable::new(),
                    },
                );
            }
        }
        self.schedule_scan(uri)
    }

    /// Handle document close: discard the session's state and clear any
    /// published diagnostics.
    pub fn did_close(&mut self, params: &DidCloseParams) -> Vec<ServerAction> {
        let uri = &params.text_document.uri;
        info!("Closed {}", uri);
        self.documents.remove(uri);
        self.settings.remove(uri);
        vec![ServerAction::PublishDiagnostics(PublishDiagnosticsParams {
            uri: uri.clone(),
            diagnostics: Vec::new(),
        })]
    }

    /// Handle workspace/didChangeConfiguration: drop every cached settings
    /// scope and revalidate all open documents.
    pub fn did_change_configuration(&mut self) -> Vec<ServerAction> {
        self.settings.clear();
        let uris: Vec<String> = self.documents.keys().cloned().collect();
        let mut actions = Vec::new();
        for uri in uris {
            actions.extend(self.schedule_scan(uri));
        }
        actions
    }

    /// Handle a workspace/configuration response from the client.
    ///
    /// A missing or malformed payload falls back to default settings for
    /// this scan rather than failing the session.
    pub fn configuration_response(
        &mut self,
        id: i64,
        result: Option<&serde_json::Value>,
    ) -> Vec<ServerAction> {
        let Some(uri) = self.pending_configuration.remove(&id) else {
            debug!("Dropping response for unknown request id {}", id);
            return Vec::new();
        };

        let settings = result
            .and_then(|value| value.as_array())
            .and_then(|items| items.first())
            .and_then(|item| serde_json::from_value::<SlateSettings>(item.clone()).ok())
            .unwrap_or_else(|| {
                warn!("Configuration fetch failed for {}, using defaults", uri);
                SlateSettings::default()
            });

        self.settings.insert(uri.clone(), settings);
        if self.documents.contains_key(&uri) {
            self.scan(&uri)
        } else {
            Vec::new()
        }
    }

    /// Handle completion request: table-derived symbols merged with the
    /// builtin pseudo-registers, filtered by the word prefix at the cursor.
    pub fn completion(&self, params: &CompletionParams) -> Vec<CompletionItem> {
        let Some(doc) = self.documents.get(&params.text_document.uri) else {
            return Vec::new();
        };
        let offset = position_to_offset(&doc.text, &params.position);
        let prefix = word_prefix(&doc.text, offset);
        self.completion.completions(&doc.table, prefix)
    }

    /// Handle completionItem/resolve
    pub fn resolve(&self, item: CompletionItem) -> CompletionItem {
        self.completion.resolve(item)
    }

    /// Symbol table for an open document, if any
    pub fn symbol_table(&self, uri: &str) -> Option<&SymbolTable> {
        self.documents.get(uri).map(|doc| &doc.table)
    }

    /// Run a scan now if settings for the URI are resolved, otherwise
    /// request configuration first; the scan runs when the response
    /// arrives.
    fn schedule_scan(&mut self, uri: String) -> Vec<ServerAction> {
        if !self.configuration_support || self.settings.get(&uri).is_some() {
            return self.scan(&uri);
        }

        let id = self.next_request_id;
        self.next_request_id += 1;
        self.pending_configuration.insert(id, uri.clone());
        vec![ServerAction::RequestConfiguration {
            id,
            params: ConfigurationParams {
                items: vec![ConfigurationItem {
                    scope_uri: Some(uri),
                    section: Some(SETTINGS_SECTION.to_string()),
                }],
            },
        }]
    }

    /// One full pass over current document text: rebuild the symbol table
    /// and publish fresh diagnostics.
    fn scan(&mut self, uri: &str) -> Vec<ServerAction> {
        match self.documents.get_mut(uri) {
            Some(doc) => doc.table = SymbolTable::rebuild(&self.matcher, &doc.text),
            None => return Vec::new(),
        }
        let Some(doc) = self.documents.get(uri) else {
            return Vec::new();
        };

        let max_problems = self
            .settings
            .get(uri)
            .cloned()
            .unwrap_or_default()
            .max_problems();
        let violations = self.linter.lint(&self.matcher, &doc.text, max_problems);
        debug!(
            "Scanned {} (version {}): {} symbols, {} diagnostics",
            uri,
            doc.version,
            doc.table.len(),
            violations.len()
        );

        let diagnostics = violations
            .into_iter()
            .map(|violation| {
                let range = Range {
                    start: offset_to_position(&doc.text, violation.start),
                    end: offset_to_position(&doc.text, violation.end),
                };
                let related_information = if self.related_information_support {
                    Some(vec![DiagnosticRelatedInformation {
                        location: Location {
                            uri: uri.to_string(),
                            range,
                        },
                        message: REMEDIATION_HINT.to_string(),
                    }])
                } else {
                    None
                };
                Diagnostic {
                    range,
                    severity: Some(2), // Warning
                    code: Some("all-uppercase".to_string()),
                    source: Some("slate-lsp".to_string()),
                    message: violation.message(),
                    related_information,
                }
            })
            .collect();

        vec![ServerAction::PublishDiagnostics(PublishDiagnosticsParams {
            uri: uri.to_string(),
            diagnostics,
        })]
    }
}

impl Default for SlateLanguageServer {
    fn default() -> Self {
        Self::new()
    }
}

/// The identifier-shaped prefix ending at `offset`
fn word_prefix(text: &str, offset: usize) -> &str {
    let mut offset = offset.min(text.len());
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &text[..offset];
    let start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(before.len());
    &before[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        ClientCapabilities, Position, PublishDiagnosticsClientCapabilities,
        TextDocumentClientCapabilities, TextDocumentContentChangeEvent, TextDocumentIdentifier,
        TextDocumentItem, VersionedTextDocumentIdentifier, WorkspaceClientCapabilities,
    };
    use crate::symbols::SymbolKind;
    use serde_json::json;

    const EXAMPLE: &str = "@set myVar 10\n@SET LOUD 5\n@define MAX_LEN 99";

    fn initialized_server(configuration: bool, related_information: bool) -> SlateLanguageServer {
        let mut server = SlateLanguageServer::new();
        server.initialize(&InitializeParams {
            process_id: None,
            root_uri: None,
            capabilities: ClientCapabilities {
                workspace: Some(WorkspaceClientCapabilities {
                    configuration: Some(configuration),
                }),
                text_document: Some(TextDocumentClientCapabilities {
                    publish_diagnostics: Some(PublishDiagnosticsClientCapabilities {
                        related_information: Some(related_information),
                    }),
                }),
            },
        });
        server
    }

    fn open(server: &mut SlateLanguageServer, uri: &str, text: &str) -> Vec<ServerAction> {
        server.did_open(DidOpenParams {
            text_document: TextDocumentItem {
                uri: uri.to_string(),
                language_id: "slate".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
    }

    fn published(actions: &[ServerAction]) -> &PublishDiagnosticsParams {
        match actions {
            [ServerAction::PublishDiagnostics(params)] => params,
            other => panic!("expected one publish action, got {:?}", other),
        }
    }

    #[test]
    fn test_open_publishes_diagnostics_and_builds_table() {
        let mut server = initialized_server(false, false);
        let actions = open(&mut server, "file:///a.slate", EXAMPLE);

        let params = published(&actions);
        assert_eq!(params.uri, "file:///a.slate");
        assert_eq!(params.diagnostics.len(), 1);

        let diagnostic = &params.diagnostics[0];
        assert_eq!(diagnostic.message, "LOUD is all uppercase.");
        assert_eq!(diagnostic.severity, Some(2));
        assert_eq!(diagnostic.range.start, Position { line: 1, character: 5 });
        assert_eq!(diagnostic.range.end, Position { line: 1, character: 9 });
        assert!(diagnostic.related_information.is_none());

        let table = server.symbol_table("file:///a.slate").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("myVar").unwrap().kind, SymbolKind::Variable);
        assert_eq!(table.get("LOUD").unwrap().kind, SymbolKind::Variable);
        assert_eq!(table.get("MAX_LEN").unwrap().kind, SymbolKind::Constant);
    }

    #[test]
    fn test_related_information_targets_violation_range() {
        let mut server = initialized_server(false, true);
        let actions = open(&mut server, "file:///a.slate", EXAMPLE);

        let diagnostic = &published(&actions).diagnostics[0];
        let related = diagnostic.related_information.as_ref().unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].location.uri, "file:///a.slate");
        assert_eq!(related[0].location.range, diagnostic.range);
        assert_eq!(
            related[0].message,
            "make the variable name lower case or lower style"
        );
    }

    #[test]
    fn test_change_rescans_current_text_only() {
        let mut server = initialized_server(false, false);
        open(&mut server, "file:///a.slate", "@set LOUD 1");

        let actions = server.did_change(DidChangeParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: "file:///a.slate".to_string(),
                version: 2,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                text: "@set quiet 1".to_string(),
            }],
        });

        assert!(published(&actions).diagnostics.is_empty());
        let table = server.symbol_table("file:///a.slate").unwrap();
        assert!(table.get("LOUD").is_none());
        assert!(table.get("quiet").is_some());
    }

    #[test]
    fn test_configuration_gates_scan() {
        let mut server = initialized_server(true, false);
        let actions = open(&mut server, "file:///a.slate", "@set AA 1\n@set BB 2");

        let id = match &actions[..] {
            [ServerAction::RequestConfiguration { id, params }] => {
                assert_eq!(params.items.len(), 1);
                assert_eq!(params.items[0].scope_uri.as_deref(), Some("file:///a.slate"));
                assert_eq!(params.items[0].section.as_deref(), Some("slate"));
                *id
            }
            other => panic!("expected configuration request, got {:?}", other),
        };

        let actions =
            server.configuration_response(id, Some(&json!([{ "maxNumberOfProblems": 1 }])));
        assert_eq!(published(&actions).diagnostics.len(), 1);
    }

    #[test]
    fn test_configuration_failure_falls_back_to_defaults() {
        let mut server = initialized_server(true, false);
        let actions = open(&mut server, "file:///a.slate", "@set AA 1\n@set BB 2");
        let id = match &actions[..] {
            [ServerAction::RequestConfiguration { id, .. }] => *id,
            other => panic!("expected configuration request, got {:?}", other),
        };

        let actions = server.configuration_response(id, None);
        assert_eq!(published(&actions).diagnostics.len(), 2);
    }

    #[test]
    fn test_unknown_response_id_is_dropped() {
        let mut server = initialized_server(true, false);
        open(&mut server, "file:///a.slate", "@set AA 1");
        assert!(server.configuration_response(99, None).is_empty());
    }

    #[test]
    fn test_configuration_change_clears_cache_and_revalidates() {
        let mut server = initialized_server(true, false);
        let actions = open(&mut server, "file:///a.slate", "@set AA 1\n@set BB 2");
        let id = match &actions[..] {
            [ServerAction::RequestConfiguration { id, .. }] => *id,
            other => panic!("unexpected {:?}", other),
        };
        server.configuration_response(id, Some(&json!([{ "maxNumberOfProblems": 1 }])));

        // Cached settings now satisfy the next scan without a round-trip.
        let actions = server.did_change(DidChangeParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: "file:///a.slate".to_string(),
                version: 2,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                text: "@set AA 1\n@set BB 2".to_string(),
            }],
        });
        assert_eq!(published(&actions).diagnostics.len(), 1);

        // A configuration change drops the cache, forcing a fresh fetch.
        let actions = server.did_change_configuration();
        assert!(matches!(
            actions.as_slice(),
            [ServerAction::RequestConfiguration { .. }]
        ));
    }

    #[test]
    fn test_close_evicts_and_clears_diagnostics() {
        let mut server = initialized_server(false, false);
        open(&mut server, "file:///a.slate", "@set LOUD 1");

        let actions = server.did_close(&DidCloseParams {
            text_document: TextDocumentIdentifier {
                uri: "file:///a.slate".to_string(),
            },
        });

        assert!(published(&actions).diagnostics.is_empty());
        assert!(server.symbol_table("file:///a.slate").is_none());
    }

    #[test]
    fn test_documents_are_isolated() {
        let mut server = initialized_server(false, false);
        let noisy = open(&mut server, "file:///noisy.slate", "@set LOUD 1");
        let clean = open(&mut server, "file:///clean.slate", "@set quiet 1");

        assert_eq!(published(&noisy).diagnostics.len(), 1);
        assert!(published(&clean).diagnostics.is_empty());
        assert_eq!(server.symbol_table("file:///noisy.slate").unwrap().len(), 1);
        assert_eq!(server.symbol_table("file:///clean.slate").unwrap().len(), 1);
    }

    #[test]
    fn test_completion_merges_table_and_builtins() {
        let mut server = initialized_server(false, false);
        open(&mut server, "file:///a.slate", EXAMPLE);

        let items = server.completion(&CompletionParams {
            text_document: TextDocumentIdentifier {
                uri: "file:///a.slate".to_string(),
            },
            position: Position { line: 0, character: 0 },
        });

        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        for expected in ["myVar", "LOUD", "MAX_LEN", "$val", "$ret"] {
            assert!(labels.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_completion_prefix_filters_at_cursor() {
        let mut server = initialized_server(false, false);
        open(&mut server, "file:///a.slate", "@set maxRate 1\nmax");

        let items = server.completion(&CompletionParams {
            text_document: TextDocumentIdentifier {
                uri: "file:///a.slate".to_string(),
            },
            position: Position { line: 1, character: 3 },
        });

        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["maxRate"]);
    }

    #[test]
    fn test_completion_for_unknown_document_is_empty() {
        let server = SlateLanguageServer::new();
        let items = server.completion(&CompletionParams {
            text_document: TextDocumentIdentifier {
                uri: "file:///nope.slate".to_string(),
            },
            position: Position { line: 0, character: 0 },
        });
        assert!(items.is_empty());
    }

    #[test]
    fn test_word_prefix() {
        assert_eq!(word_prefix("@set my", 7), "my");
        assert_eq!(word_prefix("@set my ", 8), "");
        assert_eq!(word_prefix("$v", 2), "$v");
        assert_eq!(word_prefix("", 0), "");
    }
}
