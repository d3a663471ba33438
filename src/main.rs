//! Slate Language Server Binary
//!
//! Speaks the Language Server Protocol over stdin/stdout with
//! Content-Length framing. Logging goes to stderr; stdout carries only
//! protocol traffic.

use clap::Parser;
use serde_json::{json, Value};
use slate_lsp::error::Result;
use slate_lsp::protocol::{
    CompletionItem, CompletionParams, DidChangeParams, DidCloseParams, DidOpenParams,
    InitializeParams,
};
use slate_lsp::server::{ServerAction, SlateLanguageServer};
use std::io::{self, Read, Write};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Slate language server
#[derive(Parser)]
#[command(name = "slate-lsp")]
#[command(version)]
#[command(about = "Language server for the Slate assembly language", long_about = None)]
struct Cli {
    /// Use stdio transport (the only transport; accepted for editor
    /// compatibility)
    #[arg(long)]
    stdio: bool,

    /// Log filter directive, e.g. "debug" or "slate_lsp=trace"
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .with_writer(io::stderr)
        .init();

    info!("Starting Slate language server");
    if !cli.stdio {
        debug!("No --stdio flag given; using stdio transport anyway");
    }

    let mut server = SlateLanguageServer::new();
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut shutdown_requested = false;

    loop {
        let body = match read_message(&mut stdin)? {
            Some(body) => body,
            None => break,
        };

        let message: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(e) => {
                warn!("Skipping undecodable message: {}", e);
                continue;
            }
        };

        let method = message.get("method").and_then(Value::as_str);
        let id = message.get("id").cloned();
        let params = message.get("params");

        match method {
            Some("initialize") => {
                let params: InitializeParams = params
                    .cloned()
                    .and_then(|p| serde_json::from_value(p).ok())
                    .unwrap_or_default();
                let result = server.initialize(&params);
                respond(&mut stdout, id, serde_json::to_value(result)?)?;
            }
            Some("initialized") => {}
            Some("shutdown") => {
                shutdown_requested = true;
                respond(&mut stdout, id, Value::Null)?;
            }
            Some("exit") => {
                if shutdown_requested {
                    break;
                }
                std::process::exit(1);
            }
            Some("textDocument/didOpen") => {
                if let Some(params) = decode::<DidOpenParams>(params) {
                    let actions = server.did_open(params);
                    deliver(&mut stdout, actions)?;
                }
            }
            Some("textDocument/didChange") => {
                if let Some(params) = decode::<DidChangeParams>(params) {
                    let actions = server.did_change(params);
                    deliver(&mut stdout, actions)?;
                }
            }
            Some("textDocument/didClose") => {
                if let Some(params) = decode::<DidCloseParams>(params) {
                    let actions = server.did_close(&params);
                    deliver(&mut stdout, actions)?;
                }
            }
            Some("workspace/didChangeConfiguration") => {
                let actions = server.did_change_configuration();
                deliver(&mut stdout, actions)?;
            }
            Some("textDocument/completion") => {
                let items = decode::<CompletionParams>(params)
                    .map(|params| server.completion(&params))
                    .unwrap_or_default();
                respond(&mut stdout, id, serde_json::to_value(items)?)?;
            }
            Some("completionItem/resolve") => {
                match decode::<CompletionItem>(params) {
                    Some(item) => {
                        let resolved = server.resolve(item);
                        respond(&mut stdout, id, serde_json::to_value(resolved)?)?;
                    }
                    None => respond(&mut stdout, id, Value::Null)?,
                }
            }
            Some(other) => {
                debug!("Unhandled method {}", other);
                if id.is_some() {
                    respond(&mut stdout, id, Value::Null)?;
                }
            }
            None => {
                // No method: a response to one of our own requests
                // (workspace/configuration).
                if let Some(id) = id.as_ref().and_then(Value::as_i64) {
                    let actions = server.configuration_response(id, message.get("result"));
                    deliver(&mut stdout, actions)?;
                }
            }
        }
    }

    info!("Slate language server stopped");
    Ok(())
}

/// Decode request params, logging and dropping the message on failure so a
/// malformed request never takes the process down.
fn decode<T: serde::de::DeserializeOwned>(params: Option<&Value>) -> Option<T> {
    let value = params?.clone();
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            error!("Malformed params: {}", e);
            None
        }
    }
}

/// Read one Content-Length framed message; None at end of stream.
fn read_message(reader: &mut impl Read) -> Result<Option<String>> {
    let mut header = Vec::new();
    let mut byte = [0u8; 1];

    while !header.ends_with(b"\r\n\r\n") {
        let n = reader.read(&mut byte)?;
        if n == 0 {
            return Ok(None);
        }
        header.extend_from_slice(&byte);
    }

    let header_text = String::from_utf8_lossy(&header);
    let mut content_length = None;
    for line in header_text.split("\r\n") {
        if let Some(rest) = line
            .strip_prefix("Content-Length:")
            .or_else(|| line.strip_prefix("content-length:"))
        {
            content_length = rest.trim().parse::<usize>().ok();
        }
    }

    let Some(length) = content_length else {
        warn!("Header without Content-Length, skipping");
        return Ok(Some(String::new()));
    };

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;
    Ok(Some(String::from_utf8_lossy(&body).to_string()))
}

/// Write one framed message
fn write_message(out: &mut impl Write, message: &Value) -> Result<()> {
    let body = serde_json::to_string(message)?;
    write!(out, "Content-Length: {}\r\n\r\n", body.len())?;
    out.write_all(body.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Send a response to a client request
fn respond(out: &mut impl Write, id: Option<Value>, result: Value) -> Result<()> {
    write_message(
        out,
        &json!({
            "jsonrpc": "2.0",
            "id": id.unwrap_or(Value::Null),
            "result": result,
        }),
    )
}

/// Deliver the server's outbound actions
fn deliver(out: &mut impl Write, actions: Vec<ServerAction>) -> Result<()> {
    for action in actions {
        match action {
            ServerAction::PublishDiagnostics(params) => {
                write_message(
                    out,
                    &json!({
                        "jsonrpc": "2.0",
                        "method": "textDocument/publishDiagnostics",
                        "params": params,
                    }),
                )?;
            }
            ServerAction::RequestConfiguration { id, params } => {
                write_message(
                    out,
                    &json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "method": "workspace/configuration",
                        "params": params,
                    }),
                )?;
            }
        }
    }
    Ok(())
}
