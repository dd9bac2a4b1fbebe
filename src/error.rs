//! Error taxonomy for the seams around the terminal core.
//!
//! The core itself (decoder, style engine, document, projector) is infallible by construction --
//! protocol anomalies are recovered locally per the core's error-handling design and never produce
//! a `Result::Err`. Only the transport, config, and LLM seams return `Result`, using `thiserror`
//! leaf enums at each module boundary and `miette::Result` at the binary/controller boundary,
//! matching the teacher's `thiserror`+`miette` pairing.

use thiserror::Error;

/// Failures from the SSH transport seam: connecting, allocating a pty, or moving bytes.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {hostname}:{port}: {source}")]
    Connect { hostname: String, port: u16, source: std::io::Error },

    #[error("ssh handshake or authentication failed: {0}")]
    Auth(#[from] ssh2::Error),

    #[error("failed to allocate pty / open shell channel: {0}")]
    Shell(String),

    #[error("session {session_id} has no active shell channel")]
    NoActiveShell { session_id: String },

    #[error("transport read/write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures persisting or loading `settings.json` / `chat_records.json`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not resolve an OS config directory")]
    NoConfigDir,

    #[error("failed to read {path}: {source}")]
    Read { path: std::path::PathBuf, source: std::io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: std::path::PathBuf, source: std::io::Error },

    #[error("failed to parse {path} as JSON: {source}")]
    Parse { path: std::path::PathBuf, source: serde_json::Error },
}

/// Failures from the LLM streaming HTTP seam. Out of scope for the terminal core's correctness;
/// surfaced only so the controller can log and drop the in-flight request.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to LLM server failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM server returned a non-success status: {0}")]
    Status(reqwest::StatusCode),
}
