//! `floeterm`: an xterm-compatible terminal emulator core (byte decoding, SGR styling, a
//! scrollback-backed screen model, and a stateless view projector) plus the ambient SSH
//! transport, LLM side-panel, and session-routing seams around it.

pub mod config;
pub mod core;
pub mod error;
pub mod llm;
pub mod router;
pub mod transport;
