//! LLM streaming seam: a thin Ollama chat client, explicitly out of scope for the terminal core's
//! behavior (§1 Non-goals) but carried as ambient infrastructure per §10.5.
//!
//! Grounded on `llm_client.py`'s `send_user_chat_message_to_llm` (POST `/api/chat` with
//! `stream: true`, one JSON object per line) and `send_model_check_request` (GET `/api/ps`).
//! Unlike the original's dedicated queue-draining thread, this is a plain async function the
//! controller task awaits and streams out over an `mpsc` channel -- there is no separate LLM
//! task, since `reqwest`'s streaming body is already a `Future`/`Stream` the executor can poll
//! alongside everything else.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::ChatMessage;
use crate::error::LlmError;
use crate::router::messages::SessionId;

/// One incremental chunk of an in-progress chat answer.
#[derive(Debug, Clone)]
pub struct AnswerChunk {
    pub session_id: SessionId,
    pub content: String,
    pub done: bool,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatStreamLine {
    #[serde(default)]
    message: Option<ChatMessageLine>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct ChatMessageLine {
    #[serde(default)]
    content: String,
}

/// Lists models Ollama currently has loaded, via `GET /api/ps`. Used for the server-reachability
/// check the UI runs before enabling the chat panel.
pub async fn check_models(client: &reqwest::Client, base_url: &str) -> Result<Vec<String>, LlmError> {
    let url = format!("{base_url}/api/ps");
    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(LlmError::Status(response.status()));
    }
    #[derive(Deserialize)]
    struct Ps {
        #[serde(default)]
        models: Vec<PsModel>,
    }
    #[derive(Deserialize)]
    struct PsModel {
        name: String,
    }
    let ps: Ps = response.json().await?;
    Ok(ps.models.into_iter().map(|m| m.name).collect())
}

/// Sends `messages` to `POST {base_url}/api/chat` with `stream: true` and forwards each decoded
/// content delta to `chunk_tx` as it arrives, mirroring the original's line-by-line
/// `response.iter_lines()` loop. Returns once the server reports `done: true` or the stream ends.
pub async fn stream_chat(
    client: &reqwest::Client,
    base_url: &str,
    model: &str,
    messages: &[ChatMessage],
    session_id: SessionId,
    chunk_tx: mpsc::UnboundedSender<AnswerChunk>,
) -> Result<(), LlmError> {
    let url = format!("{base_url}/api/chat");
    let request = ChatRequest { model, messages, stream: true };
    let response = client.post(&url).json(&request).send().await?;
    if !response.status().is_success() {
        return Err(LlmError::Status(response.status()));
    }

    let mut stream = response.bytes_stream();
    let mut carry = Vec::new();
    while let Some(bytes) = stream.next().await {
        let bytes = bytes?;
        carry.extend_from_slice(&bytes);
        while let Some(pos) = carry.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = carry.drain(..=pos).collect();
            let line = &line[..line.len() - 1];
            if line.is_empty() {
                continue;
            }
            let Ok(parsed) = serde_json::from_slice::<ChatStreamLine>(line) else { continue };
            let Some(message) = parsed.message else { continue };
            if chunk_tx
                .send(AnswerChunk { session_id, content: message.content, done: parsed.done })
                .is_err()
            {
                return Ok(());
            }
        }
    }
    Ok(())
}
