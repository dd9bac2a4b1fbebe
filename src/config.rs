//! `settings.json` / `chat_records.json` persistence under the OS config directory.
//!
//! Both files share one small persistence layer: `Settings` drives the terminal/LLM connection
//! parameters, `ChatRecord` is the LLM side-panel history (out of scope for the terminal core's
//! correctness, but read/written through the same module so there is exactly one place that knows
//! where these files live).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const APP_DIR: &str = "floeterm";
const SETTINGS_FILE: &str = "settings.json";
const CHAT_RECORDS_FILE: &str = "chat_records.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub font: String,
    pub font_size: u16,
    pub llm_server: String,
    pub llm_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font: "monospace".to_string(),
            font_size: 13,
            llm_server: "127.0.0.1".to_string(),
            llm_port: 11434,
        }
    }
}

/// One saved LLM side-panel chat: a transcript plus when it started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChatRecord {
    pub chat_id: String,
    pub start_time: String,
    pub message_list: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR)).ok_or(ConfigError::NoConfigDir)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })?;
    }
    let text = serde_json::to_string_pretty(value)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })
}

impl Settings {
    /// Loads `settings.json`, defaulting sensibly (rather than failing startup) when the file is
    /// absent or malformed.
    pub fn load() -> Self {
        match Self::path().and_then(|p| read_json(&p)) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!(%err, "using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        write_json(&Self::path()?, self)
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(config_dir()?.join(SETTINGS_FILE))
    }
}

/// Loads the persisted chat history, treating a missing or malformed file as "no history yet"
/// rather than an error -- mirrors the original's `load_chat_record`.
pub fn load_chat_records() -> Vec<ChatRecord> {
    match chat_records_path().and_then(|p| read_json(&p)) {
        Ok(records) => records,
        Err(err) => {
            tracing::debug!(%err, "no prior chat records");
            Vec::new()
        }
    }
}

pub fn save_chat_records(records: &[ChatRecord]) -> Result<(), ConfigError> {
    write_json(&chat_records_path()?, &records)
}

fn chat_records_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CHAT_RECORDS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_sane() {
        let s = Settings::default();
        assert_eq!(s.font_size, 13);
        assert!(!s.llm_server.is_empty());
    }

    #[test]
    fn settings_round_trip_through_json() {
        let s = Settings { font: "Fira Code".into(), font_size: 14, llm_server: "host".into(), llm_port: 8080 };
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn chat_record_round_trip_through_json() {
        let rec = ChatRecord {
            chat_id: "side".into(),
            start_time: "2026-01-01 00:00:00".into(),
            message_list: vec![ChatMessage { role: "user".into(), content: "hi".into() }],
        };
        let json = serde_json::to_string(&rec).unwrap();
        let back: ChatRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }
}
