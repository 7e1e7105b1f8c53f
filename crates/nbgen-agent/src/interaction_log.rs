//! Append-only interaction log
//!
//! A log store is a single file holding a pretty-printed JSON array of
//! [`InteractionRecord`]s. Every append reads the array, pushes one record
//! and rewrites the whole file through a sibling temporary file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use nbgen_ai::Message;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::conversation::TokenTally;
use crate::error::{Error, Result};

/// Default directory for log stores, relative to the working directory
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Token counts as written to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl From<TokenTally> for TokenUsage {
    fn from(tally: TokenTally) -> Self {
        Self {
            prompt_tokens: tally.prompt_tokens,
            completion_tokens: tally.completion_tokens,
            total_tokens: tally.total(),
        }
    }
}

/// Snapshot of one completed loop invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub input_messages: Vec<Message>,
    pub output_content: String,
    pub conversation_messages: Vec<Message>,
    pub token_usage: TokenUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Handle on one log store file
#[derive(Debug)]
pub struct InteractionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl InteractionLog {
    /// Open (creating if needed) a store inside `dir`.
    ///
    /// Without a file name the store is `ai_log_<YYYYmmdd_HHMMSS>.json`.
    pub fn open(dir: impl AsRef<Path>, file_name: Option<&str>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let file_name = match file_name {
            Some(name) => name.to_string(),
            None => default_file_name(),
        };
        let path = dir.join(file_name);
        if !path.exists() {
            fs::write(&path, "[]")?;
        }

        tracing::debug!(path = %path.display(), "Opened interaction log");
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. `total_tokens` is derived from the tally.
    pub fn record(
        &self,
        input_messages: &[Message],
        output_content: &str,
        conversation_messages: &[Message],
        tally: TokenTally,
        model: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<InteractionRecord> {
        let record = InteractionRecord {
            timestamp: Utc::now(),
            model: model.to_string(),
            input_messages: input_messages.to_vec(),
            output_content: output_content.to_string(),
            conversation_messages: conversation_messages.to_vec(),
            token_usage: tally.into(),
            metadata: metadata.cloned(),
        };

        let _guard = self.lock.lock();
        let mut records = self.read_records()?;
        records.push(record.clone());
        self.write_records(&records)?;

        tracing::info!(
            path = %self.path.display(),
            total_tokens = record.token_usage.total_tokens,
            "Logged interaction"
        );
        Ok(record)
    }

    /// Read back every record in the store
    pub fn records(&self) -> Result<Vec<InteractionRecord>> {
        let _guard = self.lock.lock();
        self.read_records()
    }

    fn read_records(&self) -> Result<Vec<InteractionRecord>> {
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| {
            Error::Log(format!(
                "{} is not a valid log store: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write_records(&self, records: &[InteractionRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| Error::Log(format!("failed to serialize records: {}", e)))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn default_file_name() -> String {
    format!("ai_log_{}.json", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tally(prompt: u64, completion: u64) -> TokenTally {
        TokenTally {
            prompt_tokens: prompt,
            completion_tokens: completion,
        }
    }

    #[test]
    fn test_open_initializes_empty_array() {
        let dir = TempDir::new().unwrap();
        let log = InteractionLog::open(dir.path().join("nested/logs"), Some("run.json")).unwrap();
        assert_eq!(fs::read_to_string(log.path()).unwrap(), "[]");
        assert!(log.records().unwrap().is_empty());
    }

    #[test]
    fn test_default_file_name_shape() {
        let name = default_file_name();
        assert!(name.starts_with("ai_log_"));
        assert!(name.ends_with(".json"));
        // ai_log_ + YYYYmmdd_HHMMSS + .json
        assert_eq!(name.len(), "ai_log_".len() + 15 + ".json".len());
    }

    #[test]
    fn test_record_appends_in_order() {
        let dir = TempDir::new().unwrap();
        let log = InteractionLog::open(dir.path(), Some("log.json")).unwrap();
        let seed = vec![Message::user("q")];

        log.record(&seed, "first", &seed, tally(1, 2), "m", None)
            .unwrap();
        log.record(&seed, "second", &seed, tally(3, 4), "m", None)
            .unwrap();

        let records = log.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].output_content, "first");
        assert_eq!(records[1].output_content, "second");
        assert_eq!(records[1].token_usage.total_tokens, 7);
    }

    #[test]
    fn test_existing_store_is_preserved() {
        let dir = TempDir::new().unwrap();
        let seed = vec![Message::user("q")];
        {
            let log = InteractionLog::open(dir.path(), Some("log.json")).unwrap();
            log.record(&seed, "a", &seed, tally(0, 0), "m", None)
                .unwrap();
        }
        let log = InteractionLog::open(dir.path(), Some("log.json")).unwrap();
        assert_eq!(log.records().unwrap().len(), 1);
    }

    #[test]
    fn test_metadata_omitted_when_absent() {
        let dir = TempDir::new().unwrap();
        let log = InteractionLog::open(dir.path(), Some("log.json")).unwrap();
        let seed = vec![Message::user("q")];
        let meta = serde_json::json!({"dandiset_id": "000001"});

        log.record(&seed, "a", &seed, tally(0, 0), "m", None)
            .unwrap();
        log.record(&seed, "b", &seed, tally(0, 0), "m", Some(&meta))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(log.path()).unwrap()).unwrap();
        assert!(raw[0].get("metadata").is_none());
        assert_eq!(raw[1]["metadata"]["dandiset_id"], "000001");
        assert_eq!(raw[0]["token_usage"]["total_tokens"], 0);
        assert!(!dir.path().join("log.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("log.json"), "{not json").unwrap();
        let log = InteractionLog::open(dir.path(), Some("log.json")).unwrap();
        let err = log
            .record(&[], "x", &[], tally(0, 0), "m", None)
            .unwrap_err();
        assert!(matches!(err, Error::Log(_)));
    }
}
