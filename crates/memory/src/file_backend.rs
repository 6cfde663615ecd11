//! File-backed layer: JSON-lines records, one file per layer.
//!
//! Each line is `{"content": ..., "timestamp": ...}` where `content` is a
//! string or any JSON value and `timestamp` is optional RFC 3339.
//!
//! Storage location: `~/.recall/layers/<layer>.jsonl`
//!
//! The file is re-read on every query so records appended by the owning
//! store show up without a restart. A missing file is an empty layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recall_core::error::LayerError;
use recall_core::item::{ItemContent, MemoryItem};
use recall_core::layer::{LayerSource, MemoryLayer};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::matching;

/// One line of a layer file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerRecord {
    pub content: ItemContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A layer answering from a JSONL file.
pub struct JsonlLayer {
    layer: MemoryLayer,
    path: PathBuf,
    limit: usize,
}

impl JsonlLayer {
    pub fn new(layer: MemoryLayer, path: PathBuf) -> Self {
        Self {
            layer,
            path,
            limit: 50,
        }
    }

    /// The conventional file for `layer` inside `dir`.
    pub fn in_dir(layer: MemoryLayer, dir: &Path) -> Self {
        Self::new(layer, dir.join(format!("{layer}.jsonl")))
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record to the file, creating it (and its directory) if needed.
    pub async fn append(&self, record: &LayerRecord) -> Result<(), LayerError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.failed(format!("Failed to create layer directory: {e}")))?;
        }
        let mut line = serde_json::to_string(record)
            .map_err(|e| self.invalid(format!("Failed to serialize record: {e}")))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.failed(format!("Failed to open layer file: {e}")))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.failed(format!("Failed to write layer file: {e}")))?;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<MemoryItem>, LayerError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.failed(format!("Failed to read {}: {e}", self.path.display()))),
        };

        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let items: Vec<MemoryItem> = lines
            .iter()
            .filter_map(|line| match serde_json::from_str::<LayerRecord>(line) {
                Ok(record) => Some(MemoryItem {
                    content: record.content,
                    layer: self.layer,
                    timestamp: record.timestamp,
                    layer_weight: None,
                }),
                Err(e) => {
                    warn!(layer = %self.layer, error = %e, "Skipping corrupted layer record");
                    None
                }
            })
            .collect();

        if items.is_empty() && !lines.is_empty() {
            return Err(self.invalid(format!(
                "none of the {} records in {} could be parsed",
                lines.len(),
                self.path.display()
            )));
        }

        debug!(layer = %self.layer, count = items.len(), "Layer file loaded");
        Ok(items)
    }

    fn failed(&self, reason: String) -> LayerError {
        LayerError::QueryFailed {
            layer: self.layer,
            reason,
        }
    }

    fn invalid(&self, reason: String) -> LayerError {
        LayerError::InvalidData {
            layer: self.layer,
            reason,
        }
    }
}

#[async_trait]
impl LayerSource for JsonlLayer {
    fn layer(&self) -> MemoryLayer {
        self.layer
    }

    async fn query(&self, text: &str) -> Result<Vec<MemoryItem>, LayerError> {
        let items = self.load().await?;
        Ok(matching::select(items.iter(), text, self.limit))
    }
}
