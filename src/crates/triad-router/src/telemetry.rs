//! Append-only JSONL telemetry for routing decisions, rotated by size.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const ROTATION_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;
const RETAINED_GENERATIONS: u32 = 2;
const PROMPT_SNIPPET_MAX_LEN: usize = 50;

/// How a routing decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMethod {
    Semantic,
    Llm,
    Manual,
    GracePeriod,
    Cancelled,
}

/// One telemetry record, one line of the JSONL log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Utc>,
    pub prompt_snippet: String,
    pub chosen_triad: Option<String>,
    pub confidence: f64,
    pub method: RoutingMethod,
    pub latency_ms: u64,
    pub overridden: bool,
}

impl TelemetryRecord {
    pub fn new(
        prompt: &str,
        chosen_triad: Option<String>,
        confidence: f64,
        method: RoutingMethod,
        latency_ms: u64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            prompt_snippet: truncate_snippet(prompt),
            chosen_triad,
            confidence,
            method,
            latency_ms,
            overridden: false,
        }
    }

    pub fn with_overridden(mut self, overridden: bool) -> Self {
        self.overridden = overridden;
        self
    }
}

fn truncate_snippet(prompt: &str) -> String {
    if prompt.chars().count() <= PROMPT_SNIPPET_MAX_LEN {
        prompt.to_string()
    } else {
        prompt.chars().take(PROMPT_SNIPPET_MAX_LEN).collect()
    }
}

/// A rotating JSONL telemetry sink at a fixed path, e.g.
/// `<home>/.claude/router/logs/routing_telemetry.jsonl`.
pub struct TelemetryLog {
    path: PathBuf,
}

impl TelemetryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn at_home(home: &Path) -> Self {
        Self::new(
            home.join(".claude")
                .join("router")
                .join("logs")
                .join("routing_telemetry.jsonl"),
        )
    }

    /// Append one record, rotating the log first if it has grown past the
    /// threshold.
    pub fn append(&self, record: &TelemetryRecord) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        self.rotate_if_needed()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)
            .map_err(|e| crate::error::RouterError::Corruption(e.to_string()))?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn rotate_if_needed(&self) -> Result<()> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if size < ROTATION_THRESHOLD_BYTES {
            return Ok(());
        }

        for generation in (1..RETAINED_GENERATIONS).rev() {
            let from = self.generation_path(generation);
            let to = self.generation_path(generation + 1);
            if from.exists() {
                fs::rename(&from, &to)?;
            }
        }
        let first = self.generation_path(1);
        fs::rename(&self.path, &first)?;
        Ok(())
    }

    fn generation_path(&self, generation: u32) -> PathBuf {
        let mut name = self.path.clone();
        name.set_extension(format!("jsonl.{generation}"));
        name
    }

    /// Read back every record currently in the live (non-rotated) file, in
    /// append order. For tests and diagnostics only.
    pub fn read_current(&self) -> Result<Vec<TelemetryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        let mut records = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            records.push(
                serde_json::from_str(line)
                    .map_err(|e| crate::error::RouterError::Corruption(e.to_string()))?,
            );
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = TelemetryLog::new(dir.path().join("telemetry.jsonl"));
        let record = TelemetryRecord::new("hello world", Some("design".into()), 0.9, RoutingMethod::Semantic, 12);
        log.append(&record).unwrap();

        let records = log.read_current().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].chosen_triad.as_deref(), Some("design"));
    }

    #[test]
    fn test_prompt_snippet_is_truncated() {
        let long_prompt = "x".repeat(200);
        let record = TelemetryRecord::new(&long_prompt, None, 0.0, RoutingMethod::Cancelled, 1);
        assert_eq!(record.prompt_snippet.len(), PROMPT_SNIPPET_MAX_LEN);
    }

    #[test]
    fn test_short_prompt_is_not_truncated() {
        let record = TelemetryRecord::new("hi", None, 0.0, RoutingMethod::Manual, 1);
        assert_eq!(record.prompt_snippet, "hi");
    }

    #[test]
    fn test_rotation_moves_oversized_log_aside() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("telemetry.jsonl");
        fs::write(&log_path, "x".repeat((ROTATION_THRESHOLD_BYTES + 1) as usize)).unwrap();
        let log = TelemetryLog::new(&log_path);
        let record = TelemetryRecord::new("after rotation", None, 0.5, RoutingMethod::Semantic, 5);
        log.append(&record).unwrap();

        assert!(log_path.with_extension("jsonl.1").exists());
        let records = log.read_current().unwrap();
        assert_eq!(records.len(), 1);
    }
}
