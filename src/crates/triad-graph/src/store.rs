//! File-backed, lock-serialized graph storage.
//!
//! Writers take an exclusive advisory lock on the target file, snapshot it
//! to a timestamped backup, write a sibling temp file, fsync, and rename it
//! over the target — so a crash mid-write never leaves a half-written
//! graph. Readers take a shared lock. Locks never span a network call; they
//! are held only for the duration of the local file operations.

use crate::error::{GraphError, Result};
use crate::model::Graph;
use crate::repair::{repair_value, RepairResult};
use crate::validate::{validate, ValidationResult};
use fs4::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use triad_support::ident::validate_identifier;

const DEFAULT_RETENTION: usize = 5;

/// Where a triad's graph file and backups live.
pub struct GraphStore {
    root: PathBuf,
    retention: usize,
}

impl GraphStore {
    /// Open a store rooted at `root` (created if missing), retaining the
    /// default number of backups per triad.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_retention(root, DEFAULT_RETENTION)
    }

    pub fn with_retention(root: impl Into<PathBuf>, retention: usize) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, retention })
    }

    fn graph_path(&self, triad: &str) -> Result<PathBuf> {
        validate_identifier(triad)?;
        Ok(self.root.join(format!("{triad}_graph.json")))
    }

    fn backup_path(&self, triad: &str, timestamp: &str) -> Result<PathBuf> {
        validate_identifier(triad)?;
        Ok(self.root.join(format!("{triad}_graph.json.backup.{timestamp}")))
    }

    /// Load a triad's graph. On invalid JSON: restores from the newest
    /// backup when `auto_restore` is set, otherwise returns the empty-graph
    /// default without writing anything. Never raises for a missing or
    /// corrupted file; `check`/`repair` exist for diagnosing corruption.
    pub fn load(&self, triad: &str, auto_restore: bool) -> Result<Graph> {
        let path = self.graph_path(triad)?;
        if !path.exists() {
            return Ok(Graph::empty(triad));
        }

        let file = File::open(&path)?;
        file.lock_shared()?;
        let contents = fs::read_to_string(&path);
        FileExt::unlock(&file).ok();
        let contents = contents?;

        match serde_json::from_str::<Graph>(&contents) {
            Ok(graph) => Ok(graph),
            Err(e) => {
                warn!(triad, error = %e, "graph file failed to parse");
                if auto_restore {
                    if let Some(latest) = self.list_backups(triad)?.into_iter().next() {
                        let backup_contents = fs::read_to_string(&latest)?;
                        if let Ok(graph) = serde_json::from_str::<Graph>(&backup_contents) {
                            return Ok(graph);
                        }
                    }
                }
                Ok(Graph::empty(triad))
            }
        }
    }

    /// Validate and persist `graph` for `triad`: backup, atomic write, prune.
    pub fn save(&self, triad: &str, graph: &mut Graph) -> Result<()> {
        graph.sync_meta();
        let result = validate(graph);
        if !result.valid {
            return Err(GraphError::Validation(format!(
                "{} violation(s): {:?}",
                result.violations.len(),
                result.violations
            )));
        }

        let path = self.graph_path(triad)?;
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)?;
        lock_file.lock_exclusive()?;

        let write_result = self.write_locked(triad, &path, graph);
        FileExt::unlock(&lock_file).ok();
        write_result
    }

    /// Shared body for `save` and `repair`: assumes the caller already holds
    /// the exclusive lock on `path`.
    fn write_locked(&self, triad: &str, path: &Path, graph: &Graph) -> Result<()> {
        if path.exists() {
            self.backup_locked(triad, path)?;
        }

        let dir = path.parent().ok_or_else(|| {
            GraphError::Io(format!("{} has no parent directory", path.display()))
        })?;
        let mut temp = NamedTempFile::new_in(dir)?;
        let serialized = serde_json::to_string_pretty(graph)
            .map_err(|e| GraphError::Validation(format!("graph failed to serialize: {e}")))?;
        use std::io::Write;
        temp.write_all(serialized.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path)
            .map_err(|e| GraphError::Io(format!("rename failed: {e}")))?;

        self.prune_backups(triad)?;
        Ok(())
    }

    fn backup_locked(&self, triad: &str, path: &Path) -> Result<()> {
        let timestamp = triad_support::time::to_rfc3339(&triad_support::time::now())
            .replace(':', "")
            .replace('.', "");
        let backup = self.backup_path(triad, &timestamp)?;
        fs::copy(path, &backup)?;
        debug!(triad, backup = %backup.display(), "wrote graph backup");
        Ok(())
    }

    fn prune_backups(&self, triad: &str) -> Result<()> {
        let mut backups = self.list_backups(triad)?;
        if backups.len() <= self.retention {
            return Ok(());
        }
        // list_backups returns newest first; drop the tail.
        for stale in backups.split_off(self.retention) {
            fs::remove_file(&stale)?;
        }
        Ok(())
    }

    /// Backups for `triad`, newest first.
    pub fn list_backups(&self, triad: &str) -> Result<Vec<PathBuf>> {
        validate_identifier(triad)?;
        let prefix = format!("{triad}_graph.json.backup.");
        let mut backups: Vec<(PathBuf, String)> = Vec::new();
        if self.root.exists() {
            for entry in fs::read_dir(&self.root)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().to_string();
                if let Some(ts) = name.strip_prefix(&prefix) {
                    backups.push((entry.path(), ts.to_string()));
                }
            }
        }
        backups.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(backups.into_iter().map(|(p, _)| p).collect())
    }

    /// Restore `triad`'s live graph from a specific backup file, persisting
    /// it through the normal atomic-write path.
    pub fn restore(&self, triad: &str, backup: &Path) -> Result<Graph> {
        let contents = fs::read_to_string(backup)?;
        let mut graph: Graph = serde_json::from_str(&contents)
            .map_err(|e| GraphError::Corruption(format!("backup is not valid JSON: {e}")))?;
        self.save(triad, &mut graph)?;
        Ok(graph)
    }

    /// Validate the current on-disk graph for `triad` without repairing it.
    pub fn check(&self, triad: &str) -> Result<ValidationResult> {
        let path = self.graph_path(triad)?;
        if !path.exists() {
            return Ok(ValidationResult {
                valid: true,
                violations: Vec::new(),
            });
        }
        let contents = fs::read_to_string(&path)?;
        match serde_json::from_str::<Graph>(&contents) {
            Ok(graph) => Ok(validate(&graph)),
            Err(e) => Ok(ValidationResult {
                valid: false,
                violations: vec![crate::validate::Violation {
                    kind: "corruption".to_string(),
                    detail: e.to_string(),
                }],
            }),
        }
    }

    /// Check every triad graph found directly under the store root.
    pub fn check_all(&self) -> Result<Vec<(String, ValidationResult)>> {
        let mut results = Vec::new();
        if !self.root.exists() {
            return Ok(results);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(triad) = name.strip_suffix("_graph.json") {
                results.push((triad.to_string(), self.check(triad)?));
            }
        }
        Ok(results)
    }

    /// Best-effort repair: drop unsalvageable nodes/edges, rewrite counters,
    /// and persist the repaired graph.
    pub fn repair(&self, triad: &str) -> Result<RepairResult> {
        let path = self.graph_path(triad)?;
        if !path.exists() {
            return Ok(RepairResult {
                actions: Vec::new(),
                nodes_dropped: 0,
                edges_dropped: 0,
            });
        }

        let lock_file = OpenOptions::new().write(true).open(&path)?;
        lock_file.lock_exclusive()?;
        let outcome = (|| -> Result<RepairResult> {
            let contents = fs::read_to_string(&path)?;
            let raw: serde_json::Value = serde_json::from_str(&contents)
                .map_err(|e| GraphError::Corruption(format!("not valid JSON: {e}")))?;
            let (graph, result) = repair_value(triad, &raw);
            self.write_locked(triad, &path, &graph)?;
            Ok(result)
        })();
        FileExt::unlock(&lock_file).ok();
        outcome
    }
}
