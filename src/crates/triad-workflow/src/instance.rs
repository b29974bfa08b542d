//! Workflow instance data model and file-backed lifecycle manager.
//!
//! Instances live as one JSON file each, moved between `instances/`,
//! `completed/`, and `abandoned/` as their status changes — isolating
//! writers to a single triad's progress from every other running instance.

use crate::error::{Result, WorkflowError};
use chrono::{DateTime, Utc};
use fs4::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use triad_support::ident::{slugify, validate_identifier};
use triad_support::time::now;

const INSTANCE_ID_SLUG_MAX_LEN: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTriad {
    pub triad_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedTriad {
    pub triad_id: String,
    pub skipped_at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowProgress {
    #[serde(default)]
    pub current_triad: Option<String>,
    #[serde(default)]
    pub completed_triads: Vec<CompletedTriad>,
    #[serde(default)]
    pub skipped_triads: Vec<SkippedTriad>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deviation {
    #[serde(rename = "type")]
    pub deviation_type: String,
    pub from_triad: Option<String>,
    pub to_triad: String,
    #[serde(default)]
    pub skipped: Vec<String>,
    pub reason: String,
    pub user: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceMetadata {
    pub title: String,
    pub started_by: String,
    pub started_at: DateTime<Utc>,
    pub status: String,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub abandon_reason: Option<String>,
    #[serde(default)]
    pub abandoned_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub instance_id: String,
    pub workflow_type: String,
    pub metadata: InstanceMetadata,
    #[serde(default)]
    pub workflow_progress: WorkflowProgress,
    #[serde(default)]
    pub workflow_deviations: Vec<Deviation>,
    #[serde(default)]
    pub significance_metrics: Value,
}

/// Which on-disk directory an instance currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    InProgress,
    Completed,
    Abandoned,
}

/// Summary view used by `list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub instance_id: String,
    pub workflow_type: String,
    pub title: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub current_triad: Option<String>,
}

fn generate_instance_id(title: &str) -> String {
    let slug = slugify(title, INSTANCE_ID_SLUG_MAX_LEN);
    let stamp = now();
    let timestamp = stamp.format("%Y%m%d-%H%M%S").to_string();
    let micros = stamp.timestamp_subsec_micros() % 1_000_000;
    format!("{slug}-{timestamp}-{micros:06}")
}

/// File-backed manager for workflow instance lifecycle.
pub struct InstanceManager {
    instances_dir: PathBuf,
    completed_dir: PathBuf,
    abandoned_dir: PathBuf,
}

impl InstanceManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let instances_dir = base_dir.join("instances");
        let completed_dir = base_dir.join("completed");
        let abandoned_dir = base_dir.join("abandoned");
        fs::create_dir_all(&instances_dir)?;
        fs::create_dir_all(&completed_dir)?;
        fs::create_dir_all(&abandoned_dir)?;
        Ok(Self { instances_dir, completed_dir, abandoned_dir })
    }

    fn dir_for(&self, status: InstanceStatus) -> &Path {
        match status {
            InstanceStatus::InProgress => &self.instances_dir,
            InstanceStatus::Completed => &self.completed_dir,
            InstanceStatus::Abandoned => &self.abandoned_dir,
        }
    }

    pub fn create(
        &self,
        workflow_type: &str,
        title: &str,
        user: &str,
    ) -> Result<String> {
        if workflow_type.is_empty() || title.is_empty() || user.is_empty() {
            return Err(WorkflowError::InstanceValidation(
                "workflow_type, title, and user must be non-empty".to_string(),
            ));
        }

        let instance_id = generate_instance_id(title);
        let instance = WorkflowInstance {
            instance_id: instance_id.clone(),
            workflow_type: workflow_type.to_string(),
            metadata: InstanceMetadata {
                title: title.to_string(),
                started_by: user.to_string(),
                started_at: now(),
                status: "in_progress".to_string(),
                completed_at: None,
                abandon_reason: None,
                abandoned_at: None,
                extra: HashMap::new(),
            },
            workflow_progress: WorkflowProgress::default(),
            workflow_deviations: Vec::new(),
            significance_metrics: Value::Object(Default::default()),
        };

        self.write_atomic(&self.instances_dir.join(format!("{instance_id}.json")), &instance)?;
        Ok(instance_id)
    }

    fn find_file(&self, instance_id: &str) -> Result<(PathBuf, InstanceStatus)> {
        validate_identifier(instance_id)?;
        for (dir, status) in [
            (&self.instances_dir, InstanceStatus::InProgress),
            (&self.completed_dir, InstanceStatus::Completed),
            (&self.abandoned_dir, InstanceStatus::Abandoned),
        ] {
            let path = dir.join(format!("{instance_id}.json"));
            if path.exists() {
                return Ok((path, status));
            }
        }
        Err(WorkflowError::InstanceNotFound(instance_id.to_string()))
    }

    pub fn load(&self, instance_id: &str) -> Result<WorkflowInstance> {
        let (path, _) = self.find_file(instance_id)?;
        let file = File::open(&path)?;
        file.lock_shared()?;
        let contents = fs::read_to_string(&path);
        FileExt::unlock(&file).ok();
        let contents = contents?;
        serde_json::from_str(&contents)
            .map_err(|e| WorkflowError::InstanceValidation(format!("{}: {e}", path.display())))
    }

    /// Deep-merge a patch: object fields merge key-by-key, scalars replace.
    pub fn update(&self, instance_id: &str, patch: &Value) -> Result<WorkflowInstance> {
        let instance = self.load(instance_id)?;
        let mut value = serde_json::to_value(&instance)
            .map_err(|e| WorkflowError::InstanceValidation(e.to_string()))?;
        merge_json(&mut value, patch);
        let updated: WorkflowInstance = serde_json::from_value(value)
            .map_err(|e| WorkflowError::InstanceValidation(e.to_string()))?;
        let (path, _) = self.find_file(instance_id)?;
        self.write_atomic(&path, &updated)?;
        Ok(updated)
    }

    pub fn mark_triad_completed(
        &self,
        instance_id: &str,
        triad_id: &str,
        duration_minutes: Option<f64>,
    ) -> Result<WorkflowInstance> {
        let mut instance = self.load(instance_id)?;
        let already_completed = instance
            .workflow_progress
            .completed_triads
            .iter()
            .any(|c| c.triad_id == triad_id);

        if !already_completed {
            instance.workflow_progress.completed_triads.push(CompletedTriad {
                triad_id: triad_id.to_string(),
                completed_at: now(),
                duration_minutes: duration_minutes.unwrap_or(0.0),
            });
        }
        instance.workflow_progress.current_triad = Some(triad_id.to_string());

        let (path, _) = self.find_file(instance_id)?;
        self.write_atomic(&path, &instance)?;
        Ok(instance)
    }

    pub fn mark_triad_skipped(
        &self,
        instance_id: &str,
        triad_id: &str,
        reason: &str,
    ) -> Result<WorkflowInstance> {
        let mut instance = self.load(instance_id)?;
        instance.workflow_progress.skipped_triads.push(SkippedTriad {
            triad_id: triad_id.to_string(),
            skipped_at: now(),
            reason: reason.to_string(),
        });
        let (path, _) = self.find_file(instance_id)?;
        self.write_atomic(&path, &instance)?;
        Ok(instance)
    }

    pub fn add_deviation(&self, instance_id: &str, mut deviation: Deviation) -> Result<WorkflowInstance> {
        let mut instance = self.load(instance_id)?;
        if deviation.user.is_none() {
            deviation.user = instance.metadata.started_by.clone().into();
        }
        instance.workflow_deviations.push(deviation);
        let (path, _) = self.find_file(instance_id)?;
        self.write_atomic(&path, &instance)?;
        Ok(instance)
    }

    pub fn complete(&self, instance_id: &str) -> Result<WorkflowInstance> {
        let mut instance = self.load(instance_id)?;
        instance.metadata.status = "completed".to_string();
        instance.metadata.completed_at = Some(now());
        self.move_instance(instance_id, &instance, InstanceStatus::Completed)?;
        Ok(instance)
    }

    pub fn abandon(&self, instance_id: &str, reason: &str) -> Result<WorkflowInstance> {
        let mut instance = self.load(instance_id)?;
        instance.metadata.status = "abandoned".to_string();
        instance.metadata.abandon_reason = Some(reason.to_string());
        instance.metadata.abandoned_at = Some(now());
        self.move_instance(instance_id, &instance, InstanceStatus::Abandoned)?;
        Ok(instance)
    }

    fn move_instance(
        &self,
        instance_id: &str,
        instance: &WorkflowInstance,
        to_status: InstanceStatus,
    ) -> Result<()> {
        let (from_path, _) = self.find_file(instance_id)?;
        let to_path = self.dir_for(to_status).join(format!("{instance_id}.json"));
        self.write_atomic(&to_path, instance)?;
        if from_path != to_path && from_path.exists() {
            fs::remove_file(&from_path)?;
        }
        Ok(())
    }

    /// Summaries across the given status (or all three, if `None`), newest
    /// `started_at` first.
    pub fn list(&self, status: Option<InstanceStatus>) -> Result<Vec<InstanceSummary>> {
        let dirs: Vec<&Path> = match status {
            Some(s) => vec![self.dir_for(s)],
            None => vec![&self.instances_dir, &self.completed_dir, &self.abandoned_dir],
        };

        let mut summaries = Vec::new();
        for dir in dirs {
            if !dir.exists() {
                continue;
            }
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Ok(contents) = fs::read_to_string(&path) else { continue };
                let Ok(instance) = serde_json::from_str::<WorkflowInstance>(&contents) else { continue };
                summaries.push(InstanceSummary {
                    instance_id: instance.instance_id,
                    workflow_type: instance.workflow_type,
                    title: instance.metadata.title,
                    status: instance.metadata.status,
                    started_at: instance.metadata.started_at,
                    current_triad: instance.workflow_progress.current_triad,
                });
            }
        }
        summaries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(summaries)
    }

    fn write_atomic(&self, path: &Path, instance: &WorkflowInstance) -> Result<()> {
        let dir = path.parent().ok_or_else(|| {
            WorkflowError::Io(format!("{} has no parent directory", path.display()))
        })?;
        let lock_file = OpenOptions::new().create(true).write(true).open(path)?;
        lock_file.lock_exclusive()?;
        let result = (|| -> Result<()> {
            let mut temp = NamedTempFile::new_in(dir)?;
            let serialized = serde_json::to_string_pretty(instance)
                .map_err(|e| WorkflowError::InstanceValidation(e.to_string()))?;
            use std::io::Write;
            temp.write_all(serialized.as_bytes())?;
            temp.as_file().sync_all()?;
            temp.persist(path).map_err(|e| WorkflowError::Io(format!("rename failed: {e}")))?;
            Ok(())
        })();
        FileExt::unlock(&lock_file).ok();
        result
    }
}

/// Recursively merge `patch` into `target`: object fields merge key-by-key,
/// everything else (including arrays) is replaced wholesale.
fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                merge_json(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, patch) => {
            *target = patch.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manager = InstanceManager::new(dir.path()).unwrap();
        let id = manager.create("software-development", "OAuth2 Integration", "user@example.com").unwrap();
        let instance = manager.load(&id).unwrap();
        assert_eq!(instance.workflow_type, "software-development");
        assert_eq!(instance.metadata.status, "in_progress");
    }

    #[test]
    fn test_rapid_creation_produces_unique_ids() {
        let dir = tempfile::tempdir().unwrap();
        let manager = InstanceManager::new(dir.path()).unwrap();
        let ids: Vec<String> = (0..20)
            .map(|_| manager.create("wf", "Same Title", "user").unwrap())
            .collect();
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_load_missing_instance_errors() {
        let dir = tempfile::tempdir().unwrap();
        let manager = InstanceManager::new(dir.path()).unwrap();
        assert!(matches!(manager.load("nope"), Err(WorkflowError::InstanceNotFound(_))));
    }

    #[test]
    fn test_load_rejects_unsafe_instance_id() {
        let dir = tempfile::tempdir().unwrap();
        let manager = InstanceManager::new(dir.path()).unwrap();
        assert!(manager.load("../escape").is_err());
    }

    #[test]
    fn test_mark_triad_completed_appends_once() {
        let dir = tempfile::tempdir().unwrap();
        let manager = InstanceManager::new(dir.path()).unwrap();
        let id = manager.create("wf", "Title", "user").unwrap();
        manager.mark_triad_completed(&id, "idea-validation", None).unwrap();
        let instance = manager.mark_triad_completed(&id, "idea-validation", None).unwrap();
        assert_eq!(instance.workflow_progress.completed_triads.len(), 1);
    }

    #[test]
    fn test_complete_moves_file_to_completed_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manager = InstanceManager::new(dir.path()).unwrap();
        let id = manager.create("wf", "Title", "user").unwrap();
        manager.complete(&id).unwrap();

        assert!(!dir.path().join("instances").join(format!("{id}.json")).exists());
        assert!(dir.path().join("completed").join(format!("{id}.json")).exists());
    }

    #[test]
    fn test_abandon_records_reason() {
        let dir = tempfile::tempdir().unwrap();
        let manager = InstanceManager::new(dir.path()).unwrap();
        let id = manager.create("wf", "Title", "user").unwrap();
        let instance = manager.abandon(&id, "no longer needed").unwrap();
        assert_eq!(instance.metadata.abandon_reason.as_deref(), Some("no longer needed"));
    }

    #[test]
    fn test_update_merges_nested_objects() {
        let dir = tempfile::tempdir().unwrap();
        let manager = InstanceManager::new(dir.path()).unwrap();
        let id = manager.create("wf", "Title", "user").unwrap();
        manager
            .update(&id, &json!({"significance_metrics": {"content_created": {"quantity": 257}}}))
            .unwrap();
        let instance = manager.load(&id).unwrap();
        assert_eq!(instance.significance_metrics["content_created"]["quantity"], 257);
    }

    #[test]
    fn test_list_sorts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let manager = InstanceManager::new(dir.path()).unwrap();
        manager.create("wf", "First", "user").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        manager.create("wf", "Second", "user").unwrap();
        let summaries = manager.list(None).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].title, "Second");
    }
}
