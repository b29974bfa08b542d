//! Persisted router state: which triad is active, how long it has been,
//! and anything pending a decision across turns.

use crate::error::{Result, RouterError};
use chrono::{DateTime, Utc};
use fs4::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A routing decision deferred past the current turn, e.g. a prompt the
/// grace period swallowed that still wants resolving once it lapses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingIntent {
    pub prompt: String,
    pub recorded_at: DateTime<Utc>,
}

/// On-disk router state for one conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterState {
    pub session_id: String,
    pub active_triad: Option<String>,
    pub conversation_start: DateTime<Utc>,
    pub turn_count: u32,
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pending_intents: Vec<PendingIntent>,
    #[serde(default)]
    pub training_mode_confirmations: u32,
}

impl RouterState {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            active_triad: None,
            conversation_start: now,
            turn_count: 0,
            last_activity: None,
            pending_intents: Vec::new(),
            training_mode_confirmations: 0,
        }
    }

    /// Enter `triad` as the active one: resets the turn/time clocks that
    /// the grace period measures against.
    pub fn activate(&mut self, triad: impl Into<String>) {
        self.active_triad = Some(triad.into());
        self.turn_count = 1;
        let now = Utc::now();
        self.last_activity = Some(now);
        self.conversation_start = now;
    }

    pub fn record_turn(&mut self) {
        self.turn_count += 1;
        self.last_activity = Some(Utc::now());
    }

    pub fn cancel(&mut self) {
        self.active_triad = None;
        self.turn_count = 0;
        self.last_activity = None;
    }
}

/// File-backed store for a single `RouterState`, guarded by an exclusive
/// advisory lock across the read-modify-write cycle.
pub struct RouterStateStore {
    path: PathBuf,
}

impl RouterStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional location: `<home>/.claude/router_state.json`.
    pub fn at_home(home: &Path) -> Self {
        Self::new(home.join(".claude").join("router_state.json"))
    }

    /// Load existing state, or `None` if the file does not exist yet.
    pub fn load(&self) -> Result<Option<RouterState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = File::open(&self.path)?;
        file.lock_shared()?;
        let contents = fs::read_to_string(&self.path);
        FileExt::unlock(&file).ok();
        let contents = contents?;
        let state = serde_json::from_str(&contents)
            .map_err(|e| RouterError::Corruption(e.to_string()))?;
        Ok(Some(state))
    }

    /// Persist `state` atomically: temp file in the same directory, fsync,
    /// rename over the target.
    pub fn save(&self, state: &RouterState) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)?;
        lock_file.lock_exclusive()?;
        let result = self.write_locked(state);
        FileExt::unlock(&lock_file).ok();
        result
    }

    fn write_locked(&self, state: &RouterState) -> Result<()> {
        let dir = self.path.parent().ok_or_else(|| {
            RouterError::Io(format!("{} has no parent directory", self.path.display()))
        })?;
        let mut temp = NamedTempFile::new_in(dir)?;
        let serialized = serde_json::to_string_pretty(state)
            .map_err(|e| RouterError::Corruption(e.to_string()))?;
        use std::io::Write;
        temp.write_all(serialized.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)
            .map_err(|e| RouterError::Io(format!("rename failed: {e}")))?;
        Ok(())
    }

    /// Read-modify-write under a single exclusive lock, so concurrent hook
    /// invocations never interleave a read with another process's write.
    pub fn update<F>(&self, session_id: &str, f: F) -> Result<RouterState>
    where
        F: FnOnce(&mut RouterState),
    {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)?;
        lock_file.lock_exclusive()?;
        let outcome = (|| -> Result<RouterState> {
            let mut state = if self.path.exists() {
                let contents = fs::read_to_string(&self.path)?;
                serde_json::from_str(&contents).unwrap_or_else(|_| RouterState::new(session_id))
            } else {
                RouterState::new(session_id)
            };
            f(&mut state);
            self.write_locked(&state)?;
            Ok(state)
        })();
        FileExt::unlock(&lock_file).ok();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = RouterStateStore::new(dir.path().join("router_state.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RouterStateStore::new(dir.path().join("router_state.json"));
        let mut state = RouterState::new("sess-1");
        state.activate("design");
        store.save(&state).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.active_triad.as_deref(), Some("design"));
        assert_eq!(loaded.turn_count, 1);
    }

    #[test]
    fn test_update_creates_state_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = RouterStateStore::new(dir.path().join("router_state.json"));
        let state = store
            .update("sess-1", |s| s.activate("implementation"))
            .unwrap();
        assert_eq!(state.active_triad.as_deref(), Some("implementation"));
    }

    #[test]
    fn test_update_mutates_existing_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = RouterStateStore::new(dir.path().join("router_state.json"));
        store.update("sess-1", |s| s.activate("design")).unwrap();
        let state = store.update("sess-1", |s| s.record_turn()).unwrap();
        assert_eq!(state.turn_count, 2);
    }

    #[test]
    fn test_cancel_clears_active_triad() {
        let mut state = RouterState::new("sess-1");
        state.activate("design");
        state.cancel();
        assert!(state.active_triad.is_none());
        assert_eq!(state.turn_count, 0);
    }
}
