//! Scene persistence: versioned document schema, stores, and autosave policy.

mod autosave;
mod document;

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

pub use autosave::AutosaveController;
pub use document::{migrate, CanvasSize, ObjectRecord, SceneDocument, FORMAT_VERSION};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid scene json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported scene format version {0}")]
    UnsupportedVersion(u64),
    #[error("malformed scene document: {0}")]
    Malformed(&'static str),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable key-value slot holding one opaque scene blob.
pub trait SceneStore {
    fn save(&mut self, blob: &str) -> StoreResult<()>;
    fn load(&mut self) -> StoreResult<Option<String>>;
}

/// Stores the blob as a JSON file, replacing it atomically on save.
#[derive(Debug, Clone)]
pub struct FileSceneStore {
    path: PathBuf,
}

impl FileSceneStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".partial");
        PathBuf::from(staging)
    }
}

impl SceneStore for FileSceneStore {
    fn save(&mut self, blob: &str) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = self.staging_path();
        fs::write(&staging, blob)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn load(&mut self) -> StoreResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

#[derive(Debug, Default)]
struct MemorySlot {
    blob: Option<String>,
    saves: usize,
    failures_pending: usize,
}

/// In-process store; clones share the same slot so a host can observe it.
#[derive(Debug, Clone, Default)]
pub struct MemorySceneStore {
    slot: Rc<RefCell<MemorySlot>>,
}

impl MemorySceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        let store = Self::new();
        store.slot.borrow_mut().blob = Some(blob.into());
        store
    }

    pub fn blob(&self) -> Option<String> {
        self.slot.borrow().blob.clone()
    }

    pub fn save_count(&self) -> usize {
        self.slot.borrow().saves
    }

    /// Makes the next `count` saves fail.
    pub fn fail_next_saves(&self, count: usize) {
        self.slot.borrow_mut().failures_pending = count;
    }
}

impl SceneStore for MemorySceneStore {
    fn save(&mut self, blob: &str) -> StoreResult<()> {
        let mut slot = self.slot.borrow_mut();
        if slot.failures_pending > 0 {
            slot.failures_pending -= 1;
            return Err(StoreError::Unavailable("memory store rejected write".to_string()));
        }
        slot.blob = Some(blob.to_string());
        slot.saves += 1;
        Ok(())
    }

    fn load(&mut self) -> StoreResult<Option<String>> {
        Ok(self.slot.borrow().blob.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_and_reports_missing_as_none() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut store = FileSceneStore::new(dir.path().join("nested").join("scene.json"));
        assert!(store.load().expect("missing file is not an error").is_none());

        store.save("{\"version\":2}").expect("save should succeed");
        store.save("{\"version\":2,\"x\":1}").expect("overwrite should succeed");
        assert_eq!(
            store.load().expect("load should succeed").as_deref(),
            Some("{\"version\":2,\"x\":1}")
        );
        assert!(!store.staging_path().exists());
    }

    #[test]
    fn memory_store_failure_injection_counts_down() {
        let store = MemorySceneStore::new();
        let mut handle = store.clone();
        store.fail_next_saves(1);
        assert!(handle.save("a").is_err());
        assert!(handle.save("b").is_ok());
        assert_eq!(store.blob().as_deref(), Some("b"));
        assert_eq!(store.save_count(), 1);
    }
}
