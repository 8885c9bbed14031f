//! Local snapshot storage for the onboarding draft.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;

/// Fixed name under which the single draft snapshot is kept.
pub const DRAFT_KEY: &str = "sponte_onboarding_draft";

/// Stores one raw snapshot document.
///
/// Parsing is left to the caller so a corrupt snapshot can be treated as
/// "no draft" rather than a storage failure.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// The raw snapshot, or `None` if nothing is stored.
    async fn read(&self) -> Result<Option<String>, StoreError>;

    /// Replace the snapshot.
    async fn write(&self, contents: &str) -> Result<(), StoreError>;

    /// Remove the snapshot. Removing a missing snapshot is not an error.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Snapshot kept as `<dir>/sponte_onboarding_draft.json`.
pub struct FileDraftStore {
    path: PathBuf,
}

impl FileDraftStore {
    /// Store the snapshot under `dir`.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{DRAFT_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DraftStore for FileDraftStore {
    async fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, contents: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        // Each writer renames its own temp file into place; the last rename wins.
        let tmp = self
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        if let Err(e) = fs::write(&tmp, contents).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory snapshot, for embedding and tests.
#[derive(Default)]
pub struct MemoryDraftStore {
    slot: RwLock<Option<String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded with raw contents.
    pub fn with_contents(contents: &str) -> Self {
        Self {
            slot: RwLock::new(Some(contents.to_string())),
        }
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.slot.read().await.clone())
    }

    async fn write(&self, contents: &str) -> Result<(), StoreError> {
        *self.slot.write().await = Some(contents.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.slot.write().await = None;
        Ok(())
    }
}
