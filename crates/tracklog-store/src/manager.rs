// ABOUTME: High-level storage manager for the tracklog home directory layout.
// ABOUTME: Handles directory creation, opening the point store, startup recovery, and document listing.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::documents::{DocumentError, list_gpx_files};
use crate::recovery::{CrashRecovery, RecoveryError, RecoveryOutcome, recover_in_background};
use crate::sqlite::{PointStore, StoreError};

/// File name of the point store inside the home directory.
pub const STORE_FILE_NAME: &str = "tracklog.db";

/// Errors that can occur during storage management operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("recovery error: {0}")]
    Recovery(#[from] RecoveryError),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),
}

/// Manages the tracklog home directory and the documents directory that
/// recovered GPX files are written to.
pub struct StorageManager {
    home: PathBuf,
    documents_dir: PathBuf,
    creator: String,
}

impl StorageManager {
    /// Create a StorageManager, creating the home and documents directories
    /// if they do not exist.
    pub fn new(
        home: PathBuf,
        documents_dir: PathBuf,
        creator: impl Into<String>,
    ) -> Result<Self, ManagerError> {
        fs::create_dir_all(&home)?;
        fs::create_dir_all(&documents_dir)?;
        Ok(Self {
            home,
            documents_dir,
            creator: creator.into(),
        })
    }

    /// Return the home directory path.
    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    /// Path of the point store database.
    pub fn store_path(&self) -> PathBuf {
        self.home.join(STORE_FILE_NAME)
    }

    pub fn open_store(&self) -> Result<PointStore, ManagerError> {
        Ok(PointStore::open(&self.store_path())?)
    }

    /// Run crash recovery against an already open store.
    pub fn recover(&self, store: &mut PointStore) -> Result<Option<RecoveryOutcome>, ManagerError> {
        let mut recovery = CrashRecovery::new(&self.documents_dir, self.creator.as_str());
        Ok(recovery.run(store)?)
    }

    /// The startup recovery check: recover whatever a previous session left
    /// in the store, without blocking the calling async task.
    pub async fn recover_on_startup(&self) -> Result<Option<RecoveryOutcome>, ManagerError> {
        let outcome = recover_in_background(
            self.store_path(),
            self.documents_dir.clone(),
            self.creator.clone(),
        )
        .await?;

        if outcome.is_none() {
            tracing::info!("no interrupted session found");
        }
        Ok(outcome)
    }

    /// GPX files currently in the documents directory.
    pub fn list_documents(&self) -> Result<Vec<PathBuf>, ManagerError> {
        Ok(list_gpx_files(&self.documents_dir)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracklog_core::{DEFAULT_CREATOR, Trackpoint, Waypoint};

    fn make_manager(dir: &TempDir) -> StorageManager {
        let home = dir.path().join("tracklog_home");
        StorageManager::new(home.clone(), home.join("documents"), DEFAULT_CREATOR).unwrap()
    }

    #[test]
    fn storage_manager_creates_directories() {
        let dir = TempDir::new().unwrap();
        let mgr = make_manager(&dir);

        assert!(mgr.home().exists());
        assert!(mgr.documents_dir().exists());
        assert_eq!(mgr.store_path(), mgr.home().join("tracklog.db"));
    }

    #[test]
    fn storage_manager_recovers_into_documents() {
        let dir = TempDir::new().unwrap();
        let mgr = make_manager(&dir);

        let mut store = mgr.open_store().unwrap();
        store
            .append_trackpoint(&Trackpoint::new(1.0, 2.0, 3.0, None))
            .unwrap();
        store.append_waypoint(&Waypoint::new(1.0, 2.0)).unwrap();

        let outcome = mgr.recover(&mut store).unwrap().unwrap();
        assert_eq!(mgr.list_documents().unwrap(), vec![outcome.path]);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn startup_recovery_without_session_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let mgr = make_manager(&dir);

        assert!(mgr.recover_on_startup().await.unwrap().is_none());
        assert!(mgr.list_documents().unwrap().is_empty());
    }

    #[tokio::test]
    async fn startup_recovery_picks_up_previous_session() {
        let dir = TempDir::new().unwrap();
        let mgr = make_manager(&dir);

        {
            let mut store = mgr.open_store().unwrap();
            for i in 0..3 {
                store
                    .append_trackpoint(&Trackpoint::new(i as f64, 0.0, 0.0, None))
                    .unwrap();
            }
        }

        let outcome = mgr.recover_on_startup().await.unwrap().unwrap();
        assert_eq!(outcome.trackpoints, 3);
        assert_eq!(mgr.list_documents().unwrap().len(), 1);
        assert!(mgr.open_store().unwrap().is_empty().unwrap());
    }
}
