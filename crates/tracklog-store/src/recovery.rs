// ABOUTME: Crash recovery for a recording session that ended without a normal save.
// ABOUTME: Folds the buffered points into a GPX file named for the recovery time, then wipes the store.

use std::path::PathBuf;

use chrono::{DateTime, Local, TimeZone, Utc};
use thiserror::Error;
use tracklog_core::{SessionBuffer, export_gpx};

use crate::documents::{recovery_file_name, save_gpx};
use crate::sqlite::PointStore;

/// Errors that can occur during recovery.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("store error: {0}")]
    Store(#[from] crate::sqlite::StoreError),

    #[error("export error: {0}")]
    Export(#[from] tracklog_core::ExportError),

    #[error("document error: {0}")]
    Document(#[from] crate::documents::DocumentError),

    #[error("recovery task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What a successful recovery produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryOutcome {
    pub path: PathBuf,
    pub trackpoints: usize,
    pub waypoints: usize,
}

/// Rebuilds the session left behind by an abnormal termination.
///
/// Recovery sequence:
/// 1. Load all trackpoints, then all waypoints, in tag order into the buffer
/// 2. If both are empty, stop: no file is produced
/// 3. Build one track with one segment holding every trackpoint, plus the waypoints
/// 4. Write it as `recovery-<dd-MMM-yyyy-HHmm>.gpx` using the recovery time
/// 5. Wipe the store and clear the buffer
///
/// Failures up to and including the file write leave the store untouched so
/// the next launch can try again. A failure to wipe the store afterwards is
/// only logged.
pub struct CrashRecovery {
    documents_dir: PathBuf,
    creator: String,
    buffer: SessionBuffer,
}

impl CrashRecovery {
    pub fn new(documents_dir: impl Into<PathBuf>, creator: impl Into<String>) -> Self {
        Self {
            documents_dir: documents_dir.into(),
            creator: creator.into(),
            buffer: SessionBuffer::new(),
        }
    }

    /// Points loaded from the store and not yet written out.
    pub fn buffer(&self) -> &SessionBuffer {
        &self.buffer
    }

    /// Fill the buffer with everything the store holds, in tag order.
    pub fn load(&mut self, store: &PointStore) -> Result<(), RecoveryError> {
        let trackpoints = store.load_trackpoints()?;
        tracing::info!("fetched {} recoverable trackpoints", trackpoints.len());
        self.buffer
            .extend_trackpoints(trackpoints.into_iter().map(|t| t.value));

        let waypoints = store.load_waypoints()?;
        tracing::info!("fetched {} recoverable waypoints", waypoints.len());
        self.buffer
            .extend_waypoints(waypoints.into_iter().map(|w| w.value));

        Ok(())
    }

    /// Run recovery now, naming the file after the local clock.
    pub fn run(
        &mut self,
        store: &mut PointStore,
    ) -> Result<Option<RecoveryOutcome>, RecoveryError> {
        self.run_at(store, Local::now())
    }

    /// Run recovery as if it happened at `now`.
    pub fn run_at<Tz: TimeZone>(
        &mut self,
        store: &mut PointStore,
        now: DateTime<Tz>,
    ) -> Result<Option<RecoveryOutcome>, RecoveryError>
    where
        Tz::Offset: std::fmt::Display,
    {
        self.buffer.clear();
        self.load(store)?;

        if self.buffer.is_empty() {
            tracing::debug!("nothing to recover");
            return Ok(None);
        }

        let gpx = export_gpx(&self.buffer, &self.creator, now.with_timezone(&Utc))?;
        let name = recovery_file_name(&now);
        let path = save_gpx(&self.documents_dir, &name, &gpx)?;

        let outcome = RecoveryOutcome {
            path,
            trackpoints: self.buffer.trackpoints().len(),
            waypoints: self.buffer.waypoints().len(),
        };
        tracing::info!(
            "file {} was recovered from last crashed session ({} trackpoints, {} waypoints)",
            outcome.path.display(),
            outcome.trackpoints,
            outcome.waypoints
        );

        match store.delete_all() {
            Ok(removed) => tracing::info!(
                "cleared {} trackpoints and {} waypoints from store",
                removed.trackpoints,
                removed.waypoints
            ),
            Err(e) => tracing::error!("failed to clear store after recovery: {}", e),
        }
        self.buffer.clear();

        Ok(Some(outcome))
    }
}

/// Open the store at `db_path` and run recovery on a blocking worker thread.
pub async fn recover_in_background(
    db_path: PathBuf,
    documents_dir: PathBuf,
    creator: String,
) -> Result<Option<RecoveryOutcome>, RecoveryError> {
    tokio::task::spawn_blocking(move || {
        let mut store = PointStore::open(&db_path)?;
        CrashRecovery::new(documents_dir, creator).run(&mut store)
    })
    .await?
}
