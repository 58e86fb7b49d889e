// ABOUTME: Persistence layer for tracklog, buffering session points and recovering crashed sessions.
// ABOUTME: Provides the SQLite point store, the single-writer recorder, GPX documents, and crash recovery.

pub mod documents;
pub mod manager;
pub mod recorder;
pub mod recovery;
pub mod sqlite;

pub use documents::{DocumentError, list_gpx_files, recovery_file_name, save_gpx};
pub use manager::{ManagerError, StorageManager};
pub use recorder::{RecorderError, RecorderHandle};
pub use recovery::{CrashRecovery, RecoveryError, RecoveryOutcome, recover_in_background};
pub use sqlite::{PointStore, StoreCounts, StoreError};
