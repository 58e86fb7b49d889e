// ABOUTME: Single-writer task that persists location updates as they arrive during a recording.
// ABOUTME: Provides RecorderHandle for sending fixes and waypoints to the task over tokio channels.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracklog_core::{FixError, LocationFix, Trackpoint, Waypoint};

use crate::sqlite::{PointStore, StoreError};

/// Errors that can occur when sending points to the recorder.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("invalid point: {0}")]
    InvalidPoint(#[from] FixError),

    /// The point could not be persisted. The recorder has stopped and will
    /// not accept further points.
    #[error("failed to persist point, recorder stopped: {0}")]
    Fatal(#[source] StoreError),

    #[error("recorder channel closed")]
    ChannelClosed,

    #[error("recorder replied without a tag")]
    MissingTag,
}

/// Commands accepted by the recorder task.
#[derive(Debug)]
pub enum RecorderCommand {
    RecordFix(LocationFix),
    RecordWaypoint(Waypoint),
    DeleteWaypoint(usize),
    DiscardSession,
}

/// A command paired with a oneshot sender for the response. Appends reply
/// with the assigned tag, or None when nothing was stored.
type CommandMessage = (
    RecorderCommand,
    oneshot::Sender<Result<Option<u64>, RecorderError>>,
);

/// Public handle for interacting with the recorder task. Cheap to clone;
/// the task ends once every handle is dropped.
#[derive(Clone)]
pub struct RecorderHandle {
    cmd_tx: mpsc::Sender<CommandMessage>,
}

impl RecorderHandle {
    async fn send(&self, cmd: RecorderCommand) -> Result<Option<u64>, RecorderError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send((cmd, tx))
            .await
            .map_err(|_| RecorderError::ChannelClosed)?;
        rx.await.map_err(|_| RecorderError::ChannelClosed)?
    }

    /// Persist a location fix as a trackpoint. Returns the tag it was stored
    /// under, or None if the fix carried no elevation and was skipped.
    pub async fn record_fix(&self, fix: LocationFix) -> Result<Option<u64>, RecorderError> {
        self.send(RecorderCommand::RecordFix(fix)).await
    }

    /// Persist a waypoint and return its tag. Unlike fixes, a valid waypoint
    /// is never skipped, so the task always answers with a tag.
    pub async fn record_waypoint(&self, waypoint: Waypoint) -> Result<u64, RecorderError> {
        self.send(RecorderCommand::RecordWaypoint(waypoint))
            .await?
            .ok_or(RecorderError::MissingTag)
    }

    /// Remove the waypoint at `index` in recording order.
    pub async fn delete_waypoint(&self, index: usize) -> Result<(), RecorderError> {
        self.send(RecorderCommand::DeleteWaypoint(index)).await?;
        Ok(())
    }

    /// Wipe everything buffered for the session, used once it has been saved normally.
    pub async fn discard_session(&self) -> Result<(), RecorderError> {
        self.send(RecorderCommand::DiscardSession).await?;
        Ok(())
    }
}

/// Spawn the recorder task that owns `store`. The join handle yields the
/// store back once every RecorderHandle has been dropped, or right after a
/// fatal append failure.
pub fn spawn(store: PointStore) -> (RecorderHandle, JoinHandle<PointStore>) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<CommandMessage>(64);
    let recorder = Recorder { store, cmd_rx };
    (RecorderHandle { cmd_tx }, tokio::spawn(recorder.run()))
}

/// The internal task that applies commands to the store one at a time.
struct Recorder {
    store: PointStore,
    cmd_rx: mpsc::Receiver<CommandMessage>,
}

impl Recorder {
    async fn run(mut self) -> PointStore {
        while let Some((cmd, reply_tx)) = self.cmd_rx.recv().await {
            let result = self.process_command(cmd);
            let fatal = matches!(result, Err(RecorderError::Fatal(_)));
            // Ignore send error; the caller may have dropped their receiver
            let _ = reply_tx.send(result);
            if fatal {
                tracing::error!("recorder stopped after a failed write");
                break;
            }
        }
        self.store
    }

    fn process_command(&mut self, cmd: RecorderCommand) -> Result<Option<u64>, RecorderError> {
        match cmd {
            RecorderCommand::RecordFix(fix) => {
                let point = match Trackpoint::try_from(fix) {
                    Ok(point) => point,
                    Err(FixError::MissingElevation) => {
                        tracing::debug!("skipping fix without elevation");
                        return Ok(None);
                    }
                    Err(e) => return Err(e.into()),
                };
                let tag = self.store.append_trackpoint(&point).map_err(fatal)?;
                Ok(Some(tag))
            }

            RecorderCommand::RecordWaypoint(waypoint) => {
                waypoint.validate()?;
                let tag = self.store.append_waypoint(&waypoint).map_err(fatal)?;
                Ok(Some(tag))
            }

            RecorderCommand::DeleteWaypoint(index) => {
                match self.store.delete_waypoint_at(index) {
                    Ok(true) => {}
                    Ok(false) => tracing::warn!("no waypoint at index {} to delete", index),
                    Err(e) => tracing::error!("failed to delete waypoint {}: {}", index, e),
                }
                Ok(None)
            }

            RecorderCommand::DiscardSession => {
                if let Err(e) = self.store.delete_all() {
                    tracing::error!("failed to discard session: {}", e);
                }
                Ok(None)
            }
        }
    }
}

fn fatal(e: StoreError) -> RecorderError {
    tracing::error!("failure to save point: {}", e);
    RecorderError::Fatal(e)
}
