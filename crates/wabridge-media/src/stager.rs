use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;
use wabridge_common::Result;

use crate::types::MediaFormat;

/// Grace period before a staged file is removed. Long enough for the upload
/// that consumes it to finish reading, short enough to keep the disk flat.
const DELETE_GRACE: Duration = Duration::from_secs(10);

/// An inbound binary payload persisted to local disk, waiting to be uploaded.
#[derive(Debug, Clone)]
pub struct StagedAttachment {
    pub path: PathBuf,
    pub mime_type: String,
}

/// Writes inbound attachments into a dedicated staging directory and arranges
/// their deferred deletion. Deletion is fire-and-forget: failures are logged,
/// never retried, and a file that is already gone is not an error.
pub struct AttachmentStager {
    staging_dir: PathBuf,
    delay: Duration,
}

impl AttachmentStager {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self::with_delay(data_dir, DELETE_GRACE)
    }

    pub fn with_delay(data_dir: impl AsRef<Path>, delay: Duration) -> Self {
        Self {
            staging_dir: data_dir.as_ref().join("staging"),
            delay,
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Persist a payload under a fresh name, returning its path and the mime
    /// type derived from the extension hint (generic binary when unknown).
    pub async fn stage(
        &self,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<StagedAttachment> {
        if !self.staging_dir.exists() {
            tokio::fs::create_dir_all(&self.staging_dir).await?;
        }

        let ext = extension.unwrap_or("bin");
        let path = self.staging_dir.join(format!("{}.{ext}", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await?;

        let mime_type = match extension {
            Some(ext) => MediaFormat::from_extension(ext).mime_type().to_string(),
            None => "application/octet-stream".to_string(),
        };

        debug!("staged {} byte attachment at {}", bytes.len(), path.display());
        Ok(StagedAttachment { path, mime_type })
    }

    /// Arrange deletion of `path` after the grace period. The returned handle
    /// lets tests trigger and await the deletion deterministically; dropping
    /// it leaves the detached task running on the wall clock.
    pub fn schedule_delete(&self, path: impl Into<PathBuf>) -> DeletionHandle {
        let path = path.into();
        let delay = self.delay;
        let (trigger, fired) = oneshot::channel();

        let task = tokio::spawn(async move {
            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            tokio::select! {
                _ = &mut sleep => {}
                fired = fired => {
                    // A dropped handle is not a trigger: wait out the full
                    // grace period before deleting.
                    if fired.is_err() {
                        sleep.await;
                    }
                }
            }
            delete_file(&path);
        });

        DeletionHandle {
            trigger: Some(trigger),
            task,
        }
    }
}

/// Handle to one scheduled deletion.
pub struct DeletionHandle {
    trigger: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl DeletionHandle {
    /// Skip the remaining grace period and delete immediately.
    pub fn fire_now(&mut self) {
        if let Some(trigger) = self.trigger.take() {
            let _ = trigger.send(());
        }
    }

    /// Wait until the deletion task has run (after the delay or `fire_now`).
    pub async fn finished(self) {
        let _ = self.task.await;
    }
}

fn delete_file(path: &Path) {
    if !path.exists() {
        // Already cleaned up, e.g. a second schedule for the same path.
        return;
    }
    match std::fs::remove_file(path) {
        Ok(()) => debug!("removed staged file {}", path.display()),
        Err(e) => warn!("failed to remove staged file {}: {e}", path.display()),
    }
}
