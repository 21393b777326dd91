//! Disk-backed retry buffer.
//!
//! Failed records are appended verbatim to a single file. The next session
//! that connects ships the whole file as one unit and truncates it only after
//! the transmission succeeded.

use super::ConnectionState;
use crate::encoder::EncodedRecord;
use crate::sender::DeliverySession;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum DiskError {
    #[error("Failed to append to retry buffer {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read retry buffer {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to truncate retry buffer {path}: {source}")]
    Truncate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one drain attempt. Draining never raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Nothing to do: not connected, or the buffer is empty.
    Idle,
    /// The backlog was transmitted and the file truncated.
    Drained(usize),
    /// The backlog is still on disk.
    Failed,
}

impl DrainOutcome {
    pub fn is_drained(self) -> bool {
        matches!(self, DrainOutcome::Drained(_))
    }
}

#[derive(Debug)]
pub struct RetryBuffer {
    path: PathBuf,
    // Serializes append against read-transmit-truncate.
    guard: Mutex<()>,
}

impl RetryBuffer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record, creating the file on first use.
    pub async fn append(&self, record: &EncodedRecord) -> Result<(), DiskError> {
        let _guard = self.guard.lock().await;
        self.append_locked(record.as_bytes())
            .await
            .map_err(|source| DiskError::Append {
                path: self.path.clone(),
                source,
            })?;

        debug!(
            "Appended {} bytes to retry buffer {}",
            record.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn append_locked(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(bytes).await?;
        file.sync_data().await
    }

    /// Current backlog; a missing file reads as empty.
    pub async fn contents(&self) -> Result<Vec<u8>, DiskError> {
        let _guard = self.guard.lock().await;
        self.read_locked().await
    }

    pub async fn is_empty(&self) -> Result<bool, DiskError> {
        Ok(self.contents().await?.is_empty())
    }

    async fn read_locked(&self) -> Result<Vec<u8>, DiskError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(DiskError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn truncate_locked(&self) -> Result<(), DiskError> {
        let truncate = async {
            let file = OpenOptions::new().write(true).open(&self.path).await?;
            file.set_len(0).await?;
            file.sync_all().await
        };
        truncate.await.map_err(|source| DiskError::Truncate {
            path: self.path.clone(),
            source,
        })
    }

    /// Ships the backlog through `session` as one unit.
    ///
    /// Only runs while `state` reports connected. On transmit failure the file
    /// is left untouched and `state` is marked disconnected.
    pub async fn drain<S: DeliverySession>(
        &self,
        session: &S,
        state: &ConnectionState,
    ) -> DrainOutcome {
        if !state.is_connected() {
            return DrainOutcome::Idle;
        }

        let _guard = self.guard.lock().await;

        let backlog = match self.read_locked().await {
            Ok(bytes) if bytes.is_empty() => return DrainOutcome::Idle,
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping retry buffer drain: {}", e);
                return DrainOutcome::Failed;
            }
        };

        if let Err(e) = session.transmit(&backlog).await {
            state.mark_disconnected();
            warn!(
                "Retry buffer drain failed, {} bytes kept in {}: {}",
                backlog.len(),
                self.path.display(),
                e
            );
            return DrainOutcome::Failed;
        }

        // A failed truncate means the backlog may be sent again later.
        if let Err(e) = self.truncate_locked().await {
            error!("Retry buffer transmitted but not cleared: {}", e);
            return DrainOutcome::Failed;
        }

        info!(
            "Drained {} bytes from retry buffer {}",
            backlog.len(),
            self.path.display()
        );
        DrainOutcome::Drained(backlog.len())
    }
}
