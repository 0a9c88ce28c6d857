//! The agent's local job queue on disk.
//!
//! One directory per job, named `job_{id}`. The directory's existence is
//! what discovery checks to avoid downloading twice; `job.json` is written
//! last, so a directory without it is a download that never finished.
//! The delivery marker is created once and is what the print trigger
//! checks to avoid copying twice.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use jigprint_core::agent_protocol::AgentJob;
use jigprint_core::hot_folder::{
    delivered_filename, job_dir_name, parse_job_dir_name, DeliveryMarker, METADATA_FILE,
    SENT_MARKER,
};
use jigprint_core::types::DbId;
use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub enum SpoolError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Job {0} is already spooled")]
    AlreadySpooled(DbId),

    #[error("Job {0} was already delivered")]
    AlreadyDelivered(DbId),

    #[error("Invalid metadata in {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SpoolError + '_ {
    move |source| SpoolError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A job held locally, as read back from its directory.
#[derive(Debug, Clone)]
pub struct SpooledJob {
    pub job: AgentJob,
    pub artifact: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Spool {
    root: PathBuf,
}

impl Spool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, job_id: DbId) -> PathBuf {
        self.root.join(job_dir_name(job_id))
    }

    /// Create the queue directory and remove downloads that never
    /// finished. Returns the ids that were discarded.
    pub async fn prepare(&self) -> Result<Vec<DbId>, SpoolError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(io_err(&self.root))?;

        let mut discarded = Vec::new();
        for job_id in self.job_ids().await? {
            if !self.is_complete(job_id).await {
                tracing::warn!(job_id, "Discarding incomplete job directory");
                self.discard(job_id).await?;
                discarded.push(job_id);
            }
        }
        Ok(discarded)
    }

    /// Whether a directory exists for the job, complete or not.
    pub async fn contains(&self, job_id: DbId) -> bool {
        tokio::fs::try_exists(self.job_dir(job_id))
            .await
            .unwrap_or(false)
    }

    /// Whether the job's download finished.
    pub async fn is_complete(&self, job_id: DbId) -> bool {
        tokio::fs::try_exists(self.job_dir(job_id).join(METADATA_FILE))
            .await
            .unwrap_or(false)
    }

    pub async fn is_delivered(&self, job_id: DbId) -> bool {
        tokio::fs::try_exists(self.job_dir(job_id).join(SENT_MARKER))
            .await
            .unwrap_or(false)
    }

    /// Ids of every `job_{id}` directory under the root.
    pub async fn job_ids(&self) -> Result<Vec<DbId>, SpoolError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(io_err(&self.root))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err(&self.root))? {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(parse_job_dir_name) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Claim the job's directory. Fails if it already exists, which is
    /// how two passes over the same job are kept from both downloading.
    pub async fn claim(&self, job_id: DbId) -> Result<PathBuf, SpoolError> {
        let dir = self.job_dir(job_id);
        match tokio::fs::create_dir(&dir).await {
            Ok(()) => Ok(dir),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(SpoolError::AlreadySpooled(job_id)),
            Err(e) => Err(io_err(&dir)(e)),
        }
    }

    /// Write the artifact, then the metadata, into a claimed directory.
    pub async fn store(&self, job: &AgentJob, artifact: &[u8]) -> Result<SpooledJob, SpoolError> {
        let dir = self.job_dir(job.id);

        let artifact_path = dir.join(delivered_filename(job.id, job.event_name.as_deref()));
        tokio::fs::write(&artifact_path, artifact)
            .await
            .map_err(io_err(&artifact_path))?;

        let meta_path = dir.join(METADATA_FILE);
        let meta = serde_json::to_vec_pretty(job).map_err(|source| SpoolError::Metadata {
            path: meta_path.clone(),
            source,
        })?;
        tokio::fs::write(&meta_path, meta)
            .await
            .map_err(io_err(&meta_path))?;

        Ok(SpooledJob {
            job: job.clone(),
            artifact: artifact_path,
        })
    }

    /// Read back a completed job.
    pub async fn load(&self, job_id: DbId) -> Result<SpooledJob, SpoolError> {
        let dir = self.job_dir(job_id);
        let meta_path = dir.join(METADATA_FILE);
        let raw = tokio::fs::read(&meta_path)
            .await
            .map_err(io_err(&meta_path))?;
        let job: AgentJob = serde_json::from_slice(&raw).map_err(|source| SpoolError::Metadata {
            path: meta_path.clone(),
            source,
        })?;
        let artifact = dir.join(delivered_filename(job.id, job.event_name.as_deref()));
        Ok(SpooledJob { job, artifact })
    }

    /// Remove a job's directory and everything in it. Missing is fine.
    pub async fn discard(&self, job_id: DbId) -> Result<(), SpoolError> {
        let dir = self.job_dir(job_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&dir)(e)),
        }
    }

    /// Write the delivery marker. Only the first call succeeds.
    pub async fn mark_delivered(&self, job_id: DbId, marker: &DeliveryMarker) -> Result<(), SpoolError> {
        let path = self.job_dir(job_id).join(SENT_MARKER);
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(SpoolError::AlreadyDelivered(job_id))
            }
            Err(e) => return Err(io_err(&path)(e)),
        };
        file.write_all(marker.render().as_bytes())
            .await
            .map_err(io_err(&path))?;
        file.flush().await.map_err(io_err(&path))?;
        Ok(())
    }

    /// Read the delivery marker, if the job was delivered.
    pub async fn delivery(&self, job_id: DbId) -> Option<DeliveryMarker> {
        let text = tokio::fs::read_to_string(self.job_dir(job_id).join(SENT_MARKER))
            .await
            .ok()?;
        DeliveryMarker::parse(&text).ok()
    }
}
