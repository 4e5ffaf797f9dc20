//! Failure taxonomy for one assembly run.
//!
//! Everything here is fatal for the run that raised it: transient storage
//! blips are retried inside the storage adapters and only surface as
//! `MediaNotFound`/`Upload` once the retry budget is spent.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssemblyError {
    /// A referenced audio/video file could not be fetched from storage.
    #[error("media not found: {reference}: {detail}")]
    MediaNotFound { reference: String, detail: String },

    /// The external media tool exited non-zero or produced no usable output.
    #[error("media tool failed during {stage}: {detail}")]
    ToolExecution { stage: &'static str, detail: String },

    /// The finished video could not be persisted to storage.
    #[error("upload to {destination} failed: {detail}")]
    Upload { destination: String, detail: String },

    /// The temporary workspace could not be created or written.
    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    /// Catch-all so one task's surprise never escapes past its own run.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AssemblyError {
    /// Stage label published alongside the terminal `failed` status.
    pub fn stage(&self) -> &'static str {
        match self {
            AssemblyError::MediaNotFound { .. } => "fetching",
            AssemblyError::ToolExecution { stage, .. } => *stage,
            AssemblyError::Upload { .. } => "uploading",
            AssemblyError::Workspace(_) => "pending",
            AssemblyError::Internal(_) => "internal",
        }
    }
}
