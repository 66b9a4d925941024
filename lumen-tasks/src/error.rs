//! `lumen-tasks`'s own error variants, in the same manual `enum` +
//! `Display`/`Error` style as `lumen_core::error::RenderError` (spec.md §7:
//! a failing mid-render checkpoint is recoverable and only logged, never
//! fatal).

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum TaskError {
    /// An output path could not be (re)written at a checkpoint boundary.
    /// Recoverable: callers log it via [`lumen_core::log::Log::verify`] and
    /// retry at the next checkpoint rather than aborting the render.
    CheckpointWrite { path: PathBuf, source: std::io::Error },
    /// The previously checkpointed image could not be loaded for `--resume`.
    /// Fatal at init time (spec.md §7's "init-time cases are fatal").
    ResumeLoad { path: PathBuf, source: std::io::Error },
    /// A worker never responded within the configured heartbeat and its
    /// block was re-queued; surfaced for logging, never fatal on its own.
    WorkerTimeout { worker: usize },
    /// A worker dropped its connection to the controller entirely.
    WorkerLost { worker: usize },
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::CheckpointWrite { path, source } => {
                write!(f, "failed to write checkpoint {}: {source}", path.display())
            }
            TaskError::ResumeLoad { path, source } => {
                write!(f, "failed to load previous image {}: {source}", path.display())
            }
            TaskError::WorkerTimeout { worker } => write!(f, "worker {worker} missed its heartbeat"),
            TaskError::WorkerLost { worker } => write!(f, "worker {worker} disconnected"),
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaskError::CheckpointWrite { source, .. } => Some(source),
            TaskError::ResumeLoad { source, .. } => Some(source),
            _ => None,
        }
    }
}
