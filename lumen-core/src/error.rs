//! Shared error taxonomy (spec §7): input errors and I/O errors are fatal;
//! numerical anomalies are clamped rather than raised.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum RenderError {
    /// A scene element referenced by name could not be resolved, or was
    /// missing entirely. Produced by the (out-of-scope) parser, surfaced
    /// here so the core's error type can represent it uniformly.
    UnresolvedReference { name: String },
    /// A required data file could not be read at initialization time.
    MissingDataFile { path: PathBuf, source: std::io::Error },
    /// An output path could not be written at a checkpoint boundary. This
    /// variant is recoverable: callers log it and retry at the next
    /// checkpoint rather than propagating it.
    CheckpointWrite { path: PathBuf, source: std::io::Error },
    /// The wavelength grid is malformed.
    InvalidGrid(crate::grid::GridError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnresolvedReference { name } => {
                write!(f, "unresolved scene reference: {name}")
            }
            RenderError::MissingDataFile { path, source } => {
                write!(f, "missing data file {}: {source}", path.display())
            }
            RenderError::CheckpointWrite { path, source } => {
                write!(f, "failed to write checkpoint {}: {source}", path.display())
            }
            RenderError::InvalidGrid(e) => write!(f, "invalid wavelength grid: {e}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::MissingDataFile { source, .. } => Some(source),
            RenderError::CheckpointWrite { source, .. } => Some(source),
            RenderError::InvalidGrid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<crate::grid::GridError> for RenderError {
    fn from(e: crate::grid::GridError) -> Self {
        RenderError::InvalidGrid(e)
    }
}
