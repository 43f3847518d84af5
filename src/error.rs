use std::{io, path::PathBuf};

/// Errors that can occur while building or writing to a logger.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to create file '{path}': {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Sink '{sink}' failed to write: {source}")]
    SinkWrite {
        sink: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to set file permissions for '{path}': {source}")]
    SetFilePermissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl LogError {
    /// Wrap an I/O failure of the named sink.
    pub(crate) fn sink_write(sink: &str, source: io::Error) -> Self {
        LogError::SinkWrite {
            sink: sink.to_string(),
            source,
        }
    }
}

/// Attach a path to an I/O error so that `SinkWrite` messages say which file
/// was involved.
pub(crate) fn with_path(action: &str, path: &std::path::Path, err: io::Error) -> io::Error {
    io::Error::new(err.kind(), format!("{action} '{}': {err}", path.display()))
}
