use std::path::PathBuf;

/// Core error type for the endpoint patcher.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid host {host:?}: {reason}")]
    InvalidHost { host: String, reason: &'static str },

    #[error("asset not found: {}", path.display())]
    AssetNotFound { path: PathBuf },

    #[error("backup not found: {}", path.display())]
    BackupNotFound { path: PathBuf },

    #[error("backup path is not a regular file: {}", path.display())]
    BackupNotAFile { path: PathBuf },

    #[error("malformed {schema} document in entry {entry:?} at byte {offset}: {message}")]
    Markup {
        entry: String,
        schema: &'static str,
        offset: usize,
        message: String,
    },

    #[error("container error in {}: {message}", path.display())]
    Store { path: PathBuf, message: String },

    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CoreError {
    /// Whether the error was raised before any file was touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidHost { .. }
                | Self::AssetNotFound { .. }
                | Self::BackupNotFound { .. }
                | Self::BackupNotAFile { .. }
        )
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
