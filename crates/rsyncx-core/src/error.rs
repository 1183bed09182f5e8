//! Error types for rsyncx-core

use std::path::PathBuf;

/// Result type for rsyncx-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rsyncx-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither the primary nor the fallback endpoint answered in time
    #[error("Group '{group}' is unreachable (tried: {})", tried.join(", "))]
    Unreachable { group: String, tried: Vec<String> },

    /// No group with this name is configured
    #[error("Group not found: {name}")]
    GroupNotFound { name: String },

    /// A group definition is unusable
    #[error("Invalid group '{name}': {reason}")]
    InvalidGroup { name: String, reason: String },

    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration is present but inconsistent
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Moving content into the recycle bin failed; the source is untouched
    #[error("Failed to move {path} to trash: {reason}")]
    TrashFailed { path: String, reason: String },

    /// The deletion ledger exists but cannot be parsed
    #[error("Deletion ledger at {path} is unreadable: {message}")]
    LedgerCorrupt { path: PathBuf, message: String },

    /// A previously synchronized remote root no longer exists
    #[error("Remote root {location} of group '{group}' does not exist")]
    RemoteRootMissing { group: String, location: String },

    /// The transfer tool failed for reasons other than a single path
    #[error("Transfer error: {message}")]
    Transfer { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from rsyncx-fs
    #[error(transparent)]
    Fs(#[from] rsyncx_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// Invalid exclude pattern
    #[error(transparent)]
    Pattern(#[from] globset::Error),
}

