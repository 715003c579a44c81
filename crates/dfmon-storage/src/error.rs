/// Errors that can occur within the cache store.
///
/// Only [`StorageError::CacheUnavailable`] is fatal to a whole collection
/// run; the rest are scoped to one statement or one record.
///
/// # Examples
///
/// ```rust
/// use dfmon_storage::error::StorageError;
///
/// let err = StorageError::Validation {
///     field: "group_name".to_string(),
///     reason: "missing".to_string(),
/// };
/// assert!(err.to_string().contains("group_name"));
/// assert!(!err.is_fatal());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The store could not be opened or bootstrapped within the connect budget.
    #[error("Storage: cache {path} unavailable after {attempts} attempt(s): {message}")]
    CacheUnavailable {
        path: String,
        attempts: u32,
        message: String,
    },

    /// A statement failed to prepare (`attempts` = 0) or failed on every
    /// execution attempt. `message` is the last underlying error.
    #[error("Storage: statement failed after {attempts} attempt(s): {message} [{sql}]")]
    Statement {
        sql: String,
        attempts: u32,
        message: String,
    },

    /// A record was rejected before any statement was issued.
    #[error("Storage: invalid record, field '{field}' {reason}")]
    Validation { field: String, reason: String },

    /// An underlying SQLite error.
    #[error("Storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem error while creating the store's directory.
    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StorageError::CacheUnavailable { .. })
    }

    pub(crate) fn missing(field: &str) -> Self {
        StorageError::Validation {
            field: field.to_string(),
            reason: "is missing".to_string(),
        }
    }
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
