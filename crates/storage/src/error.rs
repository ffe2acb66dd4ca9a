use crate::record::Table;

/// All errors that can be returned by a BackingStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A row could not be found by id.
    #[error("row not found: {table}/{id}")]
    RowNotFound { table: Table, id: String },

    /// The record passed to an insert was not a JSON object.
    #[error("invalid record for table {table}: {message}")]
    InvalidRecord { table: Table, message: String },

    /// A row could not be converted to or from its typed form.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing the on-disk store failed.
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A backend-specific storage error (remote service, corrupt file, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
