use cutover_storage::StorageError;

use crate::fixtures::FixtureName;

/// A fixture document could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// The fixture directory has no file for this document.
    #[error("fixture '{name}' not found at {path}")]
    Missing { name: FixtureName, path: String },

    /// The fixture file exists but could not be read.
    #[error("could not read fixture '{name}' at {path}: {source}")]
    Io {
        name: FixtureName,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The fixture is not valid JSON, or does not have the expected shape.
    #[error("could not parse fixture '{name}': {source}")]
    Parse {
        name: FixtureName,
        #[source]
        source: serde_json::Error,
    },
}

/// Seeding the backing store failed.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// The project insert came back without a row, so there is no id to
    /// attach stage documents to.
    #[error("project insert returned no row")]
    ProjectNotCreated,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Fixture(#[from] FixtureError),
}
