//! Application state shared across request handlers.

use std::sync::Arc;

use cutover_core::StageDataAccessor;
use cutover_storage::BackingStore;

pub(crate) struct AppState {
    /// Fixture documents, for the raw stage endpoint.
    pub(crate) accessor: StageDataAccessor,
    /// Seeded project rows and stage documents.
    pub(crate) store: Arc<dyn BackingStore>,
    /// Project written (or found) by startup seeding.
    pub(crate) project_id: String,
}
