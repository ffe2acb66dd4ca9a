//! Fixture and store construction shared by the commands and the server.

use std::path::Path;
use std::sync::Arc;

use cutover_core::{FixtureError, FixtureSet, Project, RawFixtures};
use cutover_storage::{BackingStore, Filter, JsonFileStore, MemoryStore, StorageError, Table};

/// Fixtures from `dir`, or the set compiled into the binary.
pub(crate) fn load_fixtures(dir: Option<&Path>) -> Result<FixtureSet, FixtureError> {
    match dir {
        Some(dir) => {
            tracing::debug!(dir = %dir.display(), "loading fixtures from directory");
            FixtureSet::load_dir(dir)
        }
        None => FixtureSet::embedded(),
    }
}

/// Untyped fixture documents from `dir`, or the compiled-in set.
pub(crate) fn load_raw_fixtures(dir: Option<&Path>) -> Result<RawFixtures, FixtureError> {
    match dir {
        Some(dir) => RawFixtures::load_dir(dir),
        None => RawFixtures::embedded(),
    }
}

/// A JSON file store at `path`, or a fresh in-memory store.
pub(crate) async fn open_store(path: Option<&Path>) -> Result<Arc<dyn BackingStore>, StorageError> {
    match path {
        Some(path) => {
            let store = JsonFileStore::open(path).await?;
            tracing::info!(path = %path.display(), "opened file store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// The first stored project, if any.
pub(crate) async fn first_project(
    store: &dyn BackingStore,
) -> Result<Option<Project>, StorageError> {
    let rows = store.select(Table::Projects, &Filter::all(), 1).await?;
    match rows.first() {
        Some(row) => Ok(Some(row.decode()?)),
        None => Ok(None),
    }
}
