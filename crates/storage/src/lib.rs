pub mod conformance;
mod error;
mod file;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use record::{to_fields, Fields, Filter, InsertOutcome, Row, Table};
pub use traits::BackingStore;
