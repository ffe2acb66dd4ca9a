//! cutover-core: the domain model behind the migration dashboard.
//!
//! A migration project moves through six stages (0 = repositories,
//! 1..=5 = inventory through cutover). This crate owns:
//!
//! - [`FixtureSet`] -- the static documents for one project
//! - [`seed_project()`] -- first-boot seeding of a [`BackingStore`](cutover_storage::BackingStore)
//! - [`StageDataAccessor`] -- stage index to stage document
//! - [`UnlockModel`] -- per-stage status, accessibility and progress
//! - [`Route`] -- dashboard navigation with the unlock gate applied
//! - [`documents`] -- typed stage views and their headline figures

pub mod accessor;
pub mod documents;
pub mod error;
pub mod fixtures;
pub mod history;
pub mod project;
pub mod route;
pub mod seed;
pub mod stage;
pub mod unlock;

pub use accessor::{stage_fixture, StageDataAccessor, StoreStageAccessor};
pub use documents::{summarize, StageSummary};
pub use error::{FixtureError, SeedError};
pub use fixtures::{FixtureName, FixtureSet, RawFixtures};
pub use history::{PipelineExecution, PipelineHistoryEntry};
pub use project::{format_date, format_date_time, Project, ProjectMetadata, ProjectStatus};
pub use route::Route;
pub use seed::{seed_project, SeedOutcome};
pub use stage::{stage_definition, StageDefinition, StageStatus, LAST_STAGE, STAGES};
pub use unlock::{StageView, UnlockModel};
