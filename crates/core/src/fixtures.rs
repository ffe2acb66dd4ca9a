//! Static fixture documents for one migration project.
//!
//! A [`FixtureSet`] is loaded once at startup, either from the copies
//! compiled into the binary or from a directory holding the same file
//! names, and is read-only afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::FixtureError;
use crate::history::{PipelineHistory, PipelineHistoryEntry};
use crate::project::ProjectMetadata;

/// Every document in a fixture set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixtureName {
    ProjectMetadata,
    Repositories,
    Inventory,
    TargetArchitecture,
    AssetManifest,
    RuntimeConfigs,
    Cutover,
    Environments,
    PipelineHistory,
}

impl FixtureName {
    pub const ALL: [FixtureName; 9] = [
        FixtureName::ProjectMetadata,
        FixtureName::Repositories,
        FixtureName::Inventory,
        FixtureName::TargetArchitecture,
        FixtureName::AssetManifest,
        FixtureName::RuntimeConfigs,
        FixtureName::Cutover,
        FixtureName::Environments,
        FixtureName::PipelineHistory,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            FixtureName::ProjectMetadata => "project-metadata.json",
            FixtureName::Repositories => "repos.json",
            FixtureName::Inventory => "stage1-inventory.json",
            FixtureName::TargetArchitecture => "stage2-target-architecture.json",
            FixtureName::AssetManifest => "stage3-asset-manifest.json",
            FixtureName::RuntimeConfigs => "stage4-runtime-configs.json",
            FixtureName::Cutover => "stage5-cutover.json",
            FixtureName::Environments => "environments.json",
            FixtureName::PipelineHistory => "pipeline-history.json",
        }
    }

    fn embedded_source(&self) -> &'static str {
        match self {
            FixtureName::ProjectMetadata => {
                include_str!("../fixtures/hotel-sys-api/project-metadata.json")
            }
            FixtureName::Repositories => include_str!("../fixtures/hotel-sys-api/repos.json"),
            FixtureName::Inventory => {
                include_str!("../fixtures/hotel-sys-api/stage1-inventory.json")
            }
            FixtureName::TargetArchitecture => {
                include_str!("../fixtures/hotel-sys-api/stage2-target-architecture.json")
            }
            FixtureName::AssetManifest => {
                include_str!("../fixtures/hotel-sys-api/stage3-asset-manifest.json")
            }
            FixtureName::RuntimeConfigs => {
                include_str!("../fixtures/hotel-sys-api/stage4-runtime-configs.json")
            }
            FixtureName::Cutover => include_str!("../fixtures/hotel-sys-api/stage5-cutover.json"),
            FixtureName::Environments => {
                include_str!("../fixtures/hotel-sys-api/environments.json")
            }
            FixtureName::PipelineHistory => {
                include_str!("../fixtures/hotel-sys-api/pipeline-history.json")
            }
        }
    }
}

impl fmt::Display for FixtureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stem = self.file_name().trim_end_matches(".json");
        f.write_str(stem)
    }
}

/// Every fixture document parsed as JSON, before any typed decoding.
///
/// `cutover validate` checks these against the project schema so that shape
/// errors are reported together instead of failing the typed load.
#[derive(Debug, Clone)]
pub struct RawFixtures {
    documents: BTreeMap<FixtureName, Value>,
}

impl RawFixtures {
    /// The documents compiled into the binary.
    pub fn embedded() -> Result<Self, FixtureError> {
        Self::from_sources(|name| Ok(name.embedded_source().to_string()))
    }

    /// The documents in `dir`, which must contain every
    /// [`FixtureName::file_name`].
    pub fn load_dir(dir: &Path) -> Result<Self, FixtureError> {
        Self::from_sources(|name| {
            let path = dir.join(name.file_name());
            std::fs::read_to_string(&path).map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    FixtureError::Missing {
                        name,
                        path: path.display().to_string(),
                    }
                } else {
                    FixtureError::Io {
                        name,
                        path: path.display().to_string(),
                        source,
                    }
                }
            })
        })
    }

    fn from_sources<F>(mut read: F) -> Result<Self, FixtureError>
    where
        F: FnMut(FixtureName) -> Result<String, FixtureError>,
    {
        let mut documents = BTreeMap::new();
        for name in FixtureName::ALL {
            let text = read(name)?;
            let value: Value = serde_json::from_str(&text)
                .map_err(|source| FixtureError::Parse { name, source })?;
            documents.insert(name, value);
        }
        Ok(Self { documents })
    }

    pub fn document(&self, name: FixtureName) -> &Value {
        lookup(&self.documents, name)
    }

    /// Decode the project metadata and pipeline history.
    pub fn into_fixture_set(self) -> Result<FixtureSet, FixtureError> {
        let project =
            parse_typed::<ProjectMetadata>(&self.documents, FixtureName::ProjectMetadata)?;
        let history =
            parse_typed::<PipelineHistory>(&self.documents, FixtureName::PipelineHistory)?;
        Ok(FixtureSet {
            project,
            history: history.executions,
            documents: self.documents,
        })
    }
}

/// The immutable in-memory copy of every fixture document.
#[derive(Debug, Clone)]
pub struct FixtureSet {
    project: ProjectMetadata,
    history: Vec<PipelineHistoryEntry>,
    documents: BTreeMap<FixtureName, Value>,
}

impl FixtureSet {
    /// Load the fixture set compiled into the binary.
    pub fn embedded() -> Result<Self, FixtureError> {
        RawFixtures::embedded()?.into_fixture_set()
    }

    /// Load a fixture set from `dir`, which must contain every
    /// [`FixtureName::file_name`].
    pub fn load_dir(dir: &Path) -> Result<Self, FixtureError> {
        RawFixtures::load_dir(dir)?.into_fixture_set()
    }

    pub fn project(&self) -> &ProjectMetadata {
        &self.project
    }

    pub fn history(&self) -> &[PipelineHistoryEntry] {
        &self.history
    }

    pub fn document(&self, name: FixtureName) -> &Value {
        lookup(&self.documents, name)
    }
}

fn lookup(documents: &BTreeMap<FixtureName, Value>, name: FixtureName) -> &Value {
    // `from_sources` inserts every name in `FixtureName::ALL`.
    static NULL: Value = Value::Null;
    documents.get(&name).unwrap_or(&NULL)
}

fn parse_typed<T: serde::de::DeserializeOwned>(
    documents: &BTreeMap<FixtureName, Value>,
    name: FixtureName,
) -> Result<T, FixtureError> {
    let value = documents.get(&name).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|source| FixtureError::Parse { name, source })
}
