//! Dashboard navigation surface.
//!
//! Routes: `/`, `/projects/{id}`, `/projects/{id}/repositories`,
//! `/projects/{id}/stage{1..5}`, `/projects/{id}/environments`.
//! Anything else falls back to the project list.

use serde::Serialize;

use crate::stage::{stage_definition, LAST_STAGE};
use crate::unlock::UnlockModel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Route {
    ProjectList,
    Dashboard { project_id: String },
    Repositories { project_id: String },
    Stage { project_id: String, stage: u8 },
    Environments { project_id: String },
}

impl Route {
    /// Parse a dashboard path. Query strings and trailing slashes are ignored.
    pub fn parse(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            ["projects", id] => Route::Dashboard {
                project_id: id.to_string(),
            },
            ["projects", id, "repositories"] => Route::Repositories {
                project_id: id.to_string(),
            },
            ["projects", id, "environments"] => Route::Environments {
                project_id: id.to_string(),
            },
            ["projects", id, fragment] => match parse_stage_fragment(fragment) {
                Some(stage) => Route::Stage {
                    project_id: id.to_string(),
                    stage,
                },
                None => Route::ProjectList,
            },
            _ => Route::ProjectList,
        }
    }

    /// The route for opening `stage` of a project; stage 0 is the
    /// repositories page.
    pub fn for_stage(project_id: &str, stage: i64) -> Option<Route> {
        let definition = stage_definition(stage)?;
        Some(if definition.id == 0 {
            Route::Repositories {
                project_id: project_id.to_string(),
            }
        } else {
            Route::Stage {
                project_id: project_id.to_string(),
                stage: definition.id,
            }
        })
    }

    pub fn path(&self) -> String {
        match self {
            Route::ProjectList => "/".to_string(),
            Route::Dashboard { project_id } => format!("/projects/{project_id}"),
            Route::Repositories { project_id } => format!("/projects/{project_id}/repositories"),
            Route::Stage { project_id, stage } => format!("/projects/{project_id}/stage{stage}"),
            Route::Environments { project_id } => format!("/projects/{project_id}/environments"),
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            Route::ProjectList => None,
            Route::Dashboard { project_id }
            | Route::Repositories { project_id }
            | Route::Stage { project_id, .. }
            | Route::Environments { project_id } => Some(project_id),
        }
    }

    /// The stage that must be unlocked before this route can be shown.
    pub fn required_stage(&self) -> Option<i64> {
        match self {
            Route::Repositories { .. } => Some(0),
            Route::Stage { stage, .. } => Some(i64::from(*stage)),
            _ => None,
        }
    }

    /// Apply the unlock model: a stage route the model will not select stays
    /// on the project dashboard instead.
    pub fn gate(self, model: &UnlockModel<'_>) -> Route {
        match self.required_stage() {
            Some(stage) if model.select(stage).is_none() => Route::Dashboard {
                project_id: self.project_id().unwrap_or_default().to_string(),
            },
            _ => self,
        }
    }
}

fn parse_stage_fragment(fragment: &str) -> Option<u8> {
    let stage: u8 = fragment.strip_prefix("stage")?.parse().ok()?;
    (1..=LAST_STAGE).contains(&stage).then_some(stage)
}
