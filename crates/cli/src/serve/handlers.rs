//! Core HTTP route handlers: health, projects, navigation, environments,
//! pipeline history.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cutover_core::documents::EnvironmentList;
use cutover_core::{
    format_date, format_date_time, PipelineExecution, Project, Route, StoreStageAccessor,
    UnlockModel,
};
use cutover_storage::{Filter, StorageError, Table};
use serde::Deserialize;

use super::json_error;
use super::stages::etag_response;
use super::state::AppState;

/// Default and maximum page size for the pipeline history.
const DEFAULT_EXECUTION_LIMIT: usize = 50;
const MAX_EXECUTION_LIMIT: usize = 200;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// Log a store failure and turn it into a 500.
pub(super) fn store_failure(e: StorageError) -> Response {
    tracing::error!(error = %e, "store read failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, &format!("store error: {}", e)).into_response()
}

/// Read one project, or the 404/500 response to return instead.
pub(super) async fn load_project(state: &AppState, id: &str) -> Result<Project, Response> {
    match state.store.get(Table::Projects, id).await {
        Ok(row) => row.decode().map_err(store_failure),
        Err(StorageError::RowNotFound { .. }) => Err(json_error(
            StatusCode::NOT_FOUND,
            &format!("project '{}' not found", id),
        )
        .into_response()),
        Err(e) => Err(store_failure(e)),
    }
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "project_id": state.project_id,
    });
    (StatusCode::OK, Json(response))
}

fn project_card(project: &Project) -> serde_json::Value {
    let meta = &project.metadata;
    serde_json::json!({
        "id": project.id,
        "name": meta.name,
        "description": meta.description,
        "status": meta.status,
        "current_stage": meta.current_stage,
        "overall_progress": meta.overall_progress(),
        "created_at": meta.created_at,
        "updated_at": meta.updated_at,
        "created": format_date(&meta.created_at),
        "updated": format_date(&meta.updated_at),
    })
}

/// GET /api/projects
pub(crate) async fn handle_list_projects(State(state): State<Arc<AppState>>) -> Response {
    let rows = match state.store.select(Table::Projects, &Filter::all(), 0).await {
        Ok(rows) => rows,
        Err(e) => return store_failure(e),
    };

    let mut cards = Vec::with_capacity(rows.len());
    for row in &rows {
        match row.decode::<Project>() {
            Ok(project) => cards.push(project_card(&project)),
            Err(e) => tracing::warn!(id = %row.id, error = %e, "skipping undecodable project row"),
        }
    }

    (StatusCode::OK, Json(serde_json::json!({ "projects": cards }))).into_response()
}

/// GET /api/projects/{id}
pub(crate) async fn handle_get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let project = match load_project(&state, &id).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let model = UnlockModel::for_project(&project.metadata);
    let stages: Vec<serde_json::Value> = model
        .views()
        .into_iter()
        .map(|view| {
            let route = Route::for_stage(&id, i64::from(view.definition.id)).map(|r| r.path());
            let mut value = serde_json::to_value(&view).unwrap_or_default();
            if let Some(obj) = value.as_object_mut() {
                obj.insert("route".to_string(), serde_json::json!(route));
            }
            value
        })
        .collect();

    let mut body = project_card(&project);
    if let Some(obj) = body.as_object_mut() {
        obj.insert("progress".to_string(), serde_json::json!(project.metadata.progress));
        obj.insert(
            "updated_display".to_string(),
            serde_json::json!(format_date_time(&project.metadata.updated_at)),
        );
        obj.insert("stages".to_string(), serde_json::json!(stages));
    }
    (StatusCode::OK, Json(body)).into_response()
}

/// GET /api/projects/{id}/environments
pub(crate) async fn handle_environments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = load_project(&state, &id).await {
        return resp;
    }

    let document = match StoreStageAccessor::new(state.store.as_ref(), &id)
        .environments()
        .await
    {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            return json_error(StatusCode::NOT_FOUND, "no environments recorded").into_response()
        }
        Err(e) => return store_failure(e),
    };

    let summary = match EnvironmentList::deserialize(&document) {
        Ok(list) => serde_json::to_value(list.summary()).ok(),
        Err(e) => {
            tracing::warn!(project_id = %id, error = %e, "environments document is malformed");
            None
        }
    };

    etag_response(
        &headers,
        serde_json::json!({ "document": document, "summary": summary }),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExecutionQuery {
    stage: Option<i64>,
    limit: Option<usize>,
}

/// GET /api/projects/{id}/pipeline-executions?stage=&limit=
///
/// Most recent first.
pub(crate) async fn handle_pipeline_executions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ExecutionQuery>,
) -> Response {
    if let Err(resp) = load_project(&state, &id).await {
        return resp;
    }

    let mut filter = Filter::eq("project_id", id.as_str());
    if let Some(stage) = query.stage {
        filter = filter.and_eq("stage_number", stage);
    }
    let rows = match state
        .store
        .select(Table::PipelineExecutions, &filter, 0)
        .await
    {
        Ok(rows) => rows,
        Err(e) => return store_failure(e),
    };

    let mut executions: Vec<PipelineExecution> = Vec::with_capacity(rows.len());
    for row in &rows {
        match row.decode() {
            Ok(execution) => executions.push(execution),
            Err(e) => tracing::warn!(id = %row.id, error = %e, "skipping undecodable execution"),
        }
    }
    // RFC 3339 UTC timestamps sort lexically; runs without a start go last.
    executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    let total = executions.len();
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EXECUTION_LIMIT)
        .clamp(1, MAX_EXECUTION_LIMIT);
    executions.truncate(limit);

    let body = serde_json::json!({
        "total": total,
        "limit": limit,
        "executions": executions,
    });
    (StatusCode::OK, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct NavigateQuery {
    #[serde(default)]
    path: String,
}

/// GET /api/navigate?path=...
///
/// Resolve a dashboard path. Unknown paths and unknown projects resolve to
/// the project list; locked stages resolve to the project dashboard.
pub(crate) async fn handle_navigate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NavigateQuery>,
) -> Response {
    let requested = Route::parse(&query.path);

    let resolved = match requested.project_id() {
        None => requested.clone(),
        Some(id) => match state.store.get(Table::Projects, id).await {
            Ok(row) => match row.decode::<Project>() {
                Ok(project) => requested
                    .clone()
                    .gate(&UnlockModel::for_project(&project.metadata)),
                Err(e) => return store_failure(e),
            },
            Err(StorageError::RowNotFound { .. }) => Route::ProjectList,
            Err(e) => return store_failure(e),
        },
    };

    let body = serde_json::json!({
        "requested": query.path,
        "path": resolved.path(),
        "route": resolved,
        "redirected": resolved != requested,
    });
    (StatusCode::OK, Json(body)).into_response()
}
