//! Stage document, summary and asset handlers.
//!
//! Document responses carry an `ETag` (SHA-256 of the compact JSON body) and
//! answer a matching `If-None-Match` with 304 Not Modified.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cutover_core::documents::{
    AssetManifest, RuntimeConfigs, ALL_ASSET_TYPES, DEFAULT_RUNTIME_ENVIRONMENT,
};
use cutover_core::{summarize, Route, StageView, StoreStageAccessor, UnlockModel};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::handlers::{load_project, store_failure};
use super::json_error;
use super::state::AppState;

/// Stage whose document is the asset manifest.
const MANIFEST_STAGE: i64 = 3;
/// Stage whose document holds per-environment runtime configs.
const RUNTIME_STAGE: i64 = 4;

/// Default and maximum page size for the asset listing.
const DEFAULT_ASSET_LIMIT: usize = 25;
const MAX_ASSET_LIMIT: usize = 200;

/// Hex SHA-256 of the compact serialization of `value`.
pub(crate) fn compute_etag(value: &Value) -> String {
    let canonical = serde_json::to_string(value).unwrap_or_default();
    let hash = Sha256::digest(canonical.as_bytes());
    format!("{:x}", hash)
}

/// 200 with an `ETag`, or 304 when `If-None-Match` already names it.
pub(super) fn etag_response(headers: &HeaderMap, body: Value) -> Response {
    let etag = compute_etag(&body);
    let etag_quoted = format!("\"{}\"", etag);

    if let Some(inm) = headers.get(header::IF_NONE_MATCH) {
        if let Ok(inm_str) = inm.to_str() {
            if inm_str == etag_quoted || inm_str == etag || inm_str == "*" {
                return StatusCode::NOT_MODIFIED.into_response();
            }
        }
    }

    let mut response = Json(body).into_response();
    if let Ok(val) = etag_quoted.parse() {
        response.headers_mut().insert(header::ETAG, val);
    }
    response
}

fn stage_not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "stage not found").into_response()
}

/// Project, parsed stage index and the stage's view, or the response to
/// return instead.
async fn resolve_stage(
    state: &AppState,
    id: &str,
    raw_stage: &str,
) -> Result<(i64, StageView), Response> {
    let project = load_project(state, id).await?;
    let stage: i64 = raw_stage.parse().map_err(|_| stage_not_found())?;
    let view = UnlockModel::for_project(&project.metadata)
        .view(stage)
        .ok_or_else(stage_not_found)?;
    Ok((stage, view))
}

async fn stored_document(state: &AppState, id: &str, stage: i64) -> Result<Value, Response> {
    match StoreStageAccessor::new(state.store.as_ref(), id)
        .stage_document(stage)
        .await
    {
        Ok(Some(doc)) => Ok(doc),
        Ok(None) => {
            Err(json_error(StatusCode::NOT_FOUND, "stage document not found").into_response())
        }
        Err(e) => Err(store_failure(e)),
    }
}

fn locked(view: &StageView, id: &str, field: &str) -> Response {
    let mut body = serde_json::json!({
        "stage": view,
        "route": Route::for_stage(id, i64::from(view.definition.id)).map(|r| r.path()),
        "locked": true,
    });
    if let Some(obj) = body.as_object_mut() {
        obj.insert(field.to_string(), Value::Null);
    }
    (StatusCode::OK, Json(body)).into_response()
}

/// GET /api/projects/{id}/stages/{stage}
///
/// A locked stage answers 200 with `locked: true` and a null document.
pub(crate) async fn handle_get_stage(
    State(state): State<Arc<AppState>>,
    Path((id, raw_stage)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let (stage, view) = match resolve_stage(&state, &id, &raw_stage).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !view.accessible {
        return locked(&view, &id, "document");
    }
    let document = match stored_document(&state, &id, stage).await {
        Ok(doc) => doc,
        Err(resp) => return resp,
    };

    let body = serde_json::json!({
        "stage": view,
        "route": Route::for_stage(&id, stage).map(|r| r.path()),
        "locked": false,
        "document": document,
    });
    etag_response(&headers, body)
}

/// GET /api/projects/{id}/stages/{stage}/summary
pub(crate) async fn handle_stage_summary(
    State(state): State<Arc<AppState>>,
    Path((id, raw_stage)): Path<(String, String)>,
) -> Response {
    let (stage, view) = match resolve_stage(&state, &id, &raw_stage).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !view.accessible {
        return locked(&view, &id, "summary");
    }
    let document = match stored_document(&state, &id, stage).await {
        Ok(doc) => doc,
        Err(resp) => return resp,
    };

    match summarize(stage, &document) {
        Ok(Some(summary)) => {
            let body = serde_json::json!({
                "stage": view,
                "locked": false,
                "summary": summary,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(None) => stage_not_found(),
        Err(e) => {
            tracing::warn!(project_id = %id, stage, error = %e, "stage document is malformed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("stage {} document is malformed: {}", stage, e),
            )
            .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssetQuery {
    #[serde(rename = "type")]
    asset_type: Option<String>,
    offset: Option<usize>,
    limit: Option<usize>,
}

/// GET /api/projects/{id}/stages/3/assets?type=&offset=&limit=
pub(crate) async fn handle_list_assets(
    State(state): State<Arc<AppState>>,
    Path((id, raw_stage)): Path<(String, String)>,
    Query(query): Query<AssetQuery>,
) -> Response {
    let (stage, view) = match resolve_stage(&state, &id, &raw_stage).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if stage != MANIFEST_STAGE {
        return json_error(StatusCode::NOT_FOUND, "stage has no asset manifest").into_response();
    }
    if !view.accessible {
        return locked(&view, &id, "assets");
    }
    let document = match stored_document(&state, &id, stage).await {
        Ok(doc) => doc,
        Err(resp) => return resp,
    };
    let manifest = match AssetManifest::deserialize(&document) {
        Ok(m) => m,
        Err(e) => {
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("asset manifest is malformed: {}", e),
            )
            .into_response()
        }
    };

    let asset_type = query.asset_type.as_deref().unwrap_or(ALL_ASSET_TYPES);
    let offset = query.offset.unwrap_or(0);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ASSET_LIMIT)
        .clamp(1, MAX_ASSET_LIMIT);

    let matching = manifest.filter(asset_type);
    let page: Vec<_> = matching.iter().skip(offset).take(limit).collect();

    let body = serde_json::json!({
        "type": asset_type,
        "total": matching.len(),
        "offset": offset,
        "limit": limit,
        "assets": page,
        "summary": manifest.summary(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct RuntimeQuery {
    env: Option<String>,
}

/// GET /api/projects/{id}/stages/4/runtime?env=
///
/// One environment's runtime config; `development` when `env` is omitted.
pub(crate) async fn handle_runtime_environment(
    State(state): State<Arc<AppState>>,
    Path((id, raw_stage)): Path<(String, String)>,
    Query(query): Query<RuntimeQuery>,
) -> Response {
    let (stage, view) = match resolve_stage(&state, &id, &raw_stage).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if stage != RUNTIME_STAGE {
        return json_error(StatusCode::NOT_FOUND, "stage has no runtime configs").into_response();
    }
    if !view.accessible {
        return locked(&view, &id, "config");
    }
    let document = match stored_document(&state, &id, stage).await {
        Ok(doc) => doc,
        Err(resp) => return resp,
    };
    let configs = match RuntimeConfigs::deserialize(&document) {
        Ok(c) => c,
        Err(e) => {
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("runtime configs are malformed: {}", e),
            )
            .into_response()
        }
    };

    let name = query
        .env
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_RUNTIME_ENVIRONMENT);
    let Some(config) = configs.environment(name) else {
        return json_error(
            StatusCode::NOT_FOUND,
            &format!("environment '{}' not found", name),
        )
        .into_response();
    };

    let body = serde_json::json!({
        "stage": view,
        "locked": false,
        "environment": name,
        "available": configs.summary().environments,
        "config": config,
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// GET /api/stages/{stage}
///
/// The fixture document for a stage index, without project gating.
pub(crate) async fn handle_raw_stage(
    State(state): State<Arc<AppState>>,
    Path(raw_stage): Path<String>,
    headers: HeaderMap,
) -> Response {
    let document = raw_stage
        .parse::<i64>()
        .ok()
        .and_then(|stage| state.accessor.stage_document(stage));
    match document {
        Some(doc) => etag_response(&headers, doc.clone()),
        None => stage_not_found(),
    }
}
