use std::collections::HashSet;
use std::future::Future;

use super::{file_fields, project_fields, TestResult};
use crate::{BackingStore, Filter, StorageError, Table};

pub(super) async fn run_insert_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "insert",
            "insert_returns_row_with_id",
            insert_returns_row_with_id(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "insert_assigns_unique_ids",
            insert_assigns_unique_ids(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "inserted_fields_round_trip",
            inserted_fields_round_trip(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "inserted_row_readable_by_id",
            inserted_row_readable_by_id(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "get_unknown_id_is_row_not_found",
            get_unknown_id_is_row_not_found(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "insert_many_preserves_order",
            insert_many_preserves_order(factory).await,
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

/// A successful insert hands back the stored row with a non-empty id.
async fn insert_returns_row_with_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let row = s
        .insert(Table::Projects, project_fields("Hotel"))
        .await
        .map_err(|e| e.to_string())?
        .ok_or("insert returned no row")?;
    if row.id.is_empty() {
        return Err("inserted row has an empty id".to_string());
    }
    if row.created_at.is_empty() {
        return Err("inserted row has an empty created_at".to_string());
    }
    Ok(())
}

/// Every insert gets a distinct id.
async fn insert_assigns_unique_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut ids = HashSet::new();
    for i in 0..10 {
        let row = s
            .insert(Table::ProjectFiles, file_fields("p1", &format!("stage{i}")))
            .await
            .map_err(|e| e.to_string())?
            .ok_or("insert returned no row")?;
        if !ids.insert(row.id.clone()) {
            return Err(format!("duplicate id {}", row.id));
        }
    }
    Ok(())
}

/// The field object passed to insert is returned unchanged by select.
async fn inserted_fields_round_trip<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let fields = project_fields("Hotel");
    s.insert(Table::Projects, fields.clone())
        .await
        .map_err(|e| e.to_string())?;
    let rows = s
        .select(Table::Projects, &Filter::all(), 0)
        .await
        .map_err(|e| e.to_string())?;
    match rows.as_slice() {
        [row] if row.fields == fields => Ok(()),
        [row] => Err(format!("fields changed: {:?}", row.fields)),
        _ => Err(format!("expected 1 row, got {}", rows.len())),
    }
}

/// `get` finds a row by the id insert returned.
async fn inserted_row_readable_by_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert(Table::Projects, project_fields("Other"))
        .await
        .map_err(|e| e.to_string())?;
    let row = s
        .insert(Table::Projects, project_fields("Hotel"))
        .await
        .map_err(|e| e.to_string())?
        .ok_or("insert returned no row")?;
    let fetched = s
        .get(Table::Projects, &row.id)
        .await
        .map_err(|e| e.to_string())?;
    if fetched != row {
        return Err(format!("expected {:?}, got {:?}", row, fetched));
    }
    Ok(())
}

/// `get` on a missing id is `RowNotFound` carrying the table and id.
async fn get_unknown_id_is_row_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get(Table::Projects, "nope").await {
        Err(StorageError::RowNotFound { table, id }) => {
            if table != Table::Projects || id != "nope" {
                return Err(format!("wrong error fields: {table}/{id}"));
            }
            Ok(())
        }
        Err(e) => Err(format!("expected RowNotFound, got {e}")),
        Ok(row) => Err(format!("expected RowNotFound, got row {}", row.id)),
    }
}

/// `insert_many` writes all records and select returns them in order.
async fn insert_many_preserves_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let types = ["repositories", "environments", "stage1", "stage2"];
    let records = types.iter().map(|t| file_fields("p1", t)).collect();
    let inserted = s
        .insert_many(Table::ProjectFiles, records)
        .await
        .map_err(|e| e.to_string())?;
    if inserted.len() != types.len() {
        return Err(format!("expected {} rows back, got {}", types.len(), inserted.len()));
    }
    let rows = s
        .select(Table::ProjectFiles, &Filter::all(), 0)
        .await
        .map_err(|e| e.to_string())?;
    let got: Vec<String> = rows
        .iter()
        .filter_map(|r| r.fields.get("file_type").and_then(|v| v.as_str()))
        .map(|s| s.to_string())
        .collect();
    if got != types {
        return Err(format!("expected order {:?}, got {:?}", types, got));
    }
    Ok(())
}
