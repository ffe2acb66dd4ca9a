use std::future::Future;

use super::{file_fields, project_fields, TestResult};
use crate::{BackingStore, Filter, Table};

pub(super) async fn run_select_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "select",
            "select_empty_table_returns_nothing",
            select_empty_table_returns_nothing(factory).await,
        ),
        TestResult::from_result(
            "select",
            "select_filters_by_equality",
            select_filters_by_equality(factory).await,
        ),
        TestResult::from_result(
            "select",
            "select_respects_limit",
            select_respects_limit(factory).await,
        ),
        TestResult::from_result(
            "select",
            "select_zero_limit_returns_all",
            select_zero_limit_returns_all(factory).await,
        ),
        TestResult::from_result(
            "select",
            "tables_are_isolated",
            tables_are_isolated(factory).await,
        ),
        TestResult::from_result(
            "select",
            "count_matches_select",
            count_matches_select(factory).await,
        ),
    ]
}

async fn seed_files<S: BackingStore>(s: &S) -> Result<(), String> {
    for (project, file_type) in [
        ("p1", "stage1"),
        ("p1", "stage2"),
        ("p2", "stage1"),
        ("p1", "stage3"),
    ] {
        s.insert(Table::ProjectFiles, file_fields(project, file_type))
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

// ── Test implementations ──────────────────────────────────────────────────────

/// Selecting from a table that was never written is an empty list, not an error.
async fn select_empty_table_returns_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rows = s
        .select(Table::PipelineExecutions, &Filter::all(), 0)
        .await
        .map_err(|e| e.to_string())?;
    if !rows.is_empty() {
        return Err(format!("expected no rows, got {}", rows.len()));
    }
    Ok(())
}

async fn select_filters_by_equality<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_files(&s).await?;

    let rows = s
        .select(
            Table::ProjectFiles,
            &Filter::eq("project_id", "p1").and_eq("file_type", "stage2"),
            0,
        )
        .await
        .map_err(|e| e.to_string())?;
    if rows.len() != 1 {
        return Err(format!("expected 1 row for p1/stage2, got {}", rows.len()));
    }

    let rows = s
        .select(Table::ProjectFiles, &Filter::eq("project_id", "p1"), 0)
        .await
        .map_err(|e| e.to_string())?;
    if rows.len() != 3 {
        return Err(format!("expected 3 rows for p1, got {}", rows.len()));
    }
    Ok(())
}

async fn select_respects_limit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_files(&s).await?;
    let rows = s
        .select(Table::ProjectFiles, &Filter::eq("project_id", "p1"), 2)
        .await
        .map_err(|e| e.to_string())?;
    let types: Vec<&str> = rows
        .iter()
        .filter_map(|r| r.fields.get("file_type").and_then(|v| v.as_str()))
        .collect();
    if types != ["stage1", "stage2"] {
        return Err(format!("expected first two p1 rows, got {:?}", types));
    }
    Ok(())
}

async fn select_zero_limit_returns_all<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_files(&s).await?;
    let rows = s
        .select(Table::ProjectFiles, &Filter::all(), 0)
        .await
        .map_err(|e| e.to_string())?;
    if rows.len() != 4 {
        return Err(format!("expected 4 rows, got {}", rows.len()));
    }
    Ok(())
}

/// Rows inserted into one table never show up in another.
async fn tables_are_isolated<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert(Table::Projects, project_fields("Hotel"))
        .await
        .map_err(|e| e.to_string())?;
    for table in [Table::ProjectFiles, Table::PipelineExecutions] {
        let rows = s
            .select(table, &Filter::all(), 0)
            .await
            .map_err(|e| e.to_string())?;
        if !rows.is_empty() {
            return Err(format!("{table} should be empty, has {} rows", rows.len()));
        }
    }
    Ok(())
}

async fn count_matches_select<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed_files(&s).await?;
    let filter = Filter::eq("file_type", "stage1");
    let counted = s
        .count(Table::ProjectFiles, &filter)
        .await
        .map_err(|e| e.to_string())?;
    if counted != 2 {
        return Err(format!("expected count 2, got {counted}"));
    }
    Ok(())
}
