use std::future::Future;

use super::{project_fields, TestResult};
use crate::{BackingStore, Filter, InsertOutcome, Table};

pub(super) async fn run_conditional_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "conditional",
            "insert_if_empty_inserts_into_empty_table",
            insert_if_empty_inserts_into_empty_table(factory).await,
        ),
        TestResult::from_result(
            "conditional",
            "insert_if_empty_returns_first_existing_row",
            insert_if_empty_returns_first_existing_row(factory).await,
        ),
        TestResult::from_result(
            "conditional",
            "repeated_insert_if_empty_keeps_one_row",
            repeated_insert_if_empty_keeps_one_row(factory).await,
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn insert_if_empty_inserts_into_empty_table<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let outcome = s
        .insert_if_empty(Table::Projects, project_fields("Hotel"))
        .await
        .map_err(|e| e.to_string())?;
    match outcome {
        InsertOutcome::Inserted(row)
            if row.fields.get("name").and_then(|v| v.as_str()) == Some("Hotel") =>
        {
            Ok(())
        }
        other => Err(format!("expected Inserted(Hotel), got {:?}", other)),
    }
}

/// A populated table is left untouched and the first row is reported.
async fn insert_if_empty_returns_first_existing_row<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let first = s
        .insert(Table::Projects, project_fields("First"))
        .await
        .map_err(|e| e.to_string())?
        .ok_or("insert returned no row")?;
    s.insert(Table::Projects, project_fields("Second"))
        .await
        .map_err(|e| e.to_string())?;

    let outcome = s
        .insert_if_empty(Table::Projects, project_fields("Third"))
        .await
        .map_err(|e| e.to_string())?;
    match outcome {
        InsertOutcome::Existing(row) if row.id == first.id => {}
        other => return Err(format!("expected Existing({}), got {:?}", first.id, other)),
    }

    let count = s
        .count(Table::Projects, &Filter::all())
        .await
        .map_err(|e| e.to_string())?;
    if count != 2 {
        return Err(format!("expected 2 rows after no-op, got {count}"));
    }
    Ok(())
}

async fn repeated_insert_if_empty_keeps_one_row<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut inserted = 0;
    for i in 0..5 {
        let outcome = s
            .insert_if_empty(Table::Projects, project_fields(&format!("Hotel {i}")))
            .await
            .map_err(|e| e.to_string())?;
        if outcome.was_inserted() {
            inserted += 1;
        }
    }
    if inserted != 1 {
        return Err(format!("expected exactly one insert, got {inserted}"));
    }
    let count = s
        .count(Table::Projects, &Filter::all())
        .await
        .map_err(|e| e.to_string())?;
    if count != 1 {
        return Err(format!("expected 1 row, got {count}"));
    }
    Ok(())
}
