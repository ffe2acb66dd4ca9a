//! Conformance test suite for `BackingStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any `BackingStore`
//! implementation can run to verify correctness. The suite covers:
//!
//! - **Insert**: id assignment, field round-trip, caller-supplied ids
//! - **Select**: filtering, limits, insertion order, table isolation
//! - **Conditional insert**: `insert_if_empty` on empty and populated tables
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use cutover_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn memory_conformance() {
//!     let report = run_conformance_suite(|| async { MemoryStore::new() }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod conditional;
mod insert;
mod select;

use std::fmt;
use std::future::Future;

use serde_json::json;

use crate::record::Fields;
use crate::BackingStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "insert", "select").
    pub category: String,
    /// Test name (e.g. "insert_assigns_unique_ids").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// storage instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: BackingStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(insert::run_insert_tests(&factory).await);
    results.extend(select::run_select_tests(&factory).await);
    results.extend(conditional::run_conditional_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors ─────────────────────────────────────────────

fn project_fields(name: &str) -> Fields {
    object(json!({
        "name": name,
        "status": "in_progress",
        "current_stage": 3,
        "progress": {"stage0": 100, "stage3": 75},
    }))
}

fn file_fields(project_id: &str, file_type: &str) -> Fields {
    object(json!({
        "project_id": project_id,
        "file_type": file_type,
        "content": {"kind": file_type},
    }))
}

fn object(value: serde_json::Value) -> Fields {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Fields::new(),
    }
}
