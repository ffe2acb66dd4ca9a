//! Typed views over the stage documents and the headline figures the
//! dashboard shows for each one.
//!
//! Stage documents are stored and served as opaque JSON. These types are
//! only used to compute summaries, filter manifest assets, and check that a
//! fixture set has the canonical shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fixtures::{FixtureName, FixtureSet};

/// Rounded `part / whole` as a percentage; 0 when `whole` is 0.
pub fn percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let pct = (part as f64 / whole as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

fn count_by<'a, I>(keys: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

// ── Stage 0: repositories ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryList {
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub url: String,
    pub branch: String,
    pub analysis_status: String,
    #[serde(default)]
    pub last_scanned: Option<String>,
    #[serde(default)]
    pub metrics: Option<RepositoryMetrics>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RepositoryMetrics {
    pub total_files: u64,
    pub mule_flows: u64,
    pub config_files: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositorySummary {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub total_files: u64,
    pub mule_flows: u64,
    pub config_files: u64,
}

impl RepositoryList {
    pub fn summary(&self) -> RepositorySummary {
        let metrics = || self.repositories.iter().filter_map(|r| r.metrics);
        RepositorySummary {
            total: self.repositories.len(),
            by_status: count_by(self.repositories.iter().map(|r| r.analysis_status.as_str())),
            total_files: metrics().map(|m| m.total_files).sum(),
            mule_flows: metrics().map(|m| m.mule_flows).sum(),
            config_files: metrics().map(|m| m.config_files).sum(),
        }
    }
}

// ── Stage 1: inventory ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub summary: InventoryCounts,
    pub flows_data: Vec<Flow>,
    #[serde(default)]
    pub connectors_data: Vec<Connector>,
    #[serde(default)]
    pub raml_endpoints: Vec<Value>,
    #[serde(default)]
    pub dataweave_transformations: Vec<Value>,
    #[serde(default)]
    pub config_properties_data: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCounts {
    pub total_flows: u64,
    pub total_subflows: u64,
    pub total_connectors: u64,
    pub total_endpoints: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub flow_name: String,
    #[serde(rename = "type")]
    pub flow_type: String,
    pub trigger: String,
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    pub processors: u64,
    pub complexity: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub name: String,
    #[serde(rename = "type")]
    pub connector_type: String,
    pub connection_type: String,
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    #[serde(flatten)]
    pub counts: InventoryCounts,
    pub flows_listed: usize,
    pub connectors_listed: usize,
    pub endpoints_listed: usize,
    pub transformations: usize,
    pub config_properties: usize,
    pub flows_by_complexity: BTreeMap<String, usize>,
}

impl Inventory {
    pub fn summary(&self) -> InventorySummary {
        InventorySummary {
            counts: self.summary,
            flows_listed: self.flows_data.len(),
            connectors_listed: self.connectors_data.len(),
            endpoints_listed: self.raml_endpoints.len(),
            transformations: self.dataweave_transformations.len(),
            config_properties: self.config_properties_data.len(),
            flows_by_complexity: count_by(self.flows_data.iter().map(|f| f.complexity.as_str())),
        }
    }
}

// ── Stage 2: target architecture ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct TargetArchitecture {
    pub consolidation: Consolidation,
    pub flow_services: Vec<FlowService>,
    #[serde(default)]
    pub rest_apis: Vec<RestApi>,
    #[serde(default)]
    pub workflows: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Consolidation {
    pub mule_flow_count: u64,
    pub wm_service_count: u64,
    pub reduction_ratio: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlowService {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub absorbs_mule_flows: Vec<String>,
    #[serde(default)]
    pub http_method: String,
    #[serde(default)]
    pub http_path: String,
    pub complexity: String,
    pub estimated_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestApi {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resources: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchitectureSummary {
    pub mule_flow_count: u64,
    pub wm_service_count: u64,
    pub reduction_ratio: String,
    pub total_estimated_minutes: u64,
    pub estimated_hours: u64,
    pub rest_apis: usize,
    pub workflows: usize,
}

impl TargetArchitecture {
    pub fn summary(&self) -> ArchitectureSummary {
        let minutes: u64 = self.flow_services.iter().map(|s| s.estimated_minutes).sum();
        ArchitectureSummary {
            mule_flow_count: self.consolidation.mule_flow_count,
            wm_service_count: self.consolidation.wm_service_count,
            reduction_ratio: self.consolidation.reduction_ratio.clone(),
            total_estimated_minutes: minutes,
            estimated_hours: (minutes as f64 / 60.0).round() as u64,
            rest_apis: self.rest_apis.len(),
            workflows: self.workflows.len(),
        }
    }
}

// ── Stage 3: asset manifest ──────────────────────────────────────────────────

pub const ALL_ASSET_TYPES: &str = "all";

#[derive(Debug, Clone, Deserialize)]
pub struct AssetManifest {
    pub assets: Vec<Asset>,
}

/// A generated implementation artifact.
///
/// `needs_configuration` is set upstream for assets that still carry
/// placeholder values and must be edited before deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub needs_configuration: bool,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestSummary {
    pub total_assets: usize,
    pub db_connectors: usize,
    pub integration_flows: usize,
    pub http_listeners: usize,
    pub rest_endpoints: usize,
    pub document_types: usize,
    pub needs_configuration: usize,
    pub by_type: BTreeMap<String, usize>,
}

impl AssetManifest {
    /// Assets of one type, or every asset for [`ALL_ASSET_TYPES`].
    pub fn filter<'a>(&'a self, asset_type: &str) -> Vec<&'a Asset> {
        self.assets
            .iter()
            .filter(|a| asset_type == ALL_ASSET_TYPES || a.asset_type == asset_type)
            .collect()
    }

    pub fn summary(&self) -> ManifestSummary {
        let by_type = count_by(self.assets.iter().map(|a| a.asset_type.as_str()));
        let of = |t: &str| by_type.get(t).copied().unwrap_or(0);
        ManifestSummary {
            total_assets: self.assets.len(),
            db_connectors: of("db_connector"),
            integration_flows: of("integration_flow"),
            http_listeners: of("http_listener"),
            rest_endpoints: of("rest_endpoint"),
            document_types: of("document_type"),
            needs_configuration: self.assets.iter().filter(|a| a.needs_configuration).count(),
            by_type: by_type.clone(),
        }
    }
}

// ── Stage 4: runtime configs ─────────────────────────────────────────────────

/// The three deployment tiers a runtime config is written for.
pub const RUNTIME_ENVIRONMENTS: [&str; 3] = ["development", "staging", "production"];

/// Environment shown when none is selected.
pub const DEFAULT_RUNTIME_ENVIRONMENT: &str = "development";

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfigs {
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub integration_server: IntegrationServerConfig,
    pub monitoring: MonitoringConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationServerConfig {
    pub memory_allocation: String,
    pub thread_pool_size: u32,
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub metrics_enabled: bool,
    pub health_check_path: String,
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub ssl_enabled: bool,
    pub authentication_method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeSummary {
    pub environments: Vec<String>,
    pub ssl_enabled: Vec<String>,
    pub missing: Vec<String>,
}

impl RuntimeConfigs {
    pub fn environment(&self, name: &str) -> Option<&EnvironmentConfig> {
        self.environments.get(name)
    }

    pub fn summary(&self) -> RuntimeSummary {
        RuntimeSummary {
            environments: self.environments.keys().cloned().collect(),
            ssl_enabled: self
                .environments
                .iter()
                .filter(|(_, c)| c.security.ssl_enabled)
                .map(|(name, _)| name.clone())
                .collect(),
            missing: RUNTIME_ENVIRONMENTS
                .iter()
                .filter(|name| !self.environments.contains_key(**name))
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

// ── Stage 5: cutover ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Cutover {
    pub test_results: Vec<TestSuiteResult>,
    pub migration_runbook: Vec<RunbookStep>,
    #[serde(default)]
    pub dns_routing_plan: Value,
    #[serde(default)]
    pub rollback_procedures: Vec<Value>,
    #[serde(default)]
    pub stakeholder_approvals: Vec<Value>,
    #[serde(default)]
    pub validation_checklist: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestSuiteResult {
    pub test_suite_name: String,
    pub test_type: String,
    pub status: String,
    pub execution_time_ms: u64,
    pub assertions_passed: u64,
    pub assertions_total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunbookStep {
    pub step_number: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub responsible: String,
    pub estimated_duration_minutes: u64,
    #[serde(default)]
    pub dependencies: Vec<u32>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutoverSummary {
    pub assertions_passed: u64,
    pub assertions_total: u64,
    pub success_rate: u8,
    pub steps_completed: usize,
    pub steps_total: usize,
    pub runbook_percent: u8,
    pub test_suites: usize,
    pub suites_by_status: BTreeMap<String, usize>,
    pub runbook_minutes: u64,
}

impl Cutover {
    pub fn summary(&self) -> CutoverSummary {
        let passed: u64 = self.test_results.iter().map(|s| s.assertions_passed).sum();
        let total: u64 = self.test_results.iter().map(|s| s.assertions_total).sum();
        let completed = self
            .migration_runbook
            .iter()
            .filter(|s| s.status == "completed")
            .count();
        let steps = self.migration_runbook.len();
        CutoverSummary {
            assertions_passed: passed,
            assertions_total: total,
            success_rate: percent(passed, total),
            steps_completed: completed,
            steps_total: steps,
            runbook_percent: percent(completed as u64, steps as u64),
            test_suites: self.test_results.len(),
            suites_by_status: count_by(self.test_results.iter().map(|s| s.status.as_str())),
            runbook_minutes: self
                .migration_runbook
                .iter()
                .map(|s| s.estimated_duration_minutes)
                .sum(),
        }
    }
}

// ── Environments ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentList {
    pub environments: Vec<Environment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Environment {
    pub name: String,
    #[serde(rename = "type")]
    pub env_type: String,
    pub api_url: String,
    pub deployment_status: String,
    pub health_status: String,
    #[serde(default)]
    pub last_deployed: Option<String>,
    #[serde(default)]
    pub metrics: Option<Value>,
    #[serde(default)]
    pub services: Vec<DeployedService>,
    pub infrastructure: Infrastructure,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployedService {
    pub name: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Infrastructure {
    pub server_specs: String,
    pub region: String,
    pub availability_zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentSummary {
    pub total: usize,
    pub deployed: usize,
    pub healthy: usize,
    pub services: usize,
    pub by_deployment_status: BTreeMap<String, usize>,
    pub by_health_status: BTreeMap<String, usize>,
}

impl EnvironmentList {
    pub fn summary(&self) -> EnvironmentSummary {
        let envs = &self.environments;
        EnvironmentSummary {
            total: envs.len(),
            deployed: envs.iter().filter(|e| e.deployment_status == "deployed").count(),
            healthy: envs.iter().filter(|e| e.health_status == "healthy").count(),
            services: envs.iter().map(|e| e.services.len()).sum(),
            by_deployment_status: count_by(envs.iter().map(|e| e.deployment_status.as_str())),
            by_health_status: count_by(envs.iter().map(|e| e.health_status.as_str())),
        }
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageSummary {
    Repositories(RepositorySummary),
    Inventory(InventorySummary),
    Architecture(ArchitectureSummary),
    Manifest(ManifestSummary),
    Runtime(RuntimeSummary),
    Cutover(CutoverSummary),
}

fn view<T: serde::de::DeserializeOwned>(document: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(document)
}

/// Summarize the document for `stage`. `Ok(None)` for an unknown stage.
pub fn summarize(stage: i64, document: &Value) -> Result<Option<StageSummary>, serde_json::Error> {
    let summary = match stage {
        0 => StageSummary::Repositories(view::<RepositoryList>(document)?.summary()),
        1 => StageSummary::Inventory(view::<Inventory>(document)?.summary()),
        2 => StageSummary::Architecture(view::<TargetArchitecture>(document)?.summary()),
        3 => StageSummary::Manifest(view::<AssetManifest>(document)?.summary()),
        4 => StageSummary::Runtime(view::<RuntimeConfigs>(document)?.summary()),
        5 => StageSummary::Cutover(view::<Cutover>(document)?.summary()),
        _ => return Ok(None),
    };
    Ok(Some(summary))
}

/// A fixture document that does not have its canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentIssue {
    pub fixture: FixtureName,
    pub message: String,
}

/// Check every stage document and the environment list against their
/// typed views.
pub fn check_documents(fixtures: &FixtureSet) -> Vec<DocumentIssue> {
    let mut issues = Vec::new();
    for stage in 0..=5 {
        let Some(name) = crate::accessor::stage_fixture(stage) else {
            continue;
        };
        if let Err(e) = summarize(stage, fixtures.document(name)) {
            issues.push(DocumentIssue {
                fixture: name,
                message: e.to_string(),
            });
        }
    }
    if let Err(e) = view::<EnvironmentList>(fixtures.document(FixtureName::Environments)) {
        issues.push(DocumentIssue {
            fixture: FixtureName::Environments,
            message: e.to_string(),
        });
    }
    issues
}
