//! The synthesis document and its assembly from stage outputs.
//!
//! Field order and naming here are the JSON contract consumed by downstream
//! emitters. Nothing in the document depends on wall-clock time, so identical
//! inputs give byte-identical output.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::correlation::{CorrelationSample, CorrelationStats};
use super::coupling::CouplingSummary;
use super::hotspots::critical_files;
use super::Synthesis;
use crate::config::SynthesisConfig;
use crate::core::{
    CouplingEdge, MigrationEffort, MigrationRisk, MigrationStep, ModuleCandidate, SecurityHotspot,
    TableFact,
};
use crate::io::loader::{FactBundle, InputStatuses};

const GATEWAY_APP: &str = "gateway";
const GATEWAY_PORT: u16 = 3000;
const FIRST_SERVICE_PORT: u16 = 3001;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisReport {
    #[serde(rename = "_meta")]
    pub meta: ReportMeta,
    pub summary: Summary,
    pub module_recommendations: Vec<ModuleCandidate>,
    pub migration_order: Vec<MigrationStep>,
    pub workspace_layout: WorkspaceLayout,
    pub data_architecture: DataArchitecture,
    pub security_analysis: SecurityAnalysis,
    pub correlations: CorrelationReport,
    pub key_decisions: Vec<KeyDecision>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    pub description: String,
    pub source_analysis: String,
    pub version: String,
    pub cycle_breaker: String,
    pub inputs: InputStatuses,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_modules: usize,
    pub total_microservices: usize,
    pub total_gateway_modules: usize,
    pub total_routes: usize,
    pub total_tables: usize,
    pub total_security_issues: usize,
    pub high_risk_modules: Vec<String>,
    pub estimated_total_effort: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppKind {
    HttpApi,
    Microservice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AppKind,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibSpec {
    pub name: String,
    pub purpose: String,
    pub used_by: Vec<String>,
}

/// Target workspace: one gateway app, one app per extracted service, shared libs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceLayout {
    pub apps: Vec<AppSpec>,
    pub libs: Vec<LibSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleType {
    Microservice,
    GatewayModule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleTables {
    pub owned_tables: Vec<String>,
    pub module_type: ModuleType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableOwnership {
    pub by_module: BTreeMap<String, ModuleTables>,
    /// Tables used by more than one module.
    pub shared_tables: BTreeMap<String, Vec<String>>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataArchitecture {
    pub table_ownership: TableOwnership,
    /// Every schema table some file accesses, by name.
    pub table_access: Vec<TableFact>,
    pub data_couplings: Vec<CouplingEdge>,
    pub coupling_summary: CouplingSummary,
    pub dependency_cycles: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityAnalysis {
    pub hotspots: Vec<SecurityHotspot>,
    pub total_hotspots: usize,
    pub critical_files: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrelationReport {
    #[serde(flatten)]
    pub stats: CorrelationStats,
    pub sample_correlations: Vec<CorrelationSample>,
    pub unclustered_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyDecision {
    pub decision: String,
    pub rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_offs: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affected_tables: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affected_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
}

/// Weighted module-effort score bucketed into a calendar estimate.
pub fn estimate_total_effort(modules: &[ModuleCandidate]) -> &'static str {
    let score: usize = modules
        .iter()
        .map(|m| match m.estimated_effort {
            MigrationEffort::Small => 1,
            MigrationEffort::Medium => 3,
            MigrationEffort::Large => 7,
        })
        .sum();
    match score {
        0..=10 => "small (1-2 weeks)",
        11..=25 => "medium (2-4 weeks)",
        26..=50 => "large (1-2 months)",
        _ => "very large (2+ months)",
    }
}

fn summarize(modules: &[ModuleCandidate], total_tables: usize) -> Summary {
    let microservices = modules.iter().filter(|m| m.is_microservice).count();
    Summary {
        total_modules: modules.len(),
        total_microservices: microservices,
        total_gateway_modules: modules.len() - microservices,
        total_routes: modules.iter().map(|m| m.routes.len()).sum(),
        total_tables,
        total_security_issues: modules.iter().map(|m| m.security_issues).sum(),
        high_risk_modules: modules
            .iter()
            .filter(|m| m.migration_risk == MigrationRisk::High)
            .map(|m| m.name.clone())
            .collect(),
        estimated_total_effort: estimate_total_effort(modules).to_string(),
    }
}

pub fn workspace_layout(modules: &[ModuleCandidate], transport: &str) -> WorkspaceLayout {
    let (services, gateway): (Vec<&ModuleCandidate>, Vec<&ModuleCandidate>) =
        modules.iter().partition(|m| m.is_microservice);
    let service_apps: Vec<String> = services
        .iter()
        .map(|m| format!("{}-service", m.name))
        .collect();

    let mut apps = vec![AppSpec {
        name: GATEWAY_APP.to_string(),
        kind: AppKind::HttpApi,
        port: GATEWAY_PORT,
        transport: None,
        modules: gateway.iter().map(|m| m.name.clone()).collect(),
        description: "Main HTTP API entry point".to_string(),
    }];
    apps.extend(services.iter().zip(FIRST_SERVICE_PORT..).map(|(m, port)| AppSpec {
        name: format!("{}-service", m.name),
        kind: AppKind::Microservice,
        port,
        transport: Some(transport.to_string()),
        modules: Vec::new(),
        description: format!("Microservice for the {} domain", m.name),
    }));

    let everyone: Vec<String> = std::iter::once(GATEWAY_APP.to_string())
        .chain(service_apps.iter().cloned())
        .collect();
    let mut libs: Vec<LibSpec> = [
        ("shared-dto", "Shared DTOs, interfaces and types"),
        ("database", "ORM configuration and entities"),
        ("common", "Shared utilities, guards and interceptors"),
    ]
    .into_iter()
    .map(|(name, purpose)| LibSpec {
        name: name.to_string(),
        purpose: purpose.to_string(),
        used_by: everyone.clone(),
    })
    .collect();
    libs.extend(service_apps.iter().map(|app| LibSpec {
        name: format!("contracts/{app}"),
        purpose: format!("DTOs and message patterns for {app}"),
        used_by: vec![GATEWAY_APP.to_string(), app.clone()],
    }));

    WorkspaceLayout { apps, libs }
}

pub fn table_ownership(modules: &[ModuleCandidate]) -> TableOwnership {
    let by_module = modules
        .iter()
        .filter(|m| !m.tables.is_empty())
        .map(|m| {
            let module_type = if m.is_microservice {
                ModuleType::Microservice
            } else {
                ModuleType::GatewayModule
            };
            (
                m.name.clone(),
                ModuleTables {
                    owned_tables: m.tables.iter().cloned().collect(),
                    module_type,
                },
            )
        })
        .collect();

    let mut users: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for module in modules {
        for table in &module.tables {
            users.entry(table.clone()).or_default().push(module.name.clone());
        }
    }
    users.retain(|_, modules| modules.len() > 1);

    TableOwnership {
        by_module,
        shared_tables: users,
        recommendation: "Shared tables require API calls between modules or event-based sync"
            .to_string(),
    }
}

pub fn key_decisions(
    modules: &[ModuleCandidate],
    couplings: &[CouplingEdge],
    critical: &[String],
) -> Vec<KeyDecision> {
    let mut decisions = Vec::new();

    let gateway_count = modules.iter().filter(|m| !m.is_microservice).count();
    if gateway_count < modules.len() {
        decisions.push(KeyDecision {
            decision: "Hybrid Architecture".to_string(),
            rationale: format!(
                "Pre-extracted services become microservices, the remaining {gateway_count} modules live in the gateway"
            ),
            trade_offs: Some(
                "More complex deployment but better isolation for extracted services".to_string(),
            ),
            ..KeyDecision::default()
        });
    } else {
        decisions.push(KeyDecision {
            decision: "Modular Monolith".to_string(),
            rationale: "No pre-extracted services, start with modules in a single gateway app"
                .to_string(),
            trade_offs: Some("Simpler deployment, services can be extracted later".to_string()),
            ..KeyDecision::default()
        });
    }

    let tight: Vec<&CouplingEdge> = couplings.iter().filter(|c| c.is_tight()).collect();
    if !tight.is_empty() {
        let affected: BTreeSet<&String> = tight.iter().take(5).flat_map(|c| c.tables.iter()).collect();
        decisions.push(KeyDecision {
            decision: "Shared Database for Tightly Coupled Tables".to_string(),
            rationale: format!(
                "Found {} tight data couplings; these tables should stay in a shared database",
                tight.len()
            ),
            trade_offs: Some("Simpler data consistency, but shared ownership".to_string()),
            affected_tables: affected.into_iter().cloned().collect(),
            ..KeyDecision::default()
        });
    }

    if !critical.is_empty() {
        decisions.push(KeyDecision {
            decision: "Security-First Migration".to_string(),
            rationale: format!(
                "Found {} critical security hotspots that must be addressed",
                critical.len()
            ),
            affected_files: critical.to_vec(),
            action: Some(
                "Migrate and fix these files first regardless of module priority".to_string(),
            ),
            ..KeyDecision::default()
        });
    }

    if modules.iter().any(|m| m.name == "auth") {
        decisions.push(KeyDecision {
            decision: "Auth Module First".to_string(),
            rationale: "The auth module is the foundation for all protected routes".to_string(),
            implementation: Some(
                "Token-based auth with guards, replacing legacy server-side sessions".to_string(),
            ),
            ..KeyDecision::default()
        });
    }

    decisions
}

/// Assemble the synthesis document from the stage outputs of one run.
pub fn build_report(
    bundle: &FactBundle,
    synthesis: &Synthesis,
    config: &SynthesisConfig,
) -> SynthesisReport {
    let limits = &config.report;
    let modules = &synthesis.modules;
    let critical = critical_files(&synthesis.hotspots, &config.security);

    SynthesisReport {
        meta: ReportMeta {
            description: "Architectural synthesis of the gathered migration analysis".to_string(),
            source_analysis: bundle.root.display().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            cycle_breaker: synthesis.cycle_breaker.to_string(),
            inputs: bundle.statuses,
        },
        summary: summarize(modules, synthesis.correlation.known_tables.len()),
        module_recommendations: modules.clone(),
        migration_order: synthesis.migration_order.clone(),
        workspace_layout: workspace_layout(modules, &bundle.service_hints.transport),
        data_architecture: DataArchitecture {
            table_ownership: table_ownership(modules),
            table_access: synthesis.correlation.table_facts(),
            data_couplings: synthesis
                .couplings
                .iter()
                .take(limits.max_couplings)
                .cloned()
                .collect(),
            coupling_summary: CouplingSummary::of(&synthesis.couplings),
            dependency_cycles: synthesis.dependency_cycles.clone(),
        },
        security_analysis: SecurityAnalysis {
            hotspots: synthesis
                .hotspots
                .iter()
                .take(limits.max_hotspots)
                .cloned()
                .collect(),
            total_hotspots: synthesis.hotspots.len(),
            critical_files: critical.clone(),
            recommendation:
                "Address security hotspots early in the migration to stop vulnerabilities spreading"
                    .to_string(),
        },
        correlations: CorrelationReport {
            stats: synthesis.correlation.stats(),
            sample_correlations: synthesis.correlation.samples(limits.sample_correlations),
            unclustered_files: synthesis.clustering.unclustered.clone(),
        },
        key_decisions: key_decisions(modules, &synthesis.couplings, &critical),
    }
}
