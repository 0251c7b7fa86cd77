//! Dependency & order resolver.
//!
//! Ranks module candidates by the configured canonical sequence, then emits a
//! migration order in which every module follows its dependencies whenever
//! the dependency graph allows it. When no module is ready, a dependency
//! cycle exists and a [`CycleBreaker`] forces one of its members out.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::config::MigrationOrderConfig;
use crate::core::{MigrationStep, ModuleCandidate};

/// Chooses the module to force out when every remaining module waits on
/// another remaining module.
pub trait CycleBreaker {
    fn name(&self) -> &'static str;

    /// `candidates` are the members of the blocking cycles, in rank order.
    /// Never empty.
    fn pick<'a>(&self, candidates: &[&'a ModuleCandidate]) -> Option<&'a ModuleCandidate>;
}

/// Lowest risk first, then lowest complexity, then best rank.
///
/// An ad hoc rule: it does not try to minimize the number of broken edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestRiskFirst;

impl CycleBreaker for LowestRiskFirst {
    fn name(&self) -> &'static str {
        "lowest-risk-first"
    }

    fn pick<'a>(&self, candidates: &[&'a ModuleCandidate]) -> Option<&'a ModuleCandidate> {
        candidates
            .iter()
            .min_by_key(|m| (m.migration_risk, m.complexity_score, m.priority))
            .copied()
    }
}

/// Sort modules into rank order and store each 1-based rank in `priority`.
///
/// Rank order is (canonical priority, larger modules first, name).
pub fn rank_modules(
    mut modules: Vec<ModuleCandidate>,
    config: &MigrationOrderConfig,
) -> Vec<ModuleCandidate> {
    modules.sort_by_cached_key(|m| {
        (
            config.priority_of(&m.name, m.complexity_score),
            Reverse(m.files.len()),
            m.name.clone(),
        )
    });
    for (i, module) in modules.iter_mut().enumerate() {
        module.priority = i + 1;
    }
    modules
}

fn step_for(
    index: usize,
    module: &ModuleCandidate,
    migrated: &BTreeSet<&str>,
    forced: bool,
) -> MigrationStep {
    let unmet_dependencies = if forced {
        module
            .dependencies
            .iter()
            .filter(|d| !migrated.contains(d.as_str()))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };
    MigrationStep {
        step: index + 1,
        module: module.name.clone(),
        is_microservice: module.is_microservice,
        risk: module.migration_risk,
        effort: module.estimated_effort,
        dependencies: module.dependencies.iter().cloned().collect(),
        routes_count: module.routes.len(),
        tables_count: module.tables.len(),
        security_issues: module.security_issues,
        rationale: module.rationale.clone(),
        forced,
        unmet_dependencies,
    }
}

/// Compute the migration order over ranked modules.
///
/// Always terminates with a duplicate-free permutation of `modules`.
pub fn resolve_migration_order(
    modules: &[ModuleCandidate],
    breaker: &dyn CycleBreaker,
) -> Vec<MigrationStep> {
    let mut remaining: Vec<&ModuleCandidate> = modules.iter().collect();
    remaining.sort_by(|a, b| (a.priority, &a.name).cmp(&(b.priority, &b.name)));
    let mut migrated: BTreeSet<&str> = BTreeSet::new();
    let mut steps = Vec::with_capacity(modules.len());

    while !remaining.is_empty() {
        // `remaining` is in rank order, so the first ready module has the best rank.
        let ready = remaining
            .iter()
            .position(|m| m.dependencies.iter().all(|d| migrated.contains(d.as_str())));

        let (position, forced) = match ready {
            Some(position) => (position, false),
            None => {
                let candidates = blocking_cycle_members(&remaining);
                let picked = breaker
                    .pick(&candidates)
                    .and_then(|p| remaining.iter().position(|m| std::ptr::eq(*m, p)))
                    .unwrap_or(0);
                warn!(
                    "Dependency cycle among {} modules; {} forces {} out first",
                    candidates.len(),
                    breaker.name(),
                    remaining[picked].name
                );
                (picked, true)
            }
        };

        let module = remaining.remove(position);
        steps.push(step_for(steps.len(), module, &migrated, forced));
        migrated.insert(module.name.as_str());
    }

    debug!("Resolved migration order of {} steps", steps.len());
    steps
}

/// Members of the cycles that nothing outside themselves is waiting on.
///
/// Only called when no remaining module is ready. Never returns a module
/// outside every cycle unless no such cycle exists, in which case all of
/// `remaining` is returned. Keeps rank order.
fn blocking_cycle_members<'a>(remaining: &[&'a ModuleCandidate]) -> Vec<&'a ModuleCandidate> {
    let graph = &build_dependency_graph(remaining);
    let blocking: BTreeSet<&str> = tarjan_scc(graph)
        .into_iter()
        .filter(|component| is_cyclic(graph, component))
        .filter(|component| {
            component.iter().all(|&node| {
                graph
                    .neighbors(node)
                    .all(|dependency| component.contains(&dependency))
            })
        })
        .flat_map(|component| component.into_iter().map(move |node| graph[node]))
        .collect();

    let members: Vec<&ModuleCandidate> = remaining
        .iter()
        .filter(|m| blocking.contains(m.name.as_str()))
        .copied()
        .collect();
    if members.is_empty() {
        remaining.to_vec()
    } else {
        members
    }
}

fn is_cyclic(graph: &DiGraph<&str, ()>, component: &[NodeIndex]) -> bool {
    component.len() > 1 || graph.contains_edge(component[0], component[0])
}

/// Build a petgraph DiGraph of module -> dependency edges.
fn build_dependency_graph<'a>(modules: &[&'a ModuleCandidate]) -> DiGraph<&'a str, ()> {
    let mut graph = DiGraph::new();
    let mut node_map = BTreeMap::new();

    for module in modules {
        let node = graph.add_node(module.name.as_str());
        node_map.insert(module.name.as_str(), node);
    }

    for module in modules {
        let from = node_map[module.name.as_str()];
        for dependency in &module.dependencies {
            if let Some(&to) = node_map.get(dependency.as_str()) {
                graph.add_edge(from, to, ());
            }
        }
    }

    graph
}

/// Groups of modules that depend on each other, each sorted by name.
pub fn dependency_cycles(modules: &[ModuleCandidate]) -> Vec<Vec<String>> {
    let modules: Vec<&ModuleCandidate> = modules.iter().collect();
    let graph = build_dependency_graph(&modules);
    let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| is_cyclic(&graph, component))
        .map(|component| {
            let mut names: Vec<String> = component.iter().map(|&n| graph[n].to_string()).collect();
            names.sort();
            names
        })
        .collect();
    cycles.sort();
    cycles
}
