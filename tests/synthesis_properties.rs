//! Property-based tests for the synthesis pipeline
//!
//! Invariants checked over generated fact bundles:
//! - Coupling strength follows the ratio thresholds exactly
//! - Clusters partition the referenced files
//! - The migration order is a permutation of the modules
//! - Modules outside every cycle come after all of their dependencies
//! - Module aggregates add back up to the file metrics
//! - Input order does not change the output

use archsynth::config::{CouplingThresholds, DependencyRule, SynthesisConfig};
use archsynth::core::CouplingStrength;
use archsynth::io::loader::{
    FactBundle, FileRecord, InputStatus, InputStatuses, RouteRecord, ServiceHints,
};
use archsynth::synthesis::{run_stages, synthesize, LowestRiskFirst};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::path::PathBuf;

const TABLES: &[&str] = &[
    "users",
    "orders",
    "order_items",
    "products",
    "categories",
    "payments",
    "carts",
    "sessions",
    "audit_log",
];

const SEGMENTS: &[&str] = &["users", "orders", "auth", "reports", "admin", "api"];

#[derive(Debug, Clone)]
struct GeneratedFile {
    tables: Vec<usize>,
    lines: usize,
    complexity: usize,
    issues: usize,
}

fn file_strategy() -> impl Strategy<Value = GeneratedFile> {
    (
        prop::collection::vec(0..TABLES.len(), 0..4),
        0usize..800,
        0usize..60,
        0usize..4,
    )
        .prop_map(|(tables, lines, complexity, issues)| GeneratedFile {
            tables,
            lines,
            complexity,
            issues,
        })
}

/// (file index, segment index, method is POST)
fn route_strategy() -> impl Strategy<Value = (usize, usize, bool)> {
    (0usize..12, 0..SEGMENTS.len(), any::<bool>())
}

fn bundle(files: &[GeneratedFile], routes: &[(usize, usize, bool)]) -> FactBundle {
    let records = files
        .iter()
        .enumerate()
        .map(|(i, f)| FileRecord {
            path: format!("src/f{i}.php"),
            lines: f.lines,
            complexity: f.complexity,
            has_database: !f.tables.is_empty(),
            declared_tables: f.tables.iter().map(|&t| TABLES[t].to_string()).collect(),
            security_issue_count: f.issues,
            ..FileRecord::default()
        })
        .collect();
    let routes = routes
        .iter()
        .filter(|(file, _, _)| *file < files.len())
        .enumerate()
        .map(|(n, &(file, segment, post))| RouteRecord {
            method: if post { "POST" } else { "GET" }.to_string(),
            path: format!("/{}/{n}", SEGMENTS[segment]),
            target: format!("src/f{file}.php"),
            auth: None,
        })
        .collect();

    FactBundle {
        root: PathBuf::from("fixture"),
        files: records,
        findings: Vec::new(),
        routes,
        tables: TABLES.iter().map(|t| t.to_string()).collect(),
        service_hints: ServiceHints::default(),
        statuses: InputStatuses {
            routes: InputStatus::Loaded,
            schema: InputStatus::Loaded,
            service_hints: InputStatus::Missing,
        },
    }
}

fn rules_strategy() -> impl Strategy<Value = Vec<DependencyRule>> {
    let names = prop::sample::select(vec![
        "users", "orders", "products", "categories", "payments", "cart", "auth", "sessions",
    ]);
    prop::collection::vec((names.clone(), names), 0..6).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(dependent, provider)| DependencyRule {
                dependents: vec![dependent.to_string()],
                provider: provider.to_string(),
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_strength_follows_thresholds(ratio in 0.0f64..=1.0) {
        let expected = if ratio >= 0.8 {
            CouplingStrength::Tight
        } else if ratio >= 0.5 {
            CouplingStrength::Moderate
        } else {
            CouplingStrength::Loose
        };
        prop_assert_eq!(CouplingThresholds::default().classify(ratio), expected);
    }

    #[test]
    fn prop_clusters_partition_referenced_files(
        files in prop::collection::vec(file_strategy(), 0..12),
        routes in prop::collection::vec(route_strategy(), 0..10),
    ) {
        let bundle = bundle(&files, &routes);
        let synthesis = run_stages(&bundle, &SynthesisConfig::default(), &LowestRiskFirst);

        let mut seen = BTreeSet::new();
        for members in synthesis.clustering.clusters.values() {
            for file in members {
                prop_assert!(seen.insert(file.clone()), "{} is in two clusters", file);
            }
        }
        let referenced: BTreeSet<String> = synthesis
            .correlation
            .files
            .values()
            .filter(|f| f.is_referenced())
            .map(|f| f.name.clone())
            .collect();
        prop_assert_eq!(seen, referenced);
    }

    #[test]
    fn prop_migration_order_is_a_permutation(
        files in prop::collection::vec(file_strategy(), 0..12),
        routes in prop::collection::vec(route_strategy(), 0..10),
        rules in rules_strategy(),
    ) {
        let config = SynthesisConfig { dependency_rules: rules, ..SynthesisConfig::default() };
        let synthesis = run_stages(&bundle(&files, &routes), &config, &LowestRiskFirst);

        let mut ordered: Vec<&str> = synthesis
            .migration_order
            .iter()
            .map(|s| s.module.as_str())
            .collect();
        let mut modules: Vec<&str> = synthesis.modules.iter().map(|m| m.name.as_str()).collect();
        ordered.sort_unstable();
        modules.sort_unstable();
        prop_assert_eq!(ordered, modules);

        let steps: Vec<usize> = synthesis.migration_order.iter().map(|s| s.step).collect();
        prop_assert_eq!(steps, (1..=synthesis.modules.len()).collect::<Vec<_>>());
    }

    #[test]
    fn prop_acyclic_modules_follow_their_dependencies(
        files in prop::collection::vec(file_strategy(), 0..12),
        routes in prop::collection::vec(route_strategy(), 0..10),
        rules in rules_strategy(),
    ) {
        let config = SynthesisConfig { dependency_rules: rules, ..SynthesisConfig::default() };
        let synthesis = run_stages(&bundle(&files, &routes), &config, &LowestRiskFirst);

        let cyclic: BTreeSet<&str> = synthesis
            .dependency_cycles
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();
        let mut done = BTreeSet::new();
        for step in &synthesis.migration_order {
            let in_cycle = cyclic.contains(step.module.as_str());
            if !in_cycle {
                prop_assert!(!step.forced, "{} forced outside any cycle", step.module);
            }
            if !in_cycle || !step.forced {
                for dep in &step.dependencies {
                    prop_assert!(done.contains(dep), "{} ran before {}", step.module, dep);
                }
            }
            done.insert(step.module.clone());
        }
        if synthesis.dependency_cycles.is_empty() {
            prop_assert!(synthesis.migration_order.iter().all(|s| !s.forced));
        }
    }

    #[test]
    fn prop_module_totals_match_file_metrics(
        files in prop::collection::vec(file_strategy(), 0..12),
        routes in prop::collection::vec(route_strategy(), 0..10),
    ) {
        let synthesis = run_stages(&bundle(&files, &routes), &SynthesisConfig::default(), &LowestRiskFirst);

        let referenced = synthesis.correlation.files.values().filter(|f| f.is_referenced());
        let (lines, complexity, issues) = referenced.fold((0, 0, 0), |(l, c, s), f| {
            (l + f.metrics.lines, c + f.metrics.complexity, s + f.metrics.security_issues)
        });
        let modules = &synthesis.modules;
        prop_assert_eq!(modules.iter().map(|m| m.lines_of_code).sum::<usize>(), lines);
        prop_assert_eq!(modules.iter().map(|m| m.complexity_score).sum::<usize>(), complexity);
        prop_assert_eq!(modules.iter().map(|m| m.security_issues).sum::<usize>(), issues);
    }

    #[test]
    fn prop_file_order_does_not_change_output(
        files in prop::collection::vec(file_strategy(), 1..10),
        routes in prop::collection::vec(route_strategy(), 0..8),
    ) {
        let forward = bundle(&files, &routes);
        let mut reversed = forward.clone();
        reversed.files.reverse();

        let config = SynthesisConfig::default();
        let a = serde_json::to_string(&synthesize(&forward, &config)).unwrap();
        let b = serde_json::to_string(&synthesize(&reversed, &config)).unwrap();
        prop_assert_eq!(a, b);
    }
}
