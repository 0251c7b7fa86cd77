use std::collections::{BTreeMap, BTreeSet};

use super::clustering::Clustering;
use super::correlation::Correlation;
use crate::config::{DependencyRule, SynthesisConfig};
use crate::core::{FileMetrics, ModuleCandidate};
use crate::io::loader::ServiceHints;

const SERVICE_SUFFIXES: [&str; 2] = ["-service", "_service"];

/// Module names that have been pre-extracted as services.
pub fn service_module_names(hints: &ServiceHints) -> BTreeSet<String> {
    hints
        .services
        .iter()
        .map(|name| {
            let name = name.trim().to_lowercase();
            SERVICE_SUFFIXES
                .iter()
                .find_map(|suffix| name.strip_suffix(suffix))
                .map(str::to_string)
                .unwrap_or(name)
        })
        .collect()
}

pub fn rationale(routes: usize, tables: &BTreeSet<String>, security_issues: usize) -> String {
    let mut parts = Vec::new();
    if routes > 0 {
        parts.push(format!("Handles {routes} routes"));
    }
    if !tables.is_empty() {
        let named: Vec<&str> = tables.iter().take(3).map(String::as_str).collect();
        let more = if tables.len() > 3 { "..." } else { "" };
        parts.push(format!(
            "Accesses {} tables ({}{})",
            tables.len(),
            named.join(", "),
            more
        ));
    }
    if security_issues > 0 {
        parts.push(format!("{security_issues} security issues to address"));
    }
    if parts.is_empty() {
        "Groups related functionality".to_string()
    } else {
        parts.join(". ")
    }
}

/// Providers `module` depends on, given the tables of every module.
fn dependencies_of(
    module: &str,
    tables: &BTreeSet<String>,
    all_tables: &BTreeMap<String, BTreeSet<String>>,
    rules: &[DependencyRule],
) -> BTreeSet<String> {
    all_tables
        .iter()
        .filter(|(other, _)| other.as_str() != module)
        .filter(|(_, other_tables)| !tables.is_disjoint(other_tables))
        .filter(|(other, _)| rules.iter().any(|rule| rule.applies(module, other)))
        .map(|(other, _)| other.clone())
        .collect()
}

/// Aggregate each cluster into an unranked module candidate, sorted by name.
pub fn profile_modules(
    clustering: &Clustering,
    correlation: &Correlation,
    hints: &ServiceHints,
    config: &SynthesisConfig,
) -> Vec<ModuleCandidate> {
    let services = service_module_names(hints);

    let tables_by_module: BTreeMap<String, BTreeSet<String>> = clustering
        .clusters
        .iter()
        .map(|(name, files)| {
            let tables = files
                .iter()
                .filter_map(|f| correlation.files.get(f))
                .flat_map(|fact| fact.tables.iter().cloned())
                .collect();
            (name.clone(), tables)
        })
        .collect();

    clustering
        .clusters
        .iter()
        .map(|(name, files)| {
            let facts: Vec<_> = files
                .iter()
                .filter_map(|f| correlation.files.get(f))
                .collect();
            let totals: FileMetrics = facts.iter().map(|fact| &fact.metrics).sum();
            let routes: BTreeSet<String> = facts
                .iter()
                .flat_map(|fact| fact.routes.iter().cloned())
                .collect();
            let tables = tables_by_module.get(name).cloned().unwrap_or_default();

            ModuleCandidate {
                name: name.clone(),
                rationale: rationale(routes.len(), &tables, totals.security_issues),
                dependencies: dependencies_of(
                    name,
                    &tables,
                    &tables_by_module,
                    &config.dependency_rules,
                ),
                routes,
                tables,
                files: files.clone(),
                complexity_score: totals.complexity,
                security_issues: totals.security_issues,
                lines_of_code: totals.lines,
                priority: 0,
                is_microservice: services.contains(name),
                migration_risk: config
                    .risk
                    .classify(totals.security_issues, totals.complexity),
                estimated_effort: config.effort.classify(totals.lines),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FileFact, MigrationEffort, MigrationRisk};

    fn fact(name: &str, tables: &[&str], metrics: FileMetrics) -> FileFact {
        let mut fact = FileFact::new(name);
        fact.tables = tables.iter().map(|t| t.to_string()).collect();
        fact.metrics = metrics;
        fact
    }

    fn metrics(lines: usize, complexity: usize, security_issues: usize) -> FileMetrics {
        FileMetrics {
            lines,
            complexity,
            functions: 1,
            security_issues,
        }
    }

    fn setup(facts: Vec<(&str, FileFact)>) -> (Clustering, Correlation) {
        let mut clustering = Clustering::default();
        let mut correlation = Correlation::default();
        for (cluster, fact) in facts {
            clustering
                .clusters
                .entry(cluster.to_string())
                .or_default()
                .insert(fact.name.clone());
            correlation.files.insert(fact.name.clone(), fact);
        }
        (clustering, correlation)
    }

    #[test]
    fn test_aggregates_and_classifies() {
        let (clustering, correlation) = setup(vec![
            ("orders", fact("a.php", &["orders"], metrics(800, 100, 4))),
            ("orders", fact("b.php", &["order_items"], metrics(400, 60, 3))),
            ("users", fact("u.php", &["users"], metrics(50, 5, 0))),
        ]);
        let modules = profile_modules(
            &clustering,
            &correlation,
            &ServiceHints::default(),
            &SynthesisConfig::default(),
        );
        assert_eq!(modules.len(), 2);
        let orders = &modules[0];
        assert_eq!(orders.name, "orders");
        assert_eq!(orders.lines_of_code, 1200);
        assert_eq!(orders.complexity_score, 160);
        assert_eq!(orders.security_issues, 7);
        assert_eq!(orders.migration_risk, MigrationRisk::Medium);
        assert_eq!(orders.estimated_effort, MigrationEffort::Large);
        assert_eq!(orders.tables.len(), 2);
        assert_eq!(
            orders.rationale,
            "Accesses 2 tables (order_items, orders). 7 security issues to address"
        );
        let users = &modules[1];
        assert_eq!(users.migration_risk, MigrationRisk::Low);
        assert_eq!(users.estimated_effort, MigrationEffort::Small);
    }

    #[test]
    fn test_dependencies_need_shared_table_and_rule() {
        let (clustering, correlation) = setup(vec![
            ("orders", fact("o.php", &["orders", "users"], metrics(1, 1, 0))),
            ("users", fact("u.php", &["users"], metrics(1, 1, 0))),
            ("cart", fact("c.php", &["carts"], metrics(1, 1, 0))),
            ("products", fact("p.php", &["carts", "products"], metrics(1, 1, 0))),
        ]);
        let modules = profile_modules(
            &clustering,
            &correlation,
            &ServiceHints::default(),
            &SynthesisConfig::default(),
        );
        let deps: BTreeMap<&str, Vec<&str>> = modules
            .iter()
            .map(|m| {
                (
                    m.name.as_str(),
                    m.dependencies.iter().map(String::as_str).collect(),
                )
            })
            .collect();
        assert_eq!(deps["orders"], vec!["users"]);
        assert_eq!(deps["cart"], vec!["products"]);
        assert!(deps["users"].is_empty());
        assert!(deps["products"].is_empty());
    }

    #[test]
    fn test_service_hints_mark_microservices() {
        let (clustering, correlation) = setup(vec![
            ("payments", fact("pay.php", &["payments"], metrics(1, 1, 0))),
            ("search", fact("s.php", &["idx"], metrics(1, 1, 0))),
        ]);
        let hints = ServiceHints {
            services: ["payments-service", "Search_Service"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            transport: "tcp".into(),
        };
        let modules = profile_modules(&clustering, &correlation, &hints, &SynthesisConfig::default());
        assert!(modules.iter().all(|m| m.is_microservice));
    }

    #[test]
    fn test_rationale_variants() {
        let tables: BTreeSet<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            rationale(2, &tables, 0),
            "Handles 2 routes. Accesses 4 tables (a, b, c...)"
        );
        assert_eq!(rationale(0, &BTreeSet::new(), 0), "Groups related functionality");
    }
}
