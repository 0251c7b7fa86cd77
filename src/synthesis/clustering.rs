//! Boundary clusterer: groups referenced files into named module candidates.
//!
//! Four passes, each only touching files the previous ones left unassigned:
//!
//! 1. tight coupling edges, in their sorted order, seed and grow clusters
//! 2. files with tables join the cluster of their smallest table name
//! 3. route-only files join the cluster of their first route's first path segment
//! 4. names go through the domain vocabulary and equal names merge
//!
//! The result partitions every file that touches a table or serves a route.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::correlation::Correlation;
use crate::config::DomainVocabulary;
use crate::core::{CouplingEdge, FileFact};

const FALLBACK_CLUSTER: &str = "misc";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clustering {
    /// Normalized module name -> member files.
    pub clusters: BTreeMap<String, BTreeSet<String>>,
    /// Files with neither tables nor routes.
    pub unclustered: Vec<String>,
}

impl Clustering {
    pub fn cluster_of(&self, file: &str) -> Option<&str> {
        self.clusters
            .iter()
            .find(|(_, files)| files.contains(file))
            .map(|(name, _)| name.as_str())
    }
}

/// Raw clusters under construction, kept disjoint.
#[derive(Debug, Default)]
struct ClusterSet {
    clusters: BTreeMap<String, BTreeSet<String>>,
    assignment: BTreeMap<String, String>,
}

impl ClusterSet {
    fn is_assigned(&self, file: &str) -> bool {
        self.assignment.contains_key(file)
    }

    /// Put `file` in `cluster`, taking it out of any cluster it was in.
    fn assign(&mut self, file: &str, cluster: &str) {
        if let Some(previous) = self.assignment.insert(file.to_string(), cluster.to_string()) {
            if previous != cluster {
                if let Some(members) = self.clusters.get_mut(&previous) {
                    members.remove(file);
                }
            }
        }
        self.clusters
            .entry(cluster.to_string())
            .or_default()
            .insert(file.to_string());
    }

    fn absorb_tight_edge(&mut self, edge: &CouplingEdge) {
        if edge.files.is_empty() {
            return;
        }
        let existing = edge
            .files
            .iter()
            .find_map(|f| self.assignment.get(f.as_str()))
            .cloned();
        let target = existing.unwrap_or_else(|| format!("{}_{}", edge.tables[0], edge.tables[1]));
        for file in &edge.files {
            self.assign(file, &target);
        }
    }

    fn into_clusters(self) -> BTreeMap<String, BTreeSet<String>> {
        self.clusters
            .into_iter()
            .filter(|(_, files)| !files.is_empty())
            .collect()
    }
}

/// First non-empty path segment of a route key such as `GET /users/:id`.
pub fn route_domain(route_key: &str) -> &str {
    let path = route_key
        .split_once(' ')
        .map(|(_, path)| path)
        .unwrap_or(route_key);
    path.split('/')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .unwrap_or(FALLBACK_CLUSTER)
}

fn dominant_table(fact: &FileFact) -> Option<&str> {
    fact.tables.iter().next().map(String::as_str)
}

/// Partition the referenced files of `correlation` into named clusters.
///
/// `edges` must be in the order produced by [`super::coupling::analyze_coupling`].
pub fn cluster_files(
    correlation: &Correlation,
    edges: &[CouplingEdge],
    vocabulary: &DomainVocabulary,
) -> Clustering {
    let mut set = ClusterSet::default();

    for edge in edges.iter().filter(|e| e.is_tight()) {
        set.absorb_tight_edge(edge);
    }
    debug!("Tight couplings seeded {} clusters", set.clusters.len());

    for fact in correlation.files.values() {
        if set.is_assigned(&fact.name) {
            continue;
        }
        if let Some(table) = dominant_table(fact) {
            set.assign(&fact.name, table);
        }
    }

    for fact in correlation.files.values() {
        if set.is_assigned(&fact.name) {
            continue;
        }
        if let Some(first_route) = fact.routes.first() {
            set.assign(&fact.name, route_domain(first_route));
        }
    }

    let mut clusters: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (raw, files) in set.into_clusters() {
        let mut name = vocabulary.normalize(&raw);
        if name.is_empty() {
            name = FALLBACK_CLUSTER.to_string();
        }
        if name != raw {
            debug!("Cluster {} normalized to {}", raw, name);
        }
        clusters.entry(name).or_default().extend(files);
    }

    Clustering {
        clusters,
        unclustered: correlation.unreferenced_files(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CouplingThresholds;
    use crate::synthesis::coupling::analyze_coupling;

    fn fact(name: &str, tables: &[&str], routes: &[&str]) -> FileFact {
        let mut fact = FileFact::new(name);
        fact.tables = tables.iter().map(|t| t.to_string()).collect();
        fact.routes = routes.iter().map(|r| r.to_string()).collect();
        fact
    }

    fn correlation(facts: Vec<FileFact>) -> Correlation {
        let mut c = Correlation::default();
        for fact in facts {
            for table in &fact.tables {
                c.table_to_files
                    .entry(table.clone())
                    .or_default()
                    .insert(fact.name.clone());
            }
            c.files.insert(fact.name.clone(), fact);
        }
        c
    }

    fn run(c: &Correlation) -> Clustering {
        let edges = analyze_coupling(c, &CouplingThresholds::default());
        cluster_files(c, &edges, &DomainVocabulary::default())
    }

    #[test]
    fn test_tight_tables_form_one_cluster() {
        let c = correlation(vec![
            fact("a.php", &["orders", "order_items"], &[]),
            fact("b.php", &["orders", "order_items"], &[]),
            fact("c.php", &["orders"], &[]),
        ]);
        let clustering = run(&c);
        assert_eq!(clustering.clusters.len(), 1);
        let files = &clustering.clusters["orders"];
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_dominant_table_and_route_domain() {
        let c = correlation(vec![
            fact("list.php", &["products", "categories"], &[]),
            fact("health.php", &[], &["GET /health/check"]),
            fact("root.php", &[], &["GET /"]),
            fact("readme.php", &[], &[]),
        ]);
        let clustering = run(&c);
        // "categories" is the smallest table name
        assert_eq!(clustering.cluster_of("list.php"), Some("categories"));
        assert_eq!(clustering.cluster_of("health.php"), Some("health"));
        assert_eq!(clustering.cluster_of("root.php"), Some("misc"));
        assert_eq!(clustering.cluster_of("readme.php"), None);
        assert_eq!(clustering.unclustered, vec!["readme.php"]);
    }

    #[test]
    fn test_vocabulary_merges_clusters() {
        let c = correlation(vec![
            fact("login.php", &[], &["POST /login"]),
            fact("sessions.php", &["sessions"], &[]),
            fact("profile.php", &["user_profiles"], &[]),
            fact("account.php", &[], &["GET /users/me"]),
        ]);
        let clustering = run(&c);
        assert_eq!(
            clustering.clusters.keys().collect::<Vec<_>>(),
            vec!["auth", "users"]
        );
        assert_eq!(clustering.clusters["auth"].len(), 2);
        assert_eq!(clustering.clusters["users"].len(), 2);
    }

    #[test]
    fn test_overlapping_tight_edges_keep_clusters_disjoint() {
        // p+q evidenced by {a,b}; r+s by {b,c}; both tight
        let c = correlation(vec![
            fact("a", &["p", "q"], &[]),
            fact("b", &["p", "q", "r", "s"], &[]),
            fact("c", &["r", "s"], &[]),
            fact("d", &["p", "q"], &[]),
            fact("e", &["r", "s"], &[]),
        ]);
        let clustering = run(&c);
        let mut seen = BTreeSet::new();
        for files in clustering.clusters.values() {
            for file in files {
                assert!(seen.insert(file.clone()), "{file} appears twice");
            }
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_route_domain() {
        assert_eq!(route_domain("GET /users/:id"), "users");
        assert_eq!(route_domain("POST //cart"), "cart");
        assert_eq!(route_domain("GET /"), "misc");
        assert_eq!(route_domain("search"), "search");
    }
}
