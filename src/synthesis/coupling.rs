use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::correlation::Correlation;
use crate::config::CouplingThresholds;
use crate::core::{CouplingEdge, CouplingStrength};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CouplingSummary {
    pub tight: usize,
    pub moderate: usize,
    pub loose: usize,
}

impl CouplingSummary {
    pub fn of(edges: &[CouplingEdge]) -> Self {
        edges.iter().fold(Self::default(), |mut acc, edge| {
            match edge.strength {
                CouplingStrength::Tight => acc.tight += 1,
                CouplingStrength::Moderate => acc.moderate += 1,
                CouplingStrength::Loose => acc.loose += 1,
            }
            acc
        })
    }
}

pub fn recommendation(strength: CouplingStrength, t1: &str, t2: &str) -> String {
    match strength {
        CouplingStrength::Tight => {
            format!("Tables {t1} and {t2} should be kept in the same module")
        }
        CouplingStrength::Moderate => {
            format!("Consider keeping {t1} and {t2} together, or sync them via events")
        }
        CouplingStrength::Loose => {
            format!("Tables {t1} and {t2} may live in different modules with API calls")
        }
    }
}

/// |files(t1) ∩ files(t2)| / min(|files(t1)|, |files(t2)|)
pub fn coupling_ratio(shared: usize, t1_files: usize, t2_files: usize) -> f64 {
    match t1_files.min(t2_files) {
        0 => 0.0,
        smaller => shared as f64 / smaller as f64,
    }
}

/// Pairwise table co-occurrence across files.
///
/// Only pairs seen together in at least `min_co_occurrence` files become
/// edges. The result is sorted by descending count and then by table pair;
/// clustering depends on that order.
pub fn analyze_coupling(
    correlation: &Correlation,
    thresholds: &CouplingThresholds,
) -> Vec<CouplingEdge> {
    let mut co_occurrence: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for fact in correlation.files.values() {
        let tables: Vec<&str> = fact.tables.iter().map(String::as_str).collect();
        for (i, t1) in tables.iter().enumerate() {
            for t2 in &tables[i + 1..] {
                *co_occurrence.entry((*t1, *t2)).or_default() += 1;
            }
        }
    }

    let empty = BTreeSet::new();
    let mut edges: Vec<CouplingEdge> = co_occurrence
        .into_iter()
        .filter(|(_, count)| *count >= thresholds.min_co_occurrence)
        .map(|((t1, t2), count)| {
            let t1_files = correlation.files_for(t1).unwrap_or(&empty);
            let t2_files = correlation.files_for(t2).unwrap_or(&empty);
            let shared: BTreeSet<String> = t1_files.intersection(t2_files).cloned().collect();
            let ratio = coupling_ratio(shared.len(), t1_files.len(), t2_files.len());
            let strength = thresholds.classify(ratio);
            CouplingEdge {
                tables: [t1.to_string(), t2.to_string()],
                co_occurrence: count,
                ratio,
                strength,
                files: shared,
                recommendation: recommendation(strength, t1, t2),
            }
        })
        .collect();

    edges.sort_by(|a, b| {
        b.co_occurrence
            .cmp(&a.co_occurrence)
            .then_with(|| a.tables.cmp(&b.tables))
    });
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FileFact;

    fn correlation(files: &[(&str, &[&str])]) -> Correlation {
        let mut c = Correlation::default();
        for (name, tables) in files {
            let mut fact = FileFact::new(*name);
            fact.tables = tables.iter().map(|t| t.to_string()).collect();
            for table in *tables {
                c.table_to_files
                    .entry(table.to_string())
                    .or_default()
                    .insert(name.to_string());
            }
            c.files.insert(name.to_string(), fact);
        }
        c
    }

    #[test]
    fn test_tight_pair_from_shared_files() {
        // orders in {a,b,c}, order_items in {a,b}
        let c = correlation(&[
            ("a", &["orders", "order_items"]),
            ("b", &["orders", "order_items"]),
            ("c", &["orders"]),
        ]);
        let edges = analyze_coupling(&c, &CouplingThresholds::default());
        assert_eq!(edges.len(), 1);
        let edge = &edges[0];
        assert_eq!(edge.tables, ["order_items".to_string(), "orders".to_string()]);
        assert_eq!(edge.co_occurrence, 2);
        assert_eq!(edge.ratio, 1.0);
        assert!(edge.is_tight());
        assert_eq!(edge.files.len(), 2);
    }

    #[test]
    fn test_single_co_occurrence_is_dropped() {
        let c = correlation(&[("a", &["users", "sessions"]), ("b", &["users"])]);
        assert!(analyze_coupling(&c, &CouplingThresholds::default()).is_empty());
    }

    #[test]
    fn test_moderate_and_loose_ratios() {
        let c = correlation(&[
            ("f1", &["x", "y", "z"]),
            ("f2", &["x", "y", "z"]),
            ("f3", &["y", "z"]),
            ("f4", &["z"]),
            ("f5", &["x"]),
            ("f6", &["x"]),
            ("f7", &["z"]),
            ("f8", &["y"]),
        ]);
        let edges = analyze_coupling(&c, &CouplingThresholds::default());
        let find = |a: &str, b: &str| {
            edges
                .iter()
                .find(|e| e.tables == [a.to_string(), b.to_string()])
                .cloned()
        };
        // x: f1,f2,f5,f6  y: f1,f2,f3,f8  z: f1,f2,f3,f4,f7
        let xy = find("x", "y").unwrap();
        assert_eq!(xy.ratio, 0.5);
        assert_eq!(xy.strength, CouplingStrength::Moderate);
        let yz = find("y", "z").unwrap();
        assert_eq!(yz.ratio, 0.75);
        assert_eq!(yz.strength, CouplingStrength::Moderate);
        let xz = find("x", "z").unwrap();
        assert_eq!(xz.strength, CouplingStrength::Moderate);

        let strict = CouplingThresholds {
            moderate_ratio: 0.6,
            ..CouplingThresholds::default()
        };
        let edges = analyze_coupling(&c, &strict);
        assert_eq!(edges.iter().filter(|e| e.strength == CouplingStrength::Loose).count(), 2);
    }

    #[test]
    fn test_edges_sorted_by_count_then_pair() {
        let c = correlation(&[
            ("a", &["p", "q", "r"]),
            ("b", &["p", "q", "r"]),
            ("c", &["q", "r"]),
        ]);
        let edges = analyze_coupling(&c, &CouplingThresholds::default());
        let pairs: Vec<(String, usize)> = edges
            .iter()
            .map(|e| (e.tables.join("+"), e.co_occurrence))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("q+r".to_string(), 3),
                ("p+q".to_string(), 2),
                ("p+r".to_string(), 2)
            ]
        );
        let summary = CouplingSummary::of(&edges);
        assert_eq!(summary.tight, 3);
    }

    #[test]
    fn test_ratio_guards_empty_sets() {
        assert_eq!(coupling_ratio(0, 0, 3), 0.0);
        assert_eq!(coupling_ratio(2, 4, 2), 1.0);
    }
}
