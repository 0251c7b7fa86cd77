//! Canonical fact and result records shared by every synthesis stage.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::iter::Sum;
use std::ops::AddAssign;

/// Per-file metric snapshot taken by the correlator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetrics {
    pub lines: usize,
    pub complexity: usize,
    pub functions: usize,
    pub security_issues: usize,
}

impl AddAssign for FileMetrics {
    fn add_assign(&mut self, other: Self) {
        self.lines += other.lines;
        self.complexity += other.complexity;
        self.functions += other.functions;
        self.security_issues += other.security_issues;
    }
}

impl<'a> Sum<&'a FileMetrics> for FileMetrics {
    fn sum<I: Iterator<Item = &'a FileMetrics>>(iter: I) -> Self {
        iter.fold(FileMetrics::default(), |mut acc, m| {
            acc += *m;
            acc
        })
    }
}

/// Everything known about one source file, keyed by its basename.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileFact {
    pub name: String,
    pub metrics: FileMetrics,
    pub has_database: bool,
    pub tables: BTreeSet<String>,
    /// Route keys in the order the route document lists them.
    pub routes: Vec<String>,
}

impl FileFact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A file takes part in clustering only when it touches a table or serves a route.
    pub fn is_referenced(&self) -> bool {
        !self.tables.is_empty() || !self.routes.is_empty()
    }
}

/// A schema table together with the files that access it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableFact {
    pub name: String,
    pub files: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteFact {
    pub method: String,
    pub path: String,
    pub target_file: String,
    pub auth: Option<bool>,
}

impl RouteFact {
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Severity of a single security finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Other,
}

impl Severity {
    /// Missing severities count as medium, unrecognised ones as `Other`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("medium") => Self::Medium,
            Some("critical") => Self::Critical,
            Some("high") => Self::High,
            Some("low") => Self::Low,
            Some(_) => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityFinding {
    pub file: String,
    pub kind: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouplingStrength {
    Tight,
    Moderate,
    Loose,
}

impl fmt::Display for CouplingStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tight => write!(f, "tight"),
            Self::Moderate => write!(f, "moderate"),
            Self::Loose => write!(f, "loose"),
        }
    }
}

/// Co-occurrence of two tables across source files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouplingEdge {
    /// Always stored in lexicographic order.
    pub tables: [String; 2],
    pub co_occurrence: usize,
    pub ratio: f64,
    #[serde(rename = "coupling_strength")]
    pub strength: CouplingStrength,
    #[serde(rename = "accessed_by_files")]
    pub files: BTreeSet<String>,
    pub recommendation: String,
}

impl CouplingEdge {
    pub fn is_tight(&self) -> bool {
        self.strength == CouplingStrength::Tight
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityHotspot {
    pub file: String,
    /// Finding type -> count.
    pub issues: BTreeMap<String, usize>,
    pub total_issues: usize,
    pub severity_score: usize,
    pub recommendation: String,
}

/// Migration risk, ordered from least to most risky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationRisk {
    Low,
    Medium,
    High,
}

impl fmt::Display for MigrationRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationEffort {
    Small,
    Medium,
    Large,
}

impl fmt::Display for MigrationEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
        }
    }
}

/// A proposed deployable unit built from one cluster of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleCandidate {
    pub name: String,
    pub rationale: String,
    pub routes: BTreeSet<String>,
    pub tables: BTreeSet<String>,
    #[serde(rename = "source_files")]
    pub files: BTreeSet<String>,
    pub complexity_score: usize,
    pub security_issues: usize,
    pub lines_of_code: usize,
    /// 1-based rank assigned by the order resolver; 0 until ranked.
    pub priority: usize,
    pub dependencies: BTreeSet<String>,
    pub is_microservice: bool,
    pub migration_risk: MigrationRisk,
    pub estimated_effort: MigrationEffort,
}

/// One entry of the migration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStep {
    pub step: usize,
    pub module: String,
    pub is_microservice: bool,
    pub risk: MigrationRisk,
    pub effort: MigrationEffort,
    pub dependencies: Vec<String>,
    pub routes_count: usize,
    pub tables_count: usize,
    pub security_issues: usize,
    pub rationale: String,
    /// Set when a dependency cycle forced this module out ahead of its dependencies.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub forced: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmet_dependencies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse_defaults_to_medium() {
        assert_eq!(Severity::parse(None), Severity::Medium);
        assert_eq!(Severity::parse(Some("")), Severity::Medium);
        assert_eq!(Severity::parse(Some("CRITICAL")), Severity::Critical);
        assert_eq!(Severity::parse(Some(" high ")), Severity::High);
        assert_eq!(Severity::parse(Some("info")), Severity::Other);
    }

    #[test]
    fn test_metrics_sum() {
        let metrics = [
            FileMetrics {
                lines: 10,
                complexity: 3,
                functions: 1,
                security_issues: 2,
            },
            FileMetrics {
                lines: 5,
                complexity: 4,
                functions: 2,
                security_issues: 0,
            },
        ];
        let total: FileMetrics = metrics.iter().sum();
        assert_eq!(total.lines, 15);
        assert_eq!(total.complexity, 7);
        assert_eq!(total.functions, 3);
        assert_eq!(total.security_issues, 2);
    }

    #[test]
    fn test_risk_ordering() {
        assert!(MigrationRisk::Low < MigrationRisk::Medium);
        assert!(MigrationRisk::Medium < MigrationRisk::High);
    }

    #[test]
    fn test_route_key() {
        let route = RouteFact {
            method: "POST".into(),
            path: "/orders".into(),
            target_file: "orders.php".into(),
            auth: Some(true),
        };
        assert_eq!(route.key(), "POST /orders");
    }
}
