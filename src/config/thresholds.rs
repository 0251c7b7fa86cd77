use serde::{Deserialize, Serialize};

use crate::core::{CouplingStrength, MigrationEffort, MigrationRisk, Severity};

/// Table coupling classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingThresholds {
    /// Minimum number of files two tables must share to form an edge
    #[serde(default = "default_min_co_occurrence")]
    pub min_co_occurrence: usize,

    #[serde(default = "default_tight_ratio")]
    pub tight_ratio: f64,

    #[serde(default = "default_moderate_ratio")]
    pub moderate_ratio: f64,
}

impl Default for CouplingThresholds {
    fn default() -> Self {
        Self {
            min_co_occurrence: default_min_co_occurrence(),
            tight_ratio: default_tight_ratio(),
            moderate_ratio: default_moderate_ratio(),
        }
    }
}

impl CouplingThresholds {
    /// Both bounds are inclusive.
    pub fn classify(&self, ratio: f64) -> CouplingStrength {
        if ratio >= self.tight_ratio {
            CouplingStrength::Tight
        } else if ratio >= self.moderate_ratio {
            CouplingStrength::Moderate
        } else {
            CouplingStrength::Loose
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("tight_ratio", self.tight_ratio),
            ("moderate_ratio", self.moderate_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("coupling.{name} must be within [0, 1], got {value}"));
            }
        }
        if self.tight_ratio < self.moderate_ratio {
            return Err(format!(
                "coupling.tight_ratio ({}) must not be below coupling.moderate_ratio ({})",
                self.tight_ratio, self.moderate_ratio
            ));
        }
        Ok(())
    }
}

fn default_min_co_occurrence() -> usize {
    2
}
fn default_tight_ratio() -> f64 {
    0.8
}
fn default_moderate_ratio() -> f64 {
    0.5
}

/// Severity weights used for hotspot scoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityWeights {
    #[serde(default = "default_critical_weight")]
    pub critical: usize,
    #[serde(default = "default_high_weight")]
    pub high: usize,
    #[serde(default = "default_medium_weight")]
    pub medium: usize,
    #[serde(default = "default_low_weight")]
    pub low: usize,
    #[serde(default = "default_other_weight")]
    pub other: usize,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            critical: default_critical_weight(),
            high: default_high_weight(),
            medium: default_medium_weight(),
            low: default_low_weight(),
            other: default_other_weight(),
        }
    }
}

impl SeverityWeights {
    pub fn weight(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Other => self.other,
        }
    }
}

fn default_critical_weight() -> usize {
    10
}
fn default_high_weight() -> usize {
    5
}
fn default_medium_weight() -> usize {
    2
}
fn default_low_weight() -> usize {
    1
}
fn default_other_weight() -> usize {
    1
}

/// Security hotspot thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityThresholds {
    #[serde(default = "default_min_findings")]
    pub min_findings: usize,

    #[serde(default = "default_min_severity_score")]
    pub min_severity_score: usize,

    /// Hotspots at or above this score are listed as critical files
    #[serde(default = "default_critical_score")]
    pub critical_score: usize,

    #[serde(default)]
    pub weights: SeverityWeights,
}

impl Default for SecurityThresholds {
    fn default() -> Self {
        Self {
            min_findings: default_min_findings(),
            min_severity_score: default_min_severity_score(),
            critical_score: default_critical_score(),
            weights: SeverityWeights::default(),
        }
    }
}

impl SecurityThresholds {
    pub fn is_hotspot(&self, total_findings: usize, severity_score: usize) -> bool {
        total_findings >= self.min_findings || severity_score >= self.min_severity_score
    }
}

fn default_min_findings() -> usize {
    3
}
fn default_min_severity_score() -> usize {
    10
}
fn default_critical_score() -> usize {
    20
}

/// Module migration risk thresholds (strictly greater-than comparisons)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    #[serde(default = "default_high_security")]
    pub high_security: usize,
    #[serde(default = "default_high_complexity")]
    pub high_complexity: usize,
    #[serde(default = "default_medium_security")]
    pub medium_security: usize,
    #[serde(default = "default_medium_complexity")]
    pub medium_complexity: usize,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high_security: default_high_security(),
            high_complexity: default_high_complexity(),
            medium_security: default_medium_security(),
            medium_complexity: default_medium_complexity(),
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, security_issues: usize, complexity: usize) -> MigrationRisk {
        if security_issues > self.high_security || complexity > self.high_complexity {
            MigrationRisk::High
        } else if security_issues > self.medium_security || complexity > self.medium_complexity {
            MigrationRisk::Medium
        } else {
            MigrationRisk::Low
        }
    }
}

fn default_high_security() -> usize {
    10
}
fn default_high_complexity() -> usize {
    300
}
fn default_medium_security() -> usize {
    5
}
fn default_medium_complexity() -> usize {
    150
}

/// Module effort thresholds in lines of code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffortThresholds {
    #[serde(default = "default_large_lines")]
    pub large_lines: usize,
    #[serde(default = "default_medium_lines")]
    pub medium_lines: usize,
}

impl Default for EffortThresholds {
    fn default() -> Self {
        Self {
            large_lines: default_large_lines(),
            medium_lines: default_medium_lines(),
        }
    }
}

impl EffortThresholds {
    pub fn classify(&self, lines: usize) -> MigrationEffort {
        if lines > self.large_lines {
            MigrationEffort::Large
        } else if lines > self.medium_lines {
            MigrationEffort::Medium
        } else {
            MigrationEffort::Small
        }
    }
}

fn default_large_lines() -> usize {
    1000
}
fn default_medium_lines() -> usize {
    300
}

/// Caps on list lengths in the emitted report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLimits {
    #[serde(default = "default_max_couplings")]
    pub max_couplings: usize,
    #[serde(default = "default_max_hotspots")]
    pub max_hotspots: usize,
    #[serde(default = "default_sample_correlations")]
    pub sample_correlations: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            max_couplings: default_max_couplings(),
            max_hotspots: default_max_hotspots(),
            sample_correlations: default_sample_correlations(),
        }
    }
}

fn default_max_couplings() -> usize {
    20
}
fn default_max_hotspots() -> usize {
    10
}
fn default_sample_correlations() -> usize {
    5
}
