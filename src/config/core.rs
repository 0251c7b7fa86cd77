use serde::{Deserialize, Serialize};

use super::thresholds::{
    CouplingThresholds, EffortThresholds, ReportLimits, RiskThresholds, SecurityThresholds,
};
use super::vocabulary::{
    default_dependency_rules, DependencyRule, DomainVocabulary, MigrationOrderConfig,
};

/// Root of `.archsynth.toml`. Every section falls back to its defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default)]
    pub coupling: CouplingThresholds,

    #[serde(default)]
    pub security: SecurityThresholds,

    #[serde(default)]
    pub risk: RiskThresholds,

    #[serde(default)]
    pub effort: EffortThresholds,

    #[serde(default)]
    pub migration: MigrationOrderConfig,

    #[serde(default)]
    pub report: ReportLimits,

    #[serde(default)]
    pub vocabulary: DomainVocabulary,

    #[serde(default = "default_dependency_rules")]
    pub dependency_rules: Vec<DependencyRule>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            coupling: CouplingThresholds::default(),
            security: SecurityThresholds::default(),
            risk: RiskThresholds::default(),
            effort: EffortThresholds::default(),
            migration: MigrationOrderConfig::default(),
            report: ReportLimits::default(),
            vocabulary: DomainVocabulary::default(),
            dependency_rules: default_dependency_rules(),
        }
    }
}

impl SynthesisConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.coupling.validate()?;
        if let Some(rule) = self.dependency_rules.iter().find(|r| r.provider.is_empty()) {
            return Err(format!(
                "dependency rule for {:?} has an empty provider",
                rule.dependents
            ));
        }
        Ok(())
    }
}
