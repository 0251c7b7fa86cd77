mod core;
mod loader;
mod thresholds;
mod vocabulary;

pub use self::core::SynthesisConfig;
pub use loader::{config_candidates, load_config, parse_and_validate_config, CONFIG_FILE_NAME};
pub use thresholds::{
    CouplingThresholds, EffortThresholds, ReportLimits, RiskThresholds, SecurityThresholds,
    SeverityWeights,
};
pub use vocabulary::{
    default_dependency_rules, DependencyRule, DomainKeyword, DomainVocabulary,
    MigrationOrderConfig,
};
