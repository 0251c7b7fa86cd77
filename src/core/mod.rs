pub mod types;

pub use types::{
    CouplingEdge, CouplingStrength, FileFact, FileMetrics, MigrationEffort, MigrationRisk,
    MigrationStep, ModuleCandidate, RouteFact, SecurityFinding, SecurityHotspot, Severity,
    TableFact,
};
