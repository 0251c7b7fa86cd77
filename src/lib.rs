//! Architectural synthesis for legacy code base migrations.
//!
//! Reads the fact documents produced by earlier analysis passes (per-file
//! metrics, routes, schema, pre-extracted service hints) and derives module
//! recommendations, a migration order, data couplings and security hotspots.

pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod errors;
pub mod formatting;
pub mod io;
pub mod observability;
pub mod synthesis;

pub use crate::config::{load_config, SynthesisConfig};
pub use crate::core::{
    CouplingEdge, CouplingStrength, MigrationEffort, MigrationRisk, MigrationStep,
    ModuleCandidate, SecurityHotspot,
};
pub use crate::errors::{Result, SynthesisError};
pub use crate::io::loader::{load_facts, FactBundle};
pub use crate::synthesis::{run_stages, synthesize, Synthesis, SynthesisReport};
