//! Architectural synthesis pipeline.
//!
//! Correlator -> coupling analyzer / hotspot ranker -> boundary clusterer ->
//! module profiler -> order resolver. Each stage is a pure function of the
//! values produced before it; [`run_stages`] threads them through and
//! [`report::build_report`] turns the result into the synthesis document.

pub mod clustering;
pub mod correlation;
pub mod coupling;
pub mod hotspots;
pub mod ordering;
pub mod profiling;
pub mod report;

use tracing::{info, info_span};

use crate::config::SynthesisConfig;
use crate::core::{CouplingEdge, MigrationStep, ModuleCandidate, SecurityHotspot};
use crate::io::loader::FactBundle;
use crate::observability::{set_phase, SynthesisPhase};

pub use clustering::{cluster_files, Clustering};
pub use correlation::{correlate, Correlation};
pub use coupling::analyze_coupling;
pub use hotspots::rank_hotspots;
pub use ordering::{
    dependency_cycles, rank_modules, resolve_migration_order, CycleBreaker, LowestRiskFirst,
};
pub use profiling::profile_modules;
pub use report::{build_report, SynthesisReport};

/// Every intermediate value of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub correlation: Correlation,
    pub couplings: Vec<CouplingEdge>,
    pub hotspots: Vec<SecurityHotspot>,
    pub clustering: Clustering,
    /// In rank order.
    pub modules: Vec<ModuleCandidate>,
    pub migration_order: Vec<MigrationStep>,
    pub dependency_cycles: Vec<Vec<String>>,
    pub cycle_breaker: &'static str,
}

pub fn run_stages(
    bundle: &FactBundle,
    config: &SynthesisConfig,
    breaker: &dyn CycleBreaker,
) -> Synthesis {
    let correlation = {
        let _phase = set_phase(SynthesisPhase::Correlation);
        let _span = info_span!("correlate").entered();
        correlate(bundle)
    };

    let couplings = {
        let _phase = set_phase(SynthesisPhase::Coupling);
        let _span = info_span!("coupling").entered();
        analyze_coupling(&correlation, &config.coupling)
    };
    info!("Found {} data coupling patterns", couplings.len());

    let hotspots = {
        let _phase = set_phase(SynthesisPhase::Hotspots);
        let _span = info_span!("hotspots").entered();
        rank_hotspots(&bundle.findings, &config.security)
    };
    info!("Found {} security hotspots", hotspots.len());

    let clustering = {
        let _phase = set_phase(SynthesisPhase::Clustering);
        let _span = info_span!("clustering").entered();
        cluster_files(&correlation, &couplings, &config.vocabulary)
    };
    info!(
        "Grouped files into {} clusters ({} unclustered)",
        clustering.clusters.len(),
        clustering.unclustered.len()
    );

    let modules = {
        let _phase = set_phase(SynthesisPhase::Profiling);
        let _span = info_span!("profiling").entered();
        let profiled = profile_modules(&clustering, &correlation, &bundle.service_hints, config);
        rank_modules(profiled, &config.migration)
    };

    let (migration_order, cycles) = {
        let _phase = set_phase(SynthesisPhase::Ordering);
        let _span = info_span!("ordering").entered();
        (
            resolve_migration_order(&modules, breaker),
            dependency_cycles(&modules),
        )
    };
    info!(
        "Generated {} module recommendations, {} dependency cycles",
        modules.len(),
        cycles.len()
    );

    Synthesis {
        correlation,
        couplings,
        hotspots,
        clustering,
        modules,
        migration_order,
        dependency_cycles: cycles,
        cycle_breaker: breaker.name(),
    }
}

/// Run the whole pipeline with the default cycle breaker.
pub fn synthesize(bundle: &FactBundle, config: &SynthesisConfig) -> SynthesisReport {
    let synthesis = run_stages(bundle, config, &LowestRiskFirst);
    let _phase = set_phase(SynthesisPhase::Reporting);
    build_report(bundle, &synthesis, config)
}
