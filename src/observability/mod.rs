//! Observability infrastructure for crash reports and debugging.
//!
//! - **Panic hook**: structured crash reports naming the active phase
//! - **Context tracking**: thread-local synthesis phase and output root
//!
//! ```ignore
//! use archsynth::observability::{install_panic_hook, set_phase, SynthesisPhase};
//!
//! install_panic_hook();
//! let _phase = set_phase(SynthesisPhase::Correlation);
//! ```

pub mod context;
pub mod panic_hook;

pub use context::{
    get_current_context, reset_context, set_output_root, set_phase, ContextGuard,
    SynthesisContext, SynthesisPhase,
};
pub use panic_hook::install_panic_hook;
