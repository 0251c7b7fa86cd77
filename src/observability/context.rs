//! Thread-local context tracking for crash reports.
//!
//! Records which synthesis phase is running and which output root is being
//! processed. Guards restore the previous context when dropped, so phases can
//! nest.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;

thread_local! {
    static CURRENT_CONTEXT: RefCell<SynthesisContext> = const { RefCell::new(SynthesisContext::new()) };
}

/// Snapshot of what the run was doing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisContext {
    pub phase: Option<SynthesisPhase>,
    pub output_root: Option<PathBuf>,
}

impl SynthesisContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            output_root: None,
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisPhase {
    /// Reading the upstream fact documents
    Loading,
    Correlation,
    Coupling,
    Hotspots,
    Clustering,
    Profiling,
    Ordering,
    /// Assembling the synthesis document
    Reporting,
    /// Writing JSON and Markdown files
    Output,
}

impl fmt::Display for SynthesisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Correlation => "correlation",
            Self::Coupling => "coupling",
            Self::Hotspots => "hotspots",
            Self::Clustering => "clustering",
            Self::Profiling => "profiling",
            Self::Ordering => "ordering",
            Self::Reporting => "reporting",
            Self::Output => "output",
        };
        f.write_str(name)
    }
}

/// RAII guard that restores the previous context on drop.
pub struct ContextGuard {
    previous: SynthesisContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

fn update(apply: impl FnOnce(&mut SynthesisContext)) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        apply(&mut ctx.borrow_mut());
        ContextGuard { previous }
    })
}

/// Set the current phase until the returned guard drops.
///
/// ```ignore
/// let _phase = set_phase(SynthesisPhase::Clustering);
/// // phase restored when _phase drops
/// ```
#[must_use]
pub fn set_phase(phase: SynthesisPhase) -> ContextGuard {
    update(|ctx| ctx.phase = Some(phase))
}

#[must_use]
pub fn set_output_root(root: impl Into<PathBuf>) -> ContextGuard {
    let root = root.into();
    update(|ctx| ctx.output_root = Some(root))
}

/// Called by the panic hook.
#[must_use]
pub fn get_current_context() -> SynthesisContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Reset the current thread's context to empty.
pub fn reset_context() {
    CURRENT_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = SynthesisContext::new();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_guard_restores_previous() {
        reset_context();

        let _outer = set_phase(SynthesisPhase::Correlation);
        {
            let _inner = set_phase(SynthesisPhase::Clustering);
            assert_eq!(
                get_current_context().phase,
                Some(SynthesisPhase::Clustering)
            );
        }
        assert_eq!(
            get_current_context().phase,
            Some(SynthesisPhase::Correlation),
            "Phase should be restored after the inner guard drops"
        );
    }

    #[test]
    fn test_nested_root_and_phase() {
        reset_context();

        let _root = set_output_root("/tmp/output");
        let _phase = set_phase(SynthesisPhase::Loading);
        let ctx = get_current_context();
        assert_eq!(ctx.phase, Some(SynthesisPhase::Loading));
        assert_eq!(ctx.output_root, Some(PathBuf::from("/tmp/output")));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SynthesisPhase::Loading.to_string(), "loading");
        assert_eq!(SynthesisPhase::Ordering.to_string(), "ordering");
        assert_eq!(SynthesisPhase::Output.to_string(), "output");
    }

    #[test]
    fn test_empty_context_by_default() {
        reset_context();
        assert_eq!(get_current_context(), SynthesisContext::default());
    }
}
