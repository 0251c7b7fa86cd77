//! Custom panic hook for structured crash reports.
//!
//! A crash report names the synthesis phase and output root that were active,
//! the panic message and location, and how to get a stack trace.

use super::context::{get_current_context, SynthesisContext};
use std::panic::PanicHookInfo;
use tracing::Span;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const RULE: &str = "════════════════════════════════════════════════════════════════════════════";

/// Install the custom panic hook. Call early in `main`.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        print_crash_report(info);
    }));
}

fn print_crash_report(info: &PanicHookInfo<'_>) {
    let context = get_current_context();

    eprintln!();
    eprintln!("{RULE}");
    eprintln!("  ARCHSYNTH CRASH REPORT");
    eprintln!("  Version: {VERSION}");
    eprintln!("  Platform: {}", std::env::consts::OS);
    eprintln!("{RULE}");
    print_panic_details(info);
    print_context_section(&context);
    print_backtrace_section();
}

fn print_panic_details(info: &PanicHookInfo<'_>) {
    eprintln!("  PANIC: {}", truncate(&extract_panic_message(info), 68));
    if let Some(location) = info.location() {
        eprintln!(
            "  Location: {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
    }
}

fn print_context_section(context: &SynthesisContext) {
    eprintln!("{RULE}");
    eprintln!("  CONTEXT:");
    match &context.phase {
        Some(phase) => eprintln!("    Phase: {phase}"),
        None => eprintln!("    Phase: (not set - crash occurred before synthesis started)"),
    }
    if let Some(metadata) = Span::current().metadata() {
        eprintln!("    Span: {}", metadata.name());
    }
    if let Some(root) = &context.output_root {
        eprintln!("    Output root: {}", root.display());
    }
}

fn print_backtrace_section() {
    eprintln!("{RULE}");
    if std::env::var("RUST_BACKTRACE").is_ok() {
        eprintln!("  STACK TRACE:");
        eprintln!();
        eprintln!("{}", std::backtrace::Backtrace::capture());
    } else {
        eprintln!("  Run with RUST_BACKTRACE=1 for stack trace");
        eprintln!("{RULE}");
    }
}

fn extract_panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_truncate_long_string() {
        let result = truncate("this is a long string that needs truncation", 20);
        assert_eq!(result.chars().count(), 20);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("ééééé", 4), "é...");
    }
}
