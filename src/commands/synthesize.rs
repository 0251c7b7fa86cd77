use crate::cli::OutputFormat;
use crate::config;
use crate::formatting::{ColoredFormatter, FormattingConfig};
use crate::io::{self, JsonWriter, MarkdownWriter, OutputWriter, TerminalWriter};
use crate::observability::{set_output_root, set_phase, SynthesisPhase};
use crate::synthesis::{synthesize, SynthesisReport};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORT_DIR: &str = "analysis";
pub const JSON_REPORT: &str = "SYNTHESIS.json";
pub const MARKDOWN_REPORT: &str = "SYNTHESIS.md";

pub struct SynthesizeConfig {
    pub output_root: PathBuf,
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
    pub output_dir: Option<PathBuf>,
    pub formatting_config: FormattingConfig,
    /// Print the console summary after writing
    pub summary: bool,
}

/// Files written by one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesizeOutcome {
    pub json: Option<PathBuf>,
    pub markdown: Option<PathBuf>,
}

pub fn handle_synthesize(config: SynthesizeConfig) -> Result<SynthesizeOutcome> {
    let _root = set_output_root(&config.output_root);

    let bundle = {
        let _phase = set_phase(SynthesisPhase::Loading);
        io::load_facts(&config.output_root).with_context(|| {
            format!(
                "Failed to load analysis facts from {}",
                config.output_root.display()
            )
        })?
    };
    let settings = config::load_config(config.config.as_deref(), &config.output_root)
        .context("Failed to load configuration")?;

    let report = synthesize(&bundle, &settings);

    let _phase = set_phase(SynthesisPhase::Output);
    let dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output_root.join(REPORT_DIR));
    let outcome = write_reports(&report, &dir, config.format)?;

    if config.summary {
        let formatter = ColoredFormatter::new(config.formatting_config);
        TerminalWriter::new(std::io::stdout(), Box::new(formatter)).write_report(&report)?;
        for path in [&outcome.json, &outcome.markdown].into_iter().flatten() {
            println!("Wrote {}", path.display());
        }
    }

    Ok(outcome)
}

/// Write the requested report files into `dir`, creating it if needed.
pub fn write_reports(
    report: &SynthesisReport,
    dir: &Path,
    format: OutputFormat,
) -> Result<SynthesizeOutcome> {
    io::ensure_dir(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut outcome = SynthesizeOutcome::default();

    if format.writes_json() {
        let path = dir.join(JSON_REPORT);
        let mut buf = Vec::new();
        JsonWriter::new(&mut buf).write_report(report)?;
        std::fs::write(&path, buf)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
        outcome.json = Some(path);
    }

    if format.writes_markdown() {
        let path = dir.join(MARKDOWN_REPORT);
        let mut buf = Vec::new();
        MarkdownWriter::new(&mut buf).write_report(report)?;
        std::fs::write(&path, buf)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
        outcome.markdown = Some(path);
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::loader::FILE_ANALYSIS_PATH;
    use std::fs;
    use tempfile::TempDir;

    fn run(root: &Path, format: OutputFormat) -> Result<SynthesizeOutcome> {
        handle_synthesize(SynthesizeConfig {
            output_root: root.to_path_buf(),
            config: None,
            format,
            output_dir: None,
            formatting_config: FormattingConfig::plain(),
            summary: false,
        })
    }

    #[test]
    fn test_missing_file_analysis_fails() {
        let dir = TempDir::new().unwrap();
        assert!(run(dir.path(), OutputFormat::All).is_err());
        assert!(!dir.path().join(REPORT_DIR).exists());
    }

    #[test]
    fn test_json_only_run() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("analysis")).unwrap();
        fs::write(
            dir.path().join(FILE_ANALYSIS_PATH),
            r#"[{"path": "src/users.service.ts", "total_lines": 40, "database_patterns": [{"table": "users"}]}]"#,
        )
        .unwrap();

        let outcome = run(dir.path(), OutputFormat::Json).unwrap();
        let json = outcome.json.unwrap();
        assert_eq!(json, dir.path().join(REPORT_DIR).join(JSON_REPORT));
        assert!(json.exists());
        assert!(outcome.markdown.is_none());
        assert!(!dir.path().join(REPORT_DIR).join(MARKDOWN_REPORT).exists());
    }
}
