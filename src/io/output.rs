use crate::core::{MigrationStep, ModuleCandidate};
use crate::formatting::{OutputFormatter, PlainFormatter};
use crate::synthesis::report::{AppKind, SynthesisReport};
use std::io::Write;

const MAX_LISTED_ROUTES: usize = 5;
const MAX_CONSOLE_STEPS: usize = 10;

pub trait OutputWriter {
    fn write_report(&mut self, report: &SynthesisReport) -> anyhow::Result<()>;
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_report(&mut self, report: &SynthesisReport) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        self.writer.write_all(json.as_bytes())?;
        writeln!(self.writer)?;
        Ok(())
    }
}

pub struct MarkdownWriter<W: Write> {
    writer: W,
}

impl<W: Write> MarkdownWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for MarkdownWriter<W> {
    fn write_report(&mut self, report: &SynthesisReport) -> anyhow::Result<()> {
        self.write_header(report)?;
        self.write_summary(report)?;
        self.write_decisions(report)?;
        self.write_migration_order(&report.migration_order)?;
        self.write_modules(&report.module_recommendations)?;
        self.write_workspace_layout(report)?;
        self.write_security(report)?;
        self.write_couplings(report)?;
        self.write_cycles(report)?;
        self.write_unclustered(report)?;
        Ok(())
    }
}

impl<W: Write> MarkdownWriter<W> {
    fn write_header(&mut self, report: &SynthesisReport) -> anyhow::Result<()> {
        writeln!(self.writer, "# Architectural Synthesis Report")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "Source analysis: `{}`", report.meta.source_analysis)?;
        writeln!(self.writer, "Version: {}", report.meta.version)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_summary(&mut self, report: &SynthesisReport) -> anyhow::Result<()> {
        let summary = &report.summary;
        writeln!(self.writer, "## Executive Summary")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| Metric | Value |")?;
        writeln!(self.writer, "|--------|-------|")?;
        self.write_summary_row("Modules", &summary.total_modules.to_string())?;
        self.write_summary_row("Microservices", &summary.total_microservices.to_string())?;
        self.write_summary_row("Gateway Modules", &summary.total_gateway_modules.to_string())?;
        self.write_summary_row("Routes", &summary.total_routes.to_string())?;
        self.write_summary_row("Tables", &summary.total_tables.to_string())?;
        self.write_summary_row(
            "Security Issues",
            &summary.total_security_issues.to_string(),
        )?;
        self.write_summary_row("Estimated Effort", &summary.estimated_total_effort)?;
        writeln!(self.writer)?;

        if !summary.high_risk_modules.is_empty() {
            writeln!(
                self.writer,
                "**High-risk modules:** {}",
                summary.high_risk_modules.join(", ")
            )?;
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_summary_row(&mut self, metric: &str, value: &str) -> anyhow::Result<()> {
        writeln!(self.writer, "| {metric} | {value} |")?;
        Ok(())
    }

    fn write_decisions(&mut self, report: &SynthesisReport) -> anyhow::Result<()> {
        if report.key_decisions.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "## Key Architectural Decisions")?;
        writeln!(self.writer)?;
        for (i, decision) in report.key_decisions.iter().enumerate() {
            writeln!(self.writer, "### {}. {}", i + 1, decision.decision)?;
            writeln!(self.writer)?;
            writeln!(self.writer, "**Rationale:** {}", decision.rationale)?;
            if let Some(trade_offs) = &decision.trade_offs {
                writeln!(self.writer)?;
                writeln!(self.writer, "**Trade-offs:** {trade_offs}")?;
            }
            if let Some(action) = &decision.action {
                writeln!(self.writer)?;
                writeln!(self.writer, "**Action:** {action}")?;
            }
            if let Some(implementation) = &decision.implementation {
                writeln!(self.writer)?;
                writeln!(self.writer, "**Implementation:** {implementation}")?;
            }
            if !decision.affected_tables.is_empty() {
                writeln!(self.writer)?;
                writeln!(
                    self.writer,
                    "**Affected tables:** {}",
                    decision.affected_tables.join(", ")
                )?;
            }
            if !decision.affected_files.is_empty() {
                writeln!(self.writer)?;
                writeln!(
                    self.writer,
                    "**Affected files:** {}",
                    decision.affected_files.join(", ")
                )?;
            }
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_migration_order(&mut self, steps: &[MigrationStep]) -> anyhow::Result<()> {
        writeln!(self.writer, "## Recommended Migration Order")?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "| Step | Module | Type | Risk | Effort | Routes | Tables |"
        )?;
        writeln!(
            self.writer,
            "|------|--------|------|------|--------|--------|--------|"
        )?;
        for step in steps {
            let marker = if step.forced { " (forced)" } else { "" };
            writeln!(
                self.writer,
                "| {} | {}{} | {} | {} | {} | {} | {} |",
                step.step,
                step.module,
                marker,
                module_type_label(step.is_microservice),
                step.risk,
                step.effort,
                step.routes_count,
                step.tables_count
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_modules(&mut self, modules: &[ModuleCandidate]) -> anyhow::Result<()> {
        writeln!(self.writer, "## Module Recommendations")?;
        writeln!(self.writer)?;
        for module in modules {
            writeln!(self.writer, "### {}", module.name)?;
            writeln!(self.writer)?;
            writeln!(self.writer, "- **Type:** {}", module_type_label(module.is_microservice))?;
            writeln!(self.writer, "- **Rationale:** {}", module.rationale)?;
            writeln!(
                self.writer,
                "- **Risk:** {} / **Effort:** {}",
                module.migration_risk, module.estimated_effort
            )?;
            writeln!(
                self.writer,
                "- **Lines:** {} / **Complexity:** {} / **Security issues:** {}",
                module.lines_of_code, module.complexity_score, module.security_issues
            )?;
            if !module.tables.is_empty() {
                let tables: Vec<&str> = module.tables.iter().map(String::as_str).collect();
                writeln!(self.writer, "- **Tables:** {}", tables.join(", "))?;
            }
            if !module.dependencies.is_empty() {
                let deps: Vec<&str> = module.dependencies.iter().map(String::as_str).collect();
                writeln!(self.writer, "- **Depends on:** {}", deps.join(", "))?;
            }
            if !module.routes.is_empty() {
                writeln!(self.writer, "- **Routes:**")?;
                for route in module.routes.iter().take(MAX_LISTED_ROUTES) {
                    writeln!(self.writer, "  - `{route}`")?;
                }
                if module.routes.len() > MAX_LISTED_ROUTES {
                    writeln!(
                        self.writer,
                        "  - ... and {} more",
                        module.routes.len() - MAX_LISTED_ROUTES
                    )?;
                }
            }
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_workspace_layout(&mut self, report: &SynthesisReport) -> anyhow::Result<()> {
        let layout = &report.workspace_layout;
        writeln!(self.writer, "## Recommended Workspace Layout")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "```")?;
        writeln!(self.writer, "apps/")?;
        for app in &layout.apps {
            let kind = match app.kind {
                AppKind::HttpApi => "http-api",
                AppKind::Microservice => "microservice",
            };
            let transport = app
                .transport
                .as_deref()
                .map(|t| format!(", {t}"))
                .unwrap_or_default();
            writeln!(
                self.writer,
                "  {}/  # {} on port {}{}",
                app.name, kind, app.port, transport
            )?;
            for module in &app.modules {
                writeln!(self.writer, "    {module}/")?;
            }
        }
        writeln!(self.writer, "libs/")?;
        for lib in &layout.libs {
            writeln!(self.writer, "  {}/  # {}", lib.name, lib.purpose)?;
        }
        writeln!(self.writer, "```")?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_security(&mut self, report: &SynthesisReport) -> anyhow::Result<()> {
        let security = &report.security_analysis;
        if security.hotspots.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "## Security Hotspots")?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{} hotspots in total, {} critical.",
            security.total_hotspots,
            security.critical_files.len()
        )?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| File | Issues | Score | Top Types |")?;
        writeln!(self.writer, "|------|--------|-------|-----------|")?;
        for hotspot in &security.hotspots {
            let types: Vec<String> = hotspot
                .issues
                .iter()
                .map(|(kind, count)| format!("{kind} ({count})"))
                .collect();
            writeln!(
                self.writer,
                "| {} | {} | {} | {} |",
                hotspot.file,
                hotspot.total_issues,
                hotspot.severity_score,
                types.join(", ")
            )?;
        }
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", security.recommendation)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_couplings(&mut self, report: &SynthesisReport) -> anyhow::Result<()> {
        let data = &report.data_architecture;
        if data.data_couplings.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "## Data Coupling Analysis")?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "Tight: {} / Moderate: {} / Loose: {}",
            data.coupling_summary.tight, data.coupling_summary.moderate, data.coupling_summary.loose
        )?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| Tables | Shared Files | Ratio | Strength |")?;
        writeln!(self.writer, "|--------|--------------|-------|----------|")?;
        for edge in data.data_couplings.iter().take(10) {
            writeln!(
                self.writer,
                "| {} + {} | {} | {:.2} | {} |",
                edge.tables[0], edge.tables[1], edge.co_occurrence, edge.ratio, edge.strength
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_cycles(&mut self, report: &SynthesisReport) -> anyhow::Result<()> {
        let cycles = &report.data_architecture.dependency_cycles;
        if cycles.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "## Dependency Cycles")?;
        writeln!(self.writer)?;
        for cycle in cycles {
            writeln!(self.writer, "- {}", cycle.join(" <-> "))?;
        }
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "Modules in a cycle were ordered by the `{}` breaker.",
            report.meta.cycle_breaker
        )?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_unclustered(&mut self, report: &SynthesisReport) -> anyhow::Result<()> {
        let files = &report.correlations.unclustered_files;
        if files.is_empty() {
            return Ok(());
        }
        writeln!(self.writer, "## Unclustered Files")?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{} analyzed files touch no table and serve no route:",
            files.len()
        )?;
        writeln!(self.writer)?;
        for file in files {
            writeln!(self.writer, "- {file}")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

fn module_type_label(is_microservice: bool) -> &'static str {
    if is_microservice {
        "microservice"
    } else {
        "gateway module"
    }
}

/// Short console summary printed after the files are written.
pub struct TerminalWriter<W: Write> {
    writer: W,
    formatter: Box<dyn OutputFormatter>,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W, formatter: Box<dyn OutputFormatter>) -> Self {
        Self { writer, formatter }
    }

    pub fn plain(writer: W) -> Self {
        Self::new(writer, Box::new(PlainFormatter))
    }
}

impl<W: Write> OutputWriter for TerminalWriter<W> {
    fn write_report(&mut self, report: &SynthesisReport) -> anyhow::Result<()> {
        let f = &self.formatter;
        let summary = &report.summary;

        writeln!(self.writer, "{}", f.header("Architectural Synthesis"))?;
        writeln!(
            self.writer,
            "  {} modules ({} microservices, {} gateway modules)",
            f.bold(&summary.total_modules.to_string()),
            summary.total_microservices,
            summary.total_gateway_modules
        )?;
        writeln!(
            self.writer,
            "  {} routes, {} tables, {} security issues",
            summary.total_routes, summary.total_tables, summary.total_security_issues
        )?;
        writeln!(
            self.writer,
            "  Estimated effort: {}",
            f.bold(&summary.estimated_total_effort)
        )?;
        if !summary.high_risk_modules.is_empty() {
            writeln!(
                self.writer,
                "  {} {}",
                f.warning("High-risk modules:"),
                summary.high_risk_modules.join(", ")
            )?;
        }
        writeln!(self.writer)?;

        writeln!(self.writer, "{}", f.header("Migration Order"))?;
        for step in report.migration_order.iter().take(MAX_CONSOLE_STEPS) {
            let forced = if step.forced {
                format!(" {}", f.warning("(forced)"))
            } else {
                String::new()
            };
            writeln!(
                self.writer,
                "  {:>2}. {:<20} risk {} {}{}",
                step.step,
                step.module,
                f.risk(step.risk),
                f.dim(&format!("effort {}", step.effort)),
                forced
            )?;
        }
        if report.migration_order.len() > MAX_CONSOLE_STEPS {
            writeln!(
                self.writer,
                "  {}",
                f.dim(&format!(
                    "... {} more",
                    report.migration_order.len() - MAX_CONSOLE_STEPS
                ))
            )?;
        }

        let cycles = report.data_architecture.dependency_cycles.len();
        if cycles > 0 {
            writeln!(
                self.writer,
                "{}",
                f.warning(&format!("{cycles} dependency cycle(s) broken while ordering"))
            )?;
        }
        Ok(())
    }
}
