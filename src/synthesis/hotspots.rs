//! Severity-weighted aggregation of security findings per file.

use std::collections::BTreeMap;

use crate::config::SecurityThresholds;
use crate::core::{SecurityFinding, SecurityHotspot};

const SQL_INJECTION_ADVICE: &str =
    "CRITICAL: Use parameterized queries through the ORM. Migrate this file early.";
const XSS_ADVICE: &str = "HIGH: Add input validation and output encoding at every boundary.";
const AUTH_ADVICE: &str = "HIGH: Implement proper auth guards and role-based access.";
const GENERIC_ADVICE: &str = "MEDIUM: Address security issues during migration.";

#[derive(Debug, Default)]
struct FileTally {
    issues: BTreeMap<String, usize>,
    total: usize,
    score: usize,
}

/// The three most frequent finding types, ties broken by name.
fn top_types(issues: &BTreeMap<String, usize>) -> Vec<&str> {
    let mut ranked: Vec<(&str, usize)> = issues.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(3).map(|(kind, _)| kind).collect()
}

fn advice_for(issues: &BTreeMap<String, usize>) -> &'static str {
    let top = top_types(issues);
    if top.contains(&"sql_injection") {
        SQL_INJECTION_ADVICE
    } else if top.contains(&"xss") {
        XSS_ADVICE
    } else if top.iter().any(|kind| kind.to_lowercase().contains("auth")) {
        AUTH_ADVICE
    } else {
        GENERIC_ADVICE
    }
}

/// Rank files whose findings cross either hotspot threshold.
///
/// Sorted by descending severity score, then file name.
pub fn rank_hotspots(
    findings: &[SecurityFinding],
    thresholds: &SecurityThresholds,
) -> Vec<SecurityHotspot> {
    let mut by_file: BTreeMap<&str, FileTally> = BTreeMap::new();
    for finding in findings {
        let tally = by_file.entry(finding.file.as_str()).or_default();
        *tally.issues.entry(finding.kind.clone()).or_default() += 1;
        tally.total += 1;
        tally.score += thresholds.weights.weight(finding.severity);
    }

    let mut hotspots: Vec<SecurityHotspot> = by_file
        .into_iter()
        .filter(|(_, tally)| thresholds.is_hotspot(tally.total, tally.score))
        .map(|(file, tally)| SecurityHotspot {
            file: file.to_string(),
            recommendation: advice_for(&tally.issues).to_string(),
            issues: tally.issues,
            total_issues: tally.total,
            severity_score: tally.score,
        })
        .collect();

    hotspots.sort_by(|a, b| {
        b.severity_score
            .cmp(&a.severity_score)
            .then_with(|| a.file.cmp(&b.file))
    });
    hotspots
}

/// Hotspots at or above the critical score, in rank order.
pub fn critical_files(hotspots: &[SecurityHotspot], thresholds: &SecurityThresholds) -> Vec<String> {
    hotspots
        .iter()
        .filter(|h| h.severity_score >= thresholds.critical_score)
        .map(|h| h.file.clone())
        .collect()
}
