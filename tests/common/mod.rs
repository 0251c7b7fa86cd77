//! Shared fixtures: an analysis output root laid out the way upstream passes write it.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const FILE_ANALYSIS: &str = "analysis/legacy_analysis.json";
pub const ROUTES: &str = "analysis/routes.json";
pub const SCHEMA: &str = "database/schema_inferred.json";
pub const SERVICES: &str = "analysis/extracted_services.json";

/// Temporary output root with helpers for dropping documents into it.
pub struct AnalysisRoot {
    pub dir: TempDir,
}

impl AnalysisRoot {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) -> &Self {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        self
    }

    pub fn schema(&self, tables: &[&str]) -> &Self {
        let entries: Vec<String> = tables
            .iter()
            .map(|t| format!(r#"{{"name": "{t}"}}"#))
            .collect();
        self.write(SCHEMA, &format!(r#"{{"tables": [{}]}}"#, entries.join(", ")))
    }
}
