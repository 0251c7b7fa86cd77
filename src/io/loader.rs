//! Fact loader: reads the upstream documents once and normalizes them.
//!
//! Upstream extractors are inconsistent about collection shapes. A set of
//! records may arrive as a JSON array or as an object keyed by path, table
//! name or route key, and individual fields have several historical names.
//! All of that is resolved here so later stages only ever see the canonical
//! records defined in this module.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::{SecurityFinding, Severity};
use crate::errors::SynthesisError;

pub const FILE_ANALYSIS_PATH: &str = "analysis/legacy_analysis.json";
pub const ROUTES_PATH: &str = "analysis/routes.json";
pub const SCHEMA_PATHS: [&str; 2] = ["database/schema_inferred.json", "database/schema.json"];
pub const SERVICE_HINTS_PATH: &str = "analysis/extracted_services.json";

/// Outcome of reading one optional document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputStatus {
    Loaded,
    Missing,
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputStatuses {
    pub routes: InputStatus,
    pub schema: InputStatus,
    pub service_hints: InputStatus,
}

/// One SQL-bearing function of a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionRecord {
    pub name: String,
    pub sql: Vec<String>,
}

/// Canonical file-analysis record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub lines: usize,
    pub complexity: usize,
    pub has_database: bool,
    pub functions: Vec<FunctionRecord>,
    /// File-level SQL snippets (`sql_queries` and `sql_patterns`)
    pub sql: Vec<String>,
    /// Tables named by `database_patterns` entries
    pub declared_tables: Vec<String>,
    pub security_issue_count: usize,
}

impl FileRecord {
    /// Every SQL snippet of the file, function-level ones included.
    pub fn sql_snippets(&self) -> impl Iterator<Item = &str> {
        self.sql
            .iter()
            .chain(self.functions.iter().flat_map(|f| f.sql.iter()))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRecord {
    pub method: String,
    pub path: String,
    pub target: String,
    pub auth: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceHints {
    pub services: BTreeSet<String>,
    pub transport: String,
}

/// Every fact the synthesis consumes, loaded once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactBundle {
    pub root: PathBuf,
    pub files: Vec<FileRecord>,
    pub findings: Vec<SecurityFinding>,
    pub routes: Vec<RouteRecord>,
    pub tables: BTreeSet<String>,
    pub service_hints: ServiceHints,
    pub statuses: InputStatuses,
}

// ---------------------------------------------------------------------------
// Raw document shapes
// ---------------------------------------------------------------------------

/// Records that may come from a keyed mapping learn their key here.
trait KeyedRecord {
    fn adopt_key(&mut self, key: &str);
}

// Extractors emit several spellings of the same field, sometimes side by
// side, so alternatives are separate optional fields resolved by precedence
// rather than serde aliases.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFileRecord {
    path: String,
    total_lines: Option<usize>,
    lines: Option<usize>,
    cyclomatic_complexity: Option<usize>,
    complexity: Option<usize>,
    functions: Vec<RawFunction>,
    has_database: Option<bool>,
    calls_db: Option<bool>,
    security_issues: Vec<RawIssue>,
    database_patterns: Vec<RawDatabasePattern>,
    db_operations: Vec<RawDatabasePattern>,
    sql_queries: Vec<RawSql>,
    sql_patterns: Vec<RawSql>,
}

impl KeyedRecord for RawFileRecord {
    fn adopt_key(&mut self, key: &str) {
        if self.path.is_empty() {
            self.path = key.to_string();
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFunction {
    Named(String),
    Detailed {
        #[serde(default)]
        name: String,
        #[serde(default)]
        sql_queries: Vec<RawSql>,
    },
    Other(IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSql {
    Text(String),
    Object {
        #[serde(default, alias = "sql")]
        query: String,
    },
    Other(IgnoredAny),
}

impl RawSql {
    fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) | Self::Object { query: text } if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDatabasePattern {
    Object {
        #[serde(default)]
        table: String,
        /// Raw call site such as `mysqli_query($db, "SELECT ...")`
        #[serde(default)]
        snippet: String,
        /// Present on the document-level pattern list
        #[serde(default)]
        file: String,
    },
    Other(IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIssue {
    Detailed {
        #[serde(default)]
        file: Option<String>,
        #[serde(default, rename = "type", alias = "kind")]
        kind: Option<String>,
        #[serde(default)]
        severity: Option<String>,
    },
    Text(String),
    Other(IgnoredAny),
}

impl RawIssue {
    /// Converts to a finding attributed to `default_file` unless the issue names its own.
    fn into_finding(self, default_file: Option<&str>) -> Option<SecurityFinding> {
        let (file, kind, severity) = match self {
            Self::Detailed {
                file,
                kind,
                severity,
            } => (file, kind, severity),
            Self::Text(kind) => (None, Some(kind), None),
            Self::Other(_) => return None,
        };
        let file = file
            .as_deref()
            .or(default_file)
            .map(basename)
            .filter(|f| !f.is_empty())?;
        Some(SecurityFinding {
            file,
            kind: kind
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            severity: Severity::parse(severity.as_deref()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRoute {
    nestjs_path: Option<String>,
    pattern: Option<String>,
    path: Option<String>,
    target: Option<String>,
    target_file: Option<String>,
    handler: Option<String>,
    method: Option<String>,
    nestjs_method: Option<String>,
    http_methods: Vec<String>,
    auth: Option<bool>,
}

/// First non-blank candidate.
fn first_present(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

impl KeyedRecord for RawRoute {
    fn adopt_key(&mut self, key: &str) {
        let has_path = [&self.nestjs_path, &self.pattern, &self.path]
            .iter()
            .any(|p| p.as_deref().is_some_and(|p| !p.trim().is_empty()));
        if has_path {
            return;
        }
        match key.split_once(' ') {
            Some((method, path)) if self.method.is_none() => {
                self.method = Some(method.to_string());
                self.path = Some(path.trim().to_string());
            }
            _ => self.path = Some(key.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTable {
    #[serde(alias = "table", alias = "table_name")]
    name: String,
}

impl KeyedRecord for RawTable {
    fn adopt_key(&mut self, key: &str) {
        if self.name.is_empty() {
            self.name = key.to_string();
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawService {
    Named(String),
    Detailed {
        #[serde(default, alias = "name")]
        service_name: String,
    },
    Other(IgnoredAny),
}

// ---------------------------------------------------------------------------
// Shape normalization
// ---------------------------------------------------------------------------

/// Final path component, which is how datasets refer to files.
pub fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Turn a sequence-or-mapping value into a sequence of records.
///
/// Individual records that do not deserialize are skipped; a value that is
/// neither an array nor an object is an error.
fn records_from_value<T>(value: Value, what: &str) -> Result<Vec<T>, String>
where
    T: DeserializeOwned + KeyedRecord,
{
    let parse = |entry: Value| match serde_json::from_value::<T>(entry) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping unreadable {} record: {}", what, e);
            None
        }
    };

    match value {
        Value::Array(entries) => Ok(entries.into_iter().filter_map(parse).collect()),
        Value::Object(map) => Ok(map
            .into_iter()
            .filter_map(|(key, entry)| {
                let entry = match entry {
                    Value::Null => Value::Object(Default::default()),
                    other => other,
                };
                parse(entry).map(|mut record| {
                    record.adopt_key(&key);
                    record
                })
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(format!(
            "expected {what} as an array or object, found {}",
            json_type(&other)
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Take `field` out of a wrapper object, or use the whole document when it is
/// already the collection itself.
fn unwrap_collection(document: Value, fields: &[&str]) -> Value {
    match document {
        Value::Object(mut map) => {
            for field in fields {
                if let Some(inner) = map.remove(*field) {
                    return inner;
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Canonical record plus the file's inline security issues.
fn into_file_record(mut raw: RawFileRecord) -> (FileRecord, Vec<RawIssue>) {
    let inline_issues = std::mem::take(&mut raw.security_issues);
    let mut declared_tables = Vec::new();
    let mut pattern_sql = Vec::new();
    for pattern in raw.database_patterns.into_iter().chain(raw.db_operations) {
        if let RawDatabasePattern::Object { table, snippet, .. } = pattern {
            if !table.is_empty() {
                declared_tables.push(table);
            }
            if !snippet.is_empty() {
                pattern_sql.push(snippet);
            }
        }
    }

    let record = FileRecord {
        path: raw.path,
        lines: raw.total_lines.or(raw.lines).unwrap_or(0),
        complexity: raw.cyclomatic_complexity.or(raw.complexity).unwrap_or(0),
        has_database: raw.has_database.or(raw.calls_db).unwrap_or(false),
        functions: raw
            .functions
            .into_iter()
            .filter_map(|f| match f {
                RawFunction::Named(name) => Some(FunctionRecord {
                    name,
                    sql: Vec::new(),
                }),
                RawFunction::Detailed { name, sql_queries } => Some(FunctionRecord {
                    name,
                    sql: sql_queries.into_iter().filter_map(RawSql::into_text).collect(),
                }),
                RawFunction::Other(_) => None,
            })
            .collect(),
        sql: raw
            .sql_queries
            .into_iter()
            .chain(raw.sql_patterns)
            .filter_map(RawSql::into_text)
            .chain(pattern_sql)
            .collect(),
        declared_tables,
        security_issue_count: inline_issues.len(),
    };
    (record, inline_issues)
}

/// Parsed file-analysis document: file records plus security findings.
struct FileAnalysis {
    files: Vec<FileRecord>,
    findings: Vec<SecurityFinding>,
}

/// Top-level keys of the wrapper form of the file-analysis document. An
/// object carrying none of them is a keyed path -> record mapping.
const ANALYSIS_WRAPPER_KEYS: &[&str] = &[
    "all_files",
    "files",
    "security_issues_detail",
    "database_patterns",
    "summary",
    "security_summary",
    "project_root",
    "routing",
    "entry_points",
    "include_files",
    "functions_index",
    "globals_map",
    "migration_complexity",
    "recommended_services",
];

fn parse_file_analysis(document: Value) -> Result<FileAnalysis, String> {
    let (files_value, detail_value, patterns_value) = match document {
        Value::Object(mut map) if ANALYSIS_WRAPPER_KEYS.iter().any(|k| map.contains_key(*k)) => {
            let files = map
                .remove("all_files")
                .or_else(|| map.remove("files"))
                .unwrap_or(Value::Null);
            let detail = map.remove("security_issues_detail").unwrap_or(Value::Null);
            let patterns = map.remove("database_patterns").unwrap_or(Value::Null);
            (files, detail, patterns)
        }
        other => (other, Value::Null, Value::Null),
    };

    let raw_files: Vec<RawFileRecord> = records_from_value(files_value, "file")?;

    let detailed: Vec<SecurityFinding> = match detail_value {
        Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<RawIssue>(entry).ok())
            .filter_map(|issue| issue.into_finding(None))
            .collect(),
        _ => Vec::new(),
    };

    // Without a detailed list, the inline per-file issues are the findings.
    let derive_inline = detailed.is_empty();
    let mut findings = detailed;
    let mut files = Vec::with_capacity(raw_files.len());
    for raw in raw_files {
        let (record, inline_issues) = into_file_record(raw);
        if derive_inline {
            findings.extend(
                inline_issues
                    .into_iter()
                    .filter_map(|issue| issue.into_finding(Some(&record.path))),
            );
        }
        files.push(record);
    }

    attach_document_patterns(&mut files, patterns_value);

    Ok(FileAnalysis { files, findings })
}

/// The document-level `database_patterns` list names its file per entry;
/// fold each entry into the matching file record.
fn attach_document_patterns(files: &mut [FileRecord], patterns: Value) {
    let Value::Array(entries) = patterns else {
        return;
    };
    for entry in entries {
        let Ok(RawDatabasePattern::Object {
            table,
            snippet,
            file,
        }) = serde_json::from_value::<RawDatabasePattern>(entry)
        else {
            continue;
        };
        let name = basename(&file);
        // Unattributed or unknown files are a correlation miss.
        let Some(record) = files.iter_mut().find(|r| basename(&r.path) == name) else {
            continue;
        };
        if !table.is_empty() && !record.declared_tables.contains(&table) {
            record.declared_tables.push(table);
        }
        if !snippet.is_empty() && !record.sql.contains(&snippet) {
            record.sql.push(snippet);
        }
    }
}

fn parse_routes(document: Value) -> Result<Vec<RouteRecord>, String> {
    let raw: Vec<RawRoute> = records_from_value(unwrap_collection(document, &["routes"]), "route")?;
    Ok(raw
        .into_iter()
        .map(|r| RouteRecord {
            method: first_present([
                r.method,
                r.nestjs_method,
                r.http_methods.into_iter().next(),
            ])
            .map(|m| m.trim().to_uppercase())
            .unwrap_or_else(|| "GET".to_string()),
            path: first_present([r.nestjs_path, r.pattern, r.path]).unwrap_or_default(),
            target: first_present([r.target, r.target_file, r.handler]).unwrap_or_default(),
            auth: r.auth,
        })
        .collect())
}

fn parse_schema(document: Value) -> Result<BTreeSet<String>, String> {
    let raw: Vec<RawTable> = records_from_value(unwrap_collection(document, &["tables"]), "table")?;
    Ok(raw
        .into_iter()
        .map(|t| t.name)
        .filter(|name| !name.is_empty())
        .collect())
}

fn parse_service_hints(document: Value) -> Result<ServiceHints, String> {
    let (services, transport) = match document {
        Value::Object(mut map) => {
            let transport = map
                .remove("transport")
                .and_then(|t| t.as_str().map(str::to_string));
            (map.remove("services").unwrap_or(Value::Null), transport)
        }
        other => (other, None),
    };

    let services = match services {
        Value::Array(entries) => entries,
        Value::Null => Vec::new(),
        other => {
            return Err(format!(
                "expected services as an array, found {}",
                json_type(&other)
            ))
        }
    };

    Ok(ServiceHints {
        services: services
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<RawService>(entry).ok())
            .filter_map(|s| match s {
                RawService::Named(name) | RawService::Detailed { service_name: name } => {
                    Some(name)
                }
                RawService::Other(_) => None,
            })
            .filter(|name| !name.is_empty())
            .collect(),
        transport: transport.unwrap_or_else(|| "tcp".to_string()),
    })
}

// ---------------------------------------------------------------------------
// Document reading
// ---------------------------------------------------------------------------

fn read_json(path: &Path) -> std::io::Result<Result<Value, serde_json::Error>> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents))
}

/// Load an optional document; absence and malformation both yield `T::default()`.
fn load_optional<T: Default>(
    root: &Path,
    candidates: &[&str],
    parse: impl FnOnce(Value) -> Result<T, String>,
) -> (T, InputStatus) {
    let Some(path) = candidates
        .iter()
        .map(|rel| root.join(rel))
        .find(|path| path.is_file())
    else {
        debug!("Optional input {} not found", candidates.join(" | "));
        return (T::default(), InputStatus::Missing);
    };

    let outcome = match read_json(&path) {
        Ok(Ok(value)) => parse(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match outcome {
        Ok(value) => {
            debug!("Loaded {}", path.display());
            (value, InputStatus::Loaded)
        }
        Err(message) => {
            warn!("{}", SynthesisError::malformed(&path, message));
            (T::default(), InputStatus::Malformed)
        }
    }
}

/// Load every upstream document under `root`.
///
/// Fails only when the file-analysis document is absent or cannot be parsed.
pub fn load_facts(root: &Path) -> Result<FactBundle, SynthesisError> {
    let analysis_path = root.join(FILE_ANALYSIS_PATH);
    let document = read_json(&analysis_path)
        .map_err(|e| SynthesisError::missing_mandatory(&analysis_path, e))?
        .map_err(|e| SynthesisError::missing_mandatory(&analysis_path, e))?;
    let analysis = parse_file_analysis(document)
        .map_err(|e| SynthesisError::missing_mandatory(&analysis_path, e))?;
    info!(
        "Loaded {} file records and {} security findings",
        analysis.files.len(),
        analysis.findings.len()
    );

    let (routes, routes_status) = load_optional(root, &[ROUTES_PATH], parse_routes);
    let (tables, schema_status) = load_optional(root, &SCHEMA_PATHS, parse_schema);
    let (service_hints, hints_status) =
        load_optional(root, &[SERVICE_HINTS_PATH], parse_service_hints);
    info!(
        "Loaded {} routes, {} tables, {} service hints",
        routes.len(),
        tables.len(),
        service_hints.services.len()
    );

    Ok(FactBundle {
        root: root.to_path_buf(),
        files: analysis.files,
        findings: analysis.findings,
        routes,
        tables,
        service_hints,
        statuses: InputStatuses {
            routes: routes_status,
            schema: schema_status,
            service_hints: hints_status,
        },
    })
}
