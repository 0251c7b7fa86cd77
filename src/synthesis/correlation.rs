//! Correlator: joins the independently collected datasets.
//!
//! The datasets share no native keys. Files are matched by basename and
//! tables by case-insensitive identifier match against the schema. References
//! that resolve to nothing are dropped without comment; they are expected and
//! frequent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::core::{FileFact, FileMetrics, RouteFact, TableFact};
use crate::io::loader::{basename, FactBundle, FileRecord};

/// Table identifiers following `FROM`, `JOIN`, `INTO` and `UPDATE`
/// (`DELETE FROM` is covered by `FROM`), optionally quoted.
static SQL_TABLE_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:from|join|into|update)\s+[`"']?(\w+)[`"']?"#)
        .expect("table reference pattern is valid")
});

/// Result of correlating one fact bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correlation {
    /// Every known file by basename.
    pub files: BTreeMap<String, FileFact>,
    /// Routes that named a target file, in document order.
    pub routes: Vec<RouteFact>,
    /// Route key -> target basename. A repeated key keeps its last target.
    pub route_to_file: BTreeMap<String, String>,
    pub table_to_files: BTreeMap<String, BTreeSet<String>>,
    pub known_tables: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrelationStats {
    pub route_to_file_count: usize,
    pub files_with_db_access: usize,
    pub tables_with_file_access: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrelationSample {
    pub route: String,
    pub file: String,
    pub tables: Vec<String>,
}

impl Correlation {
    pub fn files_for(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.table_to_files.get(table)
    }

    pub fn table_facts(&self) -> Vec<TableFact> {
        self.table_to_files
            .iter()
            .map(|(name, files)| TableFact {
                name: name.clone(),
                files: files.clone(),
            })
            .collect()
    }

    /// Files that neither touch a table nor serve a route.
    pub fn unreferenced_files(&self) -> Vec<String> {
        self.files
            .values()
            .filter(|f| !f.is_referenced())
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn stats(&self) -> CorrelationStats {
        CorrelationStats {
            route_to_file_count: self.route_to_file.len(),
            files_with_db_access: self.files.values().filter(|f| !f.tables.is_empty()).count(),
            tables_with_file_access: self.table_to_files.len(),
        }
    }

    /// First `limit` route -> file -> tables chains, in route-key order.
    pub fn samples(&self, limit: usize) -> Vec<CorrelationSample> {
        self.route_to_file
            .iter()
            .take(limit)
            .map(|(route, file)| CorrelationSample {
                route: route.clone(),
                file: file.clone(),
                tables: self
                    .files
                    .get(file)
                    .map(|f| f.tables.iter().take(limit).cloned().collect())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

/// Lowercased identifier -> schema table names spelled that way.
struct TableIndex(BTreeMap<String, BTreeSet<String>>);

impl TableIndex {
    fn new(known: &BTreeSet<String>) -> Self {
        let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for table in known {
            index
                .entry(table.to_lowercase())
                .or_default()
                .insert(table.clone());
        }
        Self(index)
    }

    fn resolve<'a>(&'a self, identifier: &str) -> impl Iterator<Item = &'a String> {
        self.0
            .get(&identifier.to_lowercase())
            .into_iter()
            .flatten()
    }
}

/// Known tables referenced by one file record.
fn tables_of(record: &FileRecord, index: &TableIndex) -> BTreeSet<String> {
    let declared = record
        .declared_tables
        .iter()
        .flat_map(|t| index.resolve(t));
    let scanned = record
        .sql_snippets()
        .flat_map(|sql| SQL_TABLE_REF.captures_iter(sql))
        .filter_map(|caps| caps.get(1))
        .flat_map(|m| index.resolve(m.as_str()));
    declared.chain(scanned).cloned().collect()
}

/// Build every cross-dataset association for one run.
pub fn correlate(bundle: &FactBundle) -> Correlation {
    let index = TableIndex::new(&bundle.tables);

    let mut files: BTreeMap<String, FileFact> = BTreeMap::new();
    for record in &bundle.files {
        let name = basename(&record.path);
        if name.is_empty() {
            continue;
        }
        let fact = files
            .entry(name.clone())
            .or_insert_with(|| FileFact::new(name));
        fact.metrics += FileMetrics {
            lines: record.lines,
            complexity: record.complexity,
            functions: record.functions.len(),
            security_issues: record.security_issue_count,
        };
        fact.has_database |= record.has_database;
        fact.tables.extend(tables_of(record, &index));
    }

    let mut routes = Vec::new();
    let mut route_to_file = BTreeMap::new();
    for record in &bundle.routes {
        let target = basename(&record.target);
        if target.is_empty() {
            continue;
        }
        let route = RouteFact {
            method: record.method.clone(),
            path: record.path.clone(),
            target_file: target.clone(),
            auth: record.auth,
        };
        let key = route.key();
        files
            .entry(target.clone())
            .or_insert_with(|| FileFact::new(target.clone()))
            .routes
            .push(key.clone());
        route_to_file.insert(key, target);
        routes.push(route);
    }

    // The detailed findings list can be more complete than the inline counts,
    // and also covers files known only from routes.
    let mut detailed: BTreeMap<&str, usize> = BTreeMap::new();
    for finding in &bundle.findings {
        *detailed.entry(finding.file.as_str()).or_default() += 1;
    }
    for (file, count) in detailed {
        if let Some(fact) = files.get_mut(file) {
            fact.metrics.security_issues = fact.metrics.security_issues.max(count);
        }
    }

    let mut table_to_files: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for fact in files.values() {
        for table in &fact.tables {
            table_to_files
                .entry(table.clone())
                .or_default()
                .insert(fact.name.clone());
        }
    }

    debug!(
        "Correlated {} files, {} routes, {} tables in use",
        files.len(),
        route_to_file.len(),
        table_to_files.len()
    );

    Correlation {
        files,
        routes,
        route_to_file,
        table_to_files,
        known_tables: bundle.tables.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SecurityFinding, Severity};
    use crate::io::loader::{
        FunctionRecord, InputStatus, InputStatuses, RouteRecord, ServiceHints,
    };
    use std::path::PathBuf;

    fn bundle(files: Vec<FileRecord>, routes: Vec<RouteRecord>, tables: &[&str]) -> FactBundle {
        FactBundle {
            root: PathBuf::from("."),
            files,
            findings: Vec::new(),
            routes,
            tables: tables.iter().map(|t| t.to_string()).collect(),
            service_hints: ServiceHints::default(),
            statuses: InputStatuses {
                routes: InputStatus::Loaded,
                schema: InputStatus::Loaded,
                service_hints: InputStatus::Missing,
            },
        }
    }

    fn file(path: &str, sql: &[&str]) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            lines: 10,
            complexity: 2,
            sql: sql.iter().map(|s| s.to_string()).collect(),
            ..FileRecord::default()
        }
    }

    fn route(method: &str, path: &str, target: &str) -> RouteRecord {
        RouteRecord {
            method: method.to_string(),
            path: path.to_string(),
            target: target.to_string(),
            auth: None,
        }
    }

    #[test]
    fn test_sql_scan_matches_known_tables_only() {
        let b = bundle(
            vec![file(
                "app/orders.php",
                &[
                    "SELECT * FROM `Orders` o JOIN order_items i ON i.order_id = o.id",
                    "insert into audit_log values (1)",
                    "UPDATE 'users' SET name = ?",
                    "delete from carts where id = 1",
                ],
            )],
            vec![],
            &["orders", "order_items", "users", "carts"],
        );
        let c = correlate(&b);
        let tables: Vec<&str> = c.files["orders.php"].tables.iter().map(String::as_str).collect();
        assert_eq!(tables, vec!["carts", "order_items", "orders", "users"]);
        assert!(!c.table_to_files.contains_key("audit_log"));
    }

    #[test]
    fn test_function_sql_and_declared_tables() {
        let mut record = file("a.php", &[]);
        record.functions = vec![FunctionRecord {
            name: "load".into(),
            sql: vec!["select id from products".into()],
        }];
        record.declared_tables = vec!["categories".into(), "ghost".into()];
        let c = correlate(&bundle(vec![record], vec![], &["products", "categories"]));
        assert_eq!(c.files["a.php"].tables.len(), 2);
        assert_eq!(c.files["a.php"].metrics.functions, 1);
    }

    #[test]
    fn test_no_schema_means_no_tables() {
        let c = correlate(&bundle(vec![file("a.php", &["SELECT * FROM users"])], vec![], &[]));
        assert!(c.files["a.php"].tables.is_empty());
        assert!(c.table_to_files.is_empty());
    }

    #[test]
    fn test_same_basename_records_merge() {
        let c = correlate(&bundle(
            vec![
                file("admin/index.php", &["SELECT * FROM users"]),
                file("shop/index.php", &["SELECT * FROM products"]),
            ],
            vec![],
            &["users", "products"],
        ));
        let fact = &c.files["index.php"];
        assert_eq!(fact.metrics.lines, 20);
        assert_eq!(fact.metrics.complexity, 4);
        assert_eq!(fact.tables.len(), 2);
    }

    #[test]
    fn test_routes_attach_to_files_and_create_route_only_files() {
        let c = correlate(&bundle(
            vec![file("users.php", &[])],
            vec![
                route("GET", "/users", "src/users.php"),
                route("POST", "/users", "users.php"),
                route("GET", "/health", "health.php"),
                route("GET", "/nowhere", ""),
            ],
            &[],
        ));
        assert_eq!(c.files["users.php"].routes, vec!["GET /users", "POST /users"]);
        assert_eq!(c.files["health.php"].metrics, FileMetrics::default());
        assert_eq!(c.route_to_file.len(), 3);
        assert_eq!(c.routes.len(), 3);
        assert_eq!(c.stats().route_to_file_count, 3);
    }

    #[test]
    fn test_security_count_takes_larger_source() {
        let mut record = file("a.php", &[]);
        record.security_issue_count = 1;
        let mut b = bundle(vec![record, file("b.php", &[])], vec![], &[]);
        b.findings = (0..3)
            .map(|_| SecurityFinding {
                file: "a.php".into(),
                kind: "xss".into(),
                severity: Severity::High,
            })
            .collect();
        b.findings.push(SecurityFinding {
            file: "elsewhere.php".into(),
            kind: "xss".into(),
            severity: Severity::Low,
        });
        let c = correlate(&b);
        assert_eq!(c.files["a.php"].metrics.security_issues, 3);
        assert_eq!(c.files["b.php"].metrics.security_issues, 0);
        assert!(!c.files.contains_key("elsewhere.php"));
    }

    #[test]
    fn test_route_only_file_counts_detailed_findings() {
        let mut b = bundle(vec![], vec![route("GET", "/login", "src/login.php")], &[]);
        b.findings = vec![
            SecurityFinding {
                file: "login.php".into(),
                kind: "sql_injection".into(),
                severity: Severity::Critical,
            },
            SecurityFinding {
                file: "login.php".into(),
                kind: "xss".into(),
                severity: Severity::Medium,
            },
        ];
        let c = correlate(&b);
        assert_eq!(c.files["login.php"].metrics.security_issues, 2);
        assert_eq!(c.files["login.php"].routes, vec!["GET /login"]);
    }

    #[test]
    fn test_samples_and_unreferenced() {
        let c = correlate(&bundle(
            vec![file("a.php", &["SELECT * FROM users"]), file("lonely.php", &[])],
            vec![route("GET", "/a", "a.php")],
            &["users"],
        ));
        let samples = c.samples(5);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].tables, vec!["users"]);
        assert_eq!(c.unreferenced_files(), vec!["lonely.php"]);
    }

    #[test]
    fn test_table_facts_list_accessing_files() {
        let c = correlate(&bundle(
            vec![
                file("a.php", &["SELECT * FROM users JOIN orders"]),
                file("b.php", &["UPDATE users SET x = 1"]),
            ],
            vec![],
            &["users", "orders", "unused"],
        ));
        let facts = c.table_facts();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].name, "orders");
        assert_eq!(facts[1].files.len(), 2);
        assert_eq!(c.stats().tables_with_file_access, 2);
    }
}
