//! Hardcoded naming and dependency heuristics, expressed as data.
//!
//! None of these tables are derived from the analysed code base. The
//! dependency rules in particular are placeholders ("orders need users")
//! that a project is expected to tune in `.archsynth.toml`.

use serde::{Deserialize, Serialize};

/// One keyword of the domain vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainKeyword {
    pub keyword: String,
    pub domain: String,
}

impl DomainKeyword {
    fn new(keyword: &str, domain: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            domain: domain.to_string(),
        }
    }
}

/// Ordered keyword -> canonical domain lookup. The first keyword contained in
/// a cluster name wins, so more specific keywords must come first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainVocabulary {
    #[serde(default = "default_strip_suffixes")]
    pub strip_suffixes: Vec<String>,

    #[serde(default = "default_keywords")]
    pub keywords: Vec<DomainKeyword>,
}

impl Default for DomainVocabulary {
    fn default() -> Self {
        Self {
            strip_suffixes: default_strip_suffixes(),
            keywords: default_keywords(),
        }
    }
}

impl DomainVocabulary {
    /// Canonical module name for a raw cluster name.
    pub fn normalize(&self, raw: &str) -> String {
        let mut name = raw.to_lowercase().replace('-', "_");
        for suffix in &self.strip_suffixes {
            let suffix = suffix.to_lowercase();
            if !suffix.is_empty() {
                name = name.replace(&suffix, "");
            }
        }

        self.keywords
            .iter()
            .find(|entry| !entry.keyword.is_empty() && name.contains(&entry.keyword))
            .map(|entry| entry.domain.clone())
            .unwrap_or(name)
    }
}

fn default_strip_suffixes() -> Vec<String> {
    vec![".php".to_string()]
}

fn default_keywords() -> Vec<DomainKeyword> {
    [
        ("user", "users"),
        ("users", "users"),
        ("auth", "auth"),
        ("login", "auth"),
        ("session", "auth"),
        // "notification" contains "cat"
        ("notification", "notifications"),
        ("notifications", "notifications"),
        ("push", "notifications"),
        ("mail", "notifications"),
        ("email", "notifications"),
        // "order_items" must not land in products
        ("order", "orders"),
        ("orders", "orders"),
        ("cart", "cart"),
        ("basket", "cart"),
        ("payment", "payments"),
        ("payments", "payments"),
        ("pay", "payments"),
        ("product", "products"),
        ("products", "products"),
        ("item", "products"),
        ("items", "products"),
        ("category", "categories"),
        ("categories", "categories"),
        ("cat", "categories"),
        ("search", "search"),
        ("config", "config"),
        ("settings", "config"),
    ]
    .into_iter()
    .map(|(keyword, domain)| DomainKeyword::new(keyword, domain))
    .collect()
}

/// A module whose name is in `dependents` depends on `provider` whenever the
/// two share a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRule {
    pub dependents: Vec<String>,
    pub provider: String,
}

impl DependencyRule {
    pub fn applies(&self, module: &str, other: &str) -> bool {
        self.provider == other && self.dependents.iter().any(|d| d == module)
    }
}

pub fn default_dependency_rules() -> Vec<DependencyRule> {
    vec![
        DependencyRule {
            dependents: vec!["orders".into(), "cart".into(), "payments".into()],
            provider: "users".into(),
        },
        DependencyRule {
            dependents: vec!["orders".into(), "cart".into()],
            provider: "products".into(),
        },
    ]
}

/// Migration ordering preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOrderConfig {
    /// Modules in this list get their index as priority
    #[serde(default = "default_canonical_sequence")]
    pub canonical_sequence: Vec<String>,

    /// Everything else gets this base plus its complexity score
    #[serde(default = "default_unknown_base_priority")]
    pub unknown_base_priority: usize,
}

impl Default for MigrationOrderConfig {
    fn default() -> Self {
        Self {
            canonical_sequence: default_canonical_sequence(),
            unknown_base_priority: default_unknown_base_priority(),
        }
    }
}

impl MigrationOrderConfig {
    pub fn priority_of(&self, module: &str, complexity: usize) -> usize {
        self.canonical_sequence
            .iter()
            .position(|name| name == module)
            .unwrap_or(self.unknown_base_priority + complexity)
    }
}

fn default_canonical_sequence() -> Vec<String> {
    [
        "config",
        "health",
        "auth",
        "users",
        "products",
        "categories",
        "search",
        "cart",
        "orders",
        "payments",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_unknown_base_priority() -> usize {
    100
}
