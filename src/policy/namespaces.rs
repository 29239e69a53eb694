use regex::Regex;
use serde::{Deserialize, Serialize};

/// Namespace patterns a policy layer enables.
///
/// Patterns are regular expressions anchored at both ends; `all` is accepted
/// as a synonym for `.*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Namespaces {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Whether `pattern` matches `namespace`. An invalid pattern yields
/// `on_invalid`, so a broken exclude still excludes.
fn matches(pattern: &str, namespace: &str, on_invalid: bool) -> bool {
    if pattern == "all" {
        return true;
    }
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(re) => re.is_match(namespace),
        Err(e) => {
            log::warn!("invalid namespace pattern {pattern:?}: {e}");
            on_invalid
        }
    }
}

impl Namespaces {
    pub fn is_allowed(&self, namespace: &str) -> bool {
        self.include.iter().any(|p| matches(p, namespace, false))
            && !self.exclude.iter().any(|p| matches(p, namespace, true))
    }

    /// Whether cluster-wide queries (`--all-namespaces`) are permitted.
    pub fn allows_all(&self) -> bool {
        self.exclude.is_empty() && self.include.iter().any(|p| p == ".*" || p == "all")
    }
}
