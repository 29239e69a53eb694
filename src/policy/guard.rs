//! Verb/resource filter consulted before anything is offered or executed.

use thiserror::Error;

use crate::config::{Config, ResourceConfig};

/// One addressable resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub aliases: Vec<String>,
    pub namespaced: bool,
    pub verbs: Vec<String>,
}

impl Resource {
    /// Whether `name` is this resource's canonical name or one of its aliases.
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    pub fn supports(&self, verb: &str) -> bool {
        self.verbs.iter().any(|v| v == verb)
    }
}

impl From<&ResourceConfig> for Resource {
    fn from(c: &ResourceConfig) -> Self {
        Self {
            name: c.name.clone(),
            aliases: c.aliases.clone(),
            namespaced: c.namespaced,
            verbs: c.verbs.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("{0:?} is not a supported kubectl verb")]
    UnsupportedVerb(String),
    #[error("unknown resource type {0:?}")]
    UnknownResource(String),
    #[error("resource {resource:?} does not support verb {verb:?}")]
    VerbNotSupported { verb: String, resource: String },
}

/// Answers which verbs and resources may be offered.
///
/// Implementations are pure reads: they never touch the cluster and never
/// execute anything.
pub trait CommandGuard: Send + Sync {
    /// The candidates that support `verb`, in input order.
    fn allowed_resources_for_verb(
        &self,
        verb: &str,
        candidates: &[String],
    ) -> Result<Vec<Resource>, GuardError>;

    /// Resolve a resource by name or alias and check it supports `verb`.
    fn resource_details(&self, verb: &str, resource_type: &str) -> Result<Resource, GuardError>;

    /// The candidates the interactive builder knows how to present.
    fn supported_verbs(&self, candidates: &[String]) -> Vec<String>;
}

/// Guard backed by the resource catalogue from configuration.
#[derive(Debug, Clone)]
pub struct CatalogGuard {
    resources: Vec<Resource>,
    known_verbs: Vec<String>,
    interactive_verbs: Vec<String>,
}

impl CatalogGuard {
    pub fn from_config(config: &Config) -> Self {
        Self {
            resources: config.resources.iter().map(Resource::from).collect(),
            known_verbs: config.kubectl.known_verbs.clone(),
            interactive_verbs: config.kubectl.interactive_verbs.clone(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.matches(name))
    }

    fn is_known_verb(&self, verb: &str) -> bool {
        self.known_verbs.iter().any(|v| v == verb)
    }
}

impl CommandGuard for CatalogGuard {
    fn allowed_resources_for_verb(
        &self,
        verb: &str,
        candidates: &[String],
    ) -> Result<Vec<Resource>, GuardError> {
        if !self.is_known_verb(verb) {
            return Err(GuardError::UnsupportedVerb(verb.to_string()));
        }
        let mut out: Vec<Resource> = Vec::new();
        for name in candidates {
            let Some(res) = self.lookup(name) else {
                log::debug!("resource {name:?} is not in the catalogue");
                continue;
            };
            // An alias and the canonical name may both be listed
            if res.supports(verb) && !out.iter().any(|r| r.name == res.name) {
                out.push(res.clone());
            }
        }
        Ok(out)
    }

    fn resource_details(&self, verb: &str, resource_type: &str) -> Result<Resource, GuardError> {
        let res = self
            .lookup(resource_type)
            .ok_or_else(|| GuardError::UnknownResource(resource_type.to_string()))?;
        if !res.supports(verb) {
            return Err(GuardError::VerbNotSupported {
                verb: verb.to_string(),
                resource: res.name.clone(),
            });
        }
        Ok(res.clone())
    }

    fn supported_verbs(&self, candidates: &[String]) -> Vec<String> {
        candidates
            .iter()
            .filter(|v| self.interactive_verbs.contains(v))
            .cloned()
            .collect()
    }
}
