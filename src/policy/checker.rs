//! Execution-time authority for kubectl commands.
//!
//! The guard decides what the builder offers; the checker decides what runs.
//! A typed command and a builder `Run command` click both pass through here.

use crate::config::KubectlConfig;
use crate::execute::ExecError;
use crate::parse::KubectlArgs;

use super::{CommandGuard, EffectivePolicy, GuardError, Resource};

/// Flags that would point kubectl at other credentials or another cluster.
const FORBIDDEN_FLAGS: &[&str] = &[
    "--kubeconfig",
    "--context",
    "--cluster",
    "--user",
    "-s",
    "--server",
    "--token",
    "--as",
    "--as-group",
    "--certificate-authority",
    "--client-certificate",
    "--client-key",
    "--insecure-skip-tls-verify",
];

/// Verbs whose first positional may be a bare pod name.
const POD_VERBS: &[&str] = &["logs", "exec", "attach", "port-forward"];

/// Fallback when no policy layer sets a default namespace.
pub const FALLBACK_NAMESPACE: &str = "default";

/// Outcome of a successful check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedCommand {
    pub resources: Vec<Resource>,
    /// Namespace to add because the command did not name one.
    pub default_namespace: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Checker {
    known_verbs: Vec<String>,
    resourceless_verbs: Vec<String>,
}

impl Checker {
    pub fn from_config(config: &KubectlConfig) -> Self {
        Self {
            known_verbs: config.known_verbs.clone(),
            resourceless_verbs: config.resourceless_verbs.clone(),
        }
    }

    pub fn is_known_verb(&self, verb: &str) -> bool {
        self.known_verbs.iter().any(|v| v == verb)
    }

    pub fn is_resourceless(&self, verb: &str) -> bool {
        self.resourceless_verbs.iter().any(|v| v == verb)
    }

    /// Check a parsed command against the merged policy.
    ///
    /// `authenticated` is the conversation flag; it matters only when the
    /// policy restricts access.
    pub fn check(
        &self,
        cmd: &KubectlArgs,
        policy: &EffectivePolicy,
        authenticated: bool,
        guard: &dyn CommandGuard,
    ) -> Result<CheckedCommand, ExecError> {
        let verb = cmd.verb.as_str();
        if !self.is_known_verb(verb) {
            return Err(GuardError::UnsupportedVerb(verb.to_string()).into());
        }
        if !policy.enabled {
            return Err(ExecError::PermissionDenied(
                "kubectl is not enabled in this channel".into(),
            ));
        }
        if policy.restrict_access && !authenticated {
            return Err(ExecError::PermissionDenied(
                "kubectl is restricted to authorized channels".into(),
            ));
        }
        if let Some(flag) = cmd
            .flags
            .iter()
            .find(|f| FORBIDDEN_FLAGS.contains(&f.as_str()))
        {
            return Err(ExecError::PermissionDenied(format!(
                "the {flag} flag cannot be used"
            )));
        }
        if !policy.allows_verb(verb) {
            return Err(ExecError::PermissionDenied(format!(
                "verb {verb:?} is not enabled"
            )));
        }

        let resources = if self.is_resourceless(verb) {
            Vec::new()
        } else {
            self.check_resources(cmd, policy, guard)?
        };

        let namespaced = resources.iter().any(|r| r.namespaced);
        let default_namespace = self.check_namespace(cmd, policy, namespaced)?;

        Ok(CheckedCommand {
            resources,
            default_namespace,
        })
    }

    fn check_resources(
        &self,
        cmd: &KubectlArgs,
        policy: &EffectivePolicy,
        guard: &dyn CommandGuard,
    ) -> Result<Vec<Resource>, ExecError> {
        let verb = cmd.verb.as_str();
        let Some((types, _name)) = cmd.resource_spec() else {
            return Err(ExecError::PermissionDenied(format!(
                "`kubectl {verb}` needs a resource type"
            )));
        };

        let mut out = Vec::new();
        for ty in &types {
            let res = match guard.resource_details(verb, ty) {
                Ok(res) => res,
                // `kubectl logs my-pod`: the positional is a pod name
                Err(GuardError::UnknownResource(_)) if POD_VERBS.contains(&verb) => {
                    guard.resource_details(verb, "pods")?
                }
                Err(e) => return Err(e.into()),
            };
            if !policy.allows_resource(&res) {
                return Err(ExecError::PermissionDenied(format!(
                    "resource {:?} is not enabled",
                    res.name
                )));
            }
            out.push(res);
        }
        Ok(out)
    }

    fn check_namespace(
        &self,
        cmd: &KubectlArgs,
        policy: &EffectivePolicy,
        namespaced: bool,
    ) -> Result<Option<String>, ExecError> {
        if cmd.all_namespaces {
            if !policy.namespaces.allows_all() {
                return Err(ExecError::PermissionDenied(
                    "querying all namespaces is not enabled".into(),
                ));
            }
            return Ok(None);
        }
        if let Some(ns) = &cmd.namespace {
            if !policy.allows_namespace(ns) {
                return Err(ExecError::PermissionDenied(format!(
                    "namespace {ns:?} is not enabled"
                )));
            }
            return Ok(None);
        }
        if !namespaced {
            return Ok(None);
        }
        let ns = policy
            .default_namespace
            .clone()
            .unwrap_or_else(|| FALLBACK_NAMESPACE.to_string());
        if !policy.allows_namespace(&ns) {
            return Err(ExecError::PermissionDenied(format!(
                "namespace {ns:?} is not enabled"
            )));
        }
        Ok(Some(ns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::parse::{kubectl_args, tokenize};
    use crate::policy::{CatalogGuard, Namespaces};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn policy() -> EffectivePolicy {
        EffectivePolicy {
            enabled: true,
            verbs: strings(&["get", "describe", "logs", "cluster-info"]),
            resources: strings(&["pods", "deployments", "nodes"]),
            namespaces: Namespaces {
                include: strings(&[".*"]),
                exclude: strings(&["kube-system"]),
            },
            default_namespace: Some("team-a".into()),
            restrict_access: false,
        }
    }

    fn check_with(cmd: &str, policy: &EffectivePolicy, auth: bool) -> Result<CheckedCommand, ExecError> {
        let config = Config::default_config();
        let checker = Checker::from_config(&config.kubectl);
        let guard = CatalogGuard::from_config(&config);
        checker.check(&kubectl_args(&tokenize(cmd)), policy, auth, &guard)
    }

    fn check(cmd: &str) -> Result<CheckedCommand, ExecError> {
        check_with(cmd, &policy(), false)
    }

    #[test]
    fn allowed_get_adds_default_namespace() {
        let c = check("get pods").unwrap();
        assert_eq!(c.default_namespace.as_deref(), Some("team-a"));
        assert_eq!(c.resources[0].name, "pods");
    }

    #[test]
    fn explicit_namespace_is_kept() {
        let c = check("get po -n web").unwrap();
        assert_eq!(c.default_namespace, None);
    }

    #[test]
    fn cluster_scoped_has_no_namespace() {
        assert_eq!(check("get nodes").unwrap().default_namespace, None);
    }

    #[test]
    fn resourceless_verb() {
        assert!(check("cluster-info").unwrap().resources.is_empty());
    }

    #[test]
    fn unknown_verb() {
        assert!(matches!(
            check("frobnicate pods"),
            Err(ExecError::Guard(GuardError::UnsupportedVerb(_)))
        ));
    }

    #[test]
    fn verb_not_in_policy() {
        assert!(matches!(
            check("delete pods nginx"),
            Err(ExecError::PermissionDenied(_))
        ));
    }

    #[test]
    fn resource_not_in_policy() {
        assert!(matches!(
            check("get services"),
            Err(ExecError::PermissionDenied(_))
        ));
    }

    #[test]
    fn one_of_several_resources_denied() {
        assert!(check("get pods,services").is_err());
    }

    #[test]
    fn excluded_namespace() {
        assert!(check("get pods -n kube-system").is_err());
    }

    #[test]
    fn all_namespaces_needs_unrestricted_policy() {
        assert!(check("get pods -A").is_err());
        let mut open = policy();
        open.namespaces.exclude.clear();
        assert!(check_with("get pods -A", &open, false).is_ok());
    }

    #[test]
    fn logs_with_bare_pod_name() {
        let c = check("logs nginx-123").unwrap();
        assert_eq!(c.resources[0].name, "pods");
    }

    #[test]
    fn forbidden_flag() {
        assert!(matches!(
            check("get pods --kubeconfig=/tmp/other"),
            Err(ExecError::PermissionDenied(_))
        ));
    }

    #[test]
    fn combined_short_flags_are_checked() {
        assert!(matches!(
            check("get pods -Ao wide"),
            Err(ExecError::PermissionDenied(_))
        ));
        assert!(matches!(
            check("get pods -nkube-system"),
            Err(ExecError::PermissionDenied(_))
        ));
        assert!(matches!(
            check("get pods -shttps://evil.example"),
            Err(ExecError::PermissionDenied(_))
        ));
        assert_eq!(check("get pods -nweb").unwrap().default_namespace, None);
    }

    #[test]
    fn missing_resource_type() {
        assert!(check("get").is_err());
    }

    #[test]
    fn restricted_policy_needs_authenticated_conversation() {
        let mut p = policy();
        p.restrict_access = true;
        assert!(check_with("get pods", &p, false).is_err());
        assert!(check_with("get pods", &p, true).is_ok());
    }

    #[test]
    fn disabled_policy_denies() {
        let mut p = policy();
        p.enabled = false;
        assert!(matches!(
            check_with("get pods", &p, true),
            Err(ExecError::PermissionDenied(_))
        ));
    }
}
