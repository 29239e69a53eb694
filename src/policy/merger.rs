//! Folds the policy layers bound to a conversation into one effective policy.
//!
//! Layers are applied in binding order. A field set by a layer replaces
//! whatever earlier layers set; a field no layer sets keeps its zero value,
//! which always means "disabled" or "nothing allowed".

use std::collections::BTreeMap;

use crate::config::{ExecutorConfig, KubectlFragment};

use super::{Namespaces, Resource};

/// Flattened kubectl policy for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePolicy {
    pub enabled: bool,
    pub verbs: Vec<String>,
    pub resources: Vec<String>,
    pub namespaces: Namespaces,
    pub default_namespace: Option<String>,
    /// Restrict execution to authenticated conversations.
    pub restrict_access: bool,
}

impl EffectivePolicy {
    pub fn allows_verb(&self, verb: &str) -> bool {
        self.enabled && self.verbs.iter().any(|v| v == verb)
    }

    /// Whether the policy lists the resource by its name or one of its aliases.
    pub fn allows_resource(&self, resource: &Resource) -> bool {
        self.enabled && self.resources.iter().any(|r| resource.matches(r))
    }

    pub fn allows_namespace(&self, namespace: &str) -> bool {
        self.enabled && self.namespaces.is_allowed(namespace)
    }
}

impl From<KubectlFragment> for EffectivePolicy {
    fn from(f: KubectlFragment) -> Self {
        Self {
            enabled: f.enabled.unwrap_or(false),
            verbs: f.verbs.unwrap_or_default(),
            resources: f.resources.unwrap_or_default(),
            namespaces: f.namespaces.unwrap_or_default(),
            default_namespace: f.default_namespace.filter(|ns| !ns.is_empty()),
            restrict_access: f.restrict_access.unwrap_or(false),
        }
    }
}

/// Fold the fragments named in `order`, keeping the tri-state of every field.
///
/// Names without a fragment are skipped.
pub fn merge_fragments(
    fragments: &BTreeMap<String, ExecutorConfig>,
    order: &[String],
) -> KubectlFragment {
    let mut acc = KubectlFragment::default();
    for name in order {
        let Some(exec) = fragments.get(name) else {
            log::debug!("binding {name:?} has no executor config, skipping");
            continue;
        };
        let layer = &exec.kubectl;
        if let Some(v) = layer.enabled {
            acc.enabled = Some(v);
        }
        if let Some(v) = &layer.verbs {
            acc.verbs = Some(v.clone());
        }
        if let Some(v) = &layer.resources {
            acc.resources = Some(v.clone());
        }
        if let Some(v) = &layer.namespaces {
            acc.namespaces = Some(v.clone());
        }
        if let Some(v) = &layer.default_namespace {
            acc.default_namespace = Some(v.clone());
        }
        if let Some(v) = layer.restrict_access {
            acc.restrict_access = Some(v);
        }
    }
    acc
}

/// Effective policy for the given binding order.
pub fn merge(fragments: &BTreeMap<String, ExecutorConfig>, order: &[String]) -> EffectivePolicy {
    merge_fragments(fragments, order).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(f: KubectlFragment) -> ExecutorConfig {
        ExecutorConfig { kubectl: f }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn fragments() -> BTreeMap<String, ExecutorConfig> {
        let mut m = BTreeMap::new();
        m.insert(
            "base".into(),
            layer(KubectlFragment {
                enabled: Some(true),
                verbs: Some(strings(&["get", "describe"])),
                resources: Some(strings(&["pods"])),
                default_namespace: Some("default".into()),
                ..KubectlFragment::default()
            }),
        );
        m.insert(
            "ops".into(),
            layer(KubectlFragment {
                verbs: Some(strings(&["get", "logs"])),
                restrict_access: Some(true),
                ..KubectlFragment::default()
            }),
        );
        m.insert(
            "off".into(),
            layer(KubectlFragment {
                enabled: Some(false),
                ..KubectlFragment::default()
            }),
        );
        m
    }

    #[test]
    fn later_layer_overrides_set_fields_only() {
        let p = merge(&fragments(), &strings(&["base", "ops"]));
        assert!(p.enabled);
        assert_eq!(p.verbs, strings(&["get", "logs"]));
        // inherited from base
        assert_eq!(p.resources, strings(&["pods"]));
        assert_eq!(p.default_namespace.as_deref(), Some("default"));
        assert!(p.restrict_access);
    }

    #[test]
    fn order_decides_conflicts() {
        let p = merge(&fragments(), &strings(&["ops", "base"]));
        assert_eq!(p.verbs, strings(&["get", "describe"]));
        // restrict_access only set by ops, so order does not matter for it
        assert!(p.restrict_access);
    }

    #[test]
    fn explicit_false_disables() {
        let p = merge(&fragments(), &strings(&["base", "off"]));
        assert!(!p.enabled);
        assert!(!p.allows_verb("get"));
    }

    #[test]
    fn unset_everywhere_is_zero_value() {
        let p = merge(&fragments(), &strings(&["ops"]));
        assert!(!p.enabled);
        assert!(p.resources.is_empty());
        assert_eq!(p.namespaces, Namespaces::default());
        assert_eq!(p.default_namespace, None);
    }

    #[test]
    fn unknown_bindings_are_skipped() {
        let with_unknown = merge(&fragments(), &strings(&["missing", "base", "nope"]));
        let plain = merge(&fragments(), &strings(&["base"]));
        assert_eq!(with_unknown, plain);
    }

    #[test]
    fn no_bindings_is_disabled() {
        assert_eq!(merge(&fragments(), &[]), EffectivePolicy::default());
    }

    #[test]
    fn merge_fragments_keeps_tri_state() {
        let f = merge_fragments(&fragments(), &strings(&["ops"]));
        assert_eq!(f.enabled, None);
        assert_eq!(f.restrict_access, Some(true));
    }

    #[test]
    fn each_field_is_last_set_value() {
        let all = fragments();
        let orders = [
            strings(&["base", "ops", "off"]),
            strings(&["off", "ops", "base"]),
            strings(&["ops", "off", "base"]),
            strings(&["base", "off", "ops"]),
        ];
        for order in &orders {
            let merged = merge_fragments(&all, order);
            let last_enabled = order
                .iter()
                .filter_map(|n| all[n].kubectl.enabled)
                .next_back();
            let last_verbs = order
                .iter()
                .filter_map(|n| all[n].kubectl.verbs.clone())
                .next_back();
            assert_eq!(merged.enabled, last_enabled, "{order:?}");
            assert_eq!(merged.verbs, last_verbs, "{order:?}");
        }
    }
}
