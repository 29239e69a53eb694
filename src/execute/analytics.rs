//! Strips user data from commands before they are reported.
//!
//! Only the feature used survives: for kubectl the verb and canonical
//! resource types. Names, namespaces, labels and flag values never leave.

use crate::parse::kubectl_args;
use crate::policy::CommandGuard;

use super::router::{BUILDER_TRIGGER, Route};

/// Reported for anything the bot did not understand.
pub const INVALID_FEATURE: &str = "{invalid feature}";

const NOTIFIER_SUBCOMMANDS: &[&str] = &["start", "stop", "status"];
const FILTERS_SUBCOMMANDS: &[&str] = &["list", "enable", "disable"];

fn known_subcommand(rest: &[String], known: &[&str]) -> Option<String> {
    let sub = rest.first()?.to_lowercase();
    known.contains(&sub.as_str()).then_some(sub)
}

fn anonymize_kubectl(
    keyword: &str,
    rest: &[String],
    guard: &dyn CommandGuard,
    is_known_verb: &dyn Fn(&str) -> bool,
) -> String {
    let args = kubectl_args(rest);
    if args.verb.is_empty() {
        return keyword.to_string();
    }
    if !is_known_verb(&args.verb) {
        return format!("{keyword} {INVALID_FEATURE}");
    }
    let mut out = format!("{keyword} {}", args.verb);
    if let Some((types, _)) = args.resource_spec() {
        let known: Vec<String> = types
            .iter()
            .filter_map(|t| guard.resource_details(&args.verb, t).ok())
            .map(|r| r.name)
            .collect();
        if !known.is_empty() {
            out.push(' ');
            out.push_str(&known.join(","));
        }
    }
    out
}

/// Anonymized form of a routed command.
pub fn anonymize(
    route: Route,
    rest: &[String],
    guard: &dyn CommandGuard,
    is_known_verb: &dyn Fn(&str) -> bool,
) -> String {
    match route {
        Route::Kubectl => anonymize_kubectl("kubectl", rest, guard, is_known_verb),
        Route::Builder => anonymize_kubectl(BUILDER_TRIGGER, rest, guard, is_known_verb),
        Route::Notifier => match known_subcommand(rest, NOTIFIER_SUBCOMMANDS) {
            Some(sub) => format!("notifier {sub}"),
            None => "notifier".into(),
        },
        Route::Filters => match known_subcommand(rest, FILTERS_SUBCOMMANDS) {
            Some(sub) => format!("filters {sub}"),
            None => "filters".into(),
        },
        Route::EditSourceBindings => "edit SourceBindings".into(),
        Route::Edit => format!("edit {INVALID_FEATURE}"),
        Route::CommandsList => "commands list".into(),
        Route::Ping => "ping".into(),
        Route::Help => "help".into(),
        Route::Unknown => INVALID_FEATURE.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::parse::tokenize;
    use crate::policy::CatalogGuard;

    fn anon(route: Route, rest: &str) -> String {
        let config = Config::default_config();
        let guard = CatalogGuard::from_config(&config);
        let known = |v: &str| config.kubectl.known_verbs.iter().any(|k| k == v);
        anonymize(route, &tokenize(rest), &guard, &known)
    }

    #[test]
    fn kubectl_keeps_verb_and_type_only() {
        assert_eq!(
            anon(Route::Kubectl, "get po secret-pod -n payments -l team=x"),
            "kubectl get pods"
        );
    }

    #[test]
    fn kubectl_unknown_resource_dropped() {
        assert_eq!(anon(Route::Kubectl, "get customerdata"), "kubectl get");
    }

    #[test]
    fn kubectl_unknown_verb() {
        assert_eq!(anon(Route::Kubectl, "rm -rf"), "kubectl {invalid feature}");
    }

    #[test]
    fn builder() {
        assert_eq!(anon(Route::Builder, ""), "kc-cmd-builder");
        assert_eq!(
            anon(Route::Builder, "describe deploy api -n web"),
            "kc-cmd-builder describe deployments"
        );
    }

    #[test]
    fn filters_drop_names() {
        assert_eq!(anon(Route::Filters, "enable my-secret-filter"), "filters enable");
    }

    #[test]
    fn notifier() {
        assert_eq!(anon(Route::Notifier, "START"), "notifier start");
        assert_eq!(anon(Route::Notifier, "whatever"), "notifier");
    }

    #[test]
    fn unknown() {
        assert_eq!(anon(Route::Unknown, "tell me a secret"), INVALID_FEATURE);
    }
}
