//! Interactive kubectl command builder.
//!
//! The builder holds no state between messages. Every button it emits
//! carries the complete builder command so far plus one more choice, e.g.
//!
//! ```text
//! kc-cmd-builder
//! kc-cmd-builder get
//! kc-cmd-builder get pods
//! kc-cmd-builder get pods -n default
//! kc-cmd-builder get pods nginx -n default
//! ```
//!
//! Verbs that act on one object, such as `logs`, only become runnable once a
//! name is chosen and render it as `type/name`.
//!
//! and each of those strings is parsed from scratch, so typing one by hand
//! lands on exactly the same step as clicking through. Every step re-checks
//! the choices made so far against the current policy.

use crate::message::{
    Base, Body, Button, ButtonBuilder, ButtonStyle, Message, RUN_COMMAND_NAME, Section,
};
use crate::parse::kubectl_args;
use crate::policy::checker::FALLBACK_NAMESPACE;
use crate::policy::{CommandGuard, EffectivePolicy, Resource};

use super::router::BUILDER_TRIGGER;
use super::{ExecError, NamespaceLister};

/// Upper bound on the choices offered in one step.
pub const MAX_OPTIONS: usize = 25;

/// Verbs whose command is only valid for a single named object.
const OBJECT_VERBS: &[&str] = &["logs"];

fn needs_object(verb: &str) -> bool {
    OBJECT_VERBS.contains(&verb)
}

/// Where a builder command stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Offer verbs.
    Start,
    /// Offer resource types.
    VerbChosen,
    /// Offer namespaces.
    ResourceTypeChosen,
    /// Offer object names; the verb cannot run without one.
    NameRequired,
    Ready,
}

/// Everything the builder knows, recovered from the command text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuilderState {
    pub verb: Option<String>,
    pub resource_type: Option<String>,
    pub resource_name: Option<String>,
    pub namespace: Option<String>,
}

impl BuilderState {
    /// Parse the words after the builder keyword.
    pub fn parse(args: &[String]) -> Result<Self, ExecError> {
        let parsed = kubectl_args(args);
        let stray_flag = parsed
            .flags
            .iter()
            .find(|f| !matches!(f.as_str(), "-n" | "--namespace"));
        if let Some(flag) = stray_flag {
            return Err(ExecError::UnrecognizedCommand(format!(
                "{BUILDER_TRIGGER} {flag}"
            )));
        }
        if parsed.positionals.len() > 2 || parsed.namespace.as_deref() == Some("") {
            return Err(ExecError::UnrecognizedCommand(format!(
                "{BUILDER_TRIGGER} {}",
                args.join(" ")
            )));
        }
        let mut positionals = parsed.positionals.into_iter();
        Ok(Self {
            verb: Some(parsed.verb).filter(|v| !v.is_empty()),
            resource_type: positionals.next().map(|t| t.to_lowercase()),
            resource_name: positionals.next(),
            namespace: parsed.namespace,
        })
    }

    fn words(&self, object_form: bool) -> Vec<String> {
        let mut words: Vec<String> = self.verb.iter().cloned().collect();
        match (&self.resource_type, &self.resource_name) {
            (Some(ty), Some(name)) if object_form => words.push(format!("{ty}/{name}")),
            (ty, name) => words.extend(ty.iter().chain(name).cloned()),
        }
        if let Some(ns) = &self.namespace {
            words.extend(["-n".to_string(), ns.clone()]);
        }
        words
    }

    /// The builder command that reproduces this state.
    pub fn to_command(&self) -> String {
        std::iter::once(BUILDER_TRIGGER.to_string())
            .chain(self.words(false))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The kubectl command this state describes.
    pub fn kubectl_command(&self) -> String {
        let object_form = self.verb.as_deref().is_some_and(needs_object);
        std::iter::once("kubectl".to_string())
            .chain(self.words(object_form))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn with_verb(&self, verb: &str) -> Self {
        Self {
            verb: Some(verb.to_string()),
            ..Self::default()
        }
    }

    fn with_resource_type(&self, ty: &str) -> Self {
        Self {
            resource_type: Some(ty.to_string()),
            ..self.clone()
        }
    }

    fn with_namespace(&self, ns: &str) -> Self {
        Self {
            namespace: Some(ns.to_string()),
            ..self.clone()
        }
    }

    fn with_name(&self, name: &str) -> Self {
        Self {
            resource_name: Some(name.to_string()),
            ..self.clone()
        }
    }
}

/// Lowercase DNS-style object name.
fn is_valid_name(name: &str) -> bool {
    let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    !name.is_empty()
        && name.len() <= 253
        && name.starts_with(alnum)
        && name.ends_with(alnum)
        && name.chars().all(|c| alnum(c) || c == '-' || c == '.')
}

pub struct KubectlCmdBuilder<'a> {
    guard: &'a dyn CommandGuard,
    lister: &'a dyn NamespaceLister,
    resourceless_verbs: &'a [String],
    btn: ButtonBuilder,
}

impl<'a> KubectlCmdBuilder<'a> {
    pub fn new(
        guard: &'a dyn CommandGuard,
        lister: &'a dyn NamespaceLister,
        resourceless_verbs: &'a [String],
        bot_name: &str,
    ) -> Self {
        Self {
            guard,
            lister,
            resourceless_verbs,
            btn: ButtonBuilder::new(bot_name),
        }
    }

    /// Validate a builder command against `policy` and say which step it
    /// is at. The resolved resource comes along once a type is chosen.
    pub fn step(
        &self,
        state: &BuilderState,
        policy: &EffectivePolicy,
    ) -> Result<(Step, Option<Resource>), ExecError> {
        if !policy.enabled {
            return Err(ExecError::PermissionDenied(
                "kubectl is not enabled in this channel".into(),
            ));
        }

        let Some(verb) = state.verb.as_deref() else {
            return Ok((Step::Start, None));
        };
        if !self.guard.supported_verbs(&policy.verbs).iter().any(|v| v == verb) {
            return Err(ExecError::PermissionDenied(format!(
                "verb {verb:?} is not available here"
            )));
        }

        if self.resourceless_verbs.iter().any(|v| v == verb) {
            if state.resource_type.is_some() || state.namespace.is_some() {
                return Err(ExecError::UnrecognizedCommand(state.to_command()));
            }
            return Ok((Step::Ready, None));
        }

        let Some(ty) = state.resource_type.as_deref() else {
            return Ok((Step::VerbChosen, None));
        };
        let resource = self.guard.resource_details(verb, ty)?;
        let allowed = self
            .guard
            .allowed_resources_for_verb(verb, &policy.resources)?;
        if !allowed.iter().any(|r| r.name == resource.name) {
            return Err(ExecError::PermissionDenied(format!(
                "resource {:?} is not enabled for {verb:?}",
                resource.name
            )));
        }

        if let Some(name) = &state.resource_name
            && !is_valid_name(name)
        {
            return Err(ExecError::PermissionDenied(format!(
                "{name:?} is not a valid resource name"
            )));
        }

        let step = match (&state.namespace, resource.namespaced) {
            (None, true) => Step::ResourceTypeChosen,
            (Some(ns), true) if !policy.allows_namespace(ns) => {
                return Err(ExecError::PermissionDenied(format!(
                    "namespace {ns:?} is not enabled"
                )));
            }
            (Some(_), false) => {
                return Err(ExecError::PermissionDenied(format!(
                    "{:?} is not a namespaced resource",
                    resource.name
                )));
            }
            _ if state.resource_name.is_none() && needs_object(verb) => Step::NameRequired,
            _ => Step::Ready,
        };
        Ok((step, Some(resource)))
    }

    /// Render the next step for a builder command (words after the keyword).
    pub fn build(&self, args: &[String], policy: &EffectivePolicy) -> Result<Message, ExecError> {
        let state = BuilderState::parse(args)?;
        let (step, resource) = self.step(&state, policy)?;
        match (step, resource) {
            (Step::Start, _) => Ok(self.verbs_step(&state, policy)),
            (Step::VerbChosen, _) => {
                let verb = state.verb.as_deref().unwrap_or_default();
                self.resource_types_step(&state, verb, policy)
            }
            (Step::ResourceTypeChosen, _) => self.namespaces_step(&state, policy),
            (Step::NameRequired, Some(res)) => Ok(self.names_step(&state, &res)),
            (_, res) => Ok(self.ready_step(&state, res.as_ref())),
        }
    }

    fn choice_message(
        &self,
        header: String,
        description: &str,
        choices: Vec<(String, BuilderState)>,
    ) -> Message {
        let buttons = choices
            .into_iter()
            .take(MAX_OPTIONS)
            .map(|(label, next)| self.btn.for_command_without_desc(&label, &next.to_command()))
            .collect();
        Message {
            base: Base {
                header,
                description: description.to_string(),
                ..Base::default()
            },
            sections: vec![Section {
                buttons,
                ..Section::default()
            }],
            ..Message::default()
        }
    }

    fn verbs_step(&self, state: &BuilderState, policy: &EffectivePolicy) -> Message {
        let verbs = self.guard.supported_verbs(&policy.verbs);
        if verbs.is_empty() {
            return Message::plaintext("No kubectl commands can be built in this channel.");
        }
        let choices = verbs
            .iter()
            .map(|v| (v.clone(), state.with_verb(v)))
            .collect();
        self.choice_message("Build a kubectl command".into(), "Select a verb.", choices)
    }

    fn resource_types_step(
        &self,
        state: &BuilderState,
        verb: &str,
        policy: &EffectivePolicy,
    ) -> Result<Message, ExecError> {
        let resources = self
            .guard
            .allowed_resources_for_verb(verb, &policy.resources)?;
        if resources.is_empty() {
            return Ok(Message::plaintext(format!(
                "No resource types are enabled for `kubectl {verb}` in this channel."
            )));
        }
        let choices = resources
            .iter()
            .map(|r| (r.name.clone(), state.with_resource_type(&r.name)))
            .collect();
        Ok(self.choice_message(
            format!("kubectl {verb}"),
            "Select a resource type.",
            choices,
        ))
    }

    fn namespaces_step(
        &self,
        state: &BuilderState,
        policy: &EffectivePolicy,
    ) -> Result<Message, ExecError> {
        let default_ns = policy
            .default_namespace
            .clone()
            .unwrap_or_else(|| FALLBACK_NAMESPACE.to_string());
        let mut namespaces = match self.lister.list_namespaces() {
            Ok(list) => list,
            Err(e) => {
                log::warn!("listing namespaces failed, offering only {default_ns:?}: {e}");
                vec![default_ns.clone()]
            }
        };
        namespaces.retain(|ns| policy.allows_namespace(ns));
        namespaces.sort();
        namespaces.dedup();
        if let Some(pos) = namespaces.iter().position(|ns| *ns == default_ns) {
            let ns = namespaces.remove(pos);
            namespaces.insert(0, ns);
        }
        if namespaces.is_empty() {
            return Err(ExecError::PermissionDenied(
                "no namespaces are enabled in this channel".into(),
            ));
        }

        let choices = namespaces
            .iter()
            .map(|ns| (ns.clone(), state.with_namespace(ns)))
            .collect();
        Ok(self.choice_message(
            state.kubectl_command(),
            "Select a namespace.",
            choices,
        ))
    }

    fn name_buttons(&self, state: &BuilderState, res: &Resource) -> Vec<Button> {
        let names = self
            .lister
            .list_resource_names(&res.name, state.namespace.as_deref())
            .unwrap_or_else(|e| {
                log::warn!("listing {} names failed: {e}", res.name);
                Vec::new()
            });
        names
            .iter()
            .filter(|n| is_valid_name(n))
            .take(MAX_OPTIONS)
            .map(|n| {
                self.btn
                    .for_command_without_desc(n, &state.with_name(n).to_command())
            })
            .collect()
    }

    fn names_step(&self, state: &BuilderState, res: &Resource) -> Message {
        let buttons = self.name_buttons(state, res);
        if buttons.is_empty() {
            return Message::plaintext(format!(
                "No {} found to run `{}` on.",
                res.name,
                state.kubectl_command()
            ));
        }
        Message {
            base: Base {
                header: state.kubectl_command(),
                description: format!("Select one of the {}.", res.name),
                ..Base::default()
            },
            sections: vec![Section {
                buttons,
                ..Section::default()
            }],
            ..Message::default()
        }
    }

    fn ready_step(&self, state: &BuilderState, resource: Option<&Resource>) -> Message {
        let command = state.kubectl_command();
        let mut sections = vec![Section {
            buttons: vec![self.btn.for_command_with_desc_cmd(
                RUN_COMMAND_NAME,
                &command,
                ButtonStyle::Primary,
            )],
            ..Section::default()
        }];

        if let Some(res) = resource
            && state.resource_name.is_none()
        {
            let buttons = self.name_buttons(state, res);
            if !buttons.is_empty() {
                sections.push(Section {
                    base: Base {
                        description: format!("Or narrow it down to a single {}:", res.name),
                        ..Base::default()
                    },
                    buttons,
                    ..Section::default()
                });
            }
        }

        Message {
            base: Base {
                header: "Your kubectl command".into(),
                body: Body::CodeBlock(command),
                ..Base::default()
            },
            sections,
            ..Message::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::execute::CollaboratorError;
    use crate::parse::tokenize;
    use crate::policy::{CatalogGuard, Namespaces};

    struct Lister {
        fail: bool,
    }

    impl NamespaceLister for Lister {
        fn list_namespaces(&self) -> Result<Vec<String>, CollaboratorError> {
            if self.fail {
                return Err("cluster unreachable".into());
            }
            Ok(vec!["kube-system".into(), "web".into(), "default".into()])
        }

        fn list_resource_names(
            &self,
            resource: &str,
            _namespace: Option<&str>,
        ) -> Result<Vec<String>, CollaboratorError> {
            Ok(match resource {
                "pods" => vec!["nginx-1".into(), "Bad_Name".into()],
                _ => vec![],
            })
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn policy() -> EffectivePolicy {
        EffectivePolicy {
            enabled: true,
            verbs: strings(&["get", "describe", "delete", "cluster-info", "logs"]),
            resources: strings(&["pods", "nodes", "services"]),
            namespaces: Namespaces {
                include: strings(&[".*"]),
                exclude: strings(&["kube-system"]),
            },
            default_namespace: Some("web".into()),
            restrict_access: false,
        }
    }

    fn with_builder<T>(fail: bool, f: impl FnOnce(&KubectlCmdBuilder) -> T) -> T {
        let config = Config::default_config();
        let guard = CatalogGuard::from_config(&config);
        let lister = Lister { fail };
        let builder = KubectlCmdBuilder::new(
            &guard,
            &lister,
            &config.kubectl.resourceless_verbs,
            "@Botkube",
        );
        f(&builder)
    }

    fn build_with(cmd: &str, policy: &EffectivePolicy, fail: bool) -> Result<Message, ExecError> {
        with_builder(fail, |b| b.build(&tokenize(cmd), policy))
    }

    fn build(cmd: &str) -> Result<Message, ExecError> {
        build_with(cmd, &policy(), false)
    }

    fn commands(msg: &Message) -> Vec<String> {
        msg.buttons()
            .filter_map(|b| b.command())
            .map(|c| c.trim_start_matches("@Botkube ").to_string())
            .collect()
    }

    #[test]
    fn state_round_trips_through_text() {
        let state = BuilderState::parse(&tokenize("get pods -n web nginx")).unwrap();
        assert_eq!(state.to_command(), "kc-cmd-builder get pods nginx -n web");
        assert_eq!(state.kubectl_command(), "kubectl get pods nginx -n web");
        let again = BuilderState::parse(&tokenize("get pods nginx -n web")).unwrap();
        assert_eq!(state, again);
    }

    #[test]
    fn steps() {
        let step = |s: &str| {
            with_builder(false, |b| {
                let state = BuilderState::parse(&tokenize(s)).unwrap();
                b.step(&state, &policy()).unwrap().0
            })
        };
        assert_eq!(step(""), Step::Start);
        assert_eq!(step("get"), Step::VerbChosen);
        assert_eq!(step("get pods"), Step::ResourceTypeChosen);
        assert_eq!(step("get pods nginx-1"), Step::ResourceTypeChosen);
        assert_eq!(step("get pods -n web"), Step::Ready);
        assert_eq!(step("get nodes"), Step::Ready);
        assert_eq!(step("cluster-info"), Step::Ready);
        assert_eq!(step("logs pods -n web"), Step::NameRequired);
        assert_eq!(step("logs pods nginx-1 -n web"), Step::Ready);
    }

    #[test]
    fn logs_asks_for_a_pod_before_running() {
        let msg = build("logs pods -n web").unwrap();
        assert_eq!(
            commands(&msg),
            vec!["kc-cmd-builder logs pods nginx-1 -n web"]
        );
        assert!(msg.buttons().all(|b| b.name != RUN_COMMAND_NAME));
    }

    #[test]
    fn logs_runs_against_type_slash_name() {
        let msg = build("logs pods nginx-1 -n web").unwrap();
        assert_eq!(
            msg.base.body,
            Body::CodeBlock("kubectl logs pods/nginx-1 -n web".into())
        );
        assert_eq!(commands(&msg), vec!["kubectl logs pods/nginx-1 -n web"]);
    }

    #[test]
    fn parse_rejects_extra_words_and_flags() {
        assert!(BuilderState::parse(&tokenize("get pods a b")).is_err());
        assert!(BuilderState::parse(&tokenize("get pods -o yaml")).is_err());
    }

    #[test]
    fn start_offers_interactive_policy_verbs() {
        let msg = build("").unwrap();
        // delete is enabled but not interactive
        assert_eq!(
            commands(&msg),
            vec![
                "kc-cmd-builder get",
                "kc-cmd-builder describe",
                "kc-cmd-builder cluster-info",
                "kc-cmd-builder logs"
            ]
        );
    }

    #[test]
    fn verb_offers_permitted_resources() {
        let msg = build("get").unwrap();
        assert_eq!(
            commands(&msg),
            vec![
                "kc-cmd-builder get pods",
                "kc-cmd-builder get nodes",
                "kc-cmd-builder get services"
            ]
        );
    }

    #[test]
    fn namespaced_resource_offers_allowed_namespaces_default_first() {
        let msg = build("get pods").unwrap();
        assert_eq!(
            commands(&msg),
            vec![
                "kc-cmd-builder get pods -n web",
                "kc-cmd-builder get pods -n default"
            ]
        );
    }

    #[test]
    fn lister_failure_falls_back_to_default_namespace() {
        let msg = build_with("get pods", &policy(), true).unwrap();
        assert_eq!(commands(&msg), vec!["kc-cmd-builder get pods -n web"]);
    }

    #[test]
    fn cluster_scoped_resource_is_ready() {
        let msg = build("get nodes").unwrap();
        assert_eq!(msg.base.body, Body::CodeBlock("kubectl get nodes".into()));
        assert_eq!(commands(&msg), vec!["kubectl get nodes"]);
    }

    #[test]
    fn ready_offers_run_and_valid_names() {
        let msg = build("get pods -n web").unwrap();
        assert_eq!(
            commands(&msg),
            vec![
                "kubectl get pods -n web",
                "kc-cmd-builder get pods nginx-1 -n web"
            ]
        );
    }

    #[test]
    fn resourceless_verb_is_ready() {
        let msg = build("cluster-info").unwrap();
        assert_eq!(commands(&msg), vec!["kubectl cluster-info"]);
    }

    #[test]
    fn every_payload_reenters_at_the_same_step() {
        let mut frontier = vec![String::new()];
        let mut seen = 0;
        let mut runnable = Vec::new();
        while let Some(cmd) = frontier.pop() {
            let msg = build(&cmd).unwrap();
            if let Body::CodeBlock(command) = &msg.base.body {
                runnable.push(command.clone());
            }
            let state = BuilderState::parse(&tokenize(&cmd)).unwrap();
            let canonical = state.to_command();
            let typed = build(canonical.trim_start_matches(BUILDER_TRIGGER)).unwrap();
            assert_eq!(msg, typed, "{cmd}");
            for next in commands(&msg) {
                if let Some(rest) = next.strip_prefix(BUILDER_TRIGGER) {
                    frontier.push(rest.trim().to_string());
                }
            }
            seen += 1;
        }
        assert!(seen > 5);
        assert!(runnable.contains(&"kubectl logs pods/nginx-1 -n web".to_string()));
        assert!(!runnable.iter().any(|c| c.starts_with("kubectl logs pods -n")));
    }

    #[test]
    fn stale_payload_after_policy_tightening_is_denied() {
        let msg = build("get").unwrap();
        assert!(commands(&msg).contains(&"kc-cmd-builder get services".to_string()));

        let mut tightened = policy();
        tightened.resources.retain(|r| r != "services");
        let err = build_with("get services", &tightened, false).unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[test]
    fn stale_verb_is_denied() {
        let mut tightened = policy();
        tightened.verbs = strings(&["get"]);
        assert!(build_with("describe pods", &tightened, false)
            .unwrap_err()
            .is_permission_denied());
    }

    #[test]
    fn disabled_policy_is_denied() {
        let mut off = policy();
        off.enabled = false;
        assert!(build_with("", &off, false).unwrap_err().is_permission_denied());
    }

    #[test]
    fn excluded_namespace_is_denied() {
        assert!(build("get pods -n kube-system").unwrap_err().is_permission_denied());
    }

    #[test]
    fn namespace_on_cluster_scoped_resource_is_denied() {
        assert!(build("get nodes -n web").is_err());
    }

    #[test]
    fn unknown_resource_is_denied() {
        assert!(matches!(
            build("get widgets"),
            Err(ExecError::Guard(crate::policy::GuardError::UnknownResource(_)))
        ));
    }

    #[test]
    fn invalid_name_is_denied() {
        assert!(build("get pods Bad_Name -n web").is_err());
    }
}
