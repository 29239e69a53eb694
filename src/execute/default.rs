//! Per-event dispatcher.

use std::sync::Arc;

use crate::config::{Config, Platform};
use crate::message::{HelpMessage, Message};
use crate::parse::{take_flag, tokenize};
use crate::policy::{Checker, CommandGuard, EffectivePolicy, merge};

use super::analytics::anonymize;
use super::builder::KubectlCmdBuilder;
use super::edit::SourceBindingsEditor;
use super::filters::FiltersExecutor;
use super::kubectl::KubectlExecutor;
use super::notifier::NotifierExecutor;
use super::router::{Resolved, Route, resolve};
use super::{
    AnalyticsReporter, CommandOrigin, CommandRunner, ConfigPersistenceManager, Conversation,
    ExecContext, ExecError, Executor, NamespaceLister, NotifierHandler,
};

const CLUSTER_NAME_FLAG: &[&str] = &["--cluster-name"];
const FILTER_FLAG: &[&str] = &["--filter"];

/// Handles one inbound command. Built by [`super::ExecutorFactory`].
pub struct DefaultExecutor {
    pub(super) config: Arc<Config>,
    pub(super) checker: Checker,
    pub(super) guard: Arc<dyn CommandGuard>,
    pub(super) runner: Arc<dyn CommandRunner>,
    pub(super) namespace_lister: Arc<dyn NamespaceLister>,
    pub(super) persistence: Arc<dyn ConfigPersistenceManager>,
    pub(super) analytics: Arc<dyn AnalyticsReporter>,
    pub(super) notifier_handler: Arc<dyn NotifierHandler>,
    pub(super) comm_group: String,
    pub(super) platform: Platform,
    pub(super) conversation: Conversation,
    pub(super) message: String,
    pub(super) user: String,
}

impl Executor for DefaultExecutor {
    fn execute(&self, ctx: &ExecContext) -> Message {
        let mut tokens = tokenize(&self.message);

        if let Some(cluster) = take_flag(&mut tokens, CLUSTER_NAME_FLAG)
            && cluster != self.config.settings.cluster_name
        {
            log::debug!(
                "ignoring command for cluster {cluster:?}, this is {:?}",
                self.config.settings.cluster_name
            );
            return Message::empty();
        }
        let filter = take_flag(&mut tokens, FILTER_FLAG);

        let resolved = resolve(&tokens, |v| self.checker.is_known_verb(v));
        log::debug!(
            "{} in {}/{}: {:?} routed to {:?}",
            self.user,
            self.comm_group,
            self.conversation.alias,
            self.message,
            resolved.route
        );

        let result = self.dispatch(ctx, resolved, filter.as_deref());
        self.report(resolved, filter.is_some());

        match result {
            Ok(msg) => msg,
            Err(e) => self.error_message(e),
        }
    }
}

impl DefaultExecutor {
    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Policy of this conversation, merged from its executor bindings.
    pub fn effective_policy(&self) -> EffectivePolicy {
        merge(&self.config.executors, &self.conversation.executor_bindings)
    }

    fn bot_name(&self) -> &str {
        &self.config.settings.bot_name
    }

    fn cluster_name(&self) -> &str {
        &self.config.settings.cluster_name
    }

    fn dispatch(
        &self,
        ctx: &ExecContext,
        resolved: Resolved<'_>,
        filter: Option<&str>,
    ) -> Result<Message, ExecError> {
        let rest = resolved.rest;
        match resolved.route {
            Route::Notifier => NotifierExecutor {
                handler: self.notifier_handler.as_ref(),
                persistence: self.persistence.as_ref(),
                comm_group: &self.comm_group,
                platform: self.platform,
                conversation: &self.conversation,
                cluster_name: self.cluster_name(),
            }
            .execute(ctx, rest),
            Route::EditSourceBindings => SourceBindingsEditor {
                sources: &self.config.sources,
                persistence: self.persistence.as_ref(),
                comm_group: &self.comm_group,
                platform: self.platform,
                conversation: &self.conversation,
                bot_name: self.bot_name(),
            }
            .execute(ctx, rest),
            Route::Edit => Err(ExecError::UnrecognizedCommand(format!(
                "edit {}",
                rest.join(" ")
            ))),
            Route::Filters => FiltersExecutor {
                filters: &self.config.filters,
                persistence: self.persistence.as_ref(),
            }
            .execute(ctx, rest),
            Route::CommandsList => Ok(self.commands_list()),
            Route::Ping => Ok(Message::plaintext(format!(
                "pong from cluster '{}' (kube-chatops {})",
                self.cluster_name(),
                env!("CARGO_PKG_VERSION")
            ))),
            Route::Help => Ok(self.help()),
            Route::Builder => {
                let policy = self.effective_policy();
                let builder = KubectlCmdBuilder::new(
                    self.guard.as_ref(),
                    self.namespace_lister.as_ref(),
                    &self.config.kubectl.resourceless_verbs,
                    self.bot_name(),
                );
                let mut msg = builder.build(rest, &policy)?;
                msg.replace_original = matches!(
                    self.conversation.command_origin,
                    CommandOrigin::ButtonClick | CommandOrigin::SelectValueUpdate
                );
                Ok(msg)
            }
            Route::Kubectl => {
                let policy = self.effective_policy();
                KubectlExecutor::new(
                    &self.checker,
                    self.guard.as_ref(),
                    self.runner.as_ref(),
                    self.cluster_name(),
                )
                .execute(
                    ctx,
                    &self.message,
                    rest,
                    &policy,
                    self.conversation.is_authenticated,
                    filter,
                )
            }
            Route::Unknown => Err(ExecError::UnrecognizedCommand(rest.join(" "))),
        }
    }

    /// Exactly one report per dispatched command. Never fails the reply.
    fn report(&self, resolved: Resolved<'_>, with_filter: bool) {
        let command = anonymize(
            resolved.route,
            resolved.rest,
            self.guard.as_ref(),
            &|v: &str| self.checker.is_known_verb(v),
        );
        if let Err(e) = self.analytics.report_command(
            self.platform,
            &command,
            self.conversation.command_origin,
            with_filter,
        ) {
            log::warn!("failed to report command {command:?}: {e}");
        }
    }

    fn error_message(&self, err: ExecError) -> Message {
        match &err {
            ExecError::UnrecognizedCommand(cmd) => {
                log::debug!("unrecognized command {cmd:?}");
                return self.help();
            }
            ExecError::PersistenceFailure { .. } | ExecError::CommandExecutionFailure(_) => {
                log::error!("{err}");
            }
            ExecError::Cancelled => log::warn!("{err}"),
            _ => log::info!("{} denied in {}: {err}", self.user, self.conversation.alias),
        }
        err.to_message()
    }

    fn help(&self) -> Message {
        HelpMessage::new(self.platform, self.cluster_name(), self.bot_name()).build()
    }

    fn commands_list(&self) -> Message {
        let policy = self.effective_policy();
        let mut out = String::from(
            "notifier [start|stop|status]\nedit SourceBindings [sources...]\nfilters [list|enable|disable]\nping\nhelp\n",
        );
        if policy.enabled {
            let verbs = if policy.verbs.is_empty() {
                "(none)".to_string()
            } else {
                policy.verbs.join(", ")
            };
            let resources = if policy.resources.is_empty() {
                "(none)".to_string()
            } else {
                policy.resources.join(", ")
            };
            out.push_str(&format!(
                "kubectl <verb> <resource>\n  verbs: {verbs}\n  resources: {resources}\n"
            ));
        }
        Message::code_block(
            format!("Commands available in this channel for cluster '{}'", self.cluster_name()),
            out.trim_end(),
        )
    }
}
