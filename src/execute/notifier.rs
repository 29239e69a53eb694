//! `notifier start|stop|status`

use crate::config::Platform;
use crate::message::Message;

use super::{ConfigPersistenceManager, Conversation, ExecContext, ExecError, NotifierHandler};

pub struct NotifierExecutor<'a> {
    pub handler: &'a dyn NotifierHandler,
    pub persistence: &'a dyn ConfigPersistenceManager,
    pub comm_group: &'a str,
    pub platform: Platform,
    pub conversation: &'a Conversation,
    pub cluster_name: &'a str,
}

impl NotifierExecutor<'_> {
    pub fn execute(&self, ctx: &ExecContext, rest: &[String]) -> Result<Message, ExecError> {
        let sub = rest.first().map(|s| s.to_lowercase()).unwrap_or_default();
        match sub.as_str() {
            "start" => self.set_enabled(ctx, true),
            "stop" => self.set_enabled(ctx, false),
            "status" => Ok(self.status()),
            _ => Err(ExecError::UnrecognizedCommand(
                format!("notifier {}", rest.join(" ")).trim_end().to_string(),
            )),
        }
    }

    fn state_word(enabled: bool) -> &'static str {
        if enabled { "enabled" } else { "disabled" }
    }

    fn status(&self) -> Message {
        let enabled = self.handler.notifications_enabled(&self.conversation.id);
        Message::plaintext(format!(
            "Notifications from cluster '{}' are {} here.",
            self.cluster_name,
            Self::state_word(enabled)
        ))
    }

    fn set_enabled(&self, ctx: &ExecContext, enabled: bool) -> Result<Message, ExecError> {
        let conv = self.conversation;
        if self.handler.notifications_enabled(&conv.id) == enabled {
            return Ok(Message::plaintext(format!(
                "Notifications from cluster '{}' are already {} here.",
                self.cluster_name,
                Self::state_word(enabled)
            )));
        }

        // Once the handler changes, the pair runs to completion.
        ctx.check()?;
        self.handler
            .set_notifications_enabled(&conv.id, enabled)
            .map_err(|source| ExecError::PersistenceFailure {
                what: "notification state",
                source,
            })?;

        if let Err(source) = self.persistence.persist_notifications_enabled(
            self.comm_group,
            self.platform,
            &conv.alias,
            enabled,
        ) {
            if let Err(e) = self.handler.set_notifications_enabled(&conv.id, !enabled) {
                log::error!("restoring notification state of {} failed: {e}", conv.alias);
            }
            return Err(ExecError::PersistenceFailure {
                what: "notification settings",
                source,
            });
        }

        log::info!(
            "notifications {} for {}/{} ({})",
            Self::state_word(enabled),
            self.comm_group,
            conv.alias,
            self.platform.as_str()
        );
        Ok(Message::plaintext(format!(
            "Notifications from cluster '{}' are now {} here.",
            self.cluster_name,
            Self::state_word(enabled)
        )))
    }
}
