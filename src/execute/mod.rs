//! Command execution: the per-event dispatcher, its sub-handlers and the
//! collaborator contracts they call out to.

pub mod analytics;
pub mod builder;
pub mod default;
pub mod edit;
pub mod factory;
pub mod filters;
pub mod kubectl;
pub mod notifier;
pub mod router;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Platform;
use crate::message::Message;
use crate::parse::ShellViolation;
use crate::policy::GuardError;

pub use default::DefaultExecutor;
pub use factory::{ExecutorFactory, ExecutorFactoryParams, NewDefaultInput};

/// Error type returned by collaborators.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Handles one inbound command and produces the reply.
pub trait Executor {
    fn execute(&self, ctx: &ExecContext) -> Message;
}

/// How a command reached the bot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandOrigin {
    Typed,
    ButtonClick,
    SelectValueUpdate,
    PlainTextInput,
    #[default]
    Unknown,
}

impl CommandOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandOrigin::Typed => "typed",
            CommandOrigin::ButtonClick => "button-click",
            CommandOrigin::SelectValueUpdate => "select-value-update",
            CommandOrigin::PlainTextInput => "plain-text-input",
            CommandOrigin::Unknown => "unknown",
        }
    }
}

/// The chat context a command executes in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    pub alias: String,
    pub id: String,
    /// Executor configs whose policy applies here, in override order.
    #[serde(default)]
    pub executor_bindings: Vec<String>,
    #[serde(default)]
    pub source_bindings: Vec<String>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub command_origin: CommandOrigin,
    /// Platform interaction payload, passed through untouched.
    #[serde(default)]
    pub state: Option<serde_json::Value>,
}

/// Cancellation and deadline for one event.
///
/// Clones share the cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_done(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left before the deadline, if there is one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Call before anything that changes state.
    pub fn check(&self) -> Result<(), ExecError> {
        if self.is_done() {
            return Err(ExecError::Cancelled);
        }
        Ok(())
    }
}

// ── Collaborators ──

/// Runs a fully resolved command line and returns its output.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        ctx: &ExecContext,
        program: &str,
        args: &[String],
    ) -> Result<String, CollaboratorError>;
}

/// Lists what the cluster credentials can see.
pub trait NamespaceLister: Send + Sync {
    fn list_namespaces(&self) -> Result<Vec<String>, CollaboratorError>;

    fn list_resource_names(
        &self,
        _resource: &str,
        _namespace: Option<&str>,
    ) -> Result<Vec<String>, CollaboratorError> {
        Ok(Vec::new())
    }
}

/// Persists runtime changes to the bot configuration.
pub trait ConfigPersistenceManager: Send + Sync {
    fn persist_source_bindings(
        &self,
        comm_group: &str,
        platform: Platform,
        channel_alias: &str,
        source_bindings: &[String],
    ) -> Result<(), CollaboratorError>;

    fn persist_notifications_enabled(
        &self,
        comm_group: &str,
        platform: Platform,
        channel_alias: &str,
        enabled: bool,
    ) -> Result<(), CollaboratorError>;

    fn persist_filter_enabled(&self, name: &str, enabled: bool) -> Result<(), CollaboratorError>;
}

/// Collects usage data. `command` must already be anonymized.
pub trait AnalyticsReporter: Send + Sync {
    fn report_command(
        &self,
        platform: Platform,
        command: &str,
        origin: CommandOrigin,
        with_filter: bool,
    ) -> Result<(), CollaboratorError>;
}

/// Runtime switch for event notifications in a conversation.
pub trait NotifierHandler: Send + Sync {
    fn notifications_enabled(&self, conversation_id: &str) -> bool;

    fn set_notifications_enabled(
        &self,
        conversation_id: &str,
        enabled: bool,
    ) -> Result<(), CollaboratorError>;
}

// ── Errors ──

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error("unsafe command: {0}")]
    UnsafeCommand(#[from] ShellViolation),
    #[error("failed to persist {what}: {source}")]
    PersistenceFailure {
        what: &'static str,
        #[source]
        source: CollaboratorError,
    },
    #[error("command execution failed: {0}")]
    CommandExecutionFailure(#[source] CollaboratorError),
    #[error("unrecognized command {0:?}")]
    UnrecognizedCommand(String),
    #[error("operation cancelled")]
    Cancelled,
}

impl ExecError {
    /// Reply shown to the user. Collaborator failures are not spelled out;
    /// their cause goes to the log instead.
    pub fn to_message(&self) -> Message {
        match self {
            ExecError::PermissionDenied(reason) => {
                Message::plaintext(format!("Sorry, this command is not allowed: {reason}."))
            }
            ExecError::Guard(e) => {
                Message::plaintext(format!("Sorry, this command is not allowed: {e}."))
            }
            ExecError::UnsafeCommand(e) => Message::plaintext(format!(
                "Sorry, this command was not run: {e}. Send one kubectl command without shell syntax."
            )),
            ExecError::PersistenceFailure { .. } => Message::plaintext(
                "Sorry, the change could not be saved. Please try again later.",
            ),
            ExecError::CommandExecutionFailure(_) => {
                Message::plaintext("Sorry, the command failed to run. Please try again later.")
            }
            ExecError::UnrecognizedCommand(cmd) => {
                Message::plaintext(format!("Sorry, I don't understand {cmd:?}."))
            }
            ExecError::Cancelled => Message::plaintext(
                "The request was cancelled before anything was changed.",
            ),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(
            self,
            ExecError::PermissionDenied(_) | ExecError::Guard(_) | ExecError::UnsafeCommand(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Body;

    #[test]
    fn context_cancel_is_shared_by_clones() {
        let ctx = ExecContext::new();
        let other = ctx.clone();
        assert!(ctx.check().is_ok());
        other.cancel();
        assert!(matches!(ctx.check(), Err(ExecError::Cancelled)));
    }

    #[test]
    fn context_deadline() {
        let ctx = ExecContext::with_timeout(Duration::ZERO);
        assert!(ctx.is_done());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
        assert_eq!(ExecContext::new().remaining(), None);
    }

    #[test]
    fn failure_messages_hide_cause() {
        let err = ExecError::PersistenceFailure {
            what: "source bindings",
            source: "disk on fire at /var/secret".into(),
        };
        let Body::Plaintext(text) = err.to_message().base.body else {
            panic!("expected plaintext");
        };
        assert!(!text.contains("/var/secret"));
    }

    #[test]
    fn denial_messages_name_the_reason() {
        let err = ExecError::from(GuardError::UnknownResource("widgets".into()));
        assert!(err.is_permission_denied());
        let Body::Plaintext(text) = err.to_message().base.body else {
            panic!("expected plaintext");
        };
        assert!(text.contains("widgets"));
    }

    #[test]
    fn origin_serializes_kebab_case() {
        let json = serde_json::to_string(&CommandOrigin::ButtonClick).unwrap();
        assert_eq!(json, "\"button-click\"");
    }
}
