//! kube-chatops: the command engine of a chat bot that operates a Kubernetes
//! cluster.
//!
//! A chat message addressed to the bot is routed to a handler and answered
//! with a platform-agnostic [`message::Message`]. kubectl commands are only
//! offered or run when the policy merged from the conversation's executor
//! bindings allows them. The interactive command builder keeps its whole
//! state in the button payloads it emits, so nothing is stored between
//! messages.
//!
//! # Architecture
//!
//! - **[`execute`]**: Dispatcher, sub-handlers, builder, executor factory and collaborator traits.
//! - **[`policy`]**: Policy merger, command guard and execution-time checker.
//! - **[`parse`]**: shlex tokenizer, kubectl argument split, tree-sitter single-command check.
//! - **[`message`]**: Response tree, button builder and help message.
//! - **[`mention`]**: Bot mention detection per platform.
//! - **[`config`]**: Configuration loading: embedded defaults + user overlay merge.
//! - **[`runtime`]**: Local collaborators: process runner, kubectl lister, state file.
//! - **[`logging`]**: Logger setup and the command log reporter.

/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Dispatcher, sub-handlers and collaborator contracts.
pub mod execute;
/// Logger setup and file-based command log.
pub mod logging;
/// Bot mention extraction.
pub mod mention;
/// Response model.
pub mod message;
/// Command parsing: shlex tokenizer, kubectl arguments, shell structure check.
pub mod parse;
/// Layered kubectl permissions.
pub mod policy;
/// Collaborators backed by the local machine.
pub mod runtime;

use std::sync::Arc;

use config::{Config, ConfigStore};
use execute::{
    AnalyticsReporter, CommandRunner, ConfigPersistenceManager, ExecutorFactory,
    ExecutorFactoryParams, NamespaceLister,
};

/// Factory serving `config` until a new snapshot is published.
///
/// This is the main entry point for embedding; tests and the CLI use it too.
pub fn factory(
    config: Config,
    runner: Arc<dyn CommandRunner>,
    namespace_lister: Arc<dyn NamespaceLister>,
    persistence: Arc<dyn ConfigPersistenceManager>,
    analytics: Arc<dyn AnalyticsReporter>,
) -> ExecutorFactory {
    ExecutorFactory::new(ExecutorFactoryParams {
        config: Arc::new(ConfigStore::new(config)),
        runner,
        namespace_lister,
        persistence,
        analytics,
    })
}
