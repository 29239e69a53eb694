//! Wires collaborators and the current configuration into per-event
//! dispatchers.

use std::sync::Arc;

use crate::config::{ConfigStore, Platform};
use crate::policy::{CatalogGuard, Checker};

use super::{
    AnalyticsReporter, CommandRunner, ConfigPersistenceManager, Conversation, DefaultExecutor,
    NamespaceLister, NotifierHandler,
};

/// Long-lived collaborators shared by every dispatcher.
#[derive(Clone)]
pub struct ExecutorFactoryParams {
    pub config: Arc<ConfigStore>,
    pub runner: Arc<dyn CommandRunner>,
    pub namespace_lister: Arc<dyn NamespaceLister>,
    pub persistence: Arc<dyn ConfigPersistenceManager>,
    pub analytics: Arc<dyn AnalyticsReporter>,
}

/// Per-event input.
#[derive(Clone)]
pub struct NewDefaultInput {
    pub comm_group: String,
    pub platform: Platform,
    pub notifier_handler: Arc<dyn NotifierHandler>,
    pub conversation: Conversation,
    /// Command text with the bot mention already removed.
    pub message: String,
    pub user: String,
}

pub struct ExecutorFactory {
    params: ExecutorFactoryParams,
}

impl ExecutorFactory {
    pub fn new(params: ExecutorFactoryParams) -> Self {
        Self { params }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.params.config
    }

    /// Build a dispatcher for one event.
    ///
    /// The dispatcher keeps the configuration snapshot current at this call,
    /// and its guard and checker are built from that same snapshot; later
    /// `publish`es only affect dispatchers built afterwards.
    pub fn new_default(&self, input: NewDefaultInput) -> DefaultExecutor {
        let config = self.params.config.snapshot();
        DefaultExecutor {
            checker: Checker::from_config(&config.kubectl),
            guard: Arc::new(CatalogGuard::from_config(&config)),
            config,
            runner: Arc::clone(&self.params.runner),
            namespace_lister: Arc::clone(&self.params.namespace_lister),
            persistence: Arc::clone(&self.params.persistence),
            analytics: Arc::clone(&self.params.analytics),
            notifier_handler: input.notifier_handler,
            comm_group: input.comm_group,
            platform: input.platform,
            conversation: input.conversation,
            message: input.message.trim().to_string(),
            user: input.user,
        }
    }
}
