//! kube-chatops: answers one chat event.
//!
//! Reads a JSON event from stdin, writes the reply Message as JSON to stdout.
//! Prints nothing when the message is not addressed to the bot or belongs to
//! another cluster.
//!
//! ```json
//! {"platform": "slack", "comm_group": "default", "user": "alice",
//!  "text": "@Botkube kubectl get pods",
//!  "conversation": {"alias": "ops", "id": "C123",
//!                   "executor_bindings": ["kubectl-read-only"]}}
//! ```

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use kube_chatops::config::{Config, Platform};
use kube_chatops::execute::{Conversation, ExecContext, Executor, NewDefaultInput};
use kube_chatops::logging::{self, CommandLogReporter, LOG_LEVEL_ENV};
use kube_chatops::mention;
use kube_chatops::runtime::{KubectlNamespaceLister, ProcessRunner, StateFile};

const EVENT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct InboundEvent {
    platform: Platform,
    #[serde(default)]
    comm_group: String,
    #[serde(default)]
    user: String,
    text: String,
    #[serde(default)]
    conversation: Conversation,
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("kube-chatops: {msg}");
    std::process::exit(1);
}

fn main() {
    let level = std::env::var(LOG_LEVEL_ENV).ok();
    logging::init(logging::level_from_str(level.as_deref()));

    let mut config = Config::load().unwrap_or_else(|e| fail(e));

    if std::env::args().skip(1).any(|a| a == "--dump-config") {
        match toml::to_string_pretty(&config) {
            Ok(s) => print!("{s}"),
            Err(e) => fail(e),
        }
        return;
    }

    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        fail(format!("failed to read stdin: {e}"));
    }
    let event: InboundEvent =
        serde_json::from_str(&input).unwrap_or_else(|e| fail(format!("JSON parse error: {e}")));

    let extractor = mention::for_platform(event.platform, &config.settings.bot_name)
        .unwrap_or_else(|e| fail(format!("invalid bot name: {e}")));
    let (text, addressed) = extractor.find_and_trim(&event.text);
    if !addressed {
        log::debug!("message not addressed to {}", config.settings.bot_name);
        return;
    }

    let state = Arc::new(StateFile::from_env().unwrap_or_else(|e| fail(e)));
    if let Err(e) = state.apply_filter_overrides(&mut config.filters) {
        log::warn!("cannot read persisted filter state: {e}");
    }
    let mut conversation = event.conversation;
    if conversation.source_bindings.is_empty() {
        match state.source_bindings(&event.comm_group, event.platform, &conversation.alias) {
            Ok(Some(bindings)) => conversation.source_bindings = bindings,
            Ok(None) => {}
            Err(e) => log::warn!("cannot read persisted source bindings: {e}"),
        }
    }

    let runner = Arc::new(ProcessRunner);
    let factory = kube_chatops::factory(
        config,
        runner.clone(),
        Arc::new(KubectlNamespaceLister::new(runner)),
        state.clone(),
        Arc::new(CommandLogReporter::new()),
    );
    let executor = factory.new_default(NewDefaultInput {
        comm_group: event.comm_group,
        platform: event.platform,
        notifier_handler: state,
        conversation,
        message: text,
        user: event.user,
    });

    let reply = executor.execute(&ExecContext::with_timeout(EVENT_TIMEOUT));
    if reply.is_empty() {
        return;
    }
    match serde_json::to_string_pretty(&reply) {
        Ok(json) => println!("{json}"),
        Err(e) => fail(e),
    }
}
