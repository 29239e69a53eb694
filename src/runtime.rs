//! Collaborators backed by the local machine: process execution, cluster
//! listing through kubectl, and a TOML state file.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{FilterConfig, Platform};
use crate::execute::kubectl::KUBECTL_BINARY;
use crate::execute::{
    CollaboratorError, CommandRunner, ConfigPersistenceManager, ExecContext, NamespaceLister,
    NotifierHandler,
};

/// Environment variable pointing at the state file.
pub const STATE_PATH_ENV: &str = "KUBE_CHATOPS_STATE";

const DEFAULT_STATE_PATH: &str = "~/.local/share/kube-chatops/state.toml";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

const LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs programs directly from an argv. No shell is involved.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        ctx: &ExecContext,
        program: &str,
        args: &[String],
    ) -> Result<String, CollaboratorError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes while waiting so a chatty child cannot block.
        let mut stdout = child.stdout.take().ok_or("stdout not captured")?;
        let mut stderr = child.stderr.take().ok_or("stderr not captured")?;
        let out_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });
        let err_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).map(|_| buf)
        });

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if ctx.is_done() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("{program} cancelled").into());
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let out = out_reader
            .join()
            .map_err(|_| "stdout reader panicked")??;
        let err = err_reader
            .join()
            .map_err(|_| "stderr reader panicked")??;
        if !status.success() {
            let err = String::from_utf8_lossy(&err);
            return Err(format!("{program} exited with {status}: {}", err.trim()).into());
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

/// Lists namespaces and object names with `kubectl get -o name`.
pub struct KubectlNamespaceLister {
    runner: Arc<dyn CommandRunner>,
}

impl KubectlNamespaceLister {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn names(&self, args: &[&str]) -> Result<Vec<String>, CollaboratorError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let ctx = ExecContext::with_timeout(LIST_TIMEOUT);
        let out = self.runner.run(&ctx, KUBECTL_BINARY, &args)?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            // `-o name` prints `kind/name`
            .map(|l| l.split_once('/').map_or(l, |(_, name)| name).to_string())
            .collect())
    }
}

impl NamespaceLister for KubectlNamespaceLister {
    fn list_namespaces(&self) -> Result<Vec<String>, CollaboratorError> {
        self.names(&["get", "namespaces", "-o", "name"])
    }

    fn list_resource_names(
        &self,
        resource: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<String>, CollaboratorError> {
        match namespace {
            Some(ns) => self.names(&["get", resource, "-o", "name", "-n", ns]),
            None => self.names(&["get", resource, "-o", "name"]),
        }
    }
}

// ── State file ──

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct ChannelState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_bindings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notifications_enabled: Option<bool>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct State {
    /// Runtime switch, by conversation id.
    #[serde(default)]
    notifications: BTreeMap<String, bool>,
    /// Persisted channel settings, by `group/platform/alias`.
    #[serde(default)]
    channels: BTreeMap<String, ChannelState>,
    #[serde(default)]
    filters: BTreeMap<String, bool>,
}

fn channel_key(comm_group: &str, platform: Platform, alias: &str) -> String {
    format!("{comm_group}/{}/{alias}", platform.as_str())
}

/// TOML file holding runtime changes made through chat commands.
///
/// Every call reads and rewrites the whole file under a process-local lock.
pub struct StateFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `$KUBE_CHATOPS_STATE`, or `~/.local/share/kube-chatops/state.toml`.
    pub fn from_env() -> Result<Self, CollaboratorError> {
        let raw = std::env::var(STATE_PATH_ENV).unwrap_or_else(|_| DEFAULT_STATE_PATH.into());
        let expanded = shellexpand::full(&raw)?;
        Ok(Self::new(expanded.into_owned()))
    }

    fn read(&self) -> Result<State, CollaboratorError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(State::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, state: &State) -> Result<(), CollaboratorError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, toml::to_string(state)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut State)) -> Result<(), CollaboratorError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut state = self.read()?;
        f(&mut state);
        self.write(&state)
    }

    /// Source bindings persisted for a channel, if any.
    pub fn source_bindings(
        &self,
        comm_group: &str,
        platform: Platform,
        alias: &str,
    ) -> Result<Option<Vec<String>>, CollaboratorError> {
        let state = self.read()?;
        Ok(state
            .channels
            .get(&channel_key(comm_group, platform, alias))
            .and_then(|c| c.source_bindings.clone()))
    }

    /// Overwrite `enabled` of every configured filter that was switched
    /// through `filters enable|disable`. Unknown names are ignored.
    pub fn apply_filter_overrides(
        &self,
        filters: &mut BTreeMap<String, FilterConfig>,
    ) -> Result<(), CollaboratorError> {
        for (name, enabled) in self.read()?.filters {
            match filters.get_mut(&name) {
                Some(filter) => filter.enabled = enabled,
                None => log::debug!("persisted filter {name:?} is no longer configured"),
            }
        }
        Ok(())
    }
}

impl ConfigPersistenceManager for StateFile {
    fn persist_source_bindings(
        &self,
        comm_group: &str,
        platform: Platform,
        channel_alias: &str,
        source_bindings: &[String],
    ) -> Result<(), CollaboratorError> {
        self.update(|state| {
            state
                .channels
                .entry(channel_key(comm_group, platform, channel_alias))
                .or_default()
                .source_bindings = Some(source_bindings.to_vec());
        })
    }

    fn persist_notifications_enabled(
        &self,
        comm_group: &str,
        platform: Platform,
        channel_alias: &str,
        enabled: bool,
    ) -> Result<(), CollaboratorError> {
        self.update(|state| {
            state
                .channels
                .entry(channel_key(comm_group, platform, channel_alias))
                .or_default()
                .notifications_enabled = Some(enabled);
        })
    }

    fn persist_filter_enabled(&self, name: &str, enabled: bool) -> Result<(), CollaboratorError> {
        self.update(|state| {
            state.filters.insert(name.to_string(), enabled);
        })
    }
}

impl NotifierHandler for StateFile {
    /// Conversations receive notifications until someone stops them.
    fn notifications_enabled(&self, conversation_id: &str) -> bool {
        match self.read() {
            Ok(state) => state
                .notifications
                .get(conversation_id)
                .copied()
                .unwrap_or(true),
            Err(e) => {
                log::warn!("cannot read {}: {e}", self.path.display());
                true
            }
        }
    }

    fn set_notifications_enabled(
        &self,
        conversation_id: &str,
        enabled: bool,
    ) -> Result<(), CollaboratorError> {
        self.update(|state| {
            state
                .notifications
                .insert(conversation_id.to_string(), enabled);
        })
    }
}
