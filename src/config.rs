use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::Namespaces;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Environment variable pointing at a user overlay file.
pub const CONFIG_PATH_ENV: &str = "KUBE_CHATOPS_CONFIG";

const DEFAULT_OVERLAY_PATH: &str = "~/.config/kube-chatops/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot resolve config path {path}: {reason}")]
    Path { path: String, reason: String },
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Final (merged) config types ──

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub kubectl: KubectlConfig,
    /// Resource catalogue the guard offers and checks against.
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
    /// Policy fragments, addressed by the bindings of a conversation.
    #[serde(default)]
    pub executors: BTreeMap<String, ExecutorConfig>,
    /// Event sources a channel can subscribe to.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
    #[serde(default)]
    pub filters: BTreeMap<String, FilterConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub cluster_name: String,
    /// Name as it appears in a mention, e.g. `@Botkube`.
    #[serde(default)]
    pub bot_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct KubectlConfig {
    #[serde(default)]
    pub known_verbs: Vec<String>,
    #[serde(default)]
    pub interactive_verbs: Vec<String>,
    #[serde(default)]
    pub resourceless_verbs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ResourceConfig {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub namespaced: bool,
    #[serde(default)]
    pub verbs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub kubectl: KubectlFragment,
}

/// One layer of kubectl policy. Unset fields inherit from earlier layers.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct KubectlFragment {
    pub enabled: Option<bool>,
    pub verbs: Option<Vec<String>>,
    pub resources: Option<Vec<String>>,
    pub namespaces: Option<Namespaces>,
    pub default_namespace: Option<String>,
    pub restrict_access: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct SourceConfig {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct FilterConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
}

/// Chat platform an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Slack,
    SocketSlack,
    Mattermost,
    Teams,
    Discord,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Slack => "slack",
            Platform::SocketSlack => "socket-slack",
            Platform::Mattermost => "mattermost",
            Platform::Teams => "teams",
            Platform::Discord => "discord",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Slack | Platform::SocketSlack => "Slack",
            Platform::Mattermost => "Mattermost",
            Platform::Teams => "Teams",
            Platform::Discord => "Discord",
        }
    }

    /// Whether the platform renders multi-step interactive messages natively.
    pub fn is_interactive(self) -> bool {
        matches!(self, Platform::SocketSlack)
    }
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    kubectl: KubectlOverlay,
    #[serde(default)]
    resources: Vec<ResourceConfig>,
    #[serde(default)]
    remove_resources: Vec<String>,
    #[serde(default)]
    executors: BTreeMap<String, ExecutorConfig>,
    #[serde(default)]
    remove_executors: Vec<String>,
    #[serde(default)]
    sources: BTreeMap<String, SourceConfig>,
    #[serde(default)]
    remove_sources: Vec<String>,
    #[serde(default)]
    filters: BTreeMap<String, FilterConfig>,
    #[serde(default)]
    remove_filters: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    cluster_name: Option<String>,
    bot_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct KubectlOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    known_verbs: Vec<String>,
    #[serde(default)]
    interactive_verbs: Vec<String>,
    #[serde(default)]
    resourceless_verbs: Vec<String>,
    #[serde(default)]
    remove_known_verbs: Vec<String>,
    #[serde(default)]
    remove_interactive_verbs: Vec<String>,
    #[serde(default)]
    remove_resourceless_verbs: Vec<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

/// Merge named entries: removals first, then overlay entries replace by name.
fn merge_map<V>(base: &mut BTreeMap<String, V>, add: BTreeMap<String, V>, remove: &[String]) {
    base.retain(|name, _| !remove.contains(name));
    base.extend(add);
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the user overlay from `$KUBE_CHATOPS_CONFIG`, or
    ///    `~/.config/kube-chatops/config.toml` when the variable is unset
    ///
    /// A missing overlay file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay()? {
            config.apply_overlay(overlay);
        }
        Ok(config)
    }

    fn overlay_path() -> Result<PathBuf, ConfigError> {
        let raw = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_OVERLAY_PATH.into());
        let expanded = shellexpand::full(&raw).map_err(|e| ConfigError::Path {
            path: raw.clone(),
            reason: e.to_string(),
        })?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    fn load_overlay() -> Result<Option<ConfigOverlay>, ConfigError> {
        let path = Self::overlay_path()?;
        if !path.exists() {
            log::debug!("no config overlay at {}", path.display());
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        log::info!("applying config overlay {}", path.display());
        Ok(Some(toml::from_str(&content)?))
    }

    /// Apply an overlay from a TOML string.
    pub fn apply_overlay_str(&mut self, toml_str: &str) -> Result<(), ConfigError> {
        let overlay: ConfigOverlay = toml::from_str(toml_str)?;
        self.apply_overlay(overlay);
        Ok(())
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let s = overlay.settings;
        if let Some(v) = s.cluster_name {
            self.settings.cluster_name = v;
        }
        if let Some(v) = s.bot_name {
            self.settings.bot_name = v;
        }

        let k = overlay.kubectl;
        merge_list(
            &mut self.kubectl.known_verbs,
            k.known_verbs,
            &k.remove_known_verbs,
            k.replace,
        );
        merge_list(
            &mut self.kubectl.interactive_verbs,
            k.interactive_verbs,
            &k.remove_interactive_verbs,
            k.replace,
        );
        merge_list(
            &mut self.kubectl.resourceless_verbs,
            k.resourceless_verbs,
            &k.remove_resourceless_verbs,
            k.replace,
        );

        // Resources: replaced by name, new names appended
        self.resources
            .retain(|r| !overlay.remove_resources.contains(&r.name));
        for res in overlay.resources {
            match self.resources.iter_mut().find(|r| r.name == res.name) {
                Some(existing) => *existing = res,
                None => self.resources.push(res),
            }
        }

        merge_map(
            &mut self.executors,
            overlay.executors,
            &overlay.remove_executors,
        );
        merge_map(&mut self.sources, overlay.sources, &overlay.remove_sources);
        merge_map(&mut self.filters, overlay.filters, &overlay.remove_filters);
    }
}

/// Holds the current configuration snapshot.
///
/// Readers clone the `Arc` and keep a consistent view for as long as they
/// need it; `publish` swaps in a whole new snapshot.
#[derive(Debug)]
pub struct ConfigStore {
    current: RwLock<Arc<Config>>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub fn snapshot(&self) -> Arc<Config> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn publish(&self, config: Config) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }
}
