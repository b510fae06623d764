//! # Configuration de pmohotplug
//!
//! Chargement de la configuration YAML avec :
//! - valeurs par défaut embarquées (celles de l'outil historique)
//! - cascade de découverte : chemin explicite → variable d'environnement
//!   → `/etc` → répertoire utilisateur
//! - politiques de réessai par étape, réductibles à zéro délai en test
//!
//! Contrairement au reste de la famille pmo*, il n'y a pas de singleton
//! global : la configuration est construite une fois dans `main` et
//! passée par référence à chaque composant.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use pmohotutils::retry::RetryPolicy;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmohotplug.yaml");
const DEFAULT_TEMPLATE: &str = include_str!("mpd.conf.in");

const ENV_CONFIG_FILE: &str = "PMOHOTPLUG_CONFIG";
const ETC_CONFIG_FILE: &str = "/etc/pmohotplug.yaml";
const USER_CONFIG_FILE: &str = "pmohotplug/config.yaml";

/// Attempt count and fixed inter-attempt delay for one orchestration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_millis(self.delay_ms))
    }
}

/// Per-step retry budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryTable {
    pub stop: RetrySettings,
    pub mount: RetrySettings,
    pub start: RetrySettings,
    pub connect: RetrySettings,
    pub play: RetrySettings,
    pub lock: RetrySettings,
}

impl Default for RetryTable {
    fn default() -> Self {
        Self {
            stop: RetrySettings {
                attempts: 4,
                delay_ms: 250,
            },
            mount: RetrySettings {
                attempts: 10,
                delay_ms: 500,
            },
            start: RetrySettings {
                attempts: 5,
                delay_ms: 200,
            },
            connect: RetrySettings {
                attempts: 5,
                delay_ms: 1000,
            },
            play: RetrySettings {
                attempts: 10,
                delay_ms: 250,
            },
            lock: RetrySettings {
                attempts: 3,
                delay_ms: 500,
            },
        }
    }
}

/// Static settings of one orchestration run. Immutable for the process
/// lifetime; owned by `main`, read by every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HotplugConfig {
    /// Working directory: generated config, pid file, daemon state.
    pub control_dir: PathBuf,
    /// Daemon binary, launched with the generated config as sole argument.
    pub daemon_bin: PathBuf,
    /// Control-protocol endpoint.
    pub mpd_host: String,
    pub mpd_port: u16,
    /// 0 = platform default (no explicit socket timeout).
    pub connect_timeout_ms: u64,
    /// Devices show up under `<mount_root>/<last device-path segment>`.
    pub mount_root: PathBuf,
    /// Config template; `None` = embedded default template.
    pub template_file: Option<PathBuf>,
    /// Token substituted with the mount point during generation.
    pub placeholder: String,
    /// Whether a daemon that refuses to die blocks the rest of the run.
    pub proceed_after_stop_timeout: bool,
    pub retries: RetryTable,
}

impl Default for HotplugConfig {
    fn default() -> Self {
        Self {
            control_dir: PathBuf::from("/media/ram/mpd"),
            daemon_bin: PathBuf::from("/usr/bin/mpd"),
            mpd_host: "localhost".to_string(),
            mpd_port: 6600,
            connect_timeout_ms: 0,
            mount_root: PathBuf::from("/media"),
            template_file: None,
            placeholder: "%ROOT%".to_string(),
            proceed_after_stop_timeout: true,
            retries: RetryTable::default(),
        }
    }
}

impl HotplugConfig {
    /// Loads the configuration, trying locations in order: explicit path,
    /// `PMOHOTPLUG_CONFIG`, `/etc/pmohotplug.yaml`, the user config dir,
    /// and finally the embedded defaults. An explicitly named file that
    /// cannot be read is a static fault.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!(path = %path.display(), "loading config from command line");
            return Self::from_file(path);
        }
        if let Ok(env_path) = env::var(ENV_CONFIG_FILE) {
            info!(env_var = ENV_CONFIG_FILE, path = %env_path, "loading config from env");
            return Self::from_file(Path::new(&env_path));
        }
        let etc = Path::new(ETC_CONFIG_FILE);
        if etc.exists() {
            info!(path = ETC_CONFIG_FILE, "loading system config");
            return Self::from_file(etc);
        }
        if let Some(config_dir) = dirs::config_dir() {
            let user = config_dir.join(USER_CONFIG_FILE);
            if user.exists() {
                info!(path = %user.display(), "loading user config");
                return Self::from_file(&user);
            }
        }
        info!("no config file found, using embedded defaults");
        Self::embedded()
    }

    /// Parses one YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// The embedded default document, parsed.
    pub fn embedded() -> Result<Self> {
        serde_yaml::from_str(DEFAULT_CONFIG).context("embedded default config is invalid")
    }

    /// Embedded daemon-config template, used when `template_file` is
    /// absent.
    pub fn default_template() -> &'static str {
        DEFAULT_TEMPLATE
    }

    pub fn config_file(&self) -> PathBuf {
        self.control_dir.join("mpd.conf")
    }

    pub fn pid_file(&self) -> PathBuf {
        self.control_dir.join("mpd.pid")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.control_dir.join("pmohotplug.lock")
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
