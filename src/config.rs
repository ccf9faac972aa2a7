use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Environment variable naming a config file to use instead of the default
pub const CONFIG_ENV: &str = "PIPESH_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config parse error in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// ── Final (merged) config types ──

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub shell: ShellConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShellConfig {
    pub prompt: String,
    pub history_capacity: usize,
    /// Empty keeps history in memory only
    pub history_file: String,
    pub notify_jobs: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: String,
    /// Empty logs to stderr
    pub file: String,
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    shell: ShellOverlay,
    #[serde(default)]
    log: LogOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct ShellOverlay {
    prompt: Option<String>,
    history_capacity: Option<usize>,
    history_file: Option<String>,
    notify_jobs: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct LogOverlay {
    level: Option<String>,
    file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        let mut config: Config =
            toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse");
        config.normalize();
        config
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the first overlay found: `$PIPESH_CONFIG`, then `explicit`,
    ///    then ~/.config/pipesh/config.toml
    ///
    /// A file that fails to parse is reported and ignored.
    pub fn load(explicit: Option<&Path>) -> Self {
        let mut config = Self::default_config();
        let Some(path) = Self::overlay_path(explicit) else {
            return config;
        };
        match Self::read_overlay(&path) {
            Ok(overlay) => {
                log::debug!("using config overlay {}", path.display());
                config.apply_overlay(overlay);
            }
            Err(e) => {
                log::warn!("{}", e);
                eprintln!("pipesh: {e}");
            }
        }
        config
    }

    fn overlay_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let home = std::env::var_os("HOME")?;
        let path = Path::new(&home).join(".config/pipesh/config.toml");
        path.exists().then_some(path)
    }

    fn read_overlay(path: &Path) -> Result<ConfigOverlay, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply an overlay on top of this config (scalars override)
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let s = overlay.shell;
        if let Some(v) = s.prompt {
            self.shell.prompt = v;
        }
        if let Some(v) = s.history_capacity {
            self.shell.history_capacity = v;
        }
        if let Some(v) = s.history_file {
            self.shell.history_file = v;
        }
        if let Some(v) = s.notify_jobs {
            self.shell.notify_jobs = v;
        }

        let l = overlay.log;
        if let Some(v) = l.level {
            self.log.level = v;
        }
        if let Some(v) = l.file {
            self.log.file = v;
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        self.shell.history_capacity = self.shell.history_capacity.max(1);
    }

    /// History file with `~` expanded, if one is configured
    pub fn history_path(&self) -> Option<PathBuf> {
        expand_path(&self.shell.history_file)
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

/// Expand `~` in a configured path; empty means unset
pub(crate) fn expand_path(raw: &str) -> Option<PathBuf> {
    if raw.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(shellexpand::tilde(raw).into_owned()))
}
