//! Path layout and optional overrides.
//!
//! Defaults describe the layout the backend's compose file expects. An
//! optional `~/.keyplace/config.toml` may override any of them; every
//! section uses `#[serde(default)]` so an empty file is valid.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// File name of the service-account key, both at the source and destination.
pub const KEY_FILE_NAME: &str = "google-credentials.json";

/// Directory (relative to the working directory) the key is installed into.
pub const DESTINATION_DIR: &str = "credentials";

/// Path at which the container runtime mounts the key read-only.
pub const CONTAINER_KEY_PATH: &str = "/app/credentials/google-credentials.json";

/// Service location used when none is configured.
pub const DEFAULT_LOCATION: &str = "us-central1";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Key file naming and destination.
    #[serde(default)]
    pub key: KeyConfig,

    /// Extra locations to search for the key.
    #[serde(default)]
    pub search: SearchConfig,

    /// Values rendered into the container environment.
    #[serde(default)]
    pub container: ContainerConfig,
}

/// Key file naming and destination.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    /// File name searched for in every candidate directory.
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Destination directory, relative to the working directory unless absolute.
    #[serde(default = "default_destination_dir")]
    pub destination_dir: PathBuf,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            destination_dir: default_destination_dir(),
        }
    }
}

/// Additional candidate directories.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfig {
    /// Directories searched after the built-in candidates, in order.
    #[serde(default)]
    pub extra_dirs: Vec<PathBuf>,
}

/// Container-side wiring.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerConfig {
    /// Path the key is mounted at inside the container.
    #[serde(default = "default_container_key_path")]
    pub key_path: String,

    /// Cloud project identifier. Falls back to the key's `project_id`.
    #[serde(default)]
    pub project: Option<String>,

    /// Cloud service location.
    #[serde(default = "default_location")]
    pub location: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            key_path: default_container_key_path(),
            project: None,
            location: default_location(),
        }
    }
}

fn default_file_name() -> String {
    KEY_FILE_NAME.to_owned()
}
fn default_destination_dir() -> PathBuf {
    PathBuf::from(DESTINATION_DIR)
}
fn default_container_key_path() -> String {
    CONTAINER_KEY_PATH.to_owned()
}
fn default_location() -> String {
    DEFAULT_LOCATION.to_owned()
}

/// Destination and ordered candidate list for one installer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    /// Fixed destination path.
    pub destination: PathBuf,
    /// Candidate source paths, highest priority first.
    pub candidates: Vec<PathBuf>,
}

impl Config {
    /// Resolve the destination and candidate paths against `home` and `cwd`.
    ///
    /// Candidate order: `~/Downloads`, `~`, the working directory, its
    /// parent, then any configured extra directories.
    pub fn install_paths(&self, home: &Path, cwd: &Path) -> InstallPaths {
        let name = self.key.file_name.as_str();

        let mut candidates = vec![home.join("Downloads").join(name), home.join(name)];
        candidates.push(cwd.join(name));
        if let Some(parent) = cwd.parent() {
            candidates.push(parent.join(name));
        }
        candidates.extend(self.search.extra_dirs.iter().map(|dir| dir.join(name)));

        InstallPaths {
            destination: self.destination(cwd),
            candidates,
        }
    }

    /// Destination path of the installed key.
    pub fn destination(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.key.destination_dir).join(&self.key.file_name)
    }
}

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    Ok(config)
}

/// Load configuration from `path`, or defaults when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_or_default(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    load_config(path)
}

/// Resolve the invoking user's home directory.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn home_dir() -> anyhow::Result<PathBuf> {
    let base = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(base.home_dir().to_path_buf())
}

/// Resolve the default config directory (`~/.keyplace/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    Ok(home_dir()?.join(".keyplace"))
}

/// Default config file path (`~/.keyplace/config.toml`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
