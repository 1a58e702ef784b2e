//! Process settings
//!
//! Built once at startup and shared by reference. Sources, lowest precedence
//! first: built-in defaults, a TOML file, `FLEETCHECK_*` environment
//! variables, then explicit command-line flags applied by the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "FLEETCHECK_CONFIG";
/// Environment override for the project root
pub const ROOT_ENV: &str = "FLEETCHECK_ROOT";
/// Environment override for the inventory path
pub const INVENTORY_ENV: &str = "FLEETCHECK_INVENTORY";
/// Environment override for the runner directory
pub const RUNNER_DIR_ENV: &str = "FLEETCHECK_RUNNER_DIR";

const CONFIG_FILE: &str = "fleetcheck.toml";

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// File these settings were read from
    #[serde(skip)]
    source: Option<PathBuf>,
}

/// Filesystem locations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Base for relative paths (defaults to the working directory)
    pub project_root: Option<PathBuf>,
    /// Inventory file (defaults to `<root>/inventory/hosts`)
    pub inventory: Option<PathBuf>,
    /// Directory for saved reports (defaults to `<root>/.fleetcheck`)
    pub runner_dir: Option<PathBuf>,
}

/// Diagnostic run tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Hosts diagnosed concurrently
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Per-host command timeout
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// RISU executable on the target hosts
    #[serde(default = "default_risu_binary")]
    pub risu_binary: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            command_timeout_secs: default_command_timeout_secs(),
            risu_binary: default_risu_binary(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            log_level: default_log_level(),
            source: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_batch_size() -> usize {
    4
}

fn default_command_timeout_secs() -> u64 {
    600
}

fn default_risu_binary() -> String {
    "risu".to_string()
}

impl Settings {
    /// Parse settings from TOML text
    ///
    /// # Errors
    /// Returns `CoreError::Config` if the text is not valid settings TOML
    pub fn from_toml_str(text: &str) -> Result<Self, CoreError> {
        toml::from_str(text).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Load settings from a file
    ///
    /// # Errors
    /// Returns `CoreError::Config` if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
        let mut settings: Self = toml::from_str(&content)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "settings loaded");
        settings.source = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Load from the process environment and default paths
    ///
    /// # Errors
    /// Returns `CoreError::Config` if a config file exists but is invalid
    pub fn load_default() -> Result<Self, CoreError> {
        Self::discover(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` for environment variables
    ///
    /// File discovery: `$FLEETCHECK_CONFIG`, `./fleetcheck.toml`,
    /// `/etc/fleetcheck/fleetcheck.toml`, then the user config directory.
    /// Without a file the defaults are used. Environment overrides are
    /// applied on top either way, then paths are resolved.
    ///
    /// # Errors
    /// Returns `CoreError::Config` if a config file exists but is invalid
    pub fn discover<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match lookup(CONFIG_ENV).filter(|p| !p.is_empty()) {
            Some(path) => Self::load(Path::new(&path))?,
            None => {
                let candidates = [
                    Some(PathBuf::from(CONFIG_FILE)),
                    Some(PathBuf::from("/etc/fleetcheck").join(CONFIG_FILE)),
                    dirs::config_dir().map(|dir| dir.join("fleetcheck").join(CONFIG_FILE)),
                ];
                match candidates.into_iter().flatten().find(|path| path.exists()) {
                    Some(path) => Self::load(&path)?,
                    None => {
                        debug!("no config file found");
                        Self::default()
                    }
                }
            }
        };

        settings.apply_env(lookup);
        settings.resolve_paths();
        Ok(settings)
    }

    /// File the settings came from, `None` when only defaults apply
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Fix the project root, inventory and runner directory as absolute paths
    ///
    /// The working directory is read once here; afterwards the accessors
    /// return the stored values.
    pub fn resolve_paths(&mut self) {
        let root = self.project_root();
        let root = std::path::absolute(&root).unwrap_or(root);
        let under_root = |path: &Option<PathBuf>, default: &[&str]| match path {
            Some(path) => root.join(expand_home(path)),
            None => default.iter().fold(root.clone(), |dir, part| dir.join(part)),
        };

        self.paths.inventory = Some(under_root(&self.paths.inventory, &["inventory", "hosts"]));
        self.paths.runner_dir = Some(under_root(&self.paths.runner_dir, &[".fleetcheck"]));
        self.paths.project_root = Some(root);
    }

    /// Apply `FLEETCHECK_*` overrides
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        if let Some(root) = path(ROOT_ENV) {
            self.paths.project_root = Some(root);
        }
        if let Some(inventory) = path(INVENTORY_ENV) {
            self.paths.inventory = Some(inventory);
        }
        if let Some(runner_dir) = path(RUNNER_DIR_ENV) {
            self.paths.runner_dir = Some(runner_dir);
        }
    }

    /// Base directory for relative paths
    #[must_use]
    pub fn project_root(&self) -> PathBuf {
        self.paths
            .project_root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Configured inventory file
    #[must_use]
    pub fn inventory_path(&self) -> PathBuf {
        let root = self.project_root();
        match &self.paths.inventory {
            Some(path) => root.join(expand_home(path)),
            None => root.join("inventory").join("hosts"),
        }
    }

    /// Directory for saved reports
    #[must_use]
    pub fn runner_dir(&self) -> PathBuf {
        let root = self.project_root();
        match &self.paths.runner_dir {
            Some(path) => root.join(expand_home(path)),
            None => root.join(".fleetcheck"),
        }
    }

    /// Hosts diagnosed concurrently, at least 1
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.diagnostics.batch_size.max(1)
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.diagnostics.command_timeout_secs)
    }
}

/// Expand a leading `~/`
///
/// Absolute results make `root.join` return them unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest)),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.diagnostics.batch_size, 4);
        assert_eq!(settings.command_timeout(), Duration::from_secs(600));
        assert_eq!(settings.diagnostics.risu_binary, "risu");
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_partial_toml() {
        let settings = Settings::from_toml_str(
            r#"
log_level = "debug"

[paths]
project_root = "/srv/fleet"
inventory = "inv/prod"

[diagnostics]
batch_size = 8
"#,
        )
        .unwrap();

        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.diagnostics.batch_size, 8);
        assert_eq!(settings.diagnostics.command_timeout_secs, 600);
        assert_eq!(settings.inventory_path(), PathBuf::from("/srv/fleet/inv/prod"));
        assert_eq!(settings.runner_dir(), PathBuf::from("/srv/fleet/.fleetcheck"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Settings::from_toml_str("[diagnostics]\nbatch_size = \"many\"").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.paths.inventory = Some(PathBuf::from("from-file"));
        settings.apply_env(env(&[
            (ROOT_ENV, "/opt/fleet"),
            (INVENTORY_ENV, "/etc/ansible/hosts"),
            (RUNNER_DIR_ENV, ""),
        ]));

        assert_eq!(settings.project_root(), PathBuf::from("/opt/fleet"));
        assert_eq!(settings.inventory_path(), PathBuf::from("/etc/ansible/hosts"));
        assert_eq!(settings.runner_dir(), PathBuf::from("/opt/fleet/.fleetcheck"));
    }

    #[test]
    fn test_discover_from_env_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[diagnostics]\nrisu_binary = \"/usr/bin/risu\"\n").unwrap();

        let settings = Settings::discover(env(&[
            (CONFIG_ENV, path.to_str().unwrap()),
            (ROOT_ENV, "/root/project"),
        ]))
        .unwrap();

        assert_eq!(settings.diagnostics.risu_binary, "/usr/bin/risu");
        assert_eq!(settings.inventory_path(), PathBuf::from("/root/project/inventory/hosts"));
    }

    #[test]
    fn test_settings_source() {
        assert_eq!(Settings::default().source(), None);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleetcheck.toml");
        std::fs::write(&path, "log_level = \"warn\"\n").unwrap();

        let settings = Settings::discover(env(&[(CONFIG_ENV, path.to_str().unwrap())])).unwrap();
        assert_eq!(settings.source(), Some(path.as_path()));
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn test_load_error_wrapped_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[diagnostics]\nbatch_size = \"many\"\n").unwrap();

        let message = Settings::load(&path).unwrap_err().to_string();
        assert_eq!(message.matches("configuration error:").count(), 1);
        assert!(message.contains("broken.toml"));
    }

    #[test]
    fn test_resolve_paths() {
        let mut settings = Settings::default();
        settings.paths.runner_dir = Some(PathBuf::from("runs"));
        settings.resolve_paths();

        let root = settings.paths.project_root.clone().unwrap();
        let inventory = settings.paths.inventory.clone().unwrap();
        let runner_dir = settings.paths.runner_dir.clone().unwrap();
        assert!(root.is_absolute());
        assert_eq!(inventory, root.join("inventory").join("hosts"));
        assert_eq!(runner_dir, root.join("runs"));
        assert_eq!(settings.inventory_path(), inventory);
        assert_eq!(settings.runner_dir(), runner_dir);

        let mut pinned = Settings::default();
        pinned.paths.project_root = Some(PathBuf::from("/srv/fleet"));
        pinned.paths.inventory = Some(PathBuf::from("/etc/ansible/hosts"));
        pinned.resolve_paths();
        assert_eq!(pinned.inventory_path(), PathBuf::from("/etc/ansible/hosts"));
        assert_eq!(pinned.runner_dir(), PathBuf::from("/srv/fleet/.fleetcheck"));
    }

    #[test]
    fn test_discover_missing_explicit_file() {
        let err = Settings::discover(env(&[(CONFIG_ENV, "/nonexistent/fleetcheck.toml")]))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/fleetcheck.toml"));
    }

    #[test]
    fn test_batch_size_floor() {
        let mut settings = Settings::default();
        settings.diagnostics.batch_size = 0;
        assert_eq!(settings.batch_size(), 1);
    }
}
