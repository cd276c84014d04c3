//! Finding and layering Forge config files.
//!
//! Two layers are read, the later one winning field by field:
//! 1. user: `config.toml` in `FORGE_CONFIG_DIR`, else `<config dir>/forge/`
//! 2. project: `forge.toml` in the working directory
//!
//! Flags and environment variables are applied by the CLI on top.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{ConfigError, ForgeConfig, Result};

/// Environment variable that relocates the user config directory.
pub const CONFIG_DIR_ENV: &str = "FORGE_CONFIG_DIR";

/// Hosts for which plain http is acceptable.
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

/// Which layer a config file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    User,
    Project,
}

impl ConfigLayer {
    /// File name looked up for this layer.
    pub fn file_name(self) -> &'static str {
        match self {
            ConfigLayer::User => "config.toml",
            ConfigLayer::Project => "forge.toml",
        }
    }
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigLayer::User => "user",
            ConfigLayer::Project => "project",
        })
    }
}

/// What happened to one candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerStatus {
    Missing,
    Loaded,
    /// Present but unreadable or invalid; the message is also in the warnings.
    Rejected(String),
}

/// One candidate file and its outcome.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: ConfigLayer,
    pub path: PathBuf,
    pub status: LayerStatus,
}

impl ConfigSource {
    pub fn is_loaded(&self) -> bool {
        self.status == LayerStatus::Loaded
    }
}

/// The merged configuration plus a record of how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ForgeConfig,
    /// Candidates in precedence order, lowest first.
    pub sources: Vec<ConfigSource>,
    /// Problems worth showing the user; loading still succeeded.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the files that contributed to `config`.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.is_loaded())
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Where to look for config files.
#[derive(Debug, Clone)]
pub struct ConfigDiscovery {
    user_dir: Option<PathBuf>,
    project_dir: PathBuf,
}

impl ConfigDiscovery {
    /// User directory from the environment, project layer in the working directory.
    pub fn from_env() -> Self {
        Self {
            user_dir: user_config_dir(),
            project_dir: PathBuf::new(),
        }
    }

    pub fn user_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_dir = Some(dir.into());
        self
    }

    pub fn project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    /// Candidate files in precedence order, lowest first.
    pub fn candidates(&self) -> Vec<(ConfigLayer, PathBuf)> {
        let user = self
            .user_dir
            .as_ref()
            .map(|dir| (ConfigLayer::User, dir.join(ConfigLayer::User.file_name())));
        let project = (
            ConfigLayer::Project,
            self.project_dir.join(ConfigLayer::Project.file_name()),
        );
        user.into_iter().chain(std::iter::once(project)).collect()
    }

    /// Read every candidate and merge what parses.
    ///
    /// Broken files are skipped with a warning rather than failing the load.
    pub fn load(&self) -> LoadedConfig {
        let mut config = ForgeConfig::new();
        let mut warnings = Vec::new();

        let sources = self
            .candidates()
            .into_iter()
            .map(|(layer, path)| {
                let status = if !path.is_file() {
                    LayerStatus::Missing
                } else {
                    match read_config_file(&path) {
                        Ok(layer_config) => {
                            config.merge(layer_config);
                            LayerStatus::Loaded
                        }
                        Err(e) => {
                            let message =
                                format!("Ignoring {} config {}: {}", layer, path.display(), e);
                            warnings.push(message.clone());
                            LayerStatus::Rejected(message)
                        }
                    }
                };
                ConfigSource {
                    layer,
                    path,
                    status,
                }
            })
            .collect();

        if let Some(url) = insecure_base_url(&config) {
            warnings.push(format!(
                "api.base_url '{}' uses plain http. Passwords and tokens will be sent unencrypted.",
                url
            ));
        }

        LoadedConfig {
            config,
            sources,
            warnings,
        }
    }
}

/// Discover and merge config, with the project layer read from `project_dir`
/// (the working directory when `None`).
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    let mut discovery = ConfigDiscovery::from_env();
    if let Some(dir) = project_dir {
        discovery = discovery.project_dir(dir);
    }
    Ok(discovery.load())
}

/// Parse a single config file, without layering.
pub fn read_config_file(path: &Path) -> Result<ForgeConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    ForgeConfig::from_toml(&contents)
}

/// `FORGE_CONFIG_DIR` when set, else `<platform config dir>/forge`.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join("forge")),
    }
}

fn insecure_base_url(config: &ForgeConfig) -> Option<&str> {
    let url = config.api.base_url.as_deref()?;
    let host = url.strip_prefix("http://")?.split(['/', ':']).next()?;
    (!LOOPBACK_HOSTS.contains(&host)).then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Discovery confined to two fresh directories.
    fn isolated() -> (TempDir, TempDir, ConfigDiscovery) {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let discovery = ConfigDiscovery::from_env()
            .user_dir(user.path())
            .project_dir(project.path());
        (user, project, discovery)
    }

    #[test]
    fn test_candidates_in_precedence_order() {
        let (user, project, discovery) = isolated();
        let candidates = discovery.candidates();
        assert_eq!(
            candidates,
            vec![
                (ConfigLayer::User, user.path().join("config.toml")),
                (ConfigLayer::Project, project.path().join("forge.toml")),
            ]
        );
    }

    #[test]
    fn test_read_config_file_errors() {
        let err = read_config_file(Path::new("/nonexistent/forge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forge.toml");
        fs::write(&path, "[api\nbase_url =").unwrap();
        assert!(matches!(read_config_file(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_nothing_on_disk_gives_defaults() {
        let (_user, _project, discovery) = isolated();
        let loaded = discovery.load();

        assert_eq!(loaded.config, ForgeConfig::default());
        assert!(loaded.loaded_from().is_empty());
        assert!(
            loaded
                .sources
                .iter()
                .all(|s| s.status == LayerStatus::Missing)
        );
    }

    #[test]
    fn test_project_overrides_user_per_field() {
        let (user, project, discovery) = isolated();
        fs::write(
            user.path().join("config.toml"),
            r#"
[api]
base_url = "https://shop.example.com/api/v1/"
timeout_secs = 20

[auth]
staleness_threshold_secs = 1800
"#,
        )
        .unwrap();
        fs::write(project.path().join("forge.toml"), "[api]\ntimeout_secs = 5\n").unwrap();

        let loaded = discovery.load();
        let config = &loaded.config;

        assert_eq!(config.api.base_url(), "https://shop.example.com/api/v1/");
        assert_eq!(config.api.timeout(), Duration::from_secs(5));
        assert_eq!(config.auth.staleness_threshold(), Duration::from_secs(1800));
        assert_eq!(loaded.loaded_from().len(), 2);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_broken_layer_is_skipped_with_warning() {
        let (user, project, discovery) = isolated();
        fs::write(user.path().join("config.toml"), "[auth]\nlogin_path = \"signin/\"\n").unwrap();
        fs::write(project.path().join("forge.toml"), "not valid toml {{{{").unwrap();

        let loaded = discovery.load();

        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].starts_with("Ignoring project config"));
        assert!(matches!(loaded.sources[1].status, LayerStatus::Rejected(_)));
        assert_eq!(loaded.config.auth.login_path.as_deref(), Some("signin/"));
    }

    #[test]
    fn test_plain_http_outside_loopback_warns() {
        let (_user, project, discovery) = isolated();
        let config_path = project.path().join("forge.toml");

        fs::write(&config_path, "[api]\nbase_url = \"http://shop.example.com/api/v1/\"\n").unwrap();
        let loaded = discovery.load();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("plain http"));

        fs::write(&config_path, "[api]\nbase_url = \"http://localhost:8000/api/v1/\"\n").unwrap();
        assert!(discovery.load().warnings.is_empty());

        fs::write(
            &config_path,
            "[api]\nbase_url = \"https://shop.example.com/api/v1/\"\n",
        )
        .unwrap();
        assert!(discovery.load().warnings.is_empty());
    }

    #[test]
    fn test_load_config_reads_given_project_dir() {
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join("forge.toml"),
            "[api]\nbase_url = \"https://project.example.com/api/\"\n",
        )
        .unwrap();

        let loaded = load_config(Some(project.path())).unwrap();
        assert!(
            loaded
                .loaded_from()
                .contains(&project.path().join("forge.toml").as_path())
        );
    }
}
