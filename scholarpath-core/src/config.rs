//! Configuration system for ScholarPath.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/scholarpath/config.toml` and/or
//! `.scholarpath/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::Level;

/// Paper counts offered by the roadmap view.
pub const PAPER_COUNT_CHOICES: [u32; 5] = [5, 10, 15, 20, 30];

/// The backend never returns more than this many papers per concept.
pub const MAX_PAPER_COUNT: u32 = 30;

/// Top-level configuration for ScholarPath.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuideConfig {
    pub backend: BackendConfig,
    pub roadmap: RoadmapConfig,
    pub explain: ExplainConfig,
    pub ui: UiConfig,
}

/// Where and how to reach the research backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend; figure images are resolved against its origin.
    pub base_url: String,
    /// Whole-request timeout in seconds. LLM-backed endpoints are slow.
    pub timeout_secs: u64,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 300,
            connect_timeout_secs: 10,
            user_agent: format!("ScholarPath/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl BackendConfig {
    /// Parse the configured base URL.
    pub fn parsed_base_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.base_url).map_err(|e| ConfigError::Invalid {
            message: format!("backend.base_url '{}' is not a valid URL: {}", self.base_url, e),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapConfig {
    /// Number of papers requested per concept (advisory to the backend).
    pub paper_count: u32,
}

impl Default for RoadmapConfig {
    fn default() -> Self {
        Self { paper_count: 5 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExplainConfig {
    /// Level selected when a session starts.
    pub default_level: Level,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Column at which rendered text wraps.
    pub wrap_width: usize,
    /// Emit ANSI colors and markdown styling.
    pub color: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            wrap_width: 100,
            color: true,
        }
    }
}

impl GuideConfig {
    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.parsed_base_url()?;
        if !(1..=MAX_PAPER_COUNT).contains(&self.roadmap.paper_count) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "roadmap.paper_count must be between 1 and {}, got {}",
                    MAX_PAPER_COUNT, self.roadmap.paper_count
                ),
            });
        }
        if self.ui.wrap_width < 20 {
            return Err(ConfigError::Invalid {
                message: format!("ui.wrap_width must be at least 20, got {}", self.ui.wrap_width),
            });
        }
        Ok(())
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "scholarpath", "scholarpath")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".scholarpath").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `SCHOLARPATH_`)
/// 3. Workspace-local config (`.scholarpath/config.toml`)
/// 4. User config (`~/.config/scholarpath/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&GuideConfig>,
) -> Result<GuideConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(GuideConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // SCHOLARPATH_BACKEND__BASE_URL, SCHOLARPATH_ROADMAP__PAPER_COUNT, etc.
    figment = figment.merge(Env::prefixed("SCHOLARPATH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

/// Check whether any ScholarPath configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        return true;
    }
    workspace
        .map(|ws| workspace_config_path(ws).exists())
        .unwrap_or(false)
}

/// Write the default configuration to `<workspace>/.scholarpath/config.toml`.
///
/// Returns the path and whether a new file was created; an existing file is left alone.
pub fn write_default_config(workspace: &Path) -> Result<(PathBuf, bool), ConfigError> {
    let config_path = workspace_config_path(workspace);
    if config_path.exists() {
        return Ok((config_path, false));
    }
    let write_error = |message: String| ConfigError::Write {
        path: config_path.display().to_string(),
        message,
    };
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| write_error(e.to_string()))?;
    }
    let toml_str = toml::to_string_pretty(&GuideConfig::default())
        .map_err(|e| write_error(e.to_string()))?;
    std::fs::write(&config_path, toml_str).map_err(|e| write_error(e.to_string()))?;
    Ok((config_path, true))
}
