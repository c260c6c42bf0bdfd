//! Application configuration for StepGuide.
//!
//! User config lives at `~/.stepguide/stepguide.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StepGuideError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "stepguide.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".stepguide";

// ---------------------------------------------------------------------------
// Config structs (matching stepguide.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Article search settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Where articles come from.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Feature toggles consumed by the presentation layers.
    #[serde(default)]
    pub features: FeaturesConfig,

    /// Fallback selection policy.
    #[serde(default)]
    pub fallback: FallbackConfig,
}

/// Which retrieval strategy backs article search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Keyword scorer over the loaded catalog.
    #[default]
    Keyword,
    /// Fixed list of article ids (demos, tests).
    Pinned,
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum number of matches returned per search.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Retrieval provider.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Article ids returned by the pinned provider, in order.
    #[serde(default)]
    pub pinned_ids: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            provider: ProviderKind::default(),
            pinned_ids: Vec::new(),
        }
    }
}

fn default_top_n() -> usize {
    3
}

/// `[catalog]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON catalog file. The built-in sample catalog is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// `[features]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Scan a page for text to pre-populate the first search.
    #[serde(default)]
    pub page_scan: bool,

    /// HTML page scanned when `page_scan` is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_path: Option<PathBuf>,

    /// Show a short "typing" spinner before guided messages (CLI only).
    #[serde(default = "default_true")]
    pub typing_indicator: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            page_scan: false,
            page_path: None,
            typing_indicator: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[fallback]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Minimum shared tokens before another article's fallback is offered.
    #[serde(default = "default_min_overlap")]
    pub min_overlap: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            min_overlap: default_min_overlap(),
        }
    }
}

fn default_min_overlap() -> usize {
    1
}

impl AppConfig {
    /// Reject values that would make the core misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_n == 0 {
            return Err(StepGuideError::config("retrieval.top_n must be at least 1"));
        }
        if self.retrieval.provider == ProviderKind::Pinned && self.retrieval.pinned_ids.is_empty()
        {
            return Err(StepGuideError::config(
                "retrieval.provider = \"pinned\" requires retrieval.pinned_ids",
            ));
        }
        if self.features.page_scan && self.features.page_path.is_none() {
            return Err(StepGuideError::config(
                "features.page_scan is enabled but features.page_path is not set",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.stepguide/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| StepGuideError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.stepguide/stepguide.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| StepGuideError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        StepGuideError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| StepGuideError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| StepGuideError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| StepGuideError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
