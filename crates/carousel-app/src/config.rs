//! Editor configuration.

use carousel_core::objects::DEFAULT_FONT_FAMILY;
use carousel_core::project::DEFAULT_SIGNED_URL_TTL;
use carousel_render::parse_css_color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid preview scale {0}")]
    PreviewScale(f64),
    #[error("Invalid selection color {0:?}")]
    SelectionColor(String),
}

/// Settings for an editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// On-screen preview scale. Exports always compensate to 1:1.
    pub preview_scale: f64,
    /// Directory of `.ttf`/`.otf` files used for text.
    pub font_dir: Option<PathBuf>,
    pub default_font_family: String,
    /// Lifetime of asset URLs signed at load.
    pub signed_url_ttl_secs: u64,
    pub selection_color: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            preview_scale: 0.5,
            font_dir: None,
            default_font_family: DEFAULT_FONT_FAMILY.to_string(),
            signed_url_ttl_secs: DEFAULT_SIGNED_URL_TTL.as_secs(),
            selection_color: "#3b82f6".to_string(),
        }
    }
}

impl EditorConfig {
    /// Read a JSON config file; missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.preview_scale.is_finite() || self.preview_scale <= 0.0 {
            return Err(ConfigError::PreviewScale(self.preview_scale));
        }
        if parse_css_color(&self.selection_color).is_none() {
            return Err(ConfigError::SelectionColor(self.selection_color.clone()));
        }
        Ok(())
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }
}
