//! Widget configuration loaded from TOML.

use std::path::Path;

use htmltext_types::error::{HtmlTextError, Result};
use serde::{Deserialize, Serialize};

use crate::markup::DEFAULT_MAX_DEPTH;
use crate::pipeline::ConvertOptions;
use crate::resolve::ResolutionStrategy;

/// Top-level configuration (`htmltext.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlTextConfig {
    /// Strip trailing newlines from converted text.
    #[serde(default)]
    pub trim_trailing_blank_lines: bool,
    /// Replace ASCII emoticons with inline images before parsing.
    #[serde(default)]
    pub symbolic_text: bool,
    /// Report only link hits as consumed touches.
    #[serde(default = "yes")]
    pub suppress_non_link_touches: bool,
    /// Element nesting beyond this depth is treated as text.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub images: ImagesConfig,
}

/// `[images]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// `"local"` or `"remote"`.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Base URL prepended to relative references under `remote`.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn yes() -> bool {
    true
}
fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}
fn default_strategy() -> String {
    "remote".to_string()
}

impl Default for HtmlTextConfig {
    fn default() -> Self {
        Self {
            trim_trailing_blank_lines: false,
            symbolic_text: false,
            suppress_non_link_touches: true,
            max_depth: DEFAULT_MAX_DEPTH,
            images: ImagesConfig::default(),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            base_url: None,
        }
    }
}

impl ImagesConfig {
    /// The configured strategy. A `base_url` only applies to `remote`.
    pub fn strategy(&self) -> Result<ResolutionStrategy> {
        let strategy: ResolutionStrategy = self.strategy.parse()?;
        Ok(match (strategy, &self.base_url) {
            (ResolutionStrategy::Remote { base: None }, Some(base)) => {
                ResolutionStrategy::remote(base.clone())
            },
            (strategy, _) => strategy,
        })
    }
}

impl HtmlTextConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HtmlTextError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(HtmlTextError::Config("max_depth must be at least 1".into()));
        }
        self.images.strategy().map(|_| ())
    }

    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            trim_trailing_blank_lines: self.trim_trailing_blank_lines,
            substitute_symbolic_text: self.symbolic_text,
            max_depth: self.max_depth,
        }
    }
}
