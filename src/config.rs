//! Viewer configuration

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::viewer::{ViewMode, DEFAULT_CACHE_SIZE, DEFAULT_WORKERS};

/// Recognized viewer options.
///
/// Unknown or missing fields fall back to defaults, so a configuration file
/// only needs the options it changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// First page shown after a document loads (1-indexed)
    #[serde(default = "default_initial_page")]
    pub initial_page: usize,

    /// Scale factor applied before any zoom operation
    #[serde(default = "default_initial_scale")]
    pub initial_scale: f32,

    #[serde(default = "default_min_scale")]
    pub min_scale: f32,

    #[serde(default = "default_max_scale")]
    pub max_scale: f32,

    /// Multiplier used by zoom in/out steps
    #[serde(default = "default_scale_step")]
    pub scale_step: f32,

    #[serde(default)]
    pub view_mode: ViewMode,

    /// Whether the presentation layer should draw its toolbar; carried here
    /// so one config object describes the whole viewer
    #[serde(default = "default_true")]
    pub show_controls: bool,

    /// Render worker threads per loaded document
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Surface cache capacity (entries)
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_initial_page() -> usize {
    1
}

fn default_initial_scale() -> f32 {
    1.0
}

fn default_min_scale() -> f32 {
    0.3
}

fn default_max_scale() -> f32 {
    3.0
}

fn default_scale_step() -> f32 {
    1.2
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            initial_page: default_initial_page(),
            initial_scale: default_initial_scale(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            scale_step: default_scale_step(),
            view_mode: ViewMode::default(),
            show_controls: true,
            workers: default_workers(),
            cache_size: default_cache_size(),
        }
    }
}

/// Errors from configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

impl ViewerConfig {
    /// Load configuration from a YAML file and repair inconsistent values
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config.normalized())
    }

    /// Repair out-of-range values, falling back to defaults where a setting
    /// makes no sense.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if !self.min_scale.is_finite() || self.min_scale <= 0.0 {
            warn!("min_scale {} out of range, using default", self.min_scale);
            self.min_scale = default_min_scale();
        }
        if !self.max_scale.is_finite() || self.max_scale < self.min_scale {
            warn!("max_scale {} out of range, using default", self.max_scale);
            self.max_scale = default_max_scale().max(self.min_scale);
        }
        if !self.initial_scale.is_finite() {
            self.initial_scale = default_initial_scale();
        }
        self.initial_scale = self.initial_scale.clamp(self.min_scale, self.max_scale);

        if !self.scale_step.is_finite() || self.scale_step <= 1.0 {
            warn!("scale_step {} out of range, using default", self.scale_step);
            self.scale_step = default_scale_step();
        }

        if self.initial_page == 0 {
            self.initial_page = 1;
        }
        if self.workers == 0 {
            self.workers = 1;
        }
        if self.cache_size == 0 {
            self.cache_size = 1;
        }

        self
    }
}
