//! Configuration schema types for `sitepipe.toml`
//!
//! Defines the structure and validation rules for sitepipe project
//! configuration. All paths are relative to the project root unless
//! absolute.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Site name (required), used by scaffolding for the page title
    pub name: String,
    /// Project version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Source and output directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Working output tree root (entry page, css/js bundles land here)
    #[serde(default = "default_work")]
    pub work: PathBuf,
    /// Development sources root
    #[serde(default = "default_dev")]
    pub dev: PathBuf,
    /// Distribution tree for one-shot builds
    #[serde(default = "default_dist")]
    pub dist: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { work: default_work(), dev: default_dev(), dist: default_dist() }
    }
}

fn default_work() -> PathBuf {
    PathBuf::from("app")
}

fn default_dev() -> PathBuf {
    PathBuf::from("app/dev")
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

/// Names of the concatenated output artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Concatenated stylesheet artifact name
    #[serde(default = "default_css_name")]
    pub css_name: String,
    /// Bundled script artifact name
    #[serde(default = "default_js_name")]
    pub js_name: String,
    /// Entry page artifact name
    #[serde(default = "default_entry_name")]
    pub entry_name: String,
    /// Assembled sprite artifact name
    #[serde(default = "default_sprite_name")]
    pub sprite_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            css_name: default_css_name(),
            js_name: default_js_name(),
            entry_name: default_entry_name(),
            sprite_name: default_sprite_name(),
        }
    }
}

fn default_css_name() -> String {
    "main.min.css".to_string()
}

fn default_js_name() -> String {
    "index.min.js".to_string()
}

fn default_entry_name() -> String {
    "index.html".to_string()
}

fn default_sprite_name() -> String {
    "sprite.view.svg".to_string()
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds, minimum 1. This is the watcher's
    /// raw-event batch window and is always on; event coalescing across
    /// batches is controlled separately by `coalesce_ms`.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Coalescing window in milliseconds; 0 disables coalescing so every
    /// change event routes independently
    #[serde(default)]
    pub coalesce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default = "default_true")]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 100, coalesce_ms: 0, clear_screen: true }
    }
}

/// Deploy configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeployConfig {
    /// Directory the distribution tree is published into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_dir: Option<PathBuf>,
}

/// Complete sitepipe.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Project metadata (required)
    pub project: ProjectConfig,
    /// Directory layout
    #[serde(default)]
    pub paths: PathsConfig,
    /// Output artifact names
    #[serde(default)]
    pub output: OutputConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
    /// Deploy settings
    #[serde(default)]
    pub deploy: DeployConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "output.css_name")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sitepipe.toml: '{}' {}", self.field, self.message)
    }
}

impl SiteConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.project.name.is_empty() {
            errors.push(ConfigValidationError {
                field: "project.name".to_string(),
                message: "must be a non-empty string".to_string(),
            });
        }

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        if !self.output.css_name.ends_with(".css") {
            errors.push(ConfigValidationError {
                field: "output.css_name".to_string(),
                message: "must end with .css".to_string(),
            });
        }

        if !self.output.js_name.ends_with(".js") {
            errors.push(ConfigValidationError {
                field: "output.js_name".to_string(),
                message: "must end with .js".to_string(),
            });
        }

        if !self.output.entry_name.ends_with(".html") {
            errors.push(ConfigValidationError {
                field: "output.entry_name".to_string(),
                message: "must end with .html".to_string(),
            });
        }

        // Dist and work must be distinct trees so their cleans can run
        // concurrently in the build graph.
        if self.paths.dist == self.paths.work {
            errors.push(ConfigValidationError {
                field: "paths.dist".to_string(),
                message: "must differ from paths.work".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
