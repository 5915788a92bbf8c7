//! Configuration loading and discovery for `sitepipe.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::SiteConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse sitepipe.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override development sources root
    pub dev: Option<PathBuf>,
    /// Override working output tree
    pub work: Option<PathBuf>,
    /// Override distribution tree
    pub dist: Option<PathBuf>,
    /// Override coalescing window
    pub coalesce_ms: Option<u32>,
    /// Override publish directory for deploy
    pub publish_dir: Option<PathBuf>,
}

/// Find sitepipe.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find sitepipe.toml by walking up from a specific directory.
///
/// This is the internal implementation that allows specifying the start
/// directory, useful for testing.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join("sitepipe.toml");
        if config_path.exists() {
            return Some(config_path);
        }

        // Move to parent directory
        if !current.pop() {
            // Reached root, no config found
            return None;
        }
    }
}

/// Load configuration from a sitepipe.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses
/// `find_config()` to locate the config file. If no config file is found,
/// returns a default configuration named after the current directory.
pub fn load_config(path: Option<&Path>) -> Result<SiteConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: SiteConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Create a default configuration when no sitepipe.toml is found.
///
/// Returns a minimal valid configuration with the site name set to the
/// current directory name.
pub fn default_config() -> SiteConfig {
    let site_name = env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "unnamed".to_string());

    let toml = format!("[project]\nname = \"{}\"\n", site_name);
    toml::from_str(&toml).unwrap_or_else(|_| {
        // Directory names with quotes fall back to a fixed name
        toml::from_str("[project]\nname = \"unnamed\"\n").expect("static default config parses")
    })
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut SiteConfig, overrides: &CliOverrides) {
    if let Some(ref dev) = overrides.dev {
        config.paths.dev = dev.clone();
    }

    if let Some(ref work) = overrides.work {
        config.paths.work = work.clone();
    }

    if let Some(ref dist) = overrides.dist {
        config.paths.dist = dist.clone();
    }

    if let Some(coalesce_ms) = overrides.coalesce_ms {
        config.watch.coalesce_ms = coalesce_ms;
    }

    if let Some(ref publish_dir) = overrides.publish_dir {
        config.deploy.publish_dir = Some(publish_dir.clone());
    }
}

/// Get the project root directory from a config file path.
///
/// Returns the parent directory of the sitepipe.toml file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("sitepipe.toml");
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"[project]\nname = \"test\"")
            .expect("should write config content");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("sitepipe.toml");
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"[project]\nname = \"test\"")
            .expect("should write config content");

        let subdir = temp.path().join("app").join("dev");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("sitepipe.toml");
        File::create(&config_path)
            .expect("should create config file")
            .write_all(
                br#"
[project]
name = "my-site"
version = "2.0.0"

[watch]
debounce_ms = 250
"#,
            )
            .expect("should write config content");

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(config.project.name, "my-site");
        assert_eq!(config.project.version, "2.0.0");
        assert_eq!(config.watch.debounce_ms, 250);
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("nonexistent.toml");

        let result = load_config(Some(&config_path));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("sitepipe.toml");
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"this is not valid toml {{{")
            .expect("should write invalid config");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("sitepipe.toml");
        File::create(&config_path)
            .expect("should create config file")
            .write_all(
                br#"
[project]
name = ""

[watch]
debounce_ms = 0
"#,
            )
            .expect("should write invalid config");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_merge_cli_overrides_paths() {
        let mut config = default_config();
        let overrides = CliOverrides {
            dev: Some(PathBuf::from("site/dev")),
            work: Some(PathBuf::from("site")),
            dist: Some(PathBuf::from("out")),
            ..Default::default()
        };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.paths.dev, PathBuf::from("site/dev"));
        assert_eq!(config.paths.work, PathBuf::from("site"));
        assert_eq!(config.paths.dist, PathBuf::from("out"));
    }

    #[test]
    fn test_merge_cli_overrides_coalesce() {
        let mut config = default_config();
        assert_eq!(config.watch.coalesce_ms, 0);

        let overrides = CliOverrides { coalesce_ms: Some(75), ..Default::default() };
        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.watch.coalesce_ms, 75);
    }

    #[test]
    fn test_merge_cli_overrides_publish_dir() {
        let mut config = default_config();
        let overrides =
            CliOverrides { publish_dir: Some(PathBuf::from("public")), ..Default::default() };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.deploy.publish_dir, Some(PathBuf::from("public")));
    }

    #[test]
    fn test_project_root() {
        let config_path = Path::new("/project/sitepipe.toml");
        assert_eq!(project_root(config_path), Some(Path::new("/project")));
    }

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert!(!config.project.name.is_empty());
        assert_eq!(config.project.version, "0.1.0");
        assert!(config.is_valid());
    }
}
