//! Project directory contract.
//!
//! A fixed layout of source and output sub-paths, constructed once at
//! startup from [`SiteConfig`] and passed explicitly into the registry,
//! graph builders, and watch rules. No ambient global state.

use crate::config::SiteConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Structural layout error. Always fatal.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A required source directory is missing
    #[error("Required source directory not found: {0}")]
    MissingSourceDir(PathBuf),
}

/// Resolved project layout: every directory and fixed artifact the
/// pipeline reads or writes.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Project root (where sitepipe.toml lives)
    pub root: PathBuf,

    // Source side
    /// Development sources root
    pub dev_dir: PathBuf,
    /// Markup fragments (shared includes)
    pub fragments_dir: PathBuf,
    /// Markup pages (one file per page; the entry page lives here too)
    pub pages_dir: PathBuf,
    /// Stylesheet sources
    pub styles_dir: PathBuf,
    /// Script sources
    pub scripts_dir: PathBuf,
    /// Raster image sources
    pub images_dir: PathBuf,
    /// SVG sprite sources (subfolder of the image sources)
    pub sprite_dir: PathBuf,
    /// Favicon sources (subfolder of the image sources)
    pub favicon_dir: PathBuf,
    /// Font sources
    pub fonts_dir: PathBuf,

    // Output side
    /// Working output tree root
    pub work_dir: PathBuf,
    /// Entry page artifact
    pub entry_file: PathBuf,
    /// Concatenated stylesheet artifact
    pub css_file: PathBuf,
    /// Bundled script artifact
    pub js_file: PathBuf,
    /// Built pages output directory
    pub pages_out: PathBuf,
    /// Converted raster images output directory
    pub images_out: PathBuf,
    /// Assembled sprite artifact
    pub sprite_file: PathBuf,
    /// Favicon output directory
    pub favicon_out: PathBuf,
    /// Converted fonts output directory
    pub fonts_out: PathBuf,
    /// Distribution tree root
    pub dist_dir: PathBuf,

    /// Entry page artifact name (also the entry source filename)
    pub entry_name: String,
}

impl ProjectLayout {
    /// Resolve the layout from configuration against a project root.
    pub fn new(config: &SiteConfig, project_root: &Path) -> Self {
        let resolve = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                project_root.join(p)
            }
        };

        let dev = resolve(&config.paths.dev);
        let work = resolve(&config.paths.work);
        let asset_out = work.join("src");

        Self {
            root: project_root.to_path_buf(),
            fragments_dir: dev.join("html-components"),
            pages_dir: dev.join("html-pages"),
            styles_dir: dev.join("scss"),
            scripts_dir: dev.join("js"),
            sprite_dir: dev.join("img").join("sprite"),
            favicon_dir: dev.join("img").join("favicon"),
            images_dir: dev.join("img"),
            fonts_dir: dev.join("fonts"),
            entry_file: work.join(&config.output.entry_name),
            css_file: work.join(&config.output.css_name),
            js_file: work.join(&config.output.js_name),
            pages_out: asset_out.join("html-pages"),
            images_out: asset_out.join("img"),
            sprite_file: asset_out.join("svg").join(&config.output.sprite_name),
            favicon_out: asset_out.join("favicon"),
            fonts_out: asset_out.join("fonts"),
            dist_dir: resolve(&config.paths.dist),
            entry_name: config.output.entry_name.clone(),
            dev_dir: dev,
            work_dir: work,
        }
    }

    /// Source directories that must exist before any graph runs.
    ///
    /// The sprite and favicon subfolders are optional: their selectors
    /// simply match nothing when absent.
    pub fn required_source_dirs(&self) -> [&Path; 5] {
        [&self.pages_dir, &self.fragments_dir, &self.styles_dir, &self.scripts_dir, &self.dev_dir]
    }

    /// Verify the required source directories exist.
    pub fn ensure_sources_exist(&self) -> Result<(), LayoutError> {
        for dir in self.required_source_dirs() {
            if !dir.is_dir() {
                return Err(LayoutError::MissingSourceDir(dir.to_path_buf()));
            }
        }
        Ok(())
    }

    /// Generated paths inside the working tree, removed by the clean step.
    ///
    /// Source directories under `dev_dir` are never listed here.
    pub fn generated_work_paths(&self) -> Vec<PathBuf> {
        vec![
            self.entry_file.clone(),
            self.css_file.clone(),
            self.js_file.clone(),
            self.work_dir.join("src"),
        ]
    }

    /// Source path of the entry page.
    pub fn entry_source(&self) -> PathBuf {
        self.pages_dir.join(&self.entry_name)
    }

    /// Express `path` relative to the project root where possible.
    ///
    /// Used for log lines and watch-pattern matching.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}
