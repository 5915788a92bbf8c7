//! Command-line interface.
//!
//! Dispatches to submodules for each command. Configuration errors exit
//! with `EXIT_INVALID_ARGS`; structural build failures exit with
//! `EXIT_ERROR`; recoverable transform failures are reported but do not
//! fail the process in watch mode.

mod build;
mod dev;
mod pipeline;
mod scaffold;

use crate::config::{
    find_config, load_config, merge_cli_overrides, project_root, CliOverrides, SiteConfig,
};
use crate::layout::ProjectLayout;
use crate::transform::TransformRegistry;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Sitepipe - build pipeline for hand-rolled static sites
#[derive(Parser)]
#[command(name = "sitepipe")]
#[command(about = "Sitepipe - asset pipeline and dev loop for static sites")]
#[command(version)]
pub struct Cli {
    /// Path to sitepipe.toml (default: walk up from the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new project skeleton
    Scaffold {
        /// Project directory (default: current directory)
        path: Option<PathBuf>,

        /// Project name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Clean, build everything, then watch and rebuild on change
    Dev {
        /// Override the development sources root
        #[arg(long)]
        src: Option<PathBuf>,

        /// Merge change bursts across this window (ms); 0 routes every
        /// debounced batch independently
        #[arg(long)]
        coalesce_ms: Option<u32>,

        /// Keep previous output between rebuilds
        #[arg(long)]
        no_clear: bool,
    },

    /// One-shot build: clean, run every pipeline, populate the
    /// distribution tree, exit
    Build {
        /// Override the distribution tree
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Copy built artifacts into the distribution tree without rebuilding
    Dist {
        /// Override the distribution tree
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run only the image pipeline
    Images,

    /// Run only the sprite pipeline
    Sprite,

    /// Run only the font pipeline
    Fonts,

    /// Publish the distribution tree
    Deploy {
        /// Publish destination (overrides [deploy] publish_dir)
        #[arg(long)]
        to: Option<PathBuf>,
    },
}

/// Everything a build command needs, resolved once.
pub(crate) struct Project {
    pub config: SiteConfig,
    pub layout: ProjectLayout,
    pub registry: TransformRegistry,
}

/// Load config, apply overrides, resolve the layout and registry.
///
/// `check_sources` is off for commands that work before sources exist.
pub(crate) fn setup(
    config_arg: Option<&Path>,
    overrides: &CliOverrides,
    check_sources: bool,
) -> Result<Project, ExitCode> {
    let config_path = match config_arg {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    let root = config_path
        .as_deref()
        .and_then(project_root)
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
        .ok_or(ExitCode::from(EXIT_ERROR))?;

    let mut config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
    };
    merge_cli_overrides(&mut config, overrides);

    let layout = ProjectLayout::new(&config, &root);
    if check_sources {
        if let Err(err) = layout.ensure_sources_exist() {
            eprintln!("{}", err);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    }

    let registry = match TransformRegistry::standard(&layout) {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("{}", err);
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
    };

    Ok(Project { config, layout, registry })
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Scaffold { path, name } => {
            scaffold::run_scaffold(path.as_deref(), name.as_deref())
        }
        Commands::Dev { src, coalesce_ms, no_clear } => {
            dev::run_dev(config, src, coalesce_ms, no_clear)
        }
        Commands::Build { out } => build::run_build(config, out),
        Commands::Dist { out } => build::run_dist(config, out),
        Commands::Images => pipeline::run_pipeline(config, crate::asset::AssetClass::RasterImage),
        Commands::Sprite => pipeline::run_pipeline(config, crate::asset::AssetClass::VectorSprite),
        Commands::Fonts => pipeline::run_pipeline(config, crate::asset::AssetClass::Font),
        Commands::Deploy { to } => pipeline::run_deploy(config, to),
    }
}
