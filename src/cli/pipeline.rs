//! Targeted pipeline commands and deploy.

use super::{setup, EXIT_ERROR, EXIT_SUCCESS};
use crate::asset::AssetClass;
use crate::config::CliOverrides;
use crate::console::timestamp;
use crate::deploy::{DeployError, DirPublisher, Publisher};
use crate::task::pipeline_graph;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Run one asset pipeline on its own.
pub fn run_pipeline(config: Option<&Path>, class: AssetClass) -> ExitCode {
    let project = match setup(config, &CliOverrides::default(), true) {
        Ok(project) => project,
        Err(code) => return code,
    };

    let graph = match pipeline_graph(class, &project.layout, &project.registry) {
        Ok(graph) => graph,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    super::build::run_and_report(&project, &graph)
}

/// Publish the distribution tree.
pub fn run_deploy(config: Option<&Path>, to: Option<PathBuf>) -> ExitCode {
    let overrides = CliOverrides { publish_dir: to, ..Default::default() };
    let project = match setup(config, &overrides, false) {
        Ok(project) => project,
        Err(code) => return code,
    };

    let Some(dest) = project.config.deploy.publish_dir.clone() else {
        eprintln!("{}", DeployError::NoDestination);
        return ExitCode::from(EXIT_ERROR);
    };
    let dest = if dest.is_absolute() { dest } else { project.layout.root.join(dest) };

    let mut publisher = DirPublisher::new(&dest);
    match publisher.publish(&project.layout.dist_dir) {
        Ok(count) => {
            println!("[{}] Published {} files to {}", timestamp(), count, dest.display());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
