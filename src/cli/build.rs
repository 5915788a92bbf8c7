//! `sitepipe build` and `sitepipe dist`.

use super::{setup, EXIT_ERROR, EXIT_SUCCESS};
use crate::config::CliOverrides;
use crate::scheduler::{print_summary, BuildScheduler};
use crate::task::{build_graph, BuildGraph, TaskId};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// One-shot build into the distribution tree.
pub fn run_build(config: Option<&Path>, out: Option<PathBuf>) -> ExitCode {
    let overrides = CliOverrides { dist: out, ..Default::default() };
    let project = match setup(config, &overrides, true) {
        Ok(project) => project,
        Err(code) => return code,
    };

    let graph = match build_graph(&project.layout, &project.registry) {
        Ok(graph) => graph,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    run_and_report(&project, &graph)
}

/// Copy already-built artifacts into the distribution tree.
pub fn run_dist(config: Option<&Path>, out: Option<PathBuf>) -> ExitCode {
    let overrides = CliOverrides { dist: out, ..Default::default() };
    let project = match setup(config, &overrides, false) {
        Ok(project) => project,
        Err(code) => return code,
    };

    // Only the copy leaf of the full build graph runs here
    let graph = match build_graph(&project.layout, &project.registry) {
        Ok(graph) => graph,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let scheduler = BuildScheduler::new(&project.layout, &project.registry);
    let Some(report) = scheduler.run_single(&graph, &TaskId::new("dist:copy")) else {
        eprintln!("distribution copy task missing from build graph");
        return ExitCode::from(EXIT_ERROR);
    };

    print_summary(&report);
    if report.is_fatal() {
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}

pub(crate) fn run_and_report(project: &super::Project, graph: &BuildGraph) -> ExitCode {
    let scheduler = BuildScheduler::new(&project.layout, &project.registry);
    let report = scheduler.run(graph);
    print_summary(&report);

    if report.is_fatal() {
        ExitCode::from(EXIT_ERROR)
    } else {
        // Recoverable failures were reported per task; the run completed
        ExitCode::from(EXIT_SUCCESS)
    }
}
