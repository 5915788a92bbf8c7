//! `sitepipe dev`: initial build plus the watch loop.

use super::{setup, EXIT_ERROR, EXIT_SUCCESS};
use crate::config::CliOverrides;
use crate::console::timestamp;
use crate::devloop::DevLoop;
use crate::reload::LogNotifier;
use crate::scheduler::{print_summary, BuildScheduler};
use crate::task::dev_graph;
use crate::watch::WatchRuleSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub fn run_dev(
    config: Option<&Path>,
    src: Option<PathBuf>,
    coalesce_ms: Option<u32>,
    no_clear: bool,
) -> ExitCode {
    let overrides = CliOverrides { dev: src, coalesce_ms, ..Default::default() };
    let mut project = match setup(config, &overrides, true) {
        Ok(project) => project,
        Err(code) => return code,
    };
    if no_clear {
        project.config.watch.clear_screen = false;
    }

    let graph = match dev_graph(&project.layout, &project.registry) {
        Ok(graph) => graph,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let rules = match WatchRuleSet::standard(&project.layout, &graph) {
        Ok(rules) => rules,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let scheduler = BuildScheduler::new(&project.layout, &project.registry);

    println!("[{}] Initial build", timestamp());
    let report = scheduler.run(&graph);
    print_summary(&report);
    if report.is_fatal() {
        return ExitCode::from(EXIT_ERROR);
    }

    let mut devloop = DevLoop::new(
        &project.layout,
        &project.config.watch,
        &scheduler,
        &graph,
        &rules,
        Box::new(LogNotifier),
    );
    match devloop.run() {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
