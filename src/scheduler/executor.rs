//! Graph execution.
//!
//! Series children run in order and stop at the first fatal failure,
//! marking the rest skipped. Parallel children run on scoped threads
//! with failures isolated to their branch. A recoverable failure never
//! prevents siblings from completing.

use super::outcome::{RunReport, TaskFailure, TaskOutcome, TaskStatus};
use crate::asset::{Artifact, AssetClass};
use crate::console::{format_duration, timestamp};
use crate::layout::ProjectLayout;
use crate::select::FileSelector;
use crate::task::{BuildGraph, CopyTree, FailurePolicy, LeafAction, LeafTask, Task, TaskId};
use crate::transform::TransformRegistry;
use std::path::PathBuf;
use std::time::Instant;

/// Runs validated build graphs against a layout and registry.
pub struct BuildScheduler<'a> {
    layout: &'a ProjectLayout,
    registry: &'a TransformRegistry,
    log: bool,
}

impl<'a> BuildScheduler<'a> {
    /// Scheduler over a resolved layout and registry.
    pub fn new(layout: &'a ProjectLayout, registry: &'a TransformRegistry) -> Self {
        Self { layout, registry, log: true }
    }

    /// Disable progress logging.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    /// Run a whole graph.
    pub fn run(&self, graph: &BuildGraph) -> RunReport {
        let start = Instant::now();
        let (outcomes, _) = self.execute(&graph.root);
        RunReport { outcomes, elapsed: start.elapsed() }
    }

    /// Run a single leaf of a graph by id.
    ///
    /// The watch loop uses this for selective rebuilds. Returns `None`
    /// when the id is unknown or names a composite.
    pub fn run_single(&self, graph: &BuildGraph, id: &TaskId) -> Option<RunReport> {
        let start = Instant::now();
        match graph.root.find(id)? {
            Task::Leaf(leaf) => {
                let outcome = self.run_leaf(leaf);
                Some(RunReport { outcomes: vec![outcome], elapsed: start.elapsed() })
            }
            _ => None,
        }
    }

    fn execute(&self, task: &Task) -> (Vec<TaskOutcome>, bool) {
        match task {
            Task::Leaf(leaf) => {
                let outcome = self.run_leaf(leaf);
                let fatal = outcome.fatal;
                (vec![outcome], fatal)
            }
            Task::Series { children, .. } => {
                let mut outcomes = Vec::new();
                let mut fatal = false;
                let mut iter = children.iter();
                for child in iter.by_ref() {
                    let (mut child_outcomes, child_fatal) = self.execute(child);
                    outcomes.append(&mut child_outcomes);
                    if child_fatal {
                        fatal = true;
                        break;
                    }
                }
                for unreached in iter {
                    mark_skipped(unreached, &mut outcomes);
                }
                (outcomes, fatal)
            }
            Task::Parallel { children, .. } => {
                let results: Vec<(Vec<TaskOutcome>, bool)> = std::thread::scope(|scope| {
                    let handles: Vec<_> =
                        children.iter().map(|child| scope.spawn(|| self.execute(child))).collect();
                    handles
                        .into_iter()
                        .map(|h| h.join().expect("task worker thread panicked"))
                        .collect()
                });
                let fatal = results.iter().any(|(_, f)| *f);
                let outcomes = results.into_iter().flat_map(|(o, _)| o).collect();
                (outcomes, fatal)
            }
        }
    }

    fn run_leaf(&self, leaf: &LeafTask) -> TaskOutcome {
        let start = Instant::now();
        let result = match &leaf.action {
            LeafAction::Clean { paths } => self.clean(paths),
            LeafAction::Pipeline { class, selector } => self.pipeline(*class, selector),
            LeafAction::CopyTree(copy) => self.copy_tree(copy),
        };
        let elapsed = start.elapsed();

        match result {
            Ok(artifacts) => {
                if self.log {
                    println!(
                        "[{}] ✓ {} ({} files, {})",
                        timestamp(),
                        leaf.id,
                        artifacts.len(),
                        format_duration(elapsed)
                    );
                }
                TaskOutcome::ok(leaf.id.clone(), artifacts, elapsed)
            }
            Err(failure) => {
                let fatal =
                    leaf.policy == FailurePolicy::Fatal || !failure.is_recoverable();
                if self.log {
                    eprintln!("[{}] ✗ {}: {}", timestamp(), leaf.id, failure);
                }
                TaskOutcome::failed(leaf.id.clone(), failure, fatal, elapsed)
            }
        }
    }

    fn clean(&self, paths: &[PathBuf]) -> Result<Vec<Artifact>, TaskFailure> {
        for path in paths {
            let removed = if path.is_dir() {
                std::fs::remove_dir_all(path)
            } else if path.is_file() {
                std::fs::remove_file(path)
            } else {
                // Nothing to remove
                continue;
            };
            removed.map_err(|source| TaskFailure::Io {
                context: format!("removing {}", self.layout.relative(path).display()),
                source,
            })?;
        }
        Ok(Vec::new())
    }

    fn pipeline(
        &self,
        class: AssetClass,
        selector: &FileSelector,
    ) -> Result<Vec<Artifact>, TaskFailure> {
        let pipeline =
            self.registry.pipeline(class).ok_or(TaskFailure::Unregistered(class))?;

        let inputs = selector.select()?;
        if inputs.is_empty() {
            // Optional source folders contribute nothing
            return Ok(Vec::new());
        }

        let payload = pipeline.chain.run(inputs)?;
        pipeline.rule.write(payload).map_err(|source| TaskFailure::Io {
            context: format!("writing {} output", class),
            source,
        })
    }

    fn copy_tree(&self, copy: &CopyTree) -> Result<Vec<Artifact>, TaskFailure> {
        let files = copy.selector.select()?;
        let mut artifacts = Vec::with_capacity(files.len());
        for file in files {
            let dest = copy.dest.join(&file.rel);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(|source| TaskFailure::Io {
                    context: format!("creating {}", self.layout.relative(parent).display()),
                    source,
                })?;
            }
            std::fs::write(&dest, &file.bytes).map_err(|source| TaskFailure::Io {
                context: format!("copying to {}", self.layout.relative(&dest).display()),
                source,
            })?;
            artifacts.push(Artifact::written(dest, &file.bytes));
        }
        Ok(artifacts)
    }
}

fn mark_skipped(task: &Task, outcomes: &mut Vec<TaskOutcome>) {
    match task {
        Task::Leaf(leaf) => outcomes.push(TaskOutcome::skipped(leaf.id.clone())),
        Task::Series { children, .. } | Task::Parallel { children, .. } => {
            for child in children {
                mark_skipped(child, outcomes);
            }
        }
    }
}

/// Print a one-line run summary.
pub fn print_summary(report: &RunReport) {
    let ok = report.count(TaskStatus::Ok);
    let failed = report.count(TaskStatus::Failed);
    let skipped = report.count(TaskStatus::Skipped);
    if failed == 0 {
        println!(
            "[{}] Done: {} tasks in {}",
            timestamp(),
            ok,
            format_duration(report.elapsed)
        );
    } else {
        eprintln!(
            "[{}] Done with failures: {} ok, {} failed, {} skipped in {}",
            timestamp(),
            ok,
            failed,
            skipped,
            format_duration(report.elapsed)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::task::{dev_graph, GraphKind};
    use crate::transform::{OutputRule, TransformStep};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn seeded_project() -> (TempDir, ProjectLayout) {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(&default_config(), temp.path());
        touch(temp.path(), "app/dev/html-pages/index.html", "<!--=include header.html -->");
        touch(temp.path(), "app/dev/html-pages/about.html", "<h1>About</h1>");
        touch(temp.path(), "app/dev/html-components/header.html", "<header></header>");
        touch(temp.path(), "app/dev/scss/main.scss", "body {\n  color: red;\n}\n");
        touch(temp.path(), "app/dev/js/index.js", "console.log('hi');\n");
        (temp, layout)
    }

    #[test]
    fn test_dev_graph_builds_artifacts() {
        let (_temp, layout) = seeded_project();
        let registry = TransformRegistry::standard(&layout).unwrap();
        let graph = dev_graph(&layout, &registry).unwrap();

        let scheduler = BuildScheduler::new(&layout, &registry).with_logging(false);
        let report = scheduler.run(&graph);

        assert!(!report.is_fatal(), "failures: {:?}", report.failures().collect::<Vec<_>>());
        assert!(layout.entry_file.is_file());
        assert!(layout.css_file.is_file());
        assert!(layout.js_file.is_file());
        assert!(layout.pages_out.join("about.html").is_file());

        let entry = std::fs::read_to_string(&layout.entry_file).unwrap();
        assert_eq!(entry, "<header></header>");
    }

    #[test]
    fn test_recoverable_failure_isolated() {
        let (temp, layout) = seeded_project();
        // Invalid UTF-8 breaks the stylesheet chain only
        std::fs::write(temp.path().join("app/dev/scss/bad.scss"), [0xff, 0xfe]).unwrap();

        let registry = TransformRegistry::standard(&layout).unwrap();
        let graph = dev_graph(&layout, &registry).unwrap();
        let scheduler = BuildScheduler::new(&layout, &registry).with_logging(false);
        let report = scheduler.run(&graph);

        assert!(report.has_failures());
        assert!(!report.is_fatal());
        // Siblings still produced their artifacts
        assert!(layout.entry_file.is_file());
        assert!(layout.js_file.is_file());
        assert!(!layout.css_file.exists());
    }

    #[test]
    fn test_series_fail_fast_skips_rest() {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(&default_config(), temp.path());
        let mut registry = TransformRegistry::new();
        // ConcatTo a path that is a directory forces a structural failure
        let blocked = temp.path().join("blocked");
        std::fs::create_dir_all(&blocked).unwrap();
        registry
            .register(
                AssetClass::Stylesheet,
                vec![TransformStep::Concat { name: "out".to_string() }],
                OutputRule::ConcatTo(blocked),
            )
            .unwrap();
        touch(temp.path(), "src/a.css", "a");

        let root = Task::series(
            "root",
            vec![
                Task::leaf(
                    "first",
                    LeafAction::Pipeline {
                        class: AssetClass::Stylesheet,
                        selector: FileSelector::new(temp.path().join("src"), vec!["**/*.css"]),
                    },
                    FailurePolicy::Fatal,
                    vec![],
                ),
                Task::leaf(
                    "second",
                    LeafAction::Clean { paths: vec![] },
                    FailurePolicy::Fatal,
                    vec![],
                ),
            ],
        );
        let graph = BuildGraph::new(GraphKind::Build, root, None).unwrap();
        let scheduler = BuildScheduler::new(&layout, &registry).with_logging(false);
        let report = scheduler.run(&graph);

        assert!(report.is_fatal());
        let second = report.outcomes.iter().find(|o| o.id.as_str() == "second").unwrap();
        assert_eq!(second.status, TaskStatus::Skipped);
    }

    #[test]
    fn test_clean_removes_generated_paths() {
        let (temp, layout) = seeded_project();
        touch(temp.path(), "app/index.html", "stale");
        touch(temp.path(), "app/src/img/old.png", "stale");

        let registry = TransformRegistry::new();
        let scheduler = BuildScheduler::new(&layout, &registry).with_logging(false);
        let root = Task::series(
            "root",
            vec![Task::leaf(
                "clean:work",
                LeafAction::Clean { paths: layout.generated_work_paths() },
                FailurePolicy::Fatal,
                vec![],
            )],
        );
        let graph = BuildGraph::new(GraphKind::Build, root, None).unwrap();
        let report = scheduler.run(&graph);

        assert!(!report.is_fatal());
        assert!(!layout.entry_file.exists());
        assert!(!layout.work_dir.join("src").exists());
        // Sources untouched
        assert!(layout.pages_dir.join("index.html").is_file());
    }

    #[test]
    fn test_clean_missing_paths_ok() {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(&default_config(), temp.path());
        let registry = TransformRegistry::new();
        let scheduler = BuildScheduler::new(&layout, &registry).with_logging(false);

        let root = Task::leaf(
            "clean",
            LeafAction::Clean { paths: vec![temp.path().join("never-existed")] },
            FailurePolicy::Fatal,
            vec![],
        );
        let graph = BuildGraph::new(GraphKind::Build, root, None).unwrap();
        assert!(!scheduler.run(&graph).is_fatal());
    }

    #[test]
    fn test_run_single_leaf() {
        let (_temp, layout) = seeded_project();
        let registry = TransformRegistry::standard(&layout).unwrap();
        let graph = dev_graph(&layout, &registry).unwrap();
        let scheduler = BuildScheduler::new(&layout, &registry).with_logging(false);

        let report = scheduler.run_single(&graph, &TaskId::new("build:styles")).unwrap();
        assert!(!report.is_fatal());
        assert!(layout.css_file.is_file());
        // Only the styles leaf ran
        assert!(!layout.entry_file.exists());
        assert_eq!(report.outcomes.len(), 1);
    }

    #[test]
    fn test_run_single_unknown_id() {
        let (_temp, layout) = seeded_project();
        let registry = TransformRegistry::standard(&layout).unwrap();
        let graph = dev_graph(&layout, &registry).unwrap();
        let scheduler = BuildScheduler::new(&layout, &registry).with_logging(false);
        assert!(scheduler.run_single(&graph, &TaskId::new("ghost")).is_none());
    }

    #[test]
    fn test_copy_tree_mirrors() {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(&default_config(), temp.path());
        touch(temp.path(), "app/index.html", "<html></html>");
        touch(temp.path(), "app/src/img/a.png", "png");

        let registry = TransformRegistry::new();
        let scheduler = BuildScheduler::new(&layout, &registry).with_logging(false);
        let root = Task::leaf(
            "dist:copy",
            LeafAction::CopyTree(CopyTree {
                selector: FileSelector::new(
                    &layout.work_dir,
                    vec!["index.html", "src/**/*"],
                ),
                dest: layout.dist_dir.clone(),
            }),
            FailurePolicy::Fatal,
            vec![],
        );
        let graph = BuildGraph::new(GraphKind::Build, root, None).unwrap();
        let report = scheduler.run(&graph);

        assert!(!report.is_fatal());
        assert!(layout.dist_dir.join("index.html").is_file());
        assert!(layout.dist_dir.join("src/img/a.png").is_file());
    }

    #[test]
    fn test_idempotent_rebuild_same_digests() {
        let (_temp, layout) = seeded_project();
        let registry = TransformRegistry::standard(&layout).unwrap();
        let graph = dev_graph(&layout, &registry).unwrap();
        let scheduler = BuildScheduler::new(&layout, &registry).with_logging(false);

        let first = scheduler.run(&graph);
        let mut first_digests: Vec<(PathBuf, String)> =
            first.artifacts().map(|a| (a.dest.clone(), a.digest.clone())).collect();
        first_digests.sort();

        let second = scheduler.run(&graph);
        let mut second_digests: Vec<(PathBuf, String)> =
            second.artifacts().map(|a| (a.dest.clone(), a.digest.clone())).collect();
        second_digests.sort();

        assert_eq!(first_digests, second_digests);
    }
}
