//! The dev loop: debounced change events driving selective rebuilds.
//!
//! One filesystem watcher feeds a bounded channel; one loop drains it,
//! routes each batch through the watch rules, runs the bound tasks on
//! the scheduler, and emits a reload signal. Rebuilds never overlap
//! because the loop is the only consumer.

use crate::asset::Artifact;
use crate::config::WatchConfig;
use crate::console::{clear_screen, timestamp};
use crate::layout::ProjectLayout;
use crate::reload::{signal_for, ReloadNotifier, ReloadSignal};
use crate::scheduler::BuildScheduler;
use crate::task::BuildGraph;
use crate::watch::WatchRuleSet;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;

/// Capacity of the change event queue. A full queue drops the newest
/// batch; the files still exist and the next change picks them up.
const EVENT_QUEUE_CAP: usize = 512;

/// Dev loop error.
#[derive(Debug, Error)]
pub enum DevLoopError {
    /// The filesystem watcher could not be set up
    #[error("Failed to watch sources: {0}")]
    Notify(#[from] notify::Error),
    /// The watcher side of the event channel went away
    #[error("Watch event channel closed")]
    ChannelClosed,
}

/// Drives watch mode for one project.
pub struct DevLoop<'a> {
    layout: &'a ProjectLayout,
    config: &'a WatchConfig,
    scheduler: &'a BuildScheduler<'a>,
    graph: &'a BuildGraph,
    rules: &'a WatchRuleSet,
    notifier: Box<dyn ReloadNotifier>,
}

impl<'a> DevLoop<'a> {
    /// Assemble a dev loop.
    pub fn new(
        layout: &'a ProjectLayout,
        config: &'a WatchConfig,
        scheduler: &'a BuildScheduler<'a>,
        graph: &'a BuildGraph,
        rules: &'a WatchRuleSet,
        notifier: Box<dyn ReloadNotifier>,
    ) -> Self {
        Self { layout, config, scheduler, graph, rules, notifier }
    }

    /// Watch and rebuild until the process is interrupted.
    pub fn run(&mut self) -> Result<(), DevLoopError> {
        let (tx, rx) = mpsc::sync_channel::<Vec<PathBuf>>(EVENT_QUEUE_CAP);

        let debounce = Duration::from_millis(u64::from(self.config.debounce_ms));
        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let paths: Vec<PathBuf> = events.into_iter().map(|e| e.path).collect();
                    if !paths.is_empty() {
                        // Queue full: drop the batch, back-pressure over growth
                        let _ = tx.try_send(paths);
                    }
                }
                Err(err) => eprintln!("[{}] watch error: {}", timestamp(), err),
            }
        })?;

        for root in self.rules.roots() {
            if root.is_dir() {
                debouncer.watcher().watch(root, RecursiveMode::Recursive)?;
            }
        }

        println!("[{}] Watching for changes (Ctrl-C to stop)", timestamp());

        loop {
            let mut paths = rx.recv().map_err(|_| DevLoopError::ChannelClosed)?;
            if self.config.coalesce_ms > 0 {
                // Optional wider window merging bursts across debounce
                // flushes (editor save-all, branch switches)
                let window = Duration::from_millis(u64::from(self.config.coalesce_ms));
                while let Ok(more) = rx.recv_timeout(window) {
                    paths.extend(more);
                }
            }
            self.handle_changes(&paths);
        }
    }

    /// Route one batch of changed paths, run the bound tasks, notify.
    ///
    /// Returns the emitted signal, if any.
    pub fn handle_changes(&mut self, paths: &[PathBuf]) -> Option<ReloadSignal> {
        let tasks = self.rules.tasks_for(paths);
        if tasks.is_empty() {
            return None;
        }

        if self.config.clear_screen {
            clear_screen();
        }
        let mut seen: Vec<&PathBuf> = Vec::new();
        for path in paths {
            if !seen.contains(&path) {
                seen.push(path);
                println!("[{}] changed: {}", timestamp(), self.layout.relative(path).display());
            }
        }

        let mut artifacts: Vec<Artifact> = Vec::new();
        for task in &tasks {
            let Some(report) = self.scheduler.run_single(self.graph, task) else {
                continue;
            };
            if report.has_failures() {
                // Already logged by the scheduler; keep watching
                continue;
            }
            for outcome in report.outcomes {
                artifacts.extend(outcome.artifacts);
            }
        }

        let refs: Vec<&Artifact> = artifacts.iter().collect();
        let signal = signal_for(&refs);
        if let Some(signal) = signal {
            self.notifier.notify(signal);
        }
        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::layout::ProjectLayout;
    use crate::reload::ChannelNotifier;
    use crate::task::dev_graph;
    use crate::transform::TransformRegistry;
    use crate::watch::WatchRuleSet;
    use std::path::Path;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    struct Fixture {
        _temp: TempDir,
        layout: ProjectLayout,
        registry: TransformRegistry,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(&default_config(), temp.path());
        touch(temp.path(), "app/dev/html-pages/index.html", "<!--=include nav.html -->");
        touch(temp.path(), "app/dev/html-pages/about.html", "<!--=include nav.html -->");
        touch(temp.path(), "app/dev/html-components/nav.html", "<nav></nav>");
        touch(temp.path(), "app/dev/scss/main.scss", "body { margin: 0; }");
        touch(temp.path(), "app/dev/js/index.js", "let x = 1;");
        let registry = TransformRegistry::standard(&layout).unwrap();
        Fixture { _temp: temp, layout, registry }
    }

    #[test]
    fn test_style_change_injects() {
        let fx = fixture();
        let graph = dev_graph(&fx.layout, &fx.registry).unwrap();
        let rules = WatchRuleSet::standard(&fx.layout, &graph).unwrap();
        let scheduler = BuildScheduler::new(&fx.layout, &fx.registry).with_logging(false);
        let config = WatchConfig { clear_screen: false, ..Default::default() };
        let (notifier, rx) = ChannelNotifier::new();
        let mut devloop =
            DevLoop::new(&fx.layout, &config, &scheduler, &graph, &rules, Box::new(notifier));

        let signal = devloop.handle_changes(&[fx.layout.styles_dir.join("main.scss")]);
        assert_eq!(signal, Some(ReloadSignal::InjectStyles));
        assert_eq!(rx.try_recv().unwrap(), ReloadSignal::InjectStyles);
        assert!(fx.layout.css_file.is_file());
        // Only the styles task ran
        assert!(!fx.layout.entry_file.exists());
    }

    #[test]
    fn test_fragment_change_fans_out_and_reloads() {
        let fx = fixture();
        let graph = dev_graph(&fx.layout, &fx.registry).unwrap();
        let rules = WatchRuleSet::standard(&fx.layout, &graph).unwrap();
        let scheduler = BuildScheduler::new(&fx.layout, &fx.registry).with_logging(false);
        let config = WatchConfig { clear_screen: false, ..Default::default() };
        let (notifier, rx) = ChannelNotifier::new();
        let mut devloop =
            DevLoop::new(&fx.layout, &config, &scheduler, &graph, &rules, Box::new(notifier));

        let signal = devloop.handle_changes(&[fx.layout.fragments_dir.join("nav.html")]);
        assert_eq!(signal, Some(ReloadSignal::FullReload));
        assert_eq!(rx.try_recv().unwrap(), ReloadSignal::FullReload);
        // Both markup builds ran from the one fragment edit
        assert!(fx.layout.entry_file.is_file());
        assert!(fx.layout.pages_out.join("about.html").is_file());
    }

    #[test]
    fn test_unmatched_change_is_silent() {
        let fx = fixture();
        let graph = dev_graph(&fx.layout, &fx.registry).unwrap();
        let rules = WatchRuleSet::standard(&fx.layout, &graph).unwrap();
        let scheduler = BuildScheduler::new(&fx.layout, &fx.registry).with_logging(false);
        let config = WatchConfig { clear_screen: false, ..Default::default() };
        let (notifier, rx) = ChannelNotifier::new();
        let mut devloop =
            DevLoop::new(&fx.layout, &config, &scheduler, &graph, &rules, Box::new(notifier));

        let signal = devloop.handle_changes(&[fx.layout.root.join("README.md")]);
        assert_eq!(signal, None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failed_script_sibling_still_signals_styles() {
        let fx = fixture();
        let graph = dev_graph(&fx.layout, &fx.registry).unwrap();
        let rules = WatchRuleSet::standard(&fx.layout, &graph).unwrap();
        let scheduler = BuildScheduler::new(&fx.layout, &fx.registry).with_logging(false);
        let config = WatchConfig { clear_screen: false, ..Default::default() };
        let (notifier, rx) = ChannelNotifier::new();
        let mut devloop =
            DevLoop::new(&fx.layout, &config, &scheduler, &graph, &rules, Box::new(notifier));

        // One batch touching both pipelines, with the script source invalid
        std::fs::write(fx.layout.scripts_dir.join("index.js"), [0xff, 0xfe]).unwrap();
        let signal = devloop.handle_changes(&[
            fx.layout.scripts_dir.join("index.js"),
            fx.layout.styles_dir.join("main.scss"),
        ]);

        // The script build failed; the style build completed and drove the signal
        assert_eq!(signal, Some(ReloadSignal::InjectStyles));
        assert_eq!(rx.try_recv().unwrap(), ReloadSignal::InjectStyles);
        assert!(fx.layout.css_file.is_file());
        assert!(!fx.layout.js_file.exists());
    }

    #[test]
    fn test_broken_source_keeps_loop_alive() {
        let fx = fixture();
        touch(fx.layout.root.as_path(), "app/dev/html-pages/bad.html", "<!--=include gone.html -->");
        let graph = dev_graph(&fx.layout, &fx.registry).unwrap();
        let rules = WatchRuleSet::standard(&fx.layout, &graph).unwrap();
        let scheduler = BuildScheduler::new(&fx.layout, &fx.registry).with_logging(false);
        let config = WatchConfig { clear_screen: false, ..Default::default() };
        let (notifier, rx) = ChannelNotifier::new();
        let mut devloop =
            DevLoop::new(&fx.layout, &config, &scheduler, &graph, &rules, Box::new(notifier));

        // Page build fails on the unresolved include, no signal emitted
        let signal = devloop.handle_changes(&[fx.layout.pages_dir.join("bad.html")]);
        assert_eq!(signal, None);
        assert!(rx.try_recv().is_err());

        // A later good change still builds and notifies
        std::fs::write(fx.layout.pages_dir.join("bad.html"), "<p>fixed</p>").unwrap();
        let signal = devloop.handle_changes(&[fx.layout.pages_dir.join("bad.html")]);
        assert_eq!(signal, Some(ReloadSignal::FullReload));
    }
}
