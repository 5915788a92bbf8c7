//! Watch rules: change patterns bound to the tasks they trigger.
//!
//! Every binding is explicit. A shared fragment edit fans out to both
//! the entry and the page builds because its rule lists both task ids,
//! not because anything infers the dependency at runtime.

use crate::asset::AssetClass;
use crate::layout::ProjectLayout;
use crate::select::FileSelector;
use crate::task::{class_selector, pipeline_task_id, BuildGraph, Task, TaskId};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Watch rule set construction error. Configuration class.
#[derive(Debug, Error)]
pub enum WatchRuleError {
    /// A rule binds a task id the graph does not contain as a leaf
    #[error("watch rule '{rule}' binds unknown task '{task}'")]
    UnknownTask {
        /// Rule name
        rule: String,
        /// Missing task id
        task: TaskId,
    },
}

/// One pattern-to-tasks binding.
#[derive(Debug, Clone)]
pub struct WatchRule {
    /// Rule name for logs
    pub name: String,
    /// Files this rule covers
    pub selector: FileSelector,
    /// Tasks triggered when a covered file changes, in run order
    pub tasks: Vec<TaskId>,
}

impl WatchRule {
    /// Rule binding a selector to one or more task ids.
    pub fn new(name: impl Into<String>, selector: FileSelector, tasks: Vec<TaskId>) -> Self {
        Self { name: name.into(), selector, tasks }
    }
}

/// All watch rules for a project.
#[derive(Debug, Clone)]
pub struct WatchRuleSet {
    rules: Vec<WatchRule>,
}

impl WatchRuleSet {
    /// Rule set from explicit rules, checked against the graph so a typo
    /// in a task binding fails at startup instead of on first change.
    pub fn new(rules: Vec<WatchRule>, graph: &BuildGraph) -> Result<Self, WatchRuleError> {
        for rule in &rules {
            for task in &rule.tasks {
                match graph.root.find(task) {
                    Some(Task::Leaf(_)) => {}
                    _ => {
                        return Err(WatchRuleError::UnknownTask {
                            rule: rule.name.clone(),
                            task: task.clone(),
                        })
                    }
                }
            }
        }
        Ok(Self { rules })
    }

    /// The standard rules for a layout, validated against `graph`.
    pub fn standard(layout: &ProjectLayout, graph: &BuildGraph) -> Result<Self, WatchRuleError> {
        let task = pipeline_task_id;
        let rules = vec![
            WatchRule::new(
                "entry",
                class_selector(AssetClass::MarkupEntry, layout),
                vec![task(AssetClass::MarkupEntry)],
            ),
            WatchRule::new(
                "pages",
                class_selector(AssetClass::MarkupPage, layout),
                vec![task(AssetClass::MarkupPage)],
            ),
            // Fragments are inputs to both markup builds, so one edit
            // triggers both. The fan-out is spelled out here.
            WatchRule::new(
                "fragments",
                class_selector(AssetClass::MarkupFragment, layout),
                vec![task(AssetClass::MarkupEntry), task(AssetClass::MarkupPage)],
            ),
            WatchRule::new(
                "styles",
                class_selector(AssetClass::Stylesheet, layout),
                vec![task(AssetClass::Stylesheet)],
            ),
            WatchRule::new(
                "scripts",
                class_selector(AssetClass::ScriptBundle, layout),
                vec![task(AssetClass::ScriptBundle)],
            ),
            WatchRule::new(
                "images",
                class_selector(AssetClass::RasterImage, layout),
                vec![task(AssetClass::RasterImage)],
            ),
            WatchRule::new(
                "sprite",
                class_selector(AssetClass::VectorSprite, layout),
                vec![task(AssetClass::VectorSprite)],
            ),
            WatchRule::new(
                "favicon",
                class_selector(AssetClass::Favicon, layout),
                vec![task(AssetClass::Favicon)],
            ),
            WatchRule::new(
                "fonts",
                class_selector(AssetClass::Font, layout),
                vec![task(AssetClass::Font)],
            ),
        ];
        Self::new(rules, graph)
    }

    /// Rules covering a changed path.
    pub fn route(&self, path: &Path) -> Vec<&WatchRule> {
        self.rules.iter().filter(|r| r.selector.matches(path)).collect()
    }

    /// Tasks to run for a batch of changed paths, deduplicated, in
    /// first-seen order.
    pub fn tasks_for(&self, paths: &[PathBuf]) -> Vec<TaskId> {
        let mut tasks: Vec<TaskId> = Vec::new();
        for path in paths {
            for rule in self.route(path) {
                for task in &rule.tasks {
                    if !tasks.contains(task) {
                        tasks.push(task.clone());
                    }
                }
            }
        }
        tasks
    }

    /// Unique directory roots the filesystem watcher must cover.
    pub fn roots(&self) -> Vec<&Path> {
        let mut roots: Vec<&Path> = Vec::new();
        for rule in &self.rules {
            let root = rule.selector.root.as_path();
            // Skip roots nested under one already being watched recursively
            if roots.iter().any(|r| root.starts_with(r)) {
                continue;
            }
            roots.retain(|r| !r.starts_with(root));
            roots.push(root);
        }
        roots
    }

    /// All rules, in declaration order.
    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }
}
