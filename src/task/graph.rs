//! Build graphs: validated task trees plus the standard graph builders.

use super::tree::{CopyTree, FailurePolicy, LeafAction, Task, TaskId};
use crate::asset::AssetClass;
use crate::layout::ProjectLayout;
use crate::select::FileSelector;
use crate::transform::{OutputClaim, TransformRegistry};
use std::collections::HashSet;
use thiserror::Error;

/// Graph construction error. Configuration class: aborts startup.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A composite node has no children
    #[error("task '{0}' is a composite with no children")]
    EmptyComposite(TaskId),
    /// The same id appears twice in the tree
    #[error("duplicate task id '{0}'")]
    DuplicateTaskId(TaskId),
    /// The declared barrier id is not in the tree
    #[error("barrier task '{0}' not found in graph")]
    BarrierMissing(TaskId),
    /// The barrier must be the final child of the root series
    #[error("barrier task '{0}' is not the last child of the root series")]
    BarrierNotLast(TaskId),
    /// Two parallel siblings write overlapping regions
    #[error("parallel tasks '{a}' and '{b}' have overlapping output claims ({claim})")]
    ClaimOverlap {
        /// First sibling
        a: TaskId,
        /// Second sibling
        b: TaskId,
        /// One of the colliding claims
        claim: OutputClaim,
    },
    /// An asset class has no registered pipeline
    #[error("no pipeline registered for asset class '{0}'")]
    NoPipeline(AssetClass),
}

/// Which lifecycle a graph drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    /// Clean, build all, then hand off to the watch loop
    Dev,
    /// Clean, build all, populate the distribution tree, exit
    Build,
}

/// A validated task tree ready for scheduling.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    /// Lifecycle this graph drives
    pub kind: GraphKind,
    /// Root of the task tree
    pub root: Task,
    /// Join barrier: a task that must be the final child of the root
    /// series, guaranteed not to start before every earlier stage settles
    pub barrier: Option<TaskId>,
}

impl BuildGraph {
    /// Validate and wrap a task tree.
    pub fn new(kind: GraphKind, root: Task, barrier: Option<TaskId>) -> Result<Self, GraphError> {
        validate_tree(&root)?;

        if let Some(barrier_id) = &barrier {
            if root.find(barrier_id).is_none() {
                return Err(GraphError::BarrierMissing(barrier_id.clone()));
            }
            let is_last = match &root {
                Task::Series { children, .. } => {
                    children.last().map(|c| c.id() == barrier_id).unwrap_or(false)
                }
                _ => false,
            };
            if !is_last {
                return Err(GraphError::BarrierNotLast(barrier_id.clone()));
            }
        }

        Ok(Self { kind, root, barrier })
    }
}

fn validate_tree(root: &Task) -> Result<(), GraphError> {
    let mut seen: HashSet<&TaskId> = HashSet::new();
    for id in root.all_ids() {
        if !seen.insert(id) {
            return Err(GraphError::DuplicateTaskId(id.clone()));
        }
    }
    check_node(root)
}

fn check_node(task: &Task) -> Result<(), GraphError> {
    match task {
        Task::Leaf(_) => Ok(()),
        Task::Series { id, children } => {
            if children.is_empty() {
                return Err(GraphError::EmptyComposite(id.clone()));
            }
            children.iter().try_for_each(check_node)
        }
        Task::Parallel { id, children } => {
            if children.is_empty() {
                return Err(GraphError::EmptyComposite(id.clone()));
            }
            // Siblings run concurrently, so their write regions must not
            // overlap anywhere in their subtrees.
            for (i, a) in children.iter().enumerate() {
                for b in &children[i + 1..] {
                    for claim_a in a.claims() {
                        for claim_b in b.claims() {
                            if claim_a.overlaps(claim_b) {
                                return Err(GraphError::ClaimOverlap {
                                    a: a.id().clone(),
                                    b: b.id().clone(),
                                    claim: claim_a.clone(),
                                });
                            }
                        }
                    }
                }
            }
            children.iter().try_for_each(check_node)
        }
    }
}

/// `*.ext` and `**/*.ext` include patterns for a list of extensions.
fn ext_patterns(exts: &[&str]) -> Vec<String> {
    let mut patterns = Vec::with_capacity(exts.len() * 2);
    for ext in exts {
        patterns.push(format!("*.{}", ext));
        patterns.push(format!("**/*.{}", ext));
    }
    patterns
}

/// The input selector bound to an asset class's leaf task.
pub fn class_selector(class: AssetClass, layout: &ProjectLayout) -> FileSelector {
    match class {
        AssetClass::MarkupEntry => {
            FileSelector::new(&layout.pages_dir, vec![layout.entry_name.clone()])
        }
        AssetClass::MarkupPage => {
            FileSelector::new(&layout.pages_dir, ext_patterns(&["html"]))
                .with_excludes(vec![layout.entry_name.clone()])
        }
        AssetClass::MarkupFragment => {
            FileSelector::new(&layout.fragments_dir, ext_patterns(&["html"]))
        }
        AssetClass::Stylesheet => {
            FileSelector::new(&layout.styles_dir, ext_patterns(&["scss", "css"]))
        }
        AssetClass::ScriptBundle => FileSelector::new(&layout.scripts_dir, ext_patterns(&["js"])),
        AssetClass::RasterImage => FileSelector::new(
            &layout.images_dir,
            ext_patterns(&["png", "jpg", "jpeg", "gif", "webp", "svg"]),
        )
        .with_excludes(vec!["sprite/**", "favicon/**"]),
        AssetClass::VectorSprite => FileSelector::new(&layout.sprite_dir, ext_patterns(&["svg"])),
        AssetClass::Favicon => {
            FileSelector::new(&layout.favicon_dir, vec!["*".to_string(), "**/*".to_string()])
        }
        AssetClass::Font => FileSelector::new(
            &layout.fonts_dir,
            ext_patterns(&["ttf", "otf", "eot", "woff", "woff2"]),
        ),
    }
}

/// Leaf task id for an asset class pipeline.
pub fn pipeline_task_id(class: AssetClass) -> TaskId {
    TaskId::new(format!("build:{}", class))
}

fn pipeline_leaf(
    class: AssetClass,
    layout: &ProjectLayout,
    registry: &TransformRegistry,
) -> Result<Task, GraphError> {
    let pipeline = registry.pipeline(class).ok_or(GraphError::NoPipeline(class))?;
    Ok(Task::leaf(
        pipeline_task_id(class),
        LeafAction::Pipeline { class, selector: class_selector(class, layout) },
        FailurePolicy::Recoverable,
        vec![pipeline.rule.claim()],
    ))
}

fn build_all(layout: &ProjectLayout, registry: &TransformRegistry) -> Result<Task, GraphError> {
    let mut leaves = Vec::with_capacity(8);
    for class in AssetClass::pipeline_classes() {
        leaves.push(pipeline_leaf(class, layout, registry)?);
    }
    Ok(Task::parallel("build-all", leaves))
}

fn clean_work(layout: &ProjectLayout) -> Task {
    let paths = layout.generated_work_paths();
    let claims = paths.iter().map(|p| OutputClaim::Dir(p.clone())).collect();
    Task::leaf("clean:work", LeafAction::Clean { paths }, FailurePolicy::Fatal, claims)
}

fn clean_dist(layout: &ProjectLayout) -> Task {
    Task::leaf(
        "clean:dist",
        LeafAction::Clean { paths: vec![layout.dist_dir.clone()] },
        FailurePolicy::Fatal,
        vec![OutputClaim::Dir(layout.dist_dir.clone())],
    )
}

fn dist_copy(layout: &ProjectLayout) -> Task {
    let mut includes = vec!["src/*".to_string(), "src/**/*".to_string()];
    for artifact in [&layout.entry_file, &layout.css_file, &layout.js_file] {
        if let Some(name) = artifact.file_name() {
            includes.push(name.to_string_lossy().into_owned());
        }
    }
    Task::leaf(
        "dist:copy",
        LeafAction::CopyTree(CopyTree {
            selector: FileSelector::new(&layout.work_dir, includes),
            dest: layout.dist_dir.clone(),
        }),
        FailurePolicy::Fatal,
        vec![OutputClaim::Dir(layout.dist_dir.clone())],
    )
}

/// The dev lifecycle graph: clean the working tree, then build every
/// pipeline concurrently. The watch loop takes over once this settles.
pub fn dev_graph(
    layout: &ProjectLayout,
    registry: &TransformRegistry,
) -> Result<BuildGraph, GraphError> {
    let root = Task::series("dev", vec![clean_work(layout), build_all(layout, registry)?]);
    BuildGraph::new(GraphKind::Dev, root, None)
}

/// The one-shot build graph: concurrent cleans, all pipelines, then the
/// distribution copy behind the join barrier.
pub fn build_graph(
    layout: &ProjectLayout,
    registry: &TransformRegistry,
) -> Result<BuildGraph, GraphError> {
    let root = Task::series(
        "build",
        vec![
            Task::parallel("clean", vec![clean_work(layout), clean_dist(layout)]),
            build_all(layout, registry)?,
            dist_copy(layout),
        ],
    );
    BuildGraph::new(GraphKind::Build, root, Some(TaskId::new("dist:copy")))
}

/// A graph running a single asset pipeline, for the targeted subcommands.
pub fn pipeline_graph(
    class: AssetClass,
    layout: &ProjectLayout,
    registry: &TransformRegistry,
) -> Result<BuildGraph, GraphError> {
    BuildGraph::new(GraphKind::Build, pipeline_leaf(class, layout, registry)?, None)
}
