//! Task identities and the composable task tree.

use crate::asset::AssetClass;
use crate::select::FileSelector;
use crate::transform::OutputClaim;
use std::path::PathBuf;

/// Stable task identity, unique within a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    /// Create a task id.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// How a leaf failure affects the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Failure aborts the whole run
    Fatal,
    /// Failure is reported and skipped, siblings keep running
    Recoverable,
}

/// One entry mirrored by a copy-tree leaf.
#[derive(Debug, Clone)]
pub struct CopyTree {
    /// Files to copy, relative to the selector root
    pub selector: FileSelector,
    /// Destination root the relative paths are mirrored under
    pub dest: PathBuf,
}

/// What a leaf task does when scheduled.
#[derive(Debug, Clone)]
pub enum LeafAction {
    /// Remove generated paths (files or whole subtrees)
    Clean {
        /// Paths removed; missing paths are not an error
        paths: Vec<PathBuf>,
    },
    /// Select sources and run them through the class's registered pipeline
    Pipeline {
        /// Asset class resolved against the registry
        class: AssetClass,
        /// Input selector bound to this leaf
        selector: FileSelector,
    },
    /// Mirror selected files into a destination tree
    CopyTree(CopyTree),
}

/// A leaf unit of work.
#[derive(Debug, Clone)]
pub struct LeafTask {
    /// Identity
    pub id: TaskId,
    /// What the leaf does
    pub action: LeafAction,
    /// Failure classification
    pub policy: FailurePolicy,
    /// Filesystem regions this leaf writes
    pub claims: Vec<OutputClaim>,
}

/// A task tree node: a leaf, or an ordered/unordered composite.
#[derive(Debug, Clone)]
pub enum Task {
    /// A unit of work
    Leaf(LeafTask),
    /// Children run one after another; first fatal failure stops the rest
    Series {
        /// Identity
        id: TaskId,
        /// Ordered children
        children: Vec<Task>,
    },
    /// Children run concurrently; each failure is isolated to its branch
    Parallel {
        /// Identity
        id: TaskId,
        /// Unordered children
        children: Vec<Task>,
    },
}

impl Task {
    /// Leaf constructor.
    pub fn leaf(
        id: impl Into<TaskId>,
        action: LeafAction,
        policy: FailurePolicy,
        claims: Vec<OutputClaim>,
    ) -> Self {
        Task::Leaf(LeafTask { id: id.into(), action, policy, claims })
    }

    /// Series constructor.
    pub fn series(id: impl Into<TaskId>, children: Vec<Task>) -> Self {
        Task::Series { id: id.into(), children }
    }

    /// Parallel constructor.
    pub fn parallel(id: impl Into<TaskId>, children: Vec<Task>) -> Self {
        Task::Parallel { id: id.into(), children }
    }

    /// This node's identity.
    pub fn id(&self) -> &TaskId {
        match self {
            Task::Leaf(leaf) => &leaf.id,
            Task::Series { id, .. } | Task::Parallel { id, .. } => id,
        }
    }

    /// Every id in the subtree, depth-first.
    pub fn all_ids(&self) -> Vec<&TaskId> {
        let mut ids = vec![self.id()];
        if let Task::Series { children, .. } | Task::Parallel { children, .. } = self {
            for child in children {
                ids.extend(child.all_ids());
            }
        }
        ids
    }

    /// Find a node by id.
    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            Task::Leaf(_) => None,
            Task::Series { children, .. } | Task::Parallel { children, .. } => {
                children.iter().find_map(|c| c.find(id))
            }
        }
    }

    /// Every output claim made in the subtree.
    pub fn claims(&self) -> Vec<&OutputClaim> {
        match self {
            Task::Leaf(leaf) => leaf.claims.iter().collect(),
            Task::Series { children, .. } | Task::Parallel { children, .. } => {
                children.iter().flat_map(Task::claims).collect()
            }
        }
    }
}
