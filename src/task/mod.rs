//! Task trees and validated build graphs.

pub mod graph;
pub mod tree;

pub use graph::{
    build_graph, class_selector, dev_graph, pipeline_graph, pipeline_task_id, BuildGraph,
    GraphError, GraphKind,
};
pub use tree::{CopyTree, FailurePolicy, LeafAction, LeafTask, Task, TaskId};
