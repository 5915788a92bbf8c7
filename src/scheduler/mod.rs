//! Graph scheduling and run reporting.

pub mod executor;
pub mod outcome;

pub use executor::{print_summary, BuildScheduler};
pub use outcome::{RunReport, TaskFailure, TaskOutcome, TaskStatus};
