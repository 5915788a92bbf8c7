//! Transform chains, shapes, and the per-asset-class registry.

pub mod chain;
pub mod registry;
pub mod step;

pub use chain::{ChainError, TransformChain};
pub use registry::{OutputClaim, OutputRule, Pipeline, RegistryError, TransformRegistry};
pub use step::{Payload, Record, Shape, SourceFile, TransformError, TransformStep};
