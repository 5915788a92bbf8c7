//! Shape-validated transform chains.

use super::step::{Payload, Shape, SourceFile, TransformError, TransformStep};
use thiserror::Error;

/// Chain construction error. Configuration class: aborts startup.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A chain must contain at least one step
    #[error("transform chain is empty")]
    Empty,
    /// Adjacent steps disagree on shape
    #[error(
        "step '{from}' produces {produced} but step '{to}' accepts {accepted}"
    )]
    ShapeMismatch {
        /// Producing step name
        from: &'static str,
        /// Shape it produces
        produced: Shape,
        /// Consuming step name
        to: &'static str,
        /// Shape it accepts
        accepted: Shape,
    },
    /// The first step must accept the selector's file set
    #[error("first step '{step}' accepts {accepted}, chains start from a file set")]
    BadHead {
        /// First step name
        step: &'static str,
        /// Shape it accepts
        accepted: Shape,
    },
}

/// An ordered sequence of steps with verified shape adjacency.
///
/// Construction fails if any step's output shape differs from the next
/// step's input shape, so a chain that builds at startup can never hit a
/// shape mismatch mid-run.
#[derive(Debug, Clone)]
pub struct TransformChain {
    steps: Vec<TransformStep>,
}

impl TransformChain {
    /// Build a chain, validating shape adjacency.
    pub fn new(steps: Vec<TransformStep>) -> Result<Self, ChainError> {
        let first = steps.first().ok_or(ChainError::Empty)?;
        if first.input_shape() != Shape::FileSet {
            return Err(ChainError::BadHead {
                step: first.name(),
                accepted: first.input_shape(),
            });
        }

        for pair in steps.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            if from.output_shape() != to.input_shape() {
                return Err(ChainError::ShapeMismatch {
                    from: from.name(),
                    produced: from.output_shape(),
                    to: to.name(),
                    accepted: to.input_shape(),
                });
            }
        }

        Ok(Self { steps })
    }

    /// Shape the chain produces.
    pub fn output_shape(&self) -> Shape {
        self.steps.last().expect("chain is never empty").output_shape()
    }

    /// Step names in order, for logging.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(TransformStep::name).collect()
    }

    /// Run the selected files through every step in order.
    pub fn run(&self, inputs: Vec<SourceFile>) -> Result<Payload, TransformError> {
        let mut payload = Payload::Set(inputs);
        for step in &self.steps {
            payload = step.apply(payload)?;
        }
        Ok(payload)
    }
}
