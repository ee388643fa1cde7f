//! Opaque behavior-driven spec engine, consumed via a single operation.
//!
//! Script bodies may declare specs into a host-provided framework; the
//! harness neither inspects nor schedules them. It only needs one thing:
//! after the body has run, execute everything that was declared and wait
//! for the last spec to settle before signaling completion.

use async_trait::async_trait;
use thiserror::Error;

/// Failure from the spec run as a whole.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct SpecFailure {
    /// Human-readable failure description.
    pub message: String,
}

impl SpecFailure {
    /// Creates a failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The consuming interface to the spec engine.
#[async_trait]
pub trait SpecRunner: Send + Sync {
    /// Runs all specs declared so far, resolving once every one of them
    /// has settled.
    async fn run_all(&self) -> Result<(), SpecFailure>;
}
