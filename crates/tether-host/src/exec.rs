//! Host execution capability consumed by the async bridge.
//!
//! The host performs one named unit of work (conceptually: execute a
//! referenced request inside a named execution context) and reports the
//! outcome through a callback. The harness's bridge turns that callback
//! into a deferred value the script can suspend on; this module only
//! specifies the host side of the contract.

use serde_json::Value;
use thiserror::Error;

/// Failure reported by the host for one execution request.
///
/// Carried through to the script as-is, with no reinterpretation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecFailure {
    /// Human-readable failure description.
    pub message: String,
}

impl ExecFailure {
    /// Creates a failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The single terminal event of one invocation: a result or a failure,
/// never both, delivered exactly once.
pub type ExecOutcome = Result<Value, ExecFailure>;

/// Completion callback registered on a [`PendingExecHandle`].
pub type CompletionCallback = Box<dyn FnOnce(ExecOutcome) + Send>;

/// One in-flight invocation.
///
/// Handles are per-call and never reused, so concurrent invocations do
/// not interfere with one another. `on_complete` consumes the handle:
/// exactly one callback can ever be registered, and the host must invoke
/// it exactly once. Dropping a handle (or its stored callback) without
/// completing is a host fault; the bridge surfaces it as a failure rather
/// than suspending forever.
pub trait PendingExecHandle: Send {
    /// Registers the single completion callback for this invocation.
    fn on_complete(self: Box<Self>, callback: CompletionCallback);
}

/// The host capability that performs referenced units of work.
pub trait ExecCapability: Send + Sync {
    /// Requests execution of the operation identified by `operation_id`
    /// inside the execution context named `context_name`.
    ///
    /// Returns immediately with the handle for this call; the outcome
    /// arrives later through the handle's completion callback. The host
    /// may complete multiple outstanding invocations in any order.
    fn invoke(&self, operation_id: i64, context_name: &str) -> Box<dyn PendingExecHandle>;
}
