//! Deterministic in-memory capability implementations.
//!
//! These doubles let the harness be exercised without an embedding host:
//!
//! - [`CountingContinuation`] — counts `resume()` calls for handoff
//!   assertions
//! - [`QueuedExecCapability`] — completes every invocation immediately
//!   from a queue of prepared outcomes
//! - [`ManualExecCapability`] — records invocations and lets the test
//!   settle (or drop) each one explicitly, in any order
//! - [`NullSpecRunner`] / [`CountingSpecRunner`] / [`FailingSpecRunner`]
//!   — spec-engine stand-ins

use crate::{
    CompletionCallback, Continuation, ExecCapability, ExecFailure, ExecOutcome, PendingExecHandle,
    SpecFailure, SpecRunner,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts handoffs.
#[derive(Debug, Default)]
pub struct CountingContinuation {
    resumes: AtomicUsize,
}

impl CountingContinuation {
    /// Creates a continuation with a zeroed counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `resume()` calls observed so far.
    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

impl Continuation for CountingContinuation {
    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }
}

// ─── Immediate-completion capability ─────────────────────────────────

/// Completes each invocation synchronously with the next queued outcome.
///
/// When the queue runs dry, invocations fail with a recognizable
/// "no more queued responses" message instead of panicking, so a test
/// that over-invokes sees an ordinary bridge failure.
#[derive(Default)]
pub struct QueuedExecCapability {
    responses: Mutex<VecDeque<ExecOutcome>>,
    invocations: Mutex<Vec<(i64, String)>>,
}

impl QueuedExecCapability {
    /// Creates a capability with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a capability preloaded with `responses`, consumed in order.
    pub fn with_responses(responses: Vec<ExecOutcome>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(responses)),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Every `(operation_id, context_name)` pair seen, in call order.
    pub fn invocations(&self) -> Vec<(i64, String)> {
        self.invocations.lock().clone()
    }
}

impl ExecCapability for QueuedExecCapability {
    fn invoke(&self, operation_id: i64, context_name: &str) -> Box<dyn PendingExecHandle> {
        self.invocations
            .lock()
            .push((operation_id, context_name.to_string()));
        let outcome = self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ExecFailure::new("no more queued responses")));
        Box::new(ImmediateHandle {
            outcome: Some(outcome),
        })
    }
}

struct ImmediateHandle {
    outcome: Option<ExecOutcome>,
}

impl PendingExecHandle for ImmediateHandle {
    fn on_complete(mut self: Box<Self>, callback: CompletionCallback) {
        let outcome = self
            .outcome
            .take()
            .expect("immediate handle completes exactly once");
        callback(outcome);
    }
}

// ─── Manually-settled capability ─────────────────────────────────────

struct PendingCall {
    operation_id: i64,
    context_name: String,
    callback: Option<CompletionCallback>,
}

/// Records invocations and leaves each one pending until the test
/// settles it by index, in whatever order the scenario calls for.
#[derive(Clone, Default)]
pub struct ManualExecCapability {
    calls: Arc<Mutex<Vec<PendingCall>>>,
}

impl ManualExecCapability {
    /// Creates a capability with no recorded invocations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of invocations seen so far.
    pub fn invocation_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The `(operation_id, context_name)` pair of the `index`-th call.
    pub fn invocation(&self, index: usize) -> Option<(i64, String)> {
        self.calls
            .lock()
            .get(index)
            .map(|call| (call.operation_id, call.context_name.clone()))
    }

    /// Whether the `index`-th call has a registered, unfired callback.
    pub fn is_pending(&self, index: usize) -> bool {
        self.calls
            .lock()
            .get(index)
            .is_some_and(|call| call.callback.is_some())
    }

    /// Settles the `index`-th call successfully with `value`.
    ///
    /// # Panics
    ///
    /// Panics if the call does not exist or was already settled.
    pub fn resolve(&self, index: usize, value: Value) {
        self.complete(index, Ok(value));
    }

    /// Settles the `index`-th call with a failure.
    ///
    /// # Panics
    ///
    /// Panics if the call does not exist or was already settled.
    pub fn reject(&self, index: usize, message: &str) {
        self.complete(index, Err(ExecFailure::new(message)));
    }

    /// Drops the `index`-th call's callback without firing it,
    /// simulating a host that abandons an invocation.
    pub fn drop_pending(&self, index: usize) {
        if let Some(call) = self.calls.lock().get_mut(index) {
            call.callback = None;
        }
    }

    fn complete(&self, index: usize, outcome: ExecOutcome) {
        // Take the callback out before firing so a re-entrant invoke
        // from inside the callback cannot deadlock on the lock.
        let callback = self
            .calls
            .lock()
            .get_mut(index)
            .and_then(|call| call.callback.take())
            .expect("call exists and has an unfired completion callback");
        callback(outcome);
    }
}

impl ExecCapability for ManualExecCapability {
    fn invoke(&self, operation_id: i64, context_name: &str) -> Box<dyn PendingExecHandle> {
        let mut calls = self.calls.lock();
        let index = calls.len();
        calls.push(PendingCall {
            operation_id,
            context_name: context_name.to_string(),
            callback: None,
        });
        Box::new(ManualHandle {
            calls: Arc::clone(&self.calls),
            index,
        })
    }
}

struct ManualHandle {
    calls: Arc<Mutex<Vec<PendingCall>>>,
    index: usize,
}

impl PendingExecHandle for ManualHandle {
    fn on_complete(self: Box<Self>, callback: CompletionCallback) {
        if let Some(call) = self.calls.lock().get_mut(self.index) {
            call.callback = Some(callback);
        }
    }
}

// ─── Spec-engine stand-ins ───────────────────────────────────────────

/// Spec runner with nothing declared: always succeeds.
#[derive(Debug, Default)]
pub struct NullSpecRunner;

#[async_trait]
impl SpecRunner for NullSpecRunner {
    async fn run_all(&self) -> Result<(), SpecFailure> {
        Ok(())
    }
}

/// Succeeds and counts how many times the engine was asked to run.
#[derive(Debug, Default)]
pub struct CountingSpecRunner {
    runs: AtomicUsize,
}

impl CountingSpecRunner {
    /// Creates a runner with a zeroed counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `run_all` calls observed so far.
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpecRunner for CountingSpecRunner {
    async fn run_all(&self) -> Result<(), SpecFailure> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails every run with a fixed message.
#[derive(Debug)]
pub struct FailingSpecRunner {
    message: String,
}

impl FailingSpecRunner {
    /// Creates a runner that fails with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl SpecRunner for FailingSpecRunner {
    async fn run_all(&self) -> Result<(), SpecFailure> {
        Err(SpecFailure::new(self.message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counting_continuation_counts_resumes() {
        let continuation = CountingContinuation::new();
        assert_eq!(continuation.resume_count(), 0);
        continuation.resume();
        continuation.resume();
        assert_eq!(continuation.resume_count(), 2);
    }

    #[test]
    fn queued_capability_completes_in_order() {
        let capability = QueuedExecCapability::with_responses(vec![
            Ok(json!({"status": 200})),
            Err(ExecFailure::new("boom")),
        ]);

        let seen: Arc<Mutex<Vec<ExecOutcome>>> = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let seen_clone = Arc::clone(&seen);
            capability
                .invoke(1, "env")
                .on_complete(Box::new(move |outcome| {
                    seen_clone.lock().push(outcome);
                }));
        }

        let seen = seen.lock();
        assert_eq!(seen[0], Ok(json!({"status": 200})));
        assert_eq!(seen[1], Err(ExecFailure::new("boom")));
    }

    #[test]
    fn queued_capability_fails_when_exhausted() {
        let capability = QueuedExecCapability::new();
        let seen: Arc<Mutex<Vec<ExecOutcome>>> = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        capability
            .invoke(9, "env")
            .on_complete(Box::new(move |outcome| {
                seen_clone.lock().push(outcome);
            }));

        let seen = seen.lock();
        assert!(
            matches!(&seen[0], Err(failure) if failure.message.contains("no more queued")),
            "exhausted queue should yield a recognizable failure"
        );
    }

    #[test]
    fn manual_capability_settles_out_of_order() {
        let capability = ManualExecCapability::new();
        let seen: Arc<Mutex<Vec<(usize, ExecOutcome)>>> = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..2usize {
            let seen_clone = Arc::clone(&seen);
            capability
                .invoke(tag as i64, "env")
                .on_complete(Box::new(move |outcome| {
                    seen_clone.lock().push((tag, outcome));
                }));
        }

        assert!(capability.is_pending(0));
        assert!(capability.is_pending(1));

        capability.resolve(1, json!("second"));
        assert!(capability.is_pending(0), "settling one call leaves the other pending");
        capability.resolve(0, json!("first"));

        let seen = seen.lock();
        assert_eq!(seen[0], (1, Ok(json!("second"))));
        assert_eq!(seen[1], (0, Ok(json!("first"))));
    }

    #[test]
    fn manual_capability_records_invocations() {
        let capability = ManualExecCapability::new();
        capability.invoke(7, "staging").on_complete(Box::new(|_| {}));

        assert_eq!(capability.invocation_count(), 1);
        assert_eq!(capability.invocation(0), Some((7, "staging".to_string())));
    }

    #[tokio::test]
    async fn failing_spec_runner_reports_message() {
        let runner = FailingSpecRunner::new("2 specs failed");
        let result = runner.run_all().await;
        assert_eq!(result, Err(SpecFailure::new("2 specs failed")));
    }

    #[tokio::test]
    async fn counting_spec_runner_counts() {
        let runner = CountingSpecRunner::new();
        runner.run_all().await.expect("counting runner succeeds");
        runner.run_all().await.expect("counting runner succeeds");
        assert_eq!(runner.run_count(), 2);
    }
}
