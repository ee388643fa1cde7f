//! Callback-to-deferred bridging for the host execution capability.
//!
//! The host reports completion through a callback registered on a
//! per-call [`PendingExecHandle`]; a script wants a value it can suspend
//! on. The bridge ties the two together with one `oneshot` channel per
//! invocation: the completion callback is the sender, awaiting the
//! receiver is the deferred value. Each invocation owns its own channel,
//! so concurrent calls settle independently in whatever order the host
//! delivers them.

use tether_host::{ExecCapability, ExecFailure, ExecOutcome};
use tokio::sync::oneshot;

/// Invokes the host capability and suspends until its single terminal
/// event fires.
///
/// A host that drops the handle (or its stored callback) without
/// completing closes the channel; that surfaces as an [`ExecFailure`]
/// rather than suspending the caller forever.
pub(crate) async fn invoke_deferred(
    capability: &dyn ExecCapability,
    operation_id: i64,
    context_name: &str,
) -> ExecOutcome {
    let call_id = format!("ex-{}", uuid::Uuid::new_v4());
    tracing::debug!(
        call_id = %call_id,
        operation_id,
        context = %context_name,
        "bridge invocation started"
    );

    let (settled_tx, settled_rx) = oneshot::channel();
    let handle = capability.invoke(operation_id, context_name);
    handle.on_complete(Box::new(move |outcome| {
        // The host fires exactly once; a receiver dropped by a cancelled
        // caller just discards the outcome.
        let _ = settled_tx.send(outcome);
    }));

    match settled_rx.await {
        Ok(outcome) => {
            tracing::debug!(call_id = %call_id, ok = outcome.is_ok(), "bridge invocation settled");
            outcome
        }
        Err(_) => {
            tracing::debug!(call_id = %call_id, "bridge invocation abandoned by host");
            Err(ExecFailure::new(
                "execution capability dropped without completing",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::poll;
    use serde_json::json;
    use tether_host::testing::{ManualExecCapability, QueuedExecCapability};

    #[tokio::test]
    async fn immediate_completion_resolves() {
        let capability = QueuedExecCapability::with_responses(vec![Ok(json!({"status": 200}))]);

        let outcome = invoke_deferred(&capability, 1, "env1").await;

        assert_eq!(outcome, Ok(json!({"status": 200})));
        assert_eq!(capability.invocations(), vec![(1, "env1".to_string())]);
    }

    #[tokio::test]
    async fn failure_passes_through_unchanged() {
        let capability =
            QueuedExecCapability::with_responses(vec![Err(ExecFailure::new("connection refused"))]);

        let outcome = invoke_deferred(&capability, 4, "prod").await;

        assert_eq!(outcome, Err(ExecFailure::new("connection refused")));
    }

    #[tokio::test]
    async fn concurrent_invocations_settle_independently() {
        let capability = ManualExecCapability::new();

        let first = invoke_deferred(&capability, 1, "env1");
        let second = invoke_deferred(&capability, 2, "env2");
        tokio::pin!(first);
        tokio::pin!(second);

        assert!(poll!(first.as_mut()).is_pending());
        assert!(poll!(second.as_mut()).is_pending());
        assert_eq!(capability.invocation_count(), 2);

        capability.resolve(1, json!({"status": 201}));
        assert!(
            poll!(first.as_mut()).is_pending(),
            "settling the second call must not touch the first"
        );
        assert_eq!(second.await, Ok(json!({"status": 201})));

        capability.resolve(0, json!({"status": 200}));
        assert_eq!(first.await, Ok(json!({"status": 200})));
    }

    #[tokio::test]
    async fn abandoned_handle_rejects_instead_of_hanging() {
        let capability = ManualExecCapability::new();

        let deferred = invoke_deferred(&capability, 3, "env");
        tokio::pin!(deferred);
        assert!(poll!(deferred.as_mut()).is_pending());

        capability.drop_pending(0);

        let outcome = deferred.await;
        assert!(
            matches!(&outcome, Err(failure) if failure.message.contains("without completing")),
            "got: {outcome:?}"
        );
    }
}
