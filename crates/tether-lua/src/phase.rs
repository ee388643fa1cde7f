//! The handoff state machine and its release guard.

use parking_lot::Mutex;
use tether_host::Continuation;

/// Where one run stands in the continuation-handoff protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// The script body is executing synchronously to its current floor.
    Running,
    /// The environment has suspended after a delivery handoff; the host
    /// may act. Leaving this state is engine-internal (a deferred value
    /// settling, or the host delivering again).
    Awaiting,
    /// The run (body plus the awaited spec engine) has finished and
    /// the final handoff was issued. Terminal for the run.
    Completed,
}

/// Which of the two defined handoff points a guard stands for.
#[derive(Debug, Clone, Copy)]
pub(crate) enum HandoffPoint {
    /// End of processing one delivered external event.
    Delivery,
    /// End of the whole run.
    RunEnd,
}

/// Fires the handoff on drop, on every exit path.
///
/// Constructed on entry to `deliver` and `run_script`; whatever happens
/// afterwards (normal return, early return, captured failure) dropping
/// the guard records the phase transition and calls
/// [`Continuation::resume`] exactly once. A delivery after the run has
/// completed leaves the phase at [`RunPhase::Completed`]; the run's
/// terminal state never regresses.
pub(crate) struct HandoffGuard<'a> {
    continuation: &'a dyn Continuation,
    phase: &'a Mutex<RunPhase>,
    point: HandoffPoint,
}

impl<'a> HandoffGuard<'a> {
    pub(crate) fn new(
        continuation: &'a dyn Continuation,
        phase: &'a Mutex<RunPhase>,
        point: HandoffPoint,
    ) -> Self {
        Self {
            continuation,
            phase,
            point,
        }
    }
}

impl Drop for HandoffGuard<'_> {
    fn drop(&mut self) {
        {
            let mut phase = self.phase.lock();
            *phase = match (self.point, *phase) {
                (HandoffPoint::RunEnd, _) => RunPhase::Completed,
                (HandoffPoint::Delivery, RunPhase::Completed) => RunPhase::Completed,
                (HandoffPoint::Delivery, _) => RunPhase::Awaiting,
            };
            tracing::debug!(phase = ?*phase, "handoff issued");
        }
        self.continuation.resume();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_host::testing::CountingContinuation;

    #[test]
    fn guard_fires_once_on_normal_exit() {
        let continuation = CountingContinuation::new();
        let phase = Mutex::new(RunPhase::Running);

        {
            let _guard = HandoffGuard::new(&continuation, &phase, HandoffPoint::Delivery);
        }

        assert_eq!(continuation.resume_count(), 1);
        assert_eq!(*phase.lock(), RunPhase::Awaiting);
    }

    #[test]
    fn guard_fires_on_early_return() {
        let continuation = CountingContinuation::new();
        let phase = Mutex::new(RunPhase::Running);

        fn bails(continuation: &CountingContinuation, phase: &Mutex<RunPhase>) -> Result<(), ()> {
            let _guard = HandoffGuard::new(continuation, phase, HandoffPoint::Delivery);
            Err(())
        }

        assert!(bails(&continuation, &phase).is_err());
        assert_eq!(continuation.resume_count(), 1);
    }

    #[test]
    fn run_end_marks_completed() {
        let continuation = CountingContinuation::new();
        let phase = Mutex::new(RunPhase::Running);

        {
            let _guard = HandoffGuard::new(&continuation, &phase, HandoffPoint::RunEnd);
        }

        assert_eq!(*phase.lock(), RunPhase::Completed);
    }

    #[test]
    fn delivery_after_completion_stays_completed() {
        let continuation = CountingContinuation::new();
        let phase = Mutex::new(RunPhase::Completed);

        {
            let _guard = HandoffGuard::new(&continuation, &phase, HandoffPoint::Delivery);
        }

        assert_eq!(*phase.lock(), RunPhase::Completed);
        assert_eq!(continuation.resume_count(), 1, "handoff still fires");
    }
}
