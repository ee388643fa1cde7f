//! Run driver: executes one injected script body and guarantees the
//! final handoff.
//!
//! A [`ScriptRun`] owns everything scoped to one run (the VM, the
//! capture buffers, the delivery slot, the phase) and borrows the host's
//! [`Continuation`]. The two host entry points (`run_script`, `deliver`)
//! both follow the same release discipline: a [`HandoffGuard`] is created
//! on entry, so whatever the script does, control notification reaches
//! the host exactly once per entry.

use crate::capture::RunCapture;
use crate::env;
use crate::error::{flatten_lua_error, HarnessError};
use crate::phase::{HandoffGuard, HandoffPoint, RunPhase};
use crate::slot::CallbackSlot;
use crate::LogEntry;
use async_trait::async_trait;
use mlua::{Lua, LuaSerdeExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tether_host::{
    CompletionCallback, Continuation, ExecCapability, ExecFailure, PendingExecHandle, SpecFailure,
    SpecRunner,
};

/// Builds a [`ScriptRun`] from the host's injected capabilities.
///
/// Only the continuation is mandatory; a run without an execution
/// capability fails bridge invocations with a clear message, and a run
/// without a spec engine treats the spec phase as trivially successful.
pub struct ScriptRunBuilder {
    continuation: Arc<dyn Continuation>,
    exec: Option<Arc<dyn ExecCapability>>,
    spec_runner: Option<Arc<dyn SpecRunner>>,
}

impl ScriptRunBuilder {
    /// Starts a builder around the host's continuation capability.
    pub fn new(continuation: Arc<dyn Continuation>) -> Self {
        Self {
            continuation,
            exec: None,
            spec_runner: None,
        }
    }

    /// Installs the host capability behind `invoke`.
    #[must_use]
    pub fn with_exec_capability(mut self, exec: Arc<dyn ExecCapability>) -> Self {
        self.exec = Some(exec);
        self
    }

    /// Installs the spec engine awaited at the end of the run.
    #[must_use]
    pub fn with_spec_runner(mut self, spec_runner: Arc<dyn SpecRunner>) -> Self {
        self.spec_runner = Some(spec_runner);
        self
    }

    /// Creates the run-scoped environment.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Runtime`] if VM setup fails.
    pub fn build(self) -> Result<ScriptRun, HarnessError> {
        let capture = Arc::new(Mutex::new(RunCapture::default()));
        let slot = Arc::new(CallbackSlot::default());
        let exec = self.exec.unwrap_or_else(|| Arc::new(UnavailableExec));
        let lua = env::build_lua(Arc::clone(&capture), Arc::clone(&slot), exec)?;

        Ok(ScriptRun {
            lua,
            capture,
            slot,
            continuation: self.continuation,
            spec_runner: self.spec_runner.unwrap_or_else(|| Arc::new(NoSpecs)),
            phase: Mutex::new(RunPhase::Running),
        })
    }
}

/// One complete execution environment, constructed fresh per run.
pub struct ScriptRun {
    lua: Lua,
    capture: Arc<Mutex<RunCapture>>,
    slot: Arc<CallbackSlot>,
    continuation: Arc<dyn Continuation>,
    spec_runner: Arc<dyn SpecRunner>,
    phase: Mutex<RunPhase>,
}

impl ScriptRun {
    /// Executes `body`, awaits the spec engine, and fires the final
    /// handoff.
    ///
    /// No failure crosses back to the host: an uncaught error from the
    /// body or the spec run is captured into the error slot, readable via
    /// [`error_message`](Self::error_message) after the handoff. The
    /// handoff itself is unconditional.
    pub async fn run_script(&self, body: &str) {
        tracing::info!("script run started");
        let _guard = HandoffGuard::new(
            self.continuation.as_ref(),
            &self.phase,
            HandoffPoint::RunEnd,
        );

        if let Err(message) = self.execute(body).await {
            tracing::info!(error = %message, "script run failed");
            self.capture.lock().set_error(message);
        } else {
            tracing::info!("script run finished");
        }
    }

    async fn execute(&self, body: &str) -> Result<(), String> {
        self.lua
            .load(body)
            .set_name("=script")
            .exec_async()
            .await
            .map_err(|err| flatten_lua_error(&err))?;

        self.spec_runner
            .run_all()
            .await
            .map_err(|SpecFailure { message }| message)
    }

    /// Pushes one externally produced event into the environment.
    ///
    /// Parses `payload` as JSON and invokes the registered handler with
    /// the parsed value, awaiting full completion (handlers may suspend).
    /// A handler failure is captured into the error slot. On every path
    /// (handler success or failure, malformed payload, no handler)
    /// exactly one handoff fires before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::MalformedPayload`] if `payload` does not
    /// parse; the handler is not invoked in that case, but the handoff
    /// still occurs.
    pub async fn deliver(&self, payload: &str) -> Result<(), HarnessError> {
        {
            let mut phase = self.phase.lock();
            if *phase == RunPhase::Awaiting {
                *phase = RunPhase::Running;
            }
        }
        let _guard = HandoffGuard::new(
            self.continuation.as_ref(),
            &self.phase,
            HandoffPoint::Delivery,
        );

        let event: serde_json::Value = serde_json::from_str(payload)
            .map_err(|err| HarnessError::MalformedPayload(err.to_string()))?;

        let Some(handler) = self.slot.current(&self.lua)? else {
            tracing::debug!("no delivery handler registered, event dropped");
            return Ok(());
        };

        let argument = self.lua.to_value(&event)?;
        if let Err(err) = handler.call_async::<()>(argument).await {
            let message = flatten_lua_error(&err);
            tracing::debug!(error = %message, "delivery handler failed");
            self.capture.lock().set_error(message);
        }
        Ok(())
    }

    /// The log buffer as a JSON array of `{time, message}`, in call
    /// order. Pure; callable any number of times.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::LogEncode`] if encoding fails.
    pub fn serialize_logs(&self) -> Result<String, HarnessError> {
        Ok(self.capture.lock().serialize_logs()?)
    }

    /// Entries captured so far, in call order.
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.capture.lock().entries().to_vec()
    }

    /// The captured failure message, if any step of the run failed.
    /// Empty on success.
    pub fn error_message(&self) -> Option<String> {
        self.capture.lock().error_message().map(str::to_string)
    }

    /// Where the run stands in the handoff protocol.
    pub fn phase(&self) -> RunPhase {
        *self.phase.lock()
    }
}

/// Installed when the host provides no execution capability: every
/// invocation fails with a clear message instead of suspending.
struct UnavailableExec;

impl ExecCapability for UnavailableExec {
    fn invoke(&self, _operation_id: i64, _context_name: &str) -> Box<dyn PendingExecHandle> {
        Box::new(UnavailableHandle)
    }
}

struct UnavailableHandle;

impl PendingExecHandle for UnavailableHandle {
    fn on_complete(self: Box<Self>, callback: CompletionCallback) {
        callback(Err(ExecFailure::new("no execution capability installed")));
    }
}

/// Installed when the host provides no spec engine: the spec phase
/// succeeds with nothing to run.
struct NoSpecs;

#[async_trait]
impl SpecRunner for NoSpecs {
    async fn run_all(&self) -> Result<(), SpecFailure> {
        Ok(())
    }
}
