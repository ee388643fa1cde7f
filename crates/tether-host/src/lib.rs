//! Host-side capability seam for the tether script harness.
//!
//! The harness (`tether-lua`) never talks to the embedding application
//! directly. Everything it needs from the host is expressed as a trait in
//! this crate, implemented by the host and injected at construction time:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   Host application                   │
//! │  impl Continuation   (driving-loop wakeup)           │
//! │  impl ExecCapability (run one referenced operation)  │
//! │  impl SpecRunner     (behavior-driven spec engine)   │
//! └───────────────┬──────────────────────────────────────┘
//!                 │ injected via ScriptRunBuilder
//!                 ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              ScriptRun (tether-lua)                  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The [`testing`] module provides deterministic in-memory implementations
//! of all three capabilities for exercising the harness without a host.

mod continuation;
mod exec;
mod specs;

pub mod testing;

pub use continuation::Continuation;
pub use exec::{CompletionCallback, ExecCapability, ExecFailure, ExecOutcome, PendingExecHandle};
pub use specs::{SpecFailure, SpecRunner};
