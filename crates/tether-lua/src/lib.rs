//! Continuation-handoff harness for host-embedded Lua script bodies.
//!
//! A host application embeds a script engine it drives synchronously, one
//! tick at a time; it cannot block or poll for completion of work the
//! script starts. This crate is the bridging layer around an isolated Lua
//! environment that makes that workable: whenever the script environment
//! runs out of synchronous work (suspended on a host operation, or fully
//! finished), the harness notifies the host through its injected
//! continuation so the driving loop can proceed.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      Host application                      │
//! │   Continuation · ExecCapability · SpecRunner (injected)    │
//! └──────┬──────────────────────────────────────────▲──────────┘
//!        │ run_script(body) / deliver(payload)      │ resume()
//!        ▼                                          │
//! ┌────────────────────────────────────────────────────────────┐
//! │                     ScriptRun (per run)                    │
//! │  ┌──────────────┐ ┌──────────────┐ ┌────────────────────┐  │
//! │  │ RunCapture   │ │ CallbackSlot │ │ bridge (oneshot    │  │
//! │  │ log + error  │ │ one handler  │ │ per invocation)    │  │
//! │  └──────────────┘ └──────────────┘ └────────────────────┘  │
//! │                 sandboxed Lua VM (mlua)                    │
//! │        log(...) · register_callback(fn) · invoke(..)       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Handoff discipline
//!
//! [`Continuation::resume`] fires at exactly two points, each guarded so
//! that failures cannot strand the host: once at the end of every
//! [`ScriptRun::deliver`] call, and once, unconditionally, at the end
//! of [`ScriptRun::run_script`]. Script failures never cross back as
//! errors; the host reads [`ScriptRun::error_message`] and
//! [`ScriptRun::serialize_logs`] after the handoff.
//!
//! [`Continuation::resume`]: tether_host::Continuation::resume

mod bridge;
mod capture;
mod driver;
mod env;
mod error;
mod phase;
mod slot;

pub use capture::LogEntry;
pub use driver::{ScriptRun, ScriptRunBuilder};
pub use error::HarnessError;
pub use phase::RunPhase;
