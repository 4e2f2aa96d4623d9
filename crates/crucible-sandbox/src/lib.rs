#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Crucible Sandbox
//!
//! The Sandbox Executor (spec.md §4.1): runs one confined, one-shot
//! container per invocation and turns its outcome into a structured
//! result, without itself deciding whether a failure is worth retrying —
//! that call belongs to `crucible-resilience`.

mod cli;
mod envelope;
mod fake;
mod runtime;
mod spec;
mod state;

pub use cli::CliContainerRuntime;
pub use envelope::{parse_envelope, StdinEnvelope, StdoutEnvelope, ToolError};
pub use fake::FakeContainerRuntime;
pub use runtime::{run, ContainerRuntime, Stats, WaitOutcome};
pub use spec::{ExecError, ExecResult, ExecSpec, NetworkAttachment};
pub use state::ContainerState;
