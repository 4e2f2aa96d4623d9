#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Crucible Runner
//!
//! The Runner Orchestrator (C7, spec.md §4.7): the single entry point that
//! turns an `Execute` request into a cached, validated, retried, audited
//! sandboxed container run. Everything else in this workspace —
//! `crucible-sandbox`, `crucible-resilience`, `crucible-schema`,
//! `crucible-registry`, `crucible-store` — is a dependency this crate
//! wires together.

pub mod journal;
pub mod orchestrator;
pub mod secrets;
pub mod types;

pub use journal::{InMemoryJournalSink, JournalSink, NullJournalSink};
pub use orchestrator::{cached_response, Orchestrator};
pub use secrets::{EnvSecretSource, NullSecretSource, SecretSource};
pub use types::{ExecuteRequest, ExecuteResponse, Metrics};
