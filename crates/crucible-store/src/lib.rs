#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Crucible Store
//!
//! Persistence for the Execution Record Store (C3, §4.3) and Idempotence
//! Cache (C2, §4.2): an in-memory implementation for tests and
//! single-process deployments, and a Postgres-backed implementation for
//! production.

mod memory;
mod postgres;
mod traits;

pub use memory::{InMemoryCacheStore, InMemoryExecutionStore};
pub use postgres::{PostgresCacheStore, PostgresExecutionStore};
pub use traits::{CacheStore, ExecutionStore};
