#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Crucible Error
//!
//! Centralized error handling for the Crucible runner platform, modeled on
//! the teacher's `nebula-error` crate: one taxonomy (`ErrorKind`), one
//! wrapper (`Error`), explicit retryability rather than exception types.
//!
//! Every `crucible-*` crate returns `crucible_error::Result<T>` from its
//! public API rather than inventing a parallel per-crate error enum — the
//! Retry & Budget Controller (§4.4) needs to branch on `is_retryable()`
//! regardless of which layer raised the error.

mod duration_millis;
mod error;
mod kinds;

pub use error::{Error, ErrorBody, ErrorEnvelope};
pub use kinds::{ErrorKind, Violation};

/// Result type used throughout Crucible.
pub type Result<T> = std::result::Result<T, Error>;
