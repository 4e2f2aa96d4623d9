#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Crucible Registry
//!
//! A client for the Registry's three Runner-facing operations (§4.8) and
//! the Manifest Resolver (C6, §4.6) that wraps it with a bounded local
//! cache.

mod client;
pub mod fake;
mod resolver;

pub use client::{HttpRegistryClient, ManifestWithId, RegistryClient, VersionQuery};
pub use fake::FakeRegistryClient;
pub use resolver::ManifestResolver;
