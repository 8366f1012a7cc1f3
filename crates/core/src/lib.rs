//! Domain rules for the client-service backend.
//!
//! This crate has no I/O. It holds the shared id/timestamp types, the
//! declarative descriptors of the mirrored tables, and the lifecycle rules
//! for service applications, so both the storage layer and the HTTP layer
//! agree on them.

pub mod application;
pub mod error;
pub mod mirror;
pub mod types;
pub mod warranty;
