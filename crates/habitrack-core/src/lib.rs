//! habitrack core: transport-agnostic telemetry primitives and the shared error type.
//!
//! This crate owns the process-wide metric registry and the scoped latency
//! observer. It carries no HTTP or runtime dependencies so the same registry
//! can be written to from request handlers, storage code, and the background
//! host sampler.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `HabitError`/`Result` so a bad metric
//! write can never take the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metrics;

/// Shared result type.
pub use error::{HabitError, Result};
