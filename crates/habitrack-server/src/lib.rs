//! habitrack server library entry.
//!
//! This crate wires the store, the user/habit handlers, the request
//! instrumentation, the background host sampler and the exposition endpoint
//! into one service. It is consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod obs;
pub mod ops;
pub mod router;
pub mod store;
