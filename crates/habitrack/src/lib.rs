//! Top-level facade crate for habitrack.
//!
//! Re-exports core types and the server library so users can depend on a single crate.

pub mod core {
    pub use habitrack_core::*;
}

pub mod server {
    pub use habitrack_server::*;
}
