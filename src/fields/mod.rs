//! fields
//!
//! Registries shared by the fields a host mounts.

pub mod button;

pub use button::{ButtonConfig, ButtonError, ButtonGuard, ButtonManager, LoadListenerHandle};
