//! reactive
//!
//! Single-threaded change propagation primitives.
//!
//! - [`Signal`]: a shared value cell with ordered listeners.
//! - [`MappedSignal`]: a signal that converts raw input before storing it.
//! - [`SignalLike`]: what a subscription needs from either of them.
//! - [`RefRegistry`]: keyed shared values released through [`RefGuard`]s.
//!
//! # Architecture
//!
//! Everything here uses `Rc` and `RefCell`; nothing is `Send`. The engine
//! runs on one thread and listeners are plain synchronous callbacks.

pub mod ref_counter;
pub mod signal;

pub use ref_counter::{RefCounter, RefGuard, RefRegistry};
pub use signal::{ListenerId, MappedSignal, Signal, SignalLike};
