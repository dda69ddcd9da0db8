//! The event loop and everything it coordinates.
//!
//! - `completion`: the records the loop owns and the operations they watch
//! - `timer`: expiry scan over the `timeouts` queue
//! - `poller`: the OS multiplexer backends
//! - `core`: the loop itself

mod core;
mod timer;

pub(crate) mod completion;
pub mod poller;

pub use completion::{Callback, CompletionId, CompletionState, Operation};
pub use self::core::EventLoop;
