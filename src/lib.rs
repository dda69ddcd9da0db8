//! # ekio
//!
//! A minimal single-threaded readiness event loop.
//!
//! Callers submit operations (accept, connect, read, write, recv, send or
//! a timer) together with a callback. The loop registers one-shot
//! interest with the OS multiplexer (`epoll` on Linux, `kqueue` on macOS
//! and the BSDs) and runs the callback exactly once when the descriptor
//! becomes ready or the timer expires. Performing the transfer, and
//! resubmitting to be notified again, is up to the callback.
//!
//! ## Modules
//!
//! - [`fifo`]: intrusive FIFO queue the loop threads its completions through
//! - [`time`]: the monotonic clock timers are expressed on
//! - [`poller`]: the multiplexer backends behind [`Backend`]
//!
//! ## Example
//!
//! ```no_run
//! use ekio::EventLoop;
//! use std::time::Duration;
//!
//! let mut event_loop = EventLoop::init()?;
//!
//! event_loop.timeout_after(Duration::from_millis(10), |_, id| {
//!     println!("timer {id} fired");
//! });
//! event_loop.run_for(Duration::from_millis(20))?;
//!
//! event_loop.deinit();
//! # Ok::<(), ekio::Error>(())
//! ```

mod builder;
mod error;
mod reactor;
mod utils;

pub mod fifo;
pub mod time;

pub use builder::EventLoopBuilder;
pub use error::{Error, Result};
pub use reactor::poller;
pub use reactor::poller::{Backend, Interest, Poller};
pub use reactor::{Callback, CompletionId, CompletionState, EventLoop, Operation};
pub use time::current_time;
