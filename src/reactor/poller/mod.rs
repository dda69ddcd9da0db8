//! Platform-specific readiness multiplexer.
//!
//! This module provides a unified interface over the OS readiness
//! facilities: `epoll` on Linux and Android, `kqueue` on macOS, iOS and
//! the BSDs. Both implement [`Backend`], and the concrete one is
//! selected at compile time as [`Poller`].
//!
//! Every registration is one-shot: once it fires it is disarmed and the
//! completion must be resubmitted to be observed again. Both backends
//! keep at most one armed interest per descriptor, so identical
//! submission sequences produce identical event sequences.

pub(crate) mod common;

#[cfg(test)]
pub(crate) mod mock;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod epoll;

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
mod kqueue;

#[cfg(unix)]
pub(crate) mod unix;

pub use common::Interest;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use epoll::EpollPoller;

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
pub use kqueue::KqueuePoller;

/// The native backend of the target OS.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub type Poller = EpollPoller;

/// The native backend of the target OS.
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
pub type Poller = KqueuePoller;

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
compile_error!("ekio supports epoll (Linux, Android) and kqueue (macOS, iOS, BSD) targets only");

use crate::Result;
use crate::reactor::completion::CompletionId;

use std::os::fd::RawFd;
use std::time::Duration;

/// Contract between the event loop and an OS multiplexer.
///
/// The loop owns the pending queue and decides what to register; a
/// backend only arms interests and reports which ones fired.
pub trait Backend: Sized {
    /// Opens the multiplexer handle.
    ///
    /// `event_capacity` bounds how many events a single [`wait`](Self::wait)
    /// can report.
    fn new(event_capacity: usize) -> Result<Self>;

    /// Arms a one-shot `interest` on `fd`, tagged with `token`.
    ///
    /// A descriptor the backend already knows is modified in place rather
    /// than failing. If `fd` still had an armed interest for another
    /// token, that registration is replaced and its token returned: it
    /// will never fire.
    fn register(
        &mut self,
        fd: RawFd,
        interest: Interest,
        token: CompletionId,
    ) -> Result<Option<CompletionId>>;

    /// Blocks until an armed interest fires or `timeout` elapses.
    ///
    /// `Some(Duration::ZERO)` polls without blocking, `None` blocks until
    /// an event arrives. Tokens of fired registrations are appended to
    /// `ready`; each one is disarmed.
    fn wait(&mut self, timeout: Option<Duration>, ready: &mut Vec<CompletionId>) -> Result<()>;
}
