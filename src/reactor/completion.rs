//! Completions and the operations they describe.
//!
//! A [`Completion`] is the loop's record of one request: the
//! [`Operation`] to watch for, the callback to run when it resolves, and
//! the queue link that threads it through the loop's queues. Completions
//! live in the loop's arena and are named by a [`CompletionId`].

use super::core::EventLoop;
use super::poller::Interest;
use crate::fifo::{Link, Linked};

use std::fmt;
use std::os::fd::RawFd;
use std::ptr;

/// Callback run when a completion is dispatched.
///
/// It receives the loop and the id of the completion that fired. The
/// caller's context is whatever the closure captures.
pub type Callback<B> = Box<dyn FnMut(&mut EventLoop<B>, CompletionId)>;

/// Stable name of a completion owned by an [`EventLoop`].
///
/// Ids are reused once a completion is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompletionId(pub(crate) usize);

impl CompletionId {
    /// Index of the completion inside the loop's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CompletionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a completion currently sits.
///
/// `Idle -> Pending -> Registered -> Ready -> Idle` for I/O,
/// `Idle -> Pending -> Ready -> Idle` for timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    /// Inert: never submitted, or dispatched and not resubmitted.
    Idle,

    /// Waiting in `io_pending` or `timeouts`; unknown to the OS.
    Pending,

    /// Handed to the multiplexer and counted as in flight.
    Registered,

    /// Waiting in `completed` for its callback to run.
    Ready,
}

/// The request a completion stands for.
///
/// The loop only watches for readiness. Performing the transfer with the
/// fields carried here is the callback's job; `buf` pointers are never
/// dereferenced by the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Accept {
        socket: RawFd,
    },
    Connect {
        socket: RawFd,
    },
    Read {
        fd: RawFd,
        buf: *mut u8,
        len: usize,
        offset: u64,
    },
    Write {
        fd: RawFd,
        buf: *const u8,
        len: usize,
        offset: u64,
    },
    Recv {
        socket: RawFd,
    },
    Send {
        socket: RawFd,
    },
    /// Fires once `expires` (nanoseconds on [`current_time`](crate::current_time)) is reached.
    Timeout {
        expires: u64,
    },
}

impl Operation {
    /// A read into `buf` at `offset`.
    ///
    /// Only the pointer and length are stored; the caller keeps the buffer
    /// alive until it performs the read.
    pub fn read(fd: RawFd, buf: &mut [u8], offset: u64) -> Self {
        Operation::Read {
            fd,
            buf: buf.as_mut_ptr(),
            len: buf.len(),
            offset,
        }
    }

    /// A write of `buf` at `offset`.
    pub fn write(fd: RawFd, buf: &[u8], offset: u64) -> Self {
        Operation::Write {
            fd,
            buf: buf.as_ptr(),
            len: buf.len(),
            offset,
        }
    }

    /// A read readiness watch without a buffer.
    pub fn readable(fd: RawFd) -> Self {
        Operation::Read {
            fd,
            buf: ptr::null_mut(),
            len: 0,
            offset: 0,
        }
    }

    /// The descriptor this operation watches, if any.
    pub fn fd(&self) -> Option<RawFd> {
        match *self {
            Operation::Accept { socket }
            | Operation::Connect { socket }
            | Operation::Recv { socket }
            | Operation::Send { socket } => Some(socket),
            Operation::Read { fd, .. } | Operation::Write { fd, .. } => Some(fd),
            Operation::Timeout { .. } => None,
        }
    }

    /// Readiness direction registered with the multiplexer.
    ///
    /// Timers have none; they never reach the multiplexer.
    pub fn interest(&self) -> Option<Interest> {
        match self {
            Operation::Accept { .. } | Operation::Read { .. } | Operation::Recv { .. } => {
                Some(Interest::Readable)
            }
            Operation::Connect { .. } | Operation::Write { .. } | Operation::Send { .. } => {
                Some(Interest::Writable)
            }
            Operation::Timeout { .. } => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Operation::Timeout { .. })
    }

    /// Expiry of a timer operation.
    pub fn expires(&self) -> Option<u64> {
        match *self {
            Operation::Timeout { expires } => Some(expires),
            _ => None,
        }
    }
}

/// One request owned by the loop.
pub(crate) struct Completion<B> {
    link: Link,
    pub(crate) state: CompletionState,
    pub(crate) operation: Operation,

    /// Taken out while the callback runs, so the callback may borrow the loop.
    pub(crate) callback: Option<Callback<B>>,
}

impl<B> Completion<B> {
    pub(crate) fn new(operation: Operation, callback: Callback<B>) -> Self {
        Self {
            link: Link::new(),
            state: CompletionState::Idle,
            operation,
            callback: Some(callback),
        }
    }
}

impl<B> Linked for Completion<B> {
    fn link(&self) -> &Link {
        &self.link
    }

    fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }
}
