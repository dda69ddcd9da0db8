use crate::reactor::{CompletionId, CompletionState};

use std::io;
use std::os::fd::RawFd;

/// Errors returned by the event loop.
///
/// The first three variants are multiplexer faults. The loop cannot make
/// progress after one of them; the caller decides whether to exit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The multiplexer handle (epoll / kqueue instance) could not be created.
    #[error("failed to create multiplexer handle: {0}")]
    Create(#[source] io::Error),

    /// The descriptor could not be registered, even through the modify path.
    #[error("failed to register descriptor {fd}: {source}")]
    Register {
        fd: RawFd,
        #[source]
        source: io::Error,
    },

    /// The wait primitive failed for a reason other than a signal.
    #[error("multiplexer wait failed: {0}")]
    Wait(#[source] io::Error),

    /// The id does not name a live completion.
    #[error("unknown completion {0}")]
    UnknownCompletion(CompletionId),

    /// The completion is not in a state that allows the requested transition.
    #[error("completion {id} is {state:?}")]
    InvalidState {
        id: CompletionId,
        state: CompletionState,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
