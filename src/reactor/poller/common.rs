use crate::reactor::completion::CompletionId;

use std::collections::HashMap;
use std::os::fd::RawFd;

/// Readiness direction a completion waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interest {
    /// Data can be read, or a connection accepted.
    Readable,

    /// Data can be written, or a connection finished.
    Writable,
}

/// A one-shot interest that has been armed and has not fired yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Armed {
    pub(crate) fd: RawFd,
    pub(crate) interest: Interest,
    pub(crate) token: CompletionId,
}

/// Bookkeeping of armed one-shot registrations, shared by every backend.
///
/// A descriptor has at most one armed registration. Arming it again
/// replaces the previous one, which then can never fire; the caller gets
/// it back so it can be retired.
#[derive(Debug, Default)]
pub(crate) struct Registrations {
    by_fd: HashMap<RawFd, Armed>,
    by_token: HashMap<CompletionId, RawFd>,
}

impl Registrations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records a new armed interest and returns the one it replaced.
    pub(crate) fn arm(
        &mut self,
        fd: RawFd,
        interest: Interest,
        token: CompletionId,
    ) -> Option<Armed> {
        let armed = Armed {
            fd,
            interest,
            token,
        };

        // The same completion re-armed on another descriptor drops its old slot.
        if let Some(old_fd) = self.by_token.insert(token, fd) {
            if old_fd != fd {
                self.by_fd.remove(&old_fd);
            }
        }

        let displaced = self.by_fd.insert(fd, armed)?;
        if displaced.token == token {
            return None;
        }

        self.by_token.remove(&displaced.token);
        Some(displaced)
    }

    /// Disarms the registration of `token` after it fired.
    ///
    /// Returns `None` for a token that is not armed (stale event).
    pub(crate) fn fire(&mut self, token: CompletionId) -> Option<Armed> {
        let fd = self.by_token.remove(&token)?;
        self.by_fd.remove(&fd)
    }

    /// The armed registration of `fd`, if any.
    #[cfg(test)]
    pub(crate) fn get(&self, fd: RawFd) -> Option<&Armed> {
        self.by_fd.get(&fd)
    }

    /// Number of armed registrations.
    pub(crate) fn len(&self) -> usize {
        self.by_fd.len()
    }
}
