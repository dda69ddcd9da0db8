//! In-memory backend for exercising the loop without the OS.

use super::Backend;
use super::common::{Interest, Registrations};
use crate::{Error, Result};
use crate::reactor::completion::CompletionId;

use std::collections::HashSet;
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Fires armed registrations whose `(fd, interest)` a test marked ready.
#[derive(Debug, Default)]
pub(crate) struct MockPoller {
    armed: Registrations,
    ready: HashSet<(RawFd, Interest)>,

    /// Every timeout `wait` was called with, in order.
    pub(crate) waits: Vec<Option<Duration>>,

    /// Makes every `wait` fail.
    pub(crate) fail_wait: bool,
}

impl MockPoller {
    /// Marks `fd` as ready for `interest` until [`clear`](Self::clear).
    pub(crate) fn set_ready(&mut self, fd: RawFd, interest: Interest) {
        self.ready.insert((fd, interest));
    }

    pub(crate) fn clear(&mut self, fd: RawFd, interest: Interest) {
        self.ready.remove(&(fd, interest));
    }

    pub(crate) fn armed(&self) -> usize {
        self.armed.len()
    }
}

impl Backend for MockPoller {
    fn new(_event_capacity: usize) -> Result<Self> {
        Ok(Self::default())
    }

    fn register(
        &mut self,
        fd: RawFd,
        interest: Interest,
        token: CompletionId,
    ) -> Result<Option<CompletionId>> {
        Ok(self.armed.arm(fd, interest, token).map(|old| old.token))
    }

    fn wait(&mut self, timeout: Option<Duration>, ready: &mut Vec<CompletionId>) -> Result<()> {
        self.waits.push(timeout);

        if self.fail_wait {
            return Err(Error::Wait(io::Error::from_raw_os_error(libc::EBADF)));
        }

        // Lowest descriptor first, so tests see a stable order.
        let mut fired: Vec<(RawFd, CompletionId)> = self
            .ready
            .iter()
            .filter_map(|&(fd, interest)| {
                self.armed
                    .get(fd)
                    .filter(|armed| armed.interest == interest)
                    .map(|armed| (fd, armed.token))
            })
            .collect();
        fired.sort();

        for (_, token) in fired {
            self.armed.fire(token);
            ready.push(token);
        }

        Ok(())
    }
}
