//! Linux `epoll`-based poller implementation.
//!
//! It is functionally equivalent to the `kqueue` poller and exposes the
//! same interface to the event loop.
//!
//! Responsibilities:
//! - Arm one-shot read or write interest on file descriptors
//! - Fall back to `EPOLL_CTL_MOD` for descriptors already in the set
//! - Block waiting for readiness up to a deadline
//!
//! This backend is selected automatically on Linux and Android targets.

use super::Backend;
use super::common::{Interest, Registrations};
use super::unix::{cvt, sys_close};
use crate::reactor::completion::CompletionId;
use crate::{Error, Result};

use libc::{
    EEXIST, ENOENT, EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_MOD, EPOLLIN, EPOLLONESHOT, EPOLLOUT,
    c_int, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use log::{debug, trace};
use std::collections::HashSet;
use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Linux `epoll` poller.
///
/// This poller owns:
/// - an `epoll` instance,
/// - a reusable event buffer,
/// - the set of descriptors already added to the instance,
/// - the table of armed one-shot registrations.
pub struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,

    /// Descriptors added to the epoll set. One-shot registrations stay in
    /// the set after firing, so these are re-armed with `EPOLL_CTL_MOD`.
    /// A descriptor whose registration fails is dropped again.
    known: HashSet<RawFd>,

    armed: Registrations,
}

impl EpollPoller {
    fn ctl(&self, op: c_int, fd: RawFd, event: &mut epoll_event) -> io::Result<()> {
        cvt(unsafe { epoll_ctl(self.epoll, op, fd, event) }).map(drop)
    }
}

impl Backend for EpollPoller {
    fn new(event_capacity: usize) -> Result<Self> {
        let epoll = cvt(unsafe { epoll_create1(EPOLL_CLOEXEC) }).map_err(Error::Create)?;

        debug!("epoll instance {epoll} created");

        Ok(Self {
            epoll,
            events: Vec::with_capacity(event_capacity.max(1)),
            known: HashSet::new(),
            armed: Registrations::new(),
        })
    }

    fn register(
        &mut self,
        fd: RawFd,
        interest: Interest,
        token: CompletionId,
    ) -> Result<Option<CompletionId>> {
        let flags = match interest {
            Interest::Readable => EPOLLIN,
            Interest::Writable => EPOLLOUT,
        } | EPOLLONESHOT;

        let mut event = epoll_event {
            events: flags as u32,
            u64: token.index() as u64,
        };

        // A descriptor closed and reused behind our back is gone from the
        // set (ENOENT on modify); one added elsewhere already exists
        // (EEXIST on add). Either way the other operation applies.
        let (op, fallback, expected) = if self.known.contains(&fd) {
            (EPOLL_CTL_MOD, EPOLL_CTL_ADD, ENOENT)
        } else {
            (EPOLL_CTL_ADD, EPOLL_CTL_MOD, EEXIST)
        };

        trace!("register: fd={fd}, interest={interest:?}, token={token}");

        let result = match self.ctl(op, fd, &mut event) {
            Err(err) if err.raw_os_error() == Some(expected) => {
                trace!("register: fd={fd} retried after {err}");
                self.ctl(fallback, fd, &mut event)
            }
            result => result,
        };

        if let Err(source) = result {
            // Most likely closed: forget it so the set stays bounded by
            // the descriptors still open.
            self.known.remove(&fd);
            return Err(Error::Register { fd, source });
        }

        self.known.insert(fd);

        let displaced = self.armed.arm(fd, interest, token);
        if let Some(old) = &displaced {
            trace!("register: fd={} no longer armed for {}", old.fd, old.token);
        }

        Ok(displaced.map(|old| old.token))
    }

    fn wait(&mut self, timeout: Option<Duration>, ready: &mut Vec<CompletionId>) -> Result<()> {
        let timeout_ms = timeout.map(timeout_millis).unwrap_or(-1);

        trace!(
            "wait: epoll={}, timeout_ms={timeout_ms}, armed={}",
            self.epoll,
            self.armed.len()
        );

        self.events.clear();

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as c_int,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(Error::Wait(err));
        }

        // SAFETY: epoll_wait initialized the first `n` entries.
        unsafe {
            self.events.set_len(n as usize);
        }

        for event in &self.events {
            let token = CompletionId(event.u64 as usize);

            if self.armed.fire(token).is_some() {
                ready.push(token);
            } else {
                trace!("wait: dropping stale event for token {token}");
            }
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        if let Err(err) = sys_close(self.epoll) {
            debug!("closing epoll instance {} failed: {err}", self.epoll);
        }
    }
}

/// Milliseconds for `epoll_wait`, rounded up so a timer is never woken early.
fn timeout_millis(timeout: Duration) -> c_int {
    let millis = timeout.as_nanos().div_ceil(1_000_000);
    c_int::try_from(millis).unwrap_or(c_int::MAX)
}
