//! `kqueue`-based poller for macOS, iOS and the BSDs.
//!
//! Functionally equivalent to the `epoll` poller. Read and write
//! readiness are separate filters in kqueue, so when a descriptor
//! switches direction the filter of the displaced registration is
//! deleted; otherwise both could fire and the two backends would
//! disagree.

use super::Backend;
use super::common::{Interest, Registrations};
use super::unix::{sys_close, sys_set_cloexec};
use crate::reactor::completion::CompletionId;
use crate::{Error, Result};

use libc::{EV_ADD, EV_DELETE, EV_ENABLE, EV_ONESHOT, EVFILT_READ, EVFILT_WRITE, kevent, kqueue};
use log::{debug, trace};
use std::io;
use std::mem;
use std::os::fd::RawFd;
use std::ptr;
use std::time::Duration;

/// kqueue poller.
pub struct KqueuePoller {
    /// The kqueue file descriptor.
    kq: RawFd,

    /// Buffer for kevent results.
    events: Vec<libc::kevent>,

    armed: Registrations,
}

fn filter(interest: Interest) -> i16 {
    match interest {
        Interest::Readable => EVFILT_READ,
        Interest::Writable => EVFILT_WRITE,
    }
}

fn change(fd: RawFd, filter: i16, flags: u16, token: CompletionId) -> libc::kevent {
    // Zeroed first: the struct has platform-specific extra fields.
    let mut event: libc::kevent = unsafe { mem::zeroed() };
    event.ident = fd as usize;
    event.filter = filter;
    event.flags = flags;
    event.udata = token.index() as *mut libc::c_void;
    event
}

impl KqueuePoller {
    fn apply(&self, change: &libc::kevent) -> io::Result<()> {
        let rc = unsafe { kevent(self.kq, change, 1, ptr::null_mut(), 0, ptr::null()) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

impl Backend for KqueuePoller {
    fn new(event_capacity: usize) -> Result<Self> {
        let kq = unsafe { kqueue() };
        if kq < 0 {
            return Err(Error::Create(io::Error::last_os_error()));
        }

        if let Err(err) = sys_set_cloexec(kq) {
            let _ = sys_close(kq);
            return Err(Error::Create(err));
        }

        debug!("kqueue instance {kq} created");

        Ok(Self {
            kq,
            events: Vec::with_capacity(event_capacity.max(1)),
            armed: Registrations::new(),
        })
    }

    fn register(
        &mut self,
        fd: RawFd,
        interest: Interest,
        token: CompletionId,
    ) -> Result<Option<CompletionId>> {
        trace!("register: fd={fd}, interest={interest:?}, token={token}");

        // EV_ADD on an existing (fd, filter) pair modifies it in place.
        let add = change(
            fd,
            filter(interest),
            EV_ADD | EV_ENABLE | EV_ONESHOT,
            token,
        );
        self.apply(&add)
            .map_err(|source| Error::Register { fd, source })?;

        let displaced = self.armed.arm(fd, interest, token);

        if let Some(old) = displaced {
            if old.interest != interest {
                let delete = change(old.fd, filter(old.interest), EV_DELETE, old.token);

                // The old filter may already be gone; nothing to undo then.
                if let Err(err) = self.apply(&delete) {
                    trace!("register: deleting stale filter on fd={fd}: {err}");
                }
            }
        }

        Ok(displaced.map(|old| old.token))
    }

    fn wait(&mut self, timeout: Option<Duration>, ready: &mut Vec<CompletionId>) -> Result<()> {
        let timespec = timeout.map(|t| libc::timespec {
            tv_sec: t.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_nsec: t.subsec_nanos() as _,
        });
        let timespec_ptr = timespec
            .as_ref()
            .map_or(ptr::null(), |t| t as *const libc::timespec);

        trace!(
            "wait: kq={}, timeout={timeout:?}, armed={}",
            self.kq,
            self.armed.len()
        );

        self.events.clear();

        let n = unsafe {
            kevent(
                self.kq,
                ptr::null(),
                0,
                self.events.as_mut_ptr(),
                self.events.capacity() as libc::c_int,
                timespec_ptr,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(Error::Wait(err));
        }

        // SAFETY: kevent initialized the first `n` entries.
        unsafe {
            self.events.set_len(n as usize);
        }

        for event in &self.events {
            let token = CompletionId(event.udata as usize);

            if self.armed.fire(token).is_some() {
                ready.push(token);
            } else {
                trace!("wait: dropping stale event for token {token}");
            }
        }

        Ok(())
    }
}

impl Drop for KqueuePoller {
    fn drop(&mut self) {
        if let Err(err) = sys_close(self.kq) {
            debug!("closing kqueue instance {} failed: {err}", self.kq);
        }
    }
}
