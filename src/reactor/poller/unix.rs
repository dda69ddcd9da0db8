//! Thin wrappers over the libc calls the backends share.

use libc::{c_int, close};

use std::io;
use std::os::fd::RawFd;

/// Turns a `-1`-on-error return code into an `io::Result`.
pub(crate) fn cvt(rc: c_int) -> io::Result<c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) -> io::Result<()> {
    cvt(unsafe { close(fd) }).map(drop)
}

/// Sets `FD_CLOEXEC` on a descriptor.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub(crate) fn sys_set_cloexec(fd: RawFd) -> io::Result<()> {
    use libc::{F_GETFD, F_SETFD, FD_CLOEXEC, fcntl};

    let flags = cvt(unsafe { fcntl(fd, F_GETFD) })?;
    cvt(unsafe { fcntl(fd, F_SETFD, flags | FD_CLOEXEC) }).map(drop)
}
