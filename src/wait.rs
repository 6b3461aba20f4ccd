//! Waiting for descriptor readiness.
//!
//! [`BufFd`] doesn't run its own event loop. When a descriptor reports that an
//! operation would block it suspends on a [`Wait`] implementation until the
//! descriptor is ready or the deadline expires. [`Poll`] is the default, it
//! blocks the calling thread using `poll(2)`. A cooperative scheduler can
//! provide its own implementation to suspend only the calling task.
//!
//! [`BufFd`]: crate::BufFd

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Instant;

use crate::{man_link, syscall};

/// Wait primitive used by [`BufFd`] to suspend until a descriptor is ready.
///
/// [`BufFd`]: crate::BufFd
pub trait Wait {
    /// Wait until `fd` is ready for `interest`, or until `deadline` passes.
    ///
    /// A `deadline` of `None` means waiting without a time limit. If the
    /// deadline has already passed this must return [`Event::TimedOut`]
    /// without waiting. On success the returned event must match `interest`.
    fn wait(
        &self,
        fd: BorrowedFd<'_>,
        interest: Interest,
        deadline: Option<Instant>,
    ) -> io::Result<Event>;

    /// Remove any state kept for `fd`, called right before the descriptor is
    /// closed.
    fn clean(&self, fd: BorrowedFd<'_>) {
        _ = fd;
    }
}

impl<W: Wait + ?Sized> Wait for &W {
    fn wait(
        &self,
        fd: BorrowedFd<'_>,
        interest: Interest,
        deadline: Option<Instant>,
    ) -> io::Result<Event> {
        (**self).wait(fd, interest, deadline)
    }

    fn clean(&self, fd: BorrowedFd<'_>) {
        (**self).clean(fd)
    }
}

/// Readiness to wait for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Interest {
    /// Data can be read.
    Readable,
    /// Data can be written.
    Writable,
}

/// Outcome of [`Wait::wait`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Descriptor is readable.
    Readable,
    /// Descriptor is writable.
    Writable,
    /// Deadline passed before the descriptor became ready.
    TimedOut,
}

impl From<Interest> for Event {
    fn from(interest: Interest) -> Event {
        match interest {
            Interest::Readable => Event::Readable,
            Interest::Writable => Event::Writable,
        }
    }
}

/// [`Wait`] implementation that blocks the current thread.
///
/// Errors and hang-ups are reported as the requested readiness, the next
/// system call on the descriptor will return the actual error (or end of
/// file).
#[doc = man_link!(poll(2))]
#[derive(Copy, Clone, Debug, Default)]
pub struct Poll;

impl Wait for Poll {
    fn wait(
        &self,
        fd: BorrowedFd<'_>,
        interest: Interest,
        deadline: Option<Instant>,
    ) -> io::Result<Event> {
        let events = match interest {
            Interest::Readable => libc::POLLIN,
            Interest::Writable => libc::POLLOUT,
        };
        let mut pollfd = libc::pollfd {
            fd: fd.as_raw_fd(),
            events,
            revents: 0,
        };
        loop {
            let Some(timeout) = timeout_ms(deadline) else {
                return Ok(Event::TimedOut);
            };
            match syscall!(poll(&mut pollfd, 1, timeout)) {
                Ok(0) => return Ok(Event::TimedOut),
                Ok(_) => return Ok(interest.into()),
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                    log::trace!(fd = pollfd.fd; "poll interrupted, retrying");
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Returns the `poll(2)` timeout for `deadline`, rounded up to whole
/// milliseconds, or `None` if the deadline already passed.
fn timeout_ms(deadline: Option<Instant>) -> Option<libc::c_int> {
    let Some(deadline) = deadline else {
        return Some(-1);
    };
    let now = Instant::now();
    if deadline <= now {
        return None;
    }
    let left = deadline - now;
    let mut ms = left.as_millis();
    if left.subsec_nanos() % 1_000_000 != 0 {
        ms += 1;
    }
    Some(libc::c_int::try_from(ms).unwrap_or(libc::c_int::MAX))
}
