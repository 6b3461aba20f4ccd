//! Buffered file descriptor.
//!
//! See [`BufFd`].

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::{fmt, io, mem, process};

use crate::wait::{Poll, Wait};
use crate::{man_link, syscall, BUF_SIZE};

/// A non-blocking file descriptor with an input and output buffer.
///
/// All I/O operations take a deadline. If the descriptor is not ready the
/// operation waits using `W` until it is, or until the deadline passes.
/// Descriptors of [`Kind::File`] and [`Kind::Directory`] never wait, an
/// operation that would block on them is retried immediately.
///
/// A `BufFd` can be created using some of the following methods:
///  * Files can be opened using [`open_file`] or [`fs::OpenOptions`].
///  * Any other descriptor (pipes, sockets, terminals) can be attached using
///    [`BufFd::new`] or [`BufFd::with_waiter`].
///  * The standard streams are available in the [`stdio`] module.
///
/// # Notes
///
/// Buffered output is **not** flushed when the `BufFd` is closed or dropped,
/// call [`BufFd::flush`] first.
///
/// [`open_file`]: crate::fs::open_file
/// [`fs::OpenOptions`]: crate::fs::OpenOptions
/// [`stdio`]: crate::stdio
pub struct BufFd<W: Wait = Poll> {
    /// Set to -1 once ownership is given away in [`BufFd::into_fd`].
    pub(crate) fd: RawFd,
    pub(crate) kind: Kind,
    pub(crate) waiter: W,
    /// Unread bytes are `input[in_start..in_start + in_len]`.
    pub(crate) input: Box<[u8]>,
    pub(crate) in_start: usize,
    pub(crate) in_len: usize,
    /// Unflushed bytes are `output[..out_len]`.
    pub(crate) output: Box<[u8]>,
    pub(crate) out_len: usize,
    pub(crate) eof: bool,
}

impl BufFd {
    /// Attach to an already open descriptor.
    ///
    /// The descriptor is switched to non-blocking mode and waits using
    /// [`Poll`].
    ///
    /// # Notes
    ///
    /// Attached descriptors are always of [`Kind::Other`], even if `fd` refers
    /// to a regular file. This means that operations that would block on them
    /// wait for readiness instead of retrying. Use [`fs::OpenOptions`] to get a
    /// `BufFd` that knows it's a regular file.
    ///
    /// [`fs::OpenOptions`]: crate::fs::OpenOptions
    #[doc(alias = "attach")]
    pub fn new(fd: OwnedFd) -> io::Result<BufFd> {
        BufFd::with_waiter(fd, Poll)
    }

    /// Attach to an already open raw descriptor.
    ///
    /// See [`BufFd::new`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that `fd` is valid and that it's no longer used
    /// by anything other than the returned `BufFd`.
    pub unsafe fn from_raw_fd(fd: RawFd) -> io::Result<BufFd> {
        BufFd::new(OwnedFd::from_raw_fd(fd))
    }
}

impl<W: Wait> BufFd<W> {
    /// Attach to an already open descriptor, waiting using `waiter`.
    ///
    /// Also see [`BufFd::new`].
    pub fn with_waiter(fd: OwnedFd, waiter: W) -> io::Result<BufFd<W>> {
        set_nonblocking(fd.as_fd())?;
        BufFd::build(fd, Kind::Other, waiter)
    }

    /// Create the `BufFd`, if the buffers can't be allocated `fd` is closed.
    pub(crate) fn build(fd: OwnedFd, kind: Kind, waiter: W) -> io::Result<BufFd<W>> {
        let input = alloc_buf()?;
        let output = alloc_buf()?;
        Ok(BufFd {
            fd: fd.into_raw_fd(),
            kind,
            waiter,
            input,
            in_start: 0,
            in_len: 0,
            output,
            out_len: 0,
            eof: false,
        })
    }

    /// Returns the kind of descriptor.
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns the [`Wait`] implementation used.
    pub const fn waiter(&self) -> &W {
        &self.waiter
    }

    /// Returns true if a read hit the end of the file.
    ///
    /// Once set this stays set until [`BufFd::seek`] is called.
    #[doc(alias = "feof")]
    pub const fn is_eof(&self) -> bool {
        self.eof
    }

    /// Number of bytes read from the descriptor, but not yet from the buffer.
    pub const fn buffered_input(&self) -> usize {
        self.in_len
    }

    /// Number of bytes written to the buffer, but not yet to the descriptor.
    pub const fn buffered_output(&self) -> usize {
        self.out_len
    }

    /// Give up ownership of the descriptor, without closing it.
    ///
    /// Buffered input and output are discarded, call [`BufFd::flush`] first to
    /// not lose any data.
    #[doc(alias = "detach")]
    pub fn into_fd(mut self) -> OwnedFd {
        let fd = mem::replace(&mut self.fd, -1);
        if self.out_len != 0 {
            log::debug!(fd = fd, discarded = self.out_len; "detaching descriptor with unflushed output");
        }
        // SAFETY: we own `fd` and marked `self` as no longer owning it, so it's
        // not closed when `self` is dropped.
        unsafe { OwnedFd::from_raw_fd(fd) }
    }

    /// Explicitly close the descriptor.
    ///
    /// Removes the descriptor from the [`Wait`] implementation and closes it.
    /// This is the same as dropping the `BufFd`.
    ///
    /// Buffered output is not flushed, call [`BufFd::flush`] first.
    ///
    /// # Aborts
    ///
    /// A failure to close the descriptor is never expected, it means the
    /// descriptor was already invalid. The process is aborted if it happens.
    #[doc = man_link!(close(2))]
    pub fn close(self) {
        drop(self)
    }
}

impl<W: Wait> AsFd for BufFd<W> {
    fn as_fd(&self) -> BorrowedFd<'_> {
        // SAFETY: we're ensured that `fd` is valid, it's only -1 once `self`
        // is consumed.
        unsafe { BorrowedFd::borrow_raw(self.fd) }
    }
}

impl<W: Wait> AsRawFd for BufFd<W> {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl<W: Wait + fmt::Debug> fmt::Debug for BufFd<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufFd")
            .field("fd", &self.fd)
            .field("kind", &self.kind)
            .field("waiter", &self.waiter)
            .field("buffered_input", &self.in_len)
            .field("buffered_output", &self.out_len)
            .field("eof", &self.eof)
            .finish()
    }
}

impl<W: Wait> Drop for BufFd<W> {
    fn drop(&mut self) {
        if self.fd == -1 {
            return;
        }

        self.waiter.clean(self.as_fd());
        if let Err(err) = syscall!(close(self.fd)) {
            log::error!(fd = self.fd; "error closing bufd::BufFd: {err}, aborting");
            process::abort();
        }
    }
}

/// Kind of descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Anything else, e.g. a pipe, socket or terminal.
    Other,
}

impl Kind {
    /// Determine the kind of `fd`.
    #[doc = man_link!(fstat(2))]
    pub fn of(fd: BorrowedFd<'_>) -> io::Result<Kind> {
        // SAFETY: all zeros for `stat` is valid.
        let mut stat: libc::stat = unsafe { mem::zeroed() };
        syscall!(fstat(fd.as_raw_fd(), &mut stat))?;
        let kind = match stat.st_mode & libc::S_IFMT {
            libc::S_IFREG => Kind::File,
            libc::S_IFDIR => Kind::Directory,
            _ => Kind::Other,
        };
        Ok(kind)
    }

    /// Returns false for kinds for which "would block" is only ever transient,
    /// operations on them are retried without waiting.
    pub(crate) const fn can_wait(self) -> bool {
        matches!(self, Kind::Other)
    }
}

/// Put `fd` in non-blocking mode.
#[doc = man_link!(fcntl(2))]
pub(crate) fn set_nonblocking(fd: BorrowedFd<'_>) -> io::Result<()> {
    let fd = fd.as_raw_fd();
    let flags = syscall!(fcntl(fd, libc::F_GETFL)).unwrap_or(0);
    if flags & libc::O_NONBLOCK == 0 {
        syscall!(fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK))?;
    }
    Ok(())
}

/// Allocate a buffer of [`BUF_SIZE`] bytes, reporting allocation failure.
fn alloc_buf() -> io::Result<Box<[u8]>> {
    let mut buf = Vec::new();
    if buf.try_reserve_exact(BUF_SIZE).is_err() {
        return Err(io::ErrorKind::OutOfMemory.into());
    }
    buf.resize(BUF_SIZE, 0);
    Ok(buf.into_boxed_slice())
}
