//! I/O operations of [`BufFd`].

use std::cmp::min;
use std::io::{self, IoSlice, IoSliceMut};
use std::os::fd::{BorrowedFd, RawFd};
use std::time::Instant;

use crate::fd::Kind;
use crate::wait::{Event, Interest, Wait};
use crate::{iov, man_link, syscall, BufFd, Error, Partial, BUF_SIZE};

/// Maximum number of buffers passed to a single `readv(2)` or `writev(2)`
/// call, the remaining buffers are used in the next call.
const MAX_IOVECS: usize = 1024;

/// I/O operations.
impl<W: Wait> BufFd<W> {
    /// Read exactly `buf.len()` bytes.
    ///
    /// If enough bytes are buffered this doesn't do any I/O. Otherwise the
    /// buffered bytes are used first, after which the remainder is read
    /// directly into `buf` (if it's larger than the buffer) or via the input
    /// buffer, keeping any surplus for the next read.
    ///
    /// If the end of the file is reached this returns the number of bytes
    /// read so far (which is less than `buf.len()`) and [`BufFd::is_eof`]
    /// returns true. If the deadline passes before all bytes are read this
    /// returns [`Error::TimedOut`] along with the number of bytes read into
    /// `buf` so far.
    #[doc = man_link!(read(2))]
    pub fn read(&mut self, buf: &mut [u8], deadline: Option<Instant>) -> Result<usize, Partial> {
        let len = buf.len();
        let mut pos = self.consume_input(buf);
        while pos < len {
            let remaining = len - pos;
            if remaining > BUF_SIZE {
                // Lots left to read, do it in one go into `buf`.
                let dst = &mut buf[pos..];
                match transfer(self.fd, self.kind, &self.waiter, Interest::Readable, deadline, |fd| {
                    read_fd(fd, dst)
                }) {
                    Ok(0) => return Ok(self.hit_eof(pos)),
                    Ok(n) => pos += n,
                    Err(error) => return Err(Partial::new(pos, error)),
                }
            } else {
                // Only a little left, fill the input buffer to minimise the
                // number of system calls.
                match self.fill_input(deadline) {
                    Ok(0) => return Ok(self.hit_eof(pos)),
                    Ok(_) => pos += self.consume_input(&mut buf[pos..]),
                    Err(error) => return Err(Partial::new(pos, error)),
                }
            }
        }
        Ok(len)
    }

    /// Read at least `low` and at most `high` bytes into `buf`.
    ///
    /// If at least `low` bytes are buffered this doesn't do any I/O and
    /// returns all buffered bytes, up to `high`. Otherwise it reads until at
    /// least `low` bytes are read. Any bytes read beyond `high` are kept in
    /// the input buffer.
    ///
    /// Reaching the end of the file returns the bytes read so far, which can
    /// be less than `low`, and sets [`BufFd::is_eof`]. Just like
    /// [`BufFd::read`] an expired deadline returns [`Error::TimedOut`] along
    /// with the number of bytes read.
    ///
    /// # Panics
    ///
    /// This panics if `low > high` or `high > buf.len()`.
    pub fn read_range(
        &mut self,
        buf: &mut [u8],
        low: usize,
        high: usize,
        deadline: Option<Instant>,
    ) -> Result<usize, Partial> {
        assert!(low <= high, "low watermark {low} above high watermark {high}");
        let buf = &mut buf[..high];

        if self.in_len >= low {
            return Ok(self.consume_input(buf));
        }

        let mut pos = self.consume_input(buf);
        loop {
            let remaining = high - pos;
            if remaining > BUF_SIZE {
                let dst = &mut buf[pos..];
                match transfer(self.fd, self.kind, &self.waiter, Interest::Readable, deadline, |fd| {
                    read_fd(fd, dst)
                }) {
                    Ok(0) => return Ok(self.hit_eof(pos)),
                    Ok(n) => pos += n,
                    Err(error) => return Err(Partial::new(pos, error)),
                }
            } else {
                match self.fill_input(deadline) {
                    Ok(0) => return Ok(self.hit_eof(pos)),
                    // Keeps anything beyond `high` buffered.
                    Ok(_) => pos += self.consume_input(&mut buf[pos..]),
                    Err(error) => return Err(Partial::new(pos, error)),
                }
            }

            if pos >= low {
                return Ok(pos);
            }
        }
    }

    /// Read exactly [`iov::size`]`(bufs)` bytes into `bufs`, in order.
    ///
    /// Same as [`BufFd::read`], but scatters the bytes over multiple buffers.
    #[doc = man_link!(readv(2))]
    pub fn read_vectored(
        &mut self,
        bufs: &mut [&mut [u8]],
        deadline: Option<Instant>,
    ) -> Result<usize, Partial> {
        let len = iov::size(bufs);
        let mut pos = 0;
        loop {
            // Use buffered bytes first.
            let n = min(self.in_len, len - pos);
            iov::copy_to(bufs, &self.input[self.in_start..self.in_start + n], pos, n);
            self.advance_input(n);
            pos += n;
            if pos == len {
                return Ok(len);
            }

            let remaining = len - pos;
            if remaining > BUF_SIZE {
                let mut segments: Vec<&mut [u8]> = Vec::with_capacity(bufs.len());
                segments.resize_with(bufs.len(), Default::default);
                let n = iov::cut_mut(&mut segments, bufs, pos, remaining);
                let mut slices: Vec<IoSliceMut<'_>> = segments
                    .into_iter()
                    .take(min(n, MAX_IOVECS))
                    .map(IoSliceMut::new)
                    .collect();
                match transfer(self.fd, self.kind, &self.waiter, Interest::Readable, deadline, |fd| {
                    readv_fd(fd, &mut slices)
                }) {
                    Ok(0) => return Ok(self.hit_eof(pos)),
                    Ok(n) => pos += n,
                    Err(error) => return Err(Partial::new(pos, error)),
                }
            } else {
                match self.fill_input(deadline) {
                    Ok(0) => return Ok(self.hit_eof(pos)),
                    Ok(_) => {}
                    Err(error) => return Err(Partial::new(pos, error)),
                }
            }
        }
    }

    /// Write all of `buf`.
    ///
    /// If `buf` fits in the output buffer it's copied there and no I/O is
    /// done. Otherwise the output buffer is flushed first, if `buf` is still
    /// too large it's written directly to the descriptor.
    ///
    /// If flushing fails nothing of `buf` is written. If the deadline passes
    /// while writing `buf` directly this returns [`Error::TimedOut`] along
    /// with the number of bytes of `buf` written.
    #[doc = man_link!(write(2))]
    pub fn write(&mut self, buf: &[u8], deadline: Option<Instant>) -> Result<usize, Partial> {
        if self.buffer_output(&[buf], buf.len()) {
            return Ok(buf.len());
        }
        self.flush(deadline).map_err(|error| Partial::new(0, error))?;
        if self.buffer_output(&[buf], buf.len()) {
            return Ok(buf.len());
        }

        let mut written = 0;
        while written < buf.len() {
            let src = &buf[written..];
            // NOTE: for files this retries without checking the deadline.
            match transfer(self.fd, self.kind, &self.waiter, Interest::Writable, deadline, |fd| {
                write_fd(fd, src)
            }) {
                Ok(0) => return Err(Partial::new(written, io::ErrorKind::WriteZero.into())),
                Ok(n) => written += n,
                Err(error) => return Err(Partial::new(written, error)),
            }
        }
        Ok(written)
    }

    /// Write all bytes in `bufs`, in order.
    ///
    /// Same as [`BufFd::write`], but gathers the bytes from multiple buffers.
    #[doc = man_link!(writev(2))]
    pub fn write_vectored(
        &mut self,
        bufs: &[&[u8]],
        deadline: Option<Instant>,
    ) -> Result<usize, Partial> {
        let len = iov::size(bufs);
        if self.buffer_output(bufs, len) {
            return Ok(len);
        }
        self.flush(deadline).map_err(|error| Partial::new(0, error))?;
        if self.buffer_output(bufs, len) {
            return Ok(len);
        }

        let mut segments: Vec<&[u8]> = vec![&[][..]; bufs.len()];
        let mut slices: Vec<IoSlice<'_>> = Vec::with_capacity(min(bufs.len(), MAX_IOVECS));
        let mut written = 0;
        while written < len {
            // Skip the bytes already written.
            let n = iov::cut(&mut segments, bufs, written, len - written);
            slices.clear();
            slices.extend(segments[..min(n, MAX_IOVECS)].iter().copied().map(IoSlice::new));
            match transfer(self.fd, self.kind, &self.waiter, Interest::Writable, deadline, |fd| {
                writev_fd(fd, &slices)
            }) {
                Ok(0) => return Err(Partial::new(written, io::ErrorKind::WriteZero.into())),
                Ok(n) => written += n,
                Err(error) => return Err(Partial::new(written, error)),
            }
        }
        Ok(len)
    }

    /// Write all buffered output to the descriptor.
    ///
    /// Does nothing if no output is buffered. If this fails the bytes that
    /// weren't written stay buffered, so calling `flush` again continues where
    /// the previous call stopped.
    pub fn flush(&mut self, deadline: Option<Instant>) -> Result<(), Error> {
        let mut written = 0;
        let result = loop {
            if written == self.out_len {
                break Ok(());
            }
            let src = &self.output[written..self.out_len];
            match transfer(self.fd, self.kind, &self.waiter, Interest::Writable, deadline, |fd| {
                write_fd(fd, src)
            }) {
                Ok(0) => break Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(err) => break Err(err),
            }
        };
        self.output.copy_within(written..self.out_len, 0);
        self.out_len -= written;
        result
    }

    /// Copy `len` bytes from `bufs` into the output buffer, if they fit.
    fn buffer_output(&mut self, bufs: &[&[u8]], len: usize) -> bool {
        if self.out_len + len > BUF_SIZE {
            return false;
        }
        iov::copy_all_from(&mut self.output[self.out_len..self.out_len + len], bufs);
        self.out_len += len;
        true
    }

    /// Copy as many buffered bytes as fit into `dst`, returns the number of
    /// bytes copied.
    fn consume_input(&mut self, dst: &mut [u8]) -> usize {
        let n = min(self.in_len, dst.len());
        dst[..n].copy_from_slice(&self.input[self.in_start..self.in_start + n]);
        self.advance_input(n);
        n
    }

    fn advance_input(&mut self, n: usize) {
        self.in_start += n;
        self.in_len -= n;
        if self.in_len == 0 {
            self.in_start = 0;
        }
    }

    /// Replace the (empty) input buffer with a single read from the
    /// descriptor.
    fn fill_input(&mut self, deadline: Option<Instant>) -> Result<usize, Error> {
        debug_assert!(self.in_len == 0, "refilling non-empty input buffer");
        let input = &mut self.input;
        let n = transfer(self.fd, self.kind, &self.waiter, Interest::Readable, deadline, |fd| {
            read_fd(fd, input)
        })?;
        self.in_start = 0;
        self.in_len = n;
        Ok(n)
    }

    fn hit_eof(&mut self, read: usize) -> usize {
        log::debug!(fd = self.fd, read = read; "end of file");
        self.eof = true;
        read
    }
}

/// Perform the non-blocking operation `op` until it doesn't return
/// `WouldBlock`.
///
/// For descriptors that can wait, a `WouldBlock` result waits on `waiter`
/// until the descriptor is ready for `interest`. For regular files and
/// directories the operation is retried right away, which also means the
/// deadline is never checked for them.
fn transfer<W, F>(
    fd: RawFd,
    kind: Kind,
    waiter: &W,
    interest: Interest,
    deadline: Option<Instant>,
    mut op: F,
) -> Result<usize, Error>
where
    W: Wait,
    F: FnMut(RawFd) -> io::Result<usize>,
{
    loop {
        match op(fd) {
            Ok(n) => return Ok(n),
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {}
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                log::trace!(fd = fd; "system call interrupted, retrying");
                continue;
            }
            Err(err) => return Err(Error::Io(err)),
        }

        if !kind.can_wait() {
            continue;
        }

        log::trace!(fd = fd, interest:? = interest; "waiting for descriptor to become ready");
        // SAFETY: `fd` is owned by the `BufFd` that called us.
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        match waiter.wait(borrowed, interest, deadline)? {
            Event::TimedOut => return Err(Error::TimedOut),
            event => debug_assert!(
                event == Event::from(interest),
                "waiting for {interest:?} returned {event:?}"
            ),
        }
    }
}

fn read_fd(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    syscall!(read(fd, buf.as_mut_ptr().cast(), buf.len())).map(|n| n as usize)
}

fn write_fd(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    syscall!(write(fd, buf.as_ptr().cast(), buf.len())).map(|n| n as usize)
}

fn readv_fd(fd: RawFd, bufs: &mut [IoSliceMut<'_>]) -> io::Result<usize> {
    // SAFETY: `IoSliceMut` is ABI compatible with `iovec`.
    syscall!(readv(fd, bufs.as_mut_ptr().cast(), bufs.len() as libc::c_int)).map(|n| n as usize)
}

fn writev_fd(fd: RawFd, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
    // SAFETY: `IoSlice` is ABI compatible with `iovec`.
    syscall!(writev(fd, bufs.as_ptr().cast(), bufs.len() as libc::c_int)).map(|n| n as usize)
}
