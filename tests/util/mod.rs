//! Test utilities.

#![allow(dead_code, unused_imports, unused_macros)] // Not all tests use all code here.

use std::any::Any;
use std::cell::Cell;
use std::fs::{remove_dir, remove_file};
use std::io;
use std::os::fd::{BorrowedFd, FromRawFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Instant;
use std::{fmt, panic, process, thread};

use bufd::wait::{Event, Interest, Wait};
use bufd::{BufFd, Poll};

macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)? ) ) => {{
        let res = unsafe { libc::$fn($( $arg, )*) };
        if res == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(res)
        }
    }};
}

pub(crate) use syscall;

/// Initialise logging.
pub(crate) fn init() {
    static START: Once = Once::new();
    START.call_once(|| {
        std_logger::Config::logfmt().with_call_location(true).init();
    });
}

pub(crate) fn is_sync<T: Sync>() {}
pub(crate) fn is_send<T: Send>() {}

/// Returns a unique path in the temporary directory, the file is not created.
pub(crate) fn tmp_path() -> PathBuf {
    static N: AtomicUsize = AtomicUsize::new(0);
    let n = N.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("bufd_test.{}.{n}", process::id()))
}

/// Create a pipe, returns the read and write end (in that order).
pub(crate) fn pipe() -> [OwnedFd; 2] {
    let mut fds: [libc::c_int; 2] = [-1, -1];
    syscall!(pipe(fds.as_mut_ptr())).expect("failed to create pipe");
    // SAFETY: `pipe(2)` ensures the descriptors are valid.
    unsafe { [OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])] }
}

/// Create a pipe and attach a [`BufFd`] to both ends.
pub(crate) fn buf_pipe() -> (BufFd, BufFd) {
    let [r, w] = pipe();
    let r = BufFd::new(r).expect("failed to attach read end");
    let w = BufFd::new(w).expect("failed to attach write end");
    (r, w)
}

/// Same as [`buf_pipe`], but using [`CountingWait`].
pub(crate) fn counting_pipe() -> (BufFd<CountingWait>, BufFd<CountingWait>) {
    let [r, w] = pipe();
    let r = BufFd::with_waiter(r, CountingWait::new()).expect("failed to attach read end");
    let w = BufFd::with_waiter(w, CountingWait::new()).expect("failed to attach write end");
    (r, w)
}

/// Test content of `len` bytes, not repeating every 256 bytes.
pub(crate) fn test_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// [`Wait`] implementation that counts the number of times it's called,
/// using [`Poll`] to do the actual waiting.
#[derive(Debug)]
pub(crate) struct CountingWait {
    waits: Cell<usize>,
    cleaned: Cell<usize>,
}

impl CountingWait {
    pub(crate) const fn new() -> CountingWait {
        CountingWait {
            waits: Cell::new(0),
            cleaned: Cell::new(0),
        }
    }

    pub(crate) fn waits(&self) -> usize {
        self.waits.get()
    }

    pub(crate) fn cleaned(&self) -> usize {
        self.cleaned.get()
    }
}

impl Wait for CountingWait {
    fn wait(
        &self,
        fd: BorrowedFd<'_>,
        interest: Interest,
        deadline: Option<Instant>,
    ) -> io::Result<Event> {
        self.waits.set(self.waits.get() + 1);
        Poll.wait(fd, interest, deadline)
    }

    fn clean(&self, _: BorrowedFd<'_>) {
        self.cleaned.set(self.cleaned.get() + 1);
    }
}

/// Defer execution of function `f`.
pub(crate) fn defer<F: FnOnce()>(f: F) -> Defer<F> {
    Defer { f: Some(f) }
}

pub(crate) struct Defer<F: FnOnce()> {
    f: Option<F>,
}

impl<F: FnOnce()> Drop for Defer<F> {
    fn drop(&mut self) {
        let f = self.f.take().unwrap();
        if thread::panicking() {
            if let Err(err) = panic::catch_unwind(panic::AssertUnwindSafe(f)) {
                let msg = panic_message(&*err);
                eprintln!("panic while already panicking: {msg}");
            }
        } else {
            f()
        }
    }
}

pub(crate) fn remove_test_file(path: &Path) {
    match remove_file(path) {
        Ok(()) => {}
        Err(ref err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => panic!("unexpected error removing test file: {err}"),
    }
}

pub(crate) fn remove_test_dir(path: &Path) {
    match remove_dir(path) {
        Ok(()) => {}
        Err(ref err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => panic!("unexpected error removing test directory: {err}"),
    }
}

fn panic_message<'a>(err: &'a (dyn Any + Send + 'static)) -> &'a str {
    match err.downcast_ref::<&str>() {
        Some(s) => *s,
        None => match err.downcast_ref::<String>() {
            Some(s) => &**s,
            None => "<unknown>",
        },
    }
}

/// Expect `result` to contain an [`io::Error`] with `expected` error kind.
#[track_caller]
pub(crate) fn expect_io_error_kind<T: fmt::Debug>(
    result: Result<T, io::Error>,
    expected: io::ErrorKind,
) {
    match result {
        Ok(value) => panic!("unexpected ok result, value: {value:?}"),
        Err(ref err) if err.kind() == expected => return,
        Err(err) => panic!("unexpected error result, error: {err:?}"),
    }
}

/// Expect `result` to contain an [`io::Error`] with `expected` error number.
#[track_caller]
pub(crate) fn expect_io_errno<T>(result: Result<T, io::Error>, expected: libc::c_int) {
    match result {
        Ok(_) => panic!("unexpected ok result"),
        Err(ref err) if err.raw_os_error() == Some(expected) => return,
        Err(err) => panic!("unexpected error result, error: {err:?}"),
    }
}
