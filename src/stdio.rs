//! Standard in, out and error.
//!
//! The [`stdin`], [`stdout`] and [`stderr`] functions return process wide
//! [`BufFd`]s for the standard streams. They're initialised on first use,
//! which switches the descriptor to non-blocking mode. Before first use the
//! streams can be replaced using [`set_stdin`], [`set_stdout`] and
//! [`set_stderr`], e.g. to redirect them to a pipe in tests.
//!
//! The standard streams are never closed, but also never flushed. Call
//! [`BufFd::flush`] on [`stdout`] and [`stderr`] before exiting the process.

use std::os::fd::RawFd;
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::BufFd;

macro_rules! stdio {
    (
        $fn: ident (), $set_fn: ident (), $stream: ident, $name: literal, $fd: expr
    ) => {
        static $stream: OnceLock<Mutex<BufFd>> = OnceLock::new();

        #[doc = concat!("Returns the process wide `BufFd` for ", $name, ".\n\n")]
        #[doc = "# Panics\n\n"]
        #[doc = "This panics if the descriptor can't be attached on first use."]
        pub fn $fn() -> &'static Mutex<BufFd> {
            $stream.get_or_init(|| Mutex::new(attach($fd, $name)))
        }

        #[doc = concat!(
            "Use `fd` as ", $name, ", instead of the process' ", $name, ".\n\n",
            "Returns `fd` as error if [`", stringify!($fn), "`] was already initialised.",
        )]
        pub fn $set_fn(fd: BufFd) -> Result<(), BufFd> {
            $stream
                .set(Mutex::new(fd))
                .map_err(|stream| stream.into_inner().unwrap_or_else(PoisonError::into_inner))
        }
    };
}

stdio!(stdin(), set_stdin(), STDIN, "standard in", libc::STDIN_FILENO);
stdio!(stdout(), set_stdout(), STDOUT, "standard out", libc::STDOUT_FILENO);
stdio!(stderr(), set_stderr(), STDERR, "standard error", libc::STDERR_FILENO);

fn attach(fd: RawFd, name: &str) -> BufFd {
    // SAFETY: the standard streams are open for the lifetime of the process
    // and the returned `BufFd` is kept in a static, so it's never closed.
    match unsafe { BufFd::from_raw_fd(fd) } {
        Ok(fd) => fd,
        Err(err) => panic!("failed to attach to {name}: {err}"),
    }
}
