//! Deadline-bound buffered I/O over non-blocking file descriptors.
//!
//! The main type is [`BufFd`], a file descriptor with a fixed size input and
//! output buffer ([`BUF_SIZE`] bytes each). All I/O operations take a deadline,
//! when the descriptor isn't ready the operation suspends on a [`Wait`]
//! implementation (by default [`Poll`]) until it is ready or the deadline
//! passes. Regular files and directories never suspend.
//!
//! Files are opened using [`fs::open_file`] or [`fs::OpenOptions`], any other
//! descriptor (pipe, socket, terminal) can be attached using [`BufFd::new`].
//! The standard streams are available in the [`stdio`] module.
//!
//! Data that is spread over multiple non-contiguous buffers can be transferred
//! using [`BufFd::write_vectored`] and [`BufFd::read_vectored`], the [`iov`]
//! module holds the operations on such vectors of buffers.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::{Duration, Instant};
//!
//! # fn main() -> std::io::Result<()> {
//! let mut file = bufd::fs::OpenOptions::new()
//!     .write_only()
//!     .create()
//!     .truncate()
//!     .open("greeting.txt".as_ref())?;
//!
//! let deadline = Some(Instant::now() + Duration::from_secs(1));
//! file.write(b"Hello, World!\n", deadline)?;
//! file.flush(deadline)?;
//! file.close();
//! # Ok(())
//! # }
//! ```

#![warn(
    anonymous_parameters,
    bare_trait_objects,
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces
)]

/// Helper macro to execute a system call that returns an `io::Result`.
macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)? ) ) => {{
        #[allow(unused_unsafe)]
        let res = unsafe { libc::$fn($( $arg, )*) };
        if res == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(res)
        }
    }};
}

/// Link to online manual.
macro_rules! man_link {
    ($syscall: tt ( $section: tt ) ) => {
        concat!(
            "\n\nAdditional documentation can be found in the ",
            "[`",
            stringify!($syscall),
            "(",
            stringify!($section),
            ")`]",
            "(https://man7.org/linux/man-pages/man",
            stringify!($section),
            "/",
            stringify!($syscall),
            ".",
            stringify!($section),
            ".html)",
            " manual.",
        )
    };
}

pub(crate) use {man_link, syscall};

mod error;
pub mod fd;
pub mod fs;
mod io;
pub mod iov;
pub mod stdio;
pub mod wait;

#[doc(no_inline)]
pub use error::{Error, Partial};
#[doc(no_inline)]
pub use fd::BufFd;
#[doc(no_inline)]
pub use wait::{Poll, Wait};

/// Size of the input and output buffer of a [`BufFd`], in bytes.
pub const BUF_SIZE: usize = 4096;
