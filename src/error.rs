//! Error types.
//!
//! See [`Error`] and [`Partial`].

use std::io;

use thiserror::Error;

/// Error returned by the I/O operations of [`BufFd`] and by [`iov::deep_copy`].
///
/// [`BufFd`]: crate::BufFd
/// [`iov::deep_copy`]: crate::iov::deep_copy
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The deadline elapsed while waiting for the descriptor to become ready.
    #[error("deadline expired")]
    TimedOut,
    /// Error returned by the operating system, passed through unchanged.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Destination vector is too small to hold the source vector.
    #[error("destination vector holds {available} bytes, {needed} bytes required")]
    SizeMismatch {
        /// Total size of the source vector.
        needed: usize,
        /// Total size of the destination vector.
        available: usize,
    },
}

impl Error {
    /// Returns true if this is the [`Error::TimedOut`] error.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Error::TimedOut)
    }
}

impl From<io::ErrorKind> for Error {
    fn from(kind: io::ErrorKind) -> Error {
        Error::Io(kind.into())
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::TimedOut => io::ErrorKind::TimedOut.into(),
            Error::Io(err) => err,
            err @ Error::SizeMismatch { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err.to_string())
            }
        }
    }
}

/// Error of an operation that may have transferred some bytes before failing.
///
/// Partial progress is never discarded: `transferred` bytes have been read
/// into, or written from, the caller's buffer and the operation can be resumed
/// from there.
#[derive(Debug, Error)]
#[error("{error} (after transferring {transferred} bytes)")]
pub struct Partial {
    /// Number of bytes transferred before the error occurred.
    pub transferred: usize,
    /// The error that stopped the operation.
    #[source]
    pub error: Error,
}

impl Partial {
    pub(crate) const fn new(transferred: usize, error: Error) -> Partial {
        Partial { transferred, error }
    }

    /// Returns true if the operation stopped because the deadline expired.
    pub const fn is_timeout(&self) -> bool {
        self.error.is_timeout()
    }
}

impl From<Partial> for io::Error {
    fn from(err: Partial) -> io::Error {
        err.error.into()
    }
}
