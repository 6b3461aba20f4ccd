use std::error::Error as _;
use std::io;

use bufd::{iov, Error, Partial};

#[test]
fn error_is_send_and_sync() {
    crate::util::is_send::<Error>();
    crate::util::is_sync::<Error>();
    crate::util::is_send::<Partial>();
    crate::util::is_sync::<Partial>();
}

#[test]
fn timed_out_into_io_error() {
    let err = io::Error::from(Error::TimedOut);
    assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    assert!(Error::TimedOut.is_timeout());
    assert_eq!(Error::TimedOut.to_string(), "deadline expired");
}

#[test]
fn io_error_passed_through() {
    let err = Error::from(io::Error::from_raw_os_error(libc::EBADF));
    assert!(!err.is_timeout());
    let err = io::Error::from(err);
    assert_eq!(err.raw_os_error(), Some(libc::EBADF));
}

#[test]
fn size_mismatch() {
    let mut buf = [0; 2];
    let mut dst: [&mut [u8]; 1] = [&mut buf];
    let src: [&[u8]; 2] = [b"ab", b"c"];
    let err = iov::deep_copy(&mut dst, &src).unwrap_err();
    match err {
        Error::SizeMismatch { needed, available } => {
            assert_eq!(needed, 3);
            assert_eq!(available, 2);
        }
        err => panic!("unexpected error: {err}"),
    }
    let err = io::Error::from(iov::deep_copy(&mut dst, &src).unwrap_err());
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
}

#[test]
fn partial_source() {
    let (mut r, _w) = crate::util::buf_pipe();
    let mut buf = [0; 1];
    let err = r.read(&mut buf, Some(std::time::Instant::now())).unwrap_err();
    assert_eq!(err.transferred, 0);
    assert!(err.is_timeout());
    assert!(err.source().is_some());
    assert_eq!(err.to_string(), "deadline expired (after transferring 0 bytes)");
}
