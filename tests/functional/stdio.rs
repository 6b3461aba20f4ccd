//! Each standard stream can only be replaced once per process, so every
//! stream is used by only a single test.

use std::time::Instant;

use bufd::stdio::{set_stderr, set_stdin, set_stdout, stderr, stdin, stdout};

use crate::util::{buf_pipe, init};

#[test]
fn replace_stdin() {
    init();
    let (r, mut w) = buf_pipe();
    set_stdin(r).unwrap();

    w.write(b"input", None).unwrap();
    w.flush(None).unwrap();
    let mut buf = [0; 5];
    let mut stdin = stdin().lock().unwrap();
    assert_eq!(stdin.read(&mut buf, None).unwrap(), 5);
    assert_eq!(&buf, b"input");
}

#[test]
fn replace_stdout() {
    init();
    let (mut r, w) = buf_pipe();
    set_stdout(w).unwrap();

    {
        let mut stdout = stdout().lock().unwrap();
        stdout.write(b"Hello, World!\n", None).unwrap();
        stdout.flush(None).unwrap();
    }

    let mut buf = [0; 14];
    assert_eq!(r.read(&mut buf, None).unwrap(), 14);
    assert_eq!(&buf, b"Hello, World!\n");
}

#[test]
fn replace_stderr_once() {
    init();
    let (r1, w1) = buf_pipe();
    let (_r2, w2) = buf_pipe();
    let raw = std::os::fd::AsRawFd::as_raw_fd(&w2);
    set_stderr(w1).unwrap();

    // Already set, gives back the descriptor.
    let w2 = set_stderr(w2).unwrap_err();
    assert_eq!(std::os::fd::AsRawFd::as_raw_fd(&w2), raw);

    let mut stderr = stderr().lock().unwrap();
    stderr.write(b"error", None).unwrap();
    assert_eq!(stderr.buffered_output(), 5);
    stderr.flush(Some(Instant::now())).unwrap();
    drop(r1);
}
