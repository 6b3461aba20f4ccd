use std::fs::{self, File};
use std::io;
use std::os::unix::fs::symlink;

use bufd::fd::Kind;
use bufd::fs::{self as bfs, open_file, OpenOptions};

use crate::util::{
    buf_pipe, defer, expect_io_error_kind, init, remove_test_file, test_bytes, tmp_path,
};

#[test]
fn open_options_is_send_and_sync() {
    crate::util::is_send::<OpenOptions>();
    crate::util::is_sync::<OpenOptions>();
}

#[test]
fn open_write_and_read_back() {
    init();
    let path = tmp_path();
    let _d = defer(|| remove_test_file(&path));

    let data = test_bytes(1000);
    let mut file = OpenOptions::new()
        .write_only()
        .create_new()
        .mode(0o600)
        .open(&path)
        .unwrap();
    assert_eq!(file.kind(), Kind::File);
    file.write(&data, None).unwrap();
    file.flush(None).unwrap();
    file.close();
    assert_eq!(fs::read(&path).unwrap(), data);

    let mut file = open_file(&path).unwrap();
    let mut buf = vec![0; 1000];
    assert_eq!(file.read(&mut buf, None).unwrap(), 1000);
    assert!(buf == data);
    assert!(!file.is_eof());
}

#[test]
fn open_not_found() {
    init();
    let path = tmp_path();
    expect_io_error_kind(open_file(&path), io::ErrorKind::NotFound);
}

#[test]
fn open_create_new_existing_file() {
    init();
    let path = tmp_path();
    let _d = defer(|| remove_test_file(&path));
    fs::write(&path, b"exists").unwrap();

    let res = OpenOptions::new().write().create_new().open(&path);
    expect_io_error_kind(res, io::ErrorKind::AlreadyExists);
}

#[test]
fn open_truncate_and_append() {
    init();
    let path = tmp_path();
    let _d = defer(|| remove_test_file(&path));
    fs::write(&path, b"Hello").unwrap();

    let mut file = OpenOptions::new().write().append().open(&path).unwrap();
    file.write(b", World!", None).unwrap();
    file.flush(None).unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"Hello, World!");

    let mut file = OpenOptions::new().write_only().truncate().open(&path).unwrap();
    file.write(b"Bye", None).unwrap();
    file.flush(None).unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"Bye");
}

#[test]
fn open_directory() {
    init();
    let fd = open_file(&std::env::temp_dir()).unwrap();
    assert_eq!(fd.kind(), Kind::Directory);
}

#[test]
fn seek_discards_buffered_input() {
    init();
    let path = tmp_path();
    let _d = defer(|| remove_test_file(&path));
    fs::write(&path, b"aaaaaaaaaa").unwrap();

    let mut file = open_file(&path).unwrap();
    let mut buf = [0; 2];
    file.read(&mut buf, None).unwrap();
    assert_eq!(&buf, b"aa");
    assert_eq!(file.buffered_input(), 8);

    // Modify the file behind our back, the buffer still holds the old bytes.
    fs::write(&path, b"bbbbbbbbbb").unwrap();
    file.read(&mut buf, None).unwrap();
    assert_eq!(&buf, b"aa");

    assert_eq!(file.seek(2).unwrap(), 2);
    assert_eq!(file.buffered_input(), 0);
    file.read(&mut buf, None).unwrap();
    assert_eq!(&buf, b"bb");
}

#[test]
fn seek_resets_end_of_file() {
    init();
    let path = tmp_path();
    let _d = defer(|| remove_test_file(&path));
    fs::write(&path, b"abc").unwrap();

    let mut file = open_file(&path).unwrap();
    let mut buf = [0; 4];
    assert_eq!(file.read(&mut buf, None).unwrap(), 3);
    assert!(file.is_eof());

    file.seek(1).unwrap();
    assert!(!file.is_eof());
    assert_eq!(file.read(&mut buf[..2], None).unwrap(), 2);
    assert_eq!(&buf[..2], b"bc");
}

#[test]
fn seek_discards_buffered_output() {
    init();
    let path = tmp_path();
    let _d = defer(|| remove_test_file(&path));

    let mut file = OpenOptions::new().write().create().open(&path).unwrap();
    file.write(b"discarded", None).unwrap();
    file.seek(0).unwrap();
    assert_eq!(file.buffered_output(), 0);
    file.flush(None).unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"");
}

#[test]
fn tell() {
    init();
    let path = tmp_path();
    let _d = defer(|| remove_test_file(&path));
    fs::write(&path, test_bytes(100)).unwrap();

    let mut file = open_file(&path).unwrap();
    assert_eq!(file.tell().unwrap(), 0);
    let mut buf = [0; 10];
    file.read(&mut buf, None).unwrap();
    // The entire file is buffered, but only 10 bytes were consumed.
    assert_eq!(file.buffered_input(), 90);
    assert_eq!(file.tell().unwrap(), 10);

    file.seek(50).unwrap();
    assert_eq!(file.tell().unwrap(), 50);
    file.read(&mut buf, None).unwrap();
    assert_eq!(file.tell().unwrap(), 60);
}

#[test]
fn size_includes_buffered_output() {
    init();
    let path = tmp_path();
    let _d = defer(|| remove_test_file(&path));

    let mut file = OpenOptions::new().write().create_new().open(&path).unwrap();
    assert_eq!(file.size().unwrap(), 0);
    file.write(&test_bytes(100), None).unwrap();
    assert_eq!(file.size().unwrap(), 100);
    file.flush(None).unwrap();
    assert_eq!(file.size().unwrap(), 100);
    assert_eq!(file.tell().unwrap(), 100);

    File::options().write(true).open(&path).unwrap().set_len(0).unwrap();
    assert_eq!(file.size().unwrap(), 0);
    // Position is not changed.
    assert_eq!(file.tell().unwrap(), 100);
}

#[test]
fn size_not_a_file() {
    init();
    let (r, _w) = buf_pipe();
    expect_io_error_kind(r.size(), io::ErrorKind::Unsupported);
}

#[test]
fn remove_file() {
    init();
    let path = tmp_path();
    fs::write(&path, b"remove me").unwrap();
    bfs::remove(&path).unwrap();
    expect_io_error_kind(fs::metadata(&path), io::ErrorKind::NotFound);
}

#[test]
fn remove_tree() {
    init();
    let root = tmp_path();
    let outside = tmp_path();
    let _d = defer(|| remove_test_file(&outside));

    fs::create_dir_all(root.join("a").join("b")).unwrap();
    fs::create_dir(root.join("empty")).unwrap();
    fs::write(root.join("file"), b"1").unwrap();
    fs::write(root.join("a").join("file"), b"2").unwrap();
    fs::write(root.join("a").join("b").join("file"), b"3").unwrap();
    fs::write(&outside, b"keep").unwrap();
    symlink(&outside, root.join("a").join("link")).unwrap();

    bfs::remove(&root).unwrap();
    expect_io_error_kind(fs::symlink_metadata(&root), io::ErrorKind::NotFound);
    // Symbolic links are not followed.
    assert_eq!(fs::read(&outside).unwrap(), b"keep");
}

#[test]
fn remove_not_found() {
    init();
    expect_io_error_kind(bfs::remove(&tmp_path()), io::ErrorKind::NotFound);
}
