//! Operations on vectors of buffers, for vectored (scatter/gather) I/O.
//!
//! A segment is a view into a contiguous region of memory, a byte slice. A
//! vector is a slice of segments that together represent a single stream of
//! bytes, the concatenation of all segments in order. None of the functions
//! in this module allocate.
//!
//! Most functions accept any segment type that dereferences to a byte slice,
//! e.g. `&[u8]`, `&mut [u8]`, [`IoSlice`] or `Vec<u8>`.
//!
//! [`IoSlice`]: std::io::IoSlice

use std::cmp::min;
use std::mem;
use std::ops::{Deref, DerefMut};

use crate::Error;

/// Returns the total number of bytes in `iov`.
pub fn size<S: Deref<Target = [u8]>>(iov: &[S]) -> usize {
    iov.iter().map(|seg| seg.len()).sum()
}

/// Copy all bytes from `src` into `dst`.
///
/// # Panics
///
/// `dst` must be at least [`size`]`(src)` bytes long.
pub fn copy_all_from<S: Deref<Target = [u8]>>(dst: &mut [u8], src: &[S]) {
    let mut pos = 0;
    for seg in src {
        dst[pos..pos + seg.len()].copy_from_slice(seg);
        pos += seg.len();
    }
}

/// Fill all segments in `dst` with bytes from `src`.
///
/// # Panics
///
/// `src` must be at least [`size`]`(dst)` bytes long.
pub fn copy_all_to<S: DerefMut<Target = [u8]>>(dst: &mut [S], src: &[u8]) {
    let mut pos = 0;
    for seg in dst {
        let len = seg.len();
        seg.copy_from_slice(&src[pos..pos + len]);
        pos += len;
    }
}

/// Copy the segments (not the bytes they point to) from `src` to the start of
/// `dst`.
///
/// # Panics
///
/// `dst` must hold at least `src.len()` segments.
pub fn copy<'a>(dst: &mut [&'a [u8]], src: &[&'a [u8]]) {
    dst[..src.len()].copy_from_slice(src);
}

/// Fill `dst` with the segments of `src` that cover `bytes` bytes starting at
/// `offset`, returns the number of segments used.
///
/// The segments in `dst` point into the same memory as the segments of `src`,
/// no bytes are copied. The first and last segments are shortened as needed,
/// segments that don't contribute any bytes are skipped, so the returned
/// segments never start or end with an empty segment.
///
/// # Panics
///
/// [`size`]`(src)` must be at least `offset + bytes` and `dst` must be large
/// enough to hold the resulting segments, `src.len()` segments always is.
/// Passing a range not covered by `src` is a bug in the caller and panics.
pub fn cut<'a>(dst: &mut [&'a [u8]], src: &[&'a [u8]], offset: usize, bytes: usize) -> usize {
    debug_assert!(bytes == 0 || !src.is_empty(), "cutting {bytes} bytes from an empty vector");
    fill(dst, Cut::new(src.iter().copied(), offset, bytes))
}

/// Same as [`cut`], but for mutable segments.
///
/// The returned segments borrow from `src`, which can't be used until `dst`
/// is no longer used.
pub fn cut_mut<'a>(
    dst: &mut [&'a mut [u8]],
    src: &'a mut [&mut [u8]],
    offset: usize,
    bytes: usize,
) -> usize {
    debug_assert!(bytes == 0 || !src.is_empty(), "cutting {bytes} bytes from an empty vector");
    fill(dst, Cut::new(src.iter_mut().map(|seg| &mut **seg), offset, bytes))
}

/// Copy `bytes` bytes, starting at `offset` in `src`, into `dst`.
///
/// # Panics
///
/// [`size`]`(src)` must be at least `offset + bytes` and `dst` must be at
/// least `bytes` long.
pub fn copy_from<S: Deref<Target = [u8]>>(dst: &mut [u8], src: &[S], offset: usize, bytes: usize) {
    let mut pos = 0;
    for seg in Cut::new(src.iter().map(|seg| &**seg), offset, bytes) {
        dst[pos..pos + seg.len()].copy_from_slice(seg);
        pos += seg.len();
    }
}

/// Copy `bytes` bytes from `src` into `dst`, starting at `offset` in `dst`.
///
/// # Panics
///
/// [`size`]`(dst)` must be at least `offset + bytes` and `src` must be at
/// least `bytes` long.
pub fn copy_to<S: DerefMut<Target = [u8]>>(dst: &mut [S], src: &[u8], offset: usize, bytes: usize) {
    let mut pos = 0;
    for seg in Cut::new(dst.iter_mut().map(|seg| &mut **seg), offset, bytes) {
        let len = seg.len();
        seg.copy_from_slice(&src[pos..pos + len]);
        pos += len;
    }
}

/// Copy all bytes from `src` into `dst`, both vectors can be segmented
/// differently.
///
/// Returns [`Error::SizeMismatch`], without copying anything, if `dst` can't
/// hold all bytes of `src`. If `dst` is larger than `src` the remaining bytes
/// in `dst` are left untouched.
pub fn deep_copy<D, S>(dst: &mut [D], src: &[S]) -> Result<(), Error>
where
    D: DerefMut<Target = [u8]>,
    S: Deref<Target = [u8]>,
{
    let needed = size(src);
    let available = size(dst);
    if available < needed {
        return Err(Error::SizeMismatch { needed, available });
    }

    let mut remaining = needed;
    let mut dst_segs = dst.iter_mut();
    let mut src_segs = src.iter();
    let mut dst_seg: &mut [u8] = &mut [];
    let mut src_seg: &[u8] = &[];
    while remaining != 0 {
        // Sizes are checked above, so we can't run out of segments here.
        if dst_seg.is_empty() {
            match dst_segs.next() {
                Some(seg) => dst_seg = &mut **seg,
                None => break,
            }
        }
        if src_seg.is_empty() {
            match src_segs.next() {
                Some(seg) => src_seg = &**seg,
                None => break,
            }
        }

        let n = min(dst_seg.len(), src_seg.len());
        let (to, rest) = mem::take(&mut dst_seg).split_at_mut(n);
        to.copy_from_slice(&src_seg[..n]);
        dst_seg = rest;
        src_seg = &src_seg[n..];
        remaining -= n;
        // One of the segments must be exhausted.
        debug_assert!(dst_seg.is_empty() || src_seg.is_empty());
    }
    Ok(())
}

/// Fill `dst` with all segments from `iter`, returns the number of segments.
fn fill<T>(dst: &mut [T], iter: impl Iterator<Item = T>) -> usize {
    let mut n = 0;
    for seg in iter {
        dst[n] = seg;
        n += 1;
    }
    n
}

/// Segment that can be split in two.
trait Segment: Sized {
    fn len(&self) -> usize;

    fn split(self, at: usize) -> (Self, Self);
}

impl Segment for &[u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn split(self, at: usize) -> (Self, Self) {
        self.split_at(at)
    }
}

impl Segment for &mut [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn split(self, at: usize) -> (Self, Self) {
        self.split_at_mut(at)
    }
}

/// Iterator over the segments covering the byte range
/// `offset..offset + remaining` of the segments in `segs`.
struct Cut<I> {
    segs: I,
    offset: usize,
    remaining: usize,
}

impl<I> Cut<I> {
    const fn new(segs: I, offset: usize, bytes: usize) -> Cut<I> {
        Cut {
            segs,
            offset,
            remaining: bytes,
        }
    }
}

impl<I> Iterator for Cut<I>
where
    I: Iterator,
    I::Item: Segment,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining != 0 {
            let seg = self
                .segs
                .next()
                .expect("range to cut exceeds the size of the vector");
            let len = seg.len();
            if len <= self.offset {
                self.offset -= len;
                continue;
            }

            let (_, seg) = seg.split(self.offset);
            self.offset = 0;
            let n = min(seg.len(), self.remaining);
            self.remaining -= n;
            return Some(seg.split(n).0);
        }
        None
    }
}

#[test]
fn size_sums_segments() {
    let iov: [&[u8]; 3] = [b"abc", b"", b"defg"];
    assert_eq!(size(&iov), 7);
    assert_eq!(size::<&[u8]>(&[]), 0);
}

#[test]
fn cut_within_single_segment() {
    let iov: [&[u8]; 1] = [b"hello world"];
    let mut dst: [&[u8]; 1] = [&[]];
    let n = cut(&mut dst, &iov, 6, 3);
    assert_eq!(n, 1);
    assert_eq!(dst[0], b"wor");
}

#[test]
fn cut_skips_leading_and_trailing_segments() {
    let iov: [&[u8]; 4] = [b"ab", b"cde", b"fgh", b"ij"];
    let mut dst: [&[u8]; 4] = [&[]; 4];
    let n = cut(&mut dst, &iov, 3, 5);
    assert_eq!(n, 2);
    assert_eq!(dst[0], b"de");
    assert_eq!(dst[1], b"fgh");
}

#[test]
fn cut_at_segment_boundary() {
    let iov: [&[u8]; 3] = [b"ab", b"cd", b"ef"];
    let mut dst: [&[u8]; 3] = [&[]; 3];
    // Offset at the end of the first segment must not produce an empty
    // leading segment.
    let n = cut(&mut dst, &iov, 2, 2);
    assert_eq!(n, 1);
    assert_eq!(dst[0], b"cd");
}

#[test]
fn cut_skips_empty_segments() {
    let iov: [&[u8]; 5] = [b"", b"ab", b"", b"", b"cd"];
    let mut dst: [&[u8]; 5] = [&[]; 5];
    let n = cut(&mut dst, &iov, 0, 4);
    assert_eq!(n, 2);
    assert_eq!(dst[..n], [&b"ab"[..], &b"cd"[..]]);
}

#[test]
fn cut_zero_bytes() {
    let iov: [&[u8]; 1] = [b"abc"];
    let mut dst: [&[u8]; 1] = [&[]];
    assert_eq!(cut(&mut dst, &iov, 1, 0), 0);
    assert_eq!(cut(&mut dst, &[], 0, 0), 0);
}

#[test]
fn cut_points_into_same_memory() {
    let data = *b"0123456789";
    let iov: [&[u8]; 2] = [&data[..4], &data[4..]];
    let mut dst: [&[u8]; 2] = [&[]; 2];
    let n = cut(&mut dst, &iov, 2, 5);
    assert_eq!(n, 2);
    assert_eq!(dst[0].as_ptr(), data[2..].as_ptr());
    assert_eq!(dst[1].as_ptr(), data[4..].as_ptr());
    assert_eq!(dst[1].len(), 3);
}

#[test]
#[should_panic = "range to cut exceeds the size of the vector"]
fn cut_beyond_vector() {
    let iov: [&[u8]; 2] = [b"ab", b"cd"];
    let mut dst: [&[u8]; 2] = [&[]; 2];
    cut(&mut dst, &iov, 3, 2);
}

#[test]
fn cut_matches_flattened_range() {
    let data: Vec<u8> = (0..64).collect();
    // Segment the same data in a number of different ways.
    for seg_len in 1..=9 {
        let iov: Vec<&[u8]> = data.chunks(seg_len).collect();
        let mut dst: Vec<&[u8]> = vec![&[][..]; iov.len()];
        for offset in 0..data.len() {
            for bytes in 0..=(data.len() - offset) {
                let n = cut(&mut dst, &iov, offset, bytes);
                let got: Vec<u8> = dst[..n].concat();
                assert_eq!(got, &data[offset..offset + bytes]);
                assert!(dst[..n].iter().all(|seg| !seg.is_empty()));
            }
        }
    }
}

#[test]
fn cut_mut_writes_through() {
    let mut a = *b"aaaa";
    let mut b = *b"bbbb";
    let mut iov: [&mut [u8]; 2] = [&mut a, &mut b];
    let mut dst: [&mut [u8]; 2] = [&mut [], &mut []];
    let n = cut_mut(&mut dst, &mut iov, 3, 2);
    assert_eq!(n, 2);
    dst[0].copy_from_slice(b"X");
    dst[1].copy_from_slice(b"Y");
    assert_eq!(&a, b"aaaX");
    assert_eq!(&b, b"Ybbb");
}

#[test]
fn copy_segments() {
    let iov: [&[u8]; 2] = [b"ab", b"cd"];
    let mut dst: [&[u8]; 3] = [&[]; 3];
    copy(&mut dst, &iov);
    assert_eq!(dst, [&b"ab"[..], &b"cd"[..], &b""[..]]);
}

#[test]
fn copy_all_from_and_to() {
    let iov: [&[u8]; 3] = [b"Hello", b", ", b"World"];
    let mut flat = [0; 12];
    copy_all_from(&mut flat, &iov);
    assert_eq!(&flat, b"Hello, World");

    let mut a = [0; 3];
    let mut b = [0; 9];
    let mut dst: [&mut [u8]; 2] = [&mut a, &mut b];
    copy_all_to(&mut dst, &flat);
    assert_eq!(&a, b"Hel");
    assert_eq!(&b, b"lo, World");
}

#[test]
fn copy_from_range() {
    let iov: [&[u8]; 3] = [b"Hello", b", ", b"World"];
    let mut dst = [0; 4];
    copy_from(&mut dst, &iov, 4, 4);
    assert_eq!(&dst, b"o, W");
}

#[test]
fn copy_to_range() {
    let mut a = *b"-----";
    let mut b = *b"-----";
    let mut dst: [&mut [u8]; 2] = [&mut a, &mut b];
    copy_to(&mut dst, b"abcd", 3, 4);
    assert_eq!(&a, b"---ab");
    assert_eq!(&b, b"cd---");
}

#[test]
fn deep_copy_resegments() {
    let src: Vec<u8> = (0..=255).cycle().take(4096).collect();
    let src_iov: [&[u8]; 1] = [&src];
    let mut dst = vec![0; 4096];
    let mut dst_iov: Vec<&mut [u8]> = dst.chunks_mut(256).collect();
    deep_copy(&mut dst_iov, &src_iov).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn deep_copy_round_trip() {
    let data: Vec<u8> = (0..100).collect();
    let b: Vec<&[u8]> = data.chunks(7).collect();

    let mut a_buf = vec![0; 100];
    let mut a: Vec<&mut [u8]> = a_buf.chunks_mut(13).collect();
    deep_copy(&mut a, &b).unwrap();

    let mut c_buf = vec![0; 100];
    let mut c: Vec<&mut [u8]> = c_buf.chunks_mut(1).collect();
    deep_copy(&mut c, &a).unwrap();
    assert_eq!(c_buf, data);
}

#[test]
fn deep_copy_with_empty_segments() {
    let src: [&[u8]; 4] = [b"", b"abc", b"", b"de"];
    let mut x = [0; 2];
    let mut y = [0; 0];
    let mut z = [0; 4];
    let mut dst: [&mut [u8]; 3] = [&mut x, &mut y, &mut z];
    deep_copy(&mut dst, &src).unwrap();
    assert_eq!(&x, b"ab");
    assert_eq!(&z, b"cde\0");
}

#[test]
fn deep_copy_destination_too_small() {
    let src: [&[u8]; 2] = [b"abc", b"def"];
    let mut a = [0; 2];
    let mut b = [0; 3];
    let mut dst: [&mut [u8]; 2] = [&mut a, &mut b];
    match deep_copy(&mut dst, &src) {
        Err(Error::SizeMismatch { needed, available }) => {
            assert_eq!(needed, 6);
            assert_eq!(available, 5);
        }
        res => panic!("unexpected result: {res:?}"),
    }
    // Nothing is written.
    assert_eq!(a, [0; 2]);
    assert_eq!(b, [0; 3]);
}
