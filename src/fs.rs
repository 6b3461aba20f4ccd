//! Filesystem manipulation operations.
//!
//! To open a file ([`BufFd`]) use [`open_file`] or [`OpenOptions`].

use std::ffi::CString;
use std::os::fd::{AsFd, AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::{fs, io};

use crate::fd::Kind;
use crate::wait::{Poll, Wait};
use crate::{man_link, syscall, BufFd};

/// Options used to configure how a file ([`BufFd`]) is opened.
///
/// Files are always opened in non-blocking mode and with `O_CLOEXEC` set.
#[derive(Clone, Debug)]
#[must_use = "no file is opened until `bufd::fs::OpenOptions::open` is called"]
pub struct OpenOptions {
    flags: libc::c_int,
    mode: libc::mode_t,
}

impl OpenOptions {
    /// Empty `OpenOptions`, has reading enabled by default.
    pub const fn new() -> OpenOptions {
        OpenOptions {
            flags: libc::O_RDONLY, // NOTE: `O_RDONLY` is 0.
            mode: 0o666,           // Same as in std lib.
        }
    }

    /// Enable read access.
    ///
    /// Note that read access is already enabled by default, so this is only
    /// useful if you called [`OpenOptions::write_only`] and want to enable read
    /// access as well.
    #[doc(alias = "O_RDONLY")]
    #[doc(alias = "O_RDWR")]
    pub const fn read(mut self) -> Self {
        if (self.flags & libc::O_ACCMODE) == libc::O_WRONLY {
            self.flags &= !libc::O_ACCMODE;
            self.flags |= libc::O_RDWR;
        } // Else we're already in read mode.
        self
    }

    /// Enable write access.
    #[doc(alias = "O_RDWR")]
    pub const fn write(mut self) -> Self {
        if (self.flags & libc::O_ACCMODE) == libc::O_RDONLY {
            self.flags &= !libc::O_ACCMODE;
            self.flags |= libc::O_RDWR;
        } // Else we're already in write mode.
        self
    }

    /// Only enable write access, disabling read access.
    #[doc(alias = "O_WRONLY")]
    pub const fn write_only(mut self) -> Self {
        self.flags &= !libc::O_ACCMODE;
        self.flags |= libc::O_WRONLY;
        self
    }

    /// Set writing to append only mode.
    ///
    /// # Notes
    ///
    /// This requires [writing access] to be enabled.
    ///
    /// [writing access]: OpenOptions::write
    #[doc(alias = "O_APPEND")]
    pub const fn append(mut self) -> Self {
        self.flags |= libc::O_APPEND;
        self
    }

    /// Truncate the file if it exists.
    #[doc(alias = "O_TRUNC")]
    pub const fn truncate(mut self) -> Self {
        self.flags |= libc::O_TRUNC;
        self
    }

    /// If the file doesn't exist create it.
    pub const fn create(mut self) -> Self {
        self.flags |= libc::O_CREAT;
        self
    }

    /// Force a file to be created, failing if a file already exists.
    ///
    /// This options implies [`OpenOptions::create`].
    #[doc(alias = "O_EXCL")]
    #[doc(alias = "O_CREAT")]
    pub const fn create_new(mut self) -> Self {
        self.flags |= libc::O_CREAT | libc::O_EXCL;
        self
    }

    /// Sets the mode bits that a new file will be created with.
    pub const fn mode(mut self, mode: u32) -> Self {
        self.mode = mode as _;
        self
    }

    /// Open `path`.
    #[doc = man_link!(open(2))]
    pub fn open(self, path: &Path) -> io::Result<BufFd> {
        self.open_with(path, Poll)
    }

    /// Open `path`, using `waiter` to wait for readiness.
    pub fn open_with<W: Wait>(self, path: &Path, waiter: W) -> io::Result<BufFd<W>> {
        let path = path_to_cstring(path)?;
        let flags = self.flags | libc::O_NONBLOCK | libc::O_CLOEXEC;
        let fd = syscall!(open(path.as_ptr(), flags, libc::c_uint::from(self.mode)))?;
        // SAFETY: `open(2)` ensures the descriptor is valid.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        let kind = Kind::of(fd.as_fd())?;
        BufFd::build(fd, kind, waiter)
    }
}

impl Default for OpenOptions {
    fn default() -> OpenOptions {
        OpenOptions::new()
    }
}

/// Open a file in read-only mode.
#[doc = man_link!(open(2))]
pub fn open_file(path: &Path) -> io::Result<BufFd> {
    OpenOptions::new().read().open(path)
}

/// Remove `path`, if it's a directory all its contents are removed first.
///
/// Symbolic links are removed, never followed.
#[doc(alias = "nftw")]
pub fn remove(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        for entry in fs::read_dir(path)? {
            remove(&entry?.path())?;
        }
        log::debug!(path:? = path; "removing directory");
        fs::remove_dir(path)
    } else {
        log::debug!(path:? = path; "removing file");
        fs::remove_file(path)
    }
}

/// File(system) related system calls.
impl<W: Wait> BufFd<W> {
    /// Set the file position to `offset` bytes from the start of the file.
    ///
    /// This discards all buffered input *and* output and resets the end of
    /// file flag, call [`BufFd::flush`] first to keep buffered output.
    #[doc = man_link!(lseek(2))]
    pub fn seek(&mut self, offset: u64) -> io::Result<u64> {
        self.in_start = 0;
        self.in_len = 0;
        self.out_len = 0;
        self.eof = false;
        let offset = libc::off_t::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset too large"))?;
        syscall!(lseek(self.as_raw_fd(), offset, libc::SEEK_SET)).map(|pos| pos as u64)
    }

    /// Returns the current position in the file, taking buffered input into
    /// account.
    ///
    /// Buffered output is not taken into account.
    #[doc = man_link!(lseek(2))]
    #[doc(alias = "ftell")]
    pub fn tell(&self) -> io::Result<u64> {
        let pos = syscall!(lseek(self.as_raw_fd(), 0, libc::SEEK_CUR))?;
        Ok(pos as u64 - self.in_len as u64)
    }

    /// Returns the size of the file, including buffered output.
    ///
    /// Returns an error of kind [`Unsupported`] if the descriptor isn't a
    /// regular file. The file position is not changed.
    ///
    /// [`Unsupported`]: io::ErrorKind::Unsupported
    #[doc = man_link!(lseek(2))]
    pub fn size(&self) -> io::Result<u64> {
        if self.kind() != Kind::File {
            return Err(io::ErrorKind::Unsupported.into());
        }

        let fd = self.as_raw_fd();
        let pos = syscall!(lseek(fd, 0, libc::SEEK_CUR))?;
        let end = syscall!(lseek(fd, 0, libc::SEEK_END));
        // Always restore the position, even if seeking to the end failed.
        syscall!(lseek(fd, pos, libc::SEEK_SET))?;
        Ok(end? as u64 + self.out_len as u64)
    }
}

fn path_to_cstring(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains a null byte"))
}
