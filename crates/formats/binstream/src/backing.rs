//! Byte sources a [`Stream`](crate::Stream) reads from.
//!
//! A backing only knows how to read `n` bytes at an absolute offset. Window
//! arithmetic and bounds checks live in the stream.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

/// Random-access byte source shared between a stream and its slices.
pub trait Backing {
    /// Fill `buf` with the bytes starting at absolute `offset`.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Total size of the underlying resource in bytes.
    fn len(&self) -> io::Result<u64>;

    fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Current read position of the underlying resource.
    ///
    /// Only consulted when a window is placed relative to it
    /// ([`Whence::Current`](crate::Whence::Current)).
    fn position(&self) -> io::Result<u64>;

    /// Another handle onto the same resource, for a slice.
    fn share(&self) -> Self
    where
        Self: Sized;
}

/// File resource read with positioned reads.
///
/// Positioned reads never touch the file's own cursor, so any number of
/// windows (on any number of threads) may read through one shared handle.
#[derive(Debug)]
pub struct FileBacking {
    file: Arc<File>,
    path: Option<PathBuf>,
    owned: bool,
}

impl FileBacking {
    /// Open `path` for reading. The backing owns the handle.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        log::debug!("opened {}", path.display());
        Ok(Self {
            file: Arc::new(file),
            path: Some(path.to_path_buf()),
            owned: true,
        })
    }

    /// Wrap a handle opened elsewhere. The caller keeps ownership: the file
    /// stays open for as long as the caller's `Arc` does.
    pub fn from_file(file: Arc<File>) -> Self {
        Self {
            file,
            path: None,
            owned: false,
        }
    }

    /// Path the file was opened from, if this backing opened it.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether this handle opened the file itself.
    pub fn is_owner(&self) -> bool {
        self.owned
    }

    pub fn file(&self) -> &Arc<File> {
        &self.file
    }
}

impl Backing for FileBacking {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        positioned_read(&self.file, offset, buf)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn position(&self) -> io::Result<u64> {
        let mut file: &File = &self.file;
        file.stream_position()
    }

    fn share(&self) -> Self {
        Self {
            file: Arc::clone(&self.file),
            path: self.path.clone(),
            owned: false,
        }
    }
}

#[cfg(unix)]
fn positioned_read(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

// `seek_read` updates the handle's cursor on Windows, but every read here
// names its own offset so nothing depends on it.
#[cfg(windows)]
fn positioned_read(file: &File, mut offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                let rest = buf;
                buf = &mut rest[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// In-memory buffer read by seeking its cursor.
///
/// Every read moves the shared cursor and puts it back afterwards, so the
/// buffer is confined to one thread (`Rc`). Windows sharing the buffer on that
/// thread always see its position as they left it.
#[derive(Debug)]
pub struct BufferBacking {
    buf: Rc<RefCell<io::Cursor<Vec<u8>>>>,
}

impl BufferBacking {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self::from_cursor(io::Cursor::new(bytes))
    }

    /// Take over a cursor, keeping its current position.
    pub fn from_cursor(cursor: io::Cursor<Vec<u8>>) -> Self {
        Self {
            buf: Rc::new(RefCell::new(cursor)),
        }
    }

    /// Move the buffer's own cursor.
    pub fn set_position(&self, pos: u64) {
        self.buf.borrow_mut().set_position(pos);
    }
}

impl Backing for BufferBacking {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut cursor = self.buf.borrow_mut();
        let mut restore = RestorePosition::capture(&mut *cursor)?;
        restore.seek(SeekFrom::Start(offset))?;
        restore.read_exact(buf)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.buf.borrow().get_ref().len() as u64)
    }

    fn position(&self) -> io::Result<u64> {
        Ok(self.buf.borrow().position())
    }

    fn share(&self) -> Self {
        Self {
            buf: Rc::clone(&self.buf),
        }
    }
}

/// Seeks `inner` back to where it was on drop, whether the read in between
/// succeeded or not.
struct RestorePosition<'a, S: Seek> {
    inner: &'a mut S,
    original: u64,
}

impl<'a, S: Seek> RestorePosition<'a, S> {
    fn capture(inner: &'a mut S) -> io::Result<Self> {
        let original = inner.stream_position()?;
        Ok(Self { inner, original })
    }
}

impl<S: Seek> Deref for RestorePosition<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.inner
    }
}

impl<S: Seek> DerefMut for RestorePosition<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.inner
    }
}

impl<S: Seek> Drop for RestorePosition<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.seek(SeekFrom::Start(self.original)) {
            log::warn!("failed to restore buffer position {}: {e}", self.original);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn buffer_read_restores_position() {
        let mut cursor = io::Cursor::new(vec![1u8, 2, 3, 4, 5]);
        cursor.set_position(3);
        let backing = BufferBacking::from_cursor(cursor);

        let mut buf = [0u8; 2];
        backing.read_exact_at(1, &mut buf).unwrap();
        assert_eq!(buf, [2, 3]);
        assert_eq!(backing.position().unwrap(), 3);
    }

    #[test]
    fn buffer_read_restores_position_on_error() {
        let backing = BufferBacking::new(vec![1u8, 2, 3]);
        backing.set_position(2);

        let mut buf = [0u8; 4];
        let err = backing.read_exact_at(1, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(backing.position().unwrap(), 2);
    }

    #[test]
    fn shared_buffer_sees_same_bytes() {
        let backing = BufferBacking::new(b"hello".to_vec());
        let other = backing.share();
        let mut buf = [0u8; 3];
        other.read_exact_at(2, &mut buf).unwrap();
        assert_eq!(&buf, b"llo");
        assert_eq!(backing.len().unwrap(), 5);
    }

    #[test]
    fn file_backing_reads_without_moving_cursor() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();

        let backing = FileBacking::open(tmp.path()).unwrap();
        assert!(backing.is_owner());
        assert_eq!(backing.path(), Some(tmp.path()));
        assert_eq!(backing.len().unwrap(), 10);

        let mut buf = [0u8; 3];
        backing.read_exact_at(4, &mut buf).unwrap();
        assert_eq!(&buf, b"456");
        assert_eq!(backing.position().unwrap(), 0);

        let shared = backing.share();
        assert!(!shared.is_owner());
    }

    #[test]
    fn borrowed_file_is_not_owned() {
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(b"abc").unwrap();
        let file = Arc::new(tmp);

        let backing = FileBacking::from_file(Arc::clone(&file));
        assert!(!backing.is_owner());
        assert!(backing.path().is_none());
        drop(backing);
        assert_eq!(file.metadata().unwrap().len(), 3);
    }

    #[test]
    fn file_read_past_end_fails() {
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(b"abc").unwrap();
        let backing = FileBacking::from_file(Arc::new(tmp));
        let mut buf = [0u8; 2];
        let err = backing.read_exact_at(2, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
