use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::backing::{Backing, BufferBacking, FileBacking};
use crate::error::{Error, Result};
use crate::options::{to_signed, StreamOptions, Whence};
use crate::tracker::DebugSink;
use crate::value::Value;

/// Bounds-checked cursor over a window of a [`Backing`].
///
/// The window is a fixed `(start, length)` range of absolute backing offsets;
/// the cursor is relative to `start` and always lies in `0..=length`. Reads
/// never cross the end of the window, and a failed read leaves the cursor
/// where it was.
///
/// Slices share the backing but carry their own window and cursor. Streams
/// over a [`FileBacking`] are `Send + Sync`, so slices of one file can be
/// handed to different threads. Streams over a [`BufferBacking`] stay on the
/// thread that created them.
pub struct Stream<B: Backing> {
    backing: B,
    start: u64,
    length: u64,
    cursor: u64,
    sink: Option<Arc<dyn DebugSink>>,
}

/// Stream reading a file with positioned reads.
pub type FileStream = Stream<FileBacking>;

/// Stream reading an in-memory buffer.
pub type BufferStream = Stream<BufferBacking>;

impl<B: Backing> Stream<B> {
    /// Stream over the whole backing.
    pub fn new(backing: B) -> Result<Self> {
        Self::with_options(backing, StreamOptions::default())
    }

    pub fn with_options(backing: B, options: StreamOptions) -> Result<Self> {
        let (start, length) = options.resolve(&backing)?;
        log::debug!("new stream window start={start} length={length}");
        Ok(Self {
            backing,
            start,
            length,
            cursor: 0,
            sink: None,
        })
    }

    /// Attach a debug sink. Slices taken afterwards inherit it.
    pub fn with_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn sink(&self) -> Option<&Arc<dyn DebugSink>> {
        self.sink.as_ref()
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    /// Cursor position relative to the window start.
    pub fn tell(&self) -> u64 {
        self.cursor
    }

    /// Window length.
    pub fn size(&self) -> u64 {
        self.length
    }

    /// Absolute offset of the window in the backing.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Absolute offset of the cursor in the backing.
    pub fn absolute_position(&self) -> u64 {
        self.start + self.cursor
    }

    pub fn remaining(&self) -> u64 {
        self.length - self.cursor
    }

    pub fn remaining_at_least(&self, n: u64) -> bool {
        self.remaining() >= n
    }

    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }

    /// Move the cursor and return its new position.
    ///
    /// The target must fall inside `0..=size()`; anything else is rejected
    /// with [`Error::InvalidPosition`] and the cursor stays put.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => to_signed(self.cursor)?,
            Whence::End => to_signed(self.length)?,
        };
        let proposed = base
            .checked_add(offset)
            .ok_or_else(|| Error::InvalidArgument(format!("seek {offset} from {whence} overflows")))?;
        if proposed < 0 || proposed as u64 > self.length {
            return Err(Error::InvalidPosition { proposed });
        }
        log::trace!("seek {offset} from {whence} -> {proposed}");
        self.cursor = proposed as u64;
        Ok(self.cursor)
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Move the window to `(start, length)` in the backing and zero the cursor.
    pub fn reset(&mut self, start: u64, length: u64) -> Result<()> {
        let total = self.backing.len()?;
        let end = start.checked_add(length);
        if end.map_or(true, |end| end > total) {
            return Err(Error::InvalidPosition {
                proposed: to_signed(start.saturating_add(length)).unwrap_or(i64::MAX),
            });
        }
        self.start = start;
        self.length = length;
        self.cursor = 0;
        Ok(())
    }

    /// Read `length` bytes (everything remaining when `None`) and advance.
    pub fn read(&mut self, length: Option<usize>) -> Result<Vec<u8>> {
        let bytes = self.peek(length)?;
        self.cursor += bytes.len() as u64;
        Ok(bytes)
    }

    /// Same bytes [`read`](Self::read) would return, without advancing.
    pub fn peek(&self, length: Option<usize>) -> Result<Vec<u8>> {
        let requested = length.map_or(self.remaining(), |n| n as u64);
        self.ensure(requested)?;
        let len = usize::try_from(requested)
            .map_err(|_| Error::InvalidArgument(format!("cannot buffer {requested} bytes")))?;
        let mut buf = vec![0u8; len];
        self.backing.read_exact_at(self.absolute_position(), &mut buf)?;
        Ok(buf)
    }

    /// Advance past `n` bytes without reading them.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.ensure(n)?;
        self.cursor += n;
        Ok(())
    }

    /// Read exactly `N` bytes into an array and advance.
    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure(N as u64)?;
        let mut buf = [0u8; N];
        self.backing.read_exact_at(self.absolute_position(), &mut buf)?;
        self.cursor += N as u64;
        Ok(buf)
    }

    /// Child stream over `length` bytes at `cursor + offset`. The parent
    /// advances by `length` as though it had read them.
    pub fn slice(&mut self, length: u64, offset: u64) -> Result<Self> {
        let child = self.peek_slice(length, offset)?;
        self.cursor += length;
        Ok(child)
    }

    /// Like [`slice`](Self::slice) but leaves the parent cursor alone.
    pub fn peek_slice(&self, length: u64, offset: u64) -> Result<Self> {
        let span = offset
            .checked_add(length)
            .ok_or_else(|| Error::InvalidArgument(format!("slice {offset}+{length} overflows")))?;
        self.ensure(span)?;
        Ok(self.child(self.cursor + offset, length))
    }

    /// Child stream over `length` bytes at `offset` from the window start,
    /// regardless of the cursor.
    pub fn slice_absolute(&self, length: u64, offset: u64) -> Result<Self> {
        if offset > self.length {
            return Err(Error::InvalidPosition {
                proposed: to_signed(offset)?,
            });
        }
        let available = self.length - offset;
        if length > available {
            return Err(Error::Overrun {
                requested: length,
                remaining: available,
                position: offset,
            });
        }
        Ok(self.child(offset, length))
    }

    fn child(&self, relative_start: u64, length: u64) -> Self {
        let start = self.start + relative_start;
        log::trace!("slice start={start} length={length}");
        Self {
            backing: self.backing.share(),
            start,
            length,
            cursor: 0,
            sink: self.sink.clone(),
        }
    }

    /// Write the whole window to `path`. The cursor does not move.
    pub fn dump(&self, path: impl AsRef<Path>) -> Result<()> {
        let len = usize::try_from(self.length)
            .map_err(|_| Error::InvalidArgument(format!("cannot buffer {} bytes", self.length)))?;
        let mut buf = vec![0u8; len];
        self.backing.read_exact_at(self.start, &mut buf)?;
        std::fs::write(path, buf)?;
        Ok(())
    }

    /// Record the cursor position in the debug sink.
    pub fn track_position(&self) {
        self.track(|| Value::Position(self.cursor));
    }

    pub(crate) fn track(&self, value: impl FnOnce() -> Value) {
        if let Some(sink) = self.sink.as_deref().filter(|s| s.is_enabled()) {
            sink.record(&value());
        }
    }

    fn ensure(&self, requested: u64) -> Result<()> {
        let remaining = self.remaining();
        if requested > remaining {
            return Err(Error::Overrun {
                requested,
                remaining,
                position: self.cursor,
            });
        }
        Ok(())
    }
}

impl FileStream {
    /// Open `path` and window it. The stream owns the file handle.
    pub fn open(path: impl AsRef<Path>, options: StreamOptions) -> Result<Self> {
        Self::with_options(FileBacking::open(path)?, options)
    }

    /// Window a handle opened by the caller, who keeps ownership of it.
    pub fn from_file(file: Arc<File>, options: StreamOptions) -> Result<Self> {
        Self::with_options(FileBacking::from_file(file), options)
    }

    pub fn path(&self) -> Option<&Path> {
        self.backing.path()
    }
}

impl BufferStream {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, options: StreamOptions) -> Result<Self> {
        Self::with_options(BufferBacking::new(bytes.into()), options)
    }

    /// Window a cursor. Its position is the reference for [`Whence::Current`].
    pub fn from_cursor(cursor: io::Cursor<Vec<u8>>, options: StreamOptions) -> Result<Self> {
        Self::with_options(BufferBacking::from_cursor(cursor), options)
    }
}

impl<B: Backing> fmt::Debug for Stream<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("start", &self.start)
            .field("length", &self.length)
            .field("cursor", &self.cursor)
            .field("tracking", &self.sink.is_some())
            .finish()
    }
}
