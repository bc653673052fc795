//! Bounds-checked, windowed streams for decoding binary formats.
//!
//! Two layers:
//! - **Backing** (`backing`): a byte source that reads `n` bytes at an absolute
//!   offset. Files use positioned reads; in-memory buffers seek and restore.
//! - **Stream** (`stream`, `decode`): a `(start, length)` window over a backing
//!   with its own cursor, slicing, and typed little/big-endian decoders.
//!
//! ```no_run
//! use binstream::{FileStream, StreamOptions, Whence};
//!
//! let mut header = FileStream::open("archive.bin", StreamOptions::new().max_length(16))?;
//! let magic = header.read_hex(4)?;
//! let count = header.read_uint32()?;
//! let mut body = header.slice_absolute(8, 8)?;
//! let first = body.read_double_be()?;
//! body.seek(-4, Whence::End)?;
//! # Ok::<(), binstream::Error>(())
//! ```

pub mod backing;
pub mod decode;
pub mod error;
pub mod options;
pub mod registry;
pub mod stream;
pub mod tracker;
pub mod value;

pub use backing::{Backing, BufferBacking, FileBacking};
pub use decode::TextEncoding;
pub use error::{Error, Result};
pub use options::{StreamOptions, Whence};
pub use registry::{DecodeRequest, Decoder, DecoderRegistry};
pub use stream::{BufferStream, FileStream, Stream};
pub use tracker::{without_tracking, DebugSink, Tracker};
pub use value::Value;
