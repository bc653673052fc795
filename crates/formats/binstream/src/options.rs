use std::fmt;
use std::str::FromStr;

use crate::backing::Backing;
use crate::error::{Error, Result};

/// Reference point for a position: the window start, the cursor, or the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Whence {
    #[default]
    Start,
    Current,
    End,
}

impl FromStr for Whence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "start" | "set" => Ok(Self::Start),
            "current" | "cur" => Ok(Self::Current),
            "end" => Ok(Self::End),
            _ => Err(Error::InvalidArgument(format!(
                "whence must be start, current or end (got {s:?})"
            ))),
        }
    }
}

impl fmt::Display for Whence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Current => "current",
            Self::End => "end",
        })
    }
}

/// Where a new stream's window sits inside its backing.
///
/// The default covers the whole backing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Window start, interpreted according to `whence`.
    pub start: Option<i64>,
    pub whence: Whence,
    /// Upper bound on the window length. The window never runs past the end
    /// of the backing.
    pub max_length: Option<u64>,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn whence(mut self, whence: Whence) -> Self {
        self.whence = whence;
        self
    }

    pub fn max_length(mut self, max_length: u64) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Resolve to an absolute `(start, length)` window over `backing`.
    pub(crate) fn resolve<B: Backing>(&self, backing: &B) -> Result<(u64, u64)> {
        let total = backing.len()?;
        let offset = self.start.unwrap_or(0);
        let base = match self.whence {
            Whence::Start => 0,
            Whence::Current => backing.position()?,
            Whence::End => total,
        };
        let start = to_signed(base)?
            .checked_add(offset)
            .ok_or_else(|| Error::InvalidArgument(format!("window start {base} + {offset} overflows")))?;
        if start < 0 || start as u64 > total {
            return Err(Error::InvalidPosition { proposed: start });
        }
        let start = start as u64;
        let rest = total - start;
        let length = self.max_length.map_or(rest, |max| max.min(rest));
        Ok((start, length))
    }
}

pub(crate) fn to_signed(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::InvalidArgument(format!("offset {value} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backing::BufferBacking;

    fn backing() -> BufferBacking {
        BufferBacking::new((0u8..10).collect())
    }

    #[test]
    fn default_covers_everything() {
        assert_eq!(StreamOptions::default().resolve(&backing()).unwrap(), (0, 10));
    }

    #[test]
    fn max_length_is_clamped_to_backing() {
        let opts = StreamOptions::new().start(6).max_length(100);
        assert_eq!(opts.resolve(&backing()).unwrap(), (6, 4));
    }

    #[test]
    fn current_is_relative_to_backing_position() {
        let b = backing();
        b.set_position(3);
        let opts = StreamOptions::new().start(2).whence(Whence::Current).max_length(4);
        assert_eq!(opts.resolve(&b).unwrap(), (5, 4));
    }

    #[test]
    fn end_counts_back_from_total() {
        let opts = StreamOptions::new().start(-3).whence(Whence::End);
        assert_eq!(opts.resolve(&backing()).unwrap(), (7, 3));
    }

    #[test]
    fn start_outside_backing_is_rejected() {
        let err = StreamOptions::new().start(11).resolve(&backing()).unwrap_err();
        assert!(matches!(err, Error::InvalidPosition { proposed: 11 }));
        let err = StreamOptions::new().start(-1).resolve(&backing()).unwrap_err();
        assert!(matches!(err, Error::InvalidPosition { proposed: -1 }));
    }

    #[test]
    fn whence_parses_aliases() {
        assert_eq!("SET".parse::<Whence>().unwrap(), Whence::Start);
        assert_eq!("cur".parse::<Whence>().unwrap(), Whence::Current);
        assert_eq!("end".parse::<Whence>().unwrap(), Whence::End);
        assert!(matches!("middle".parse::<Whence>(), Err(Error::InvalidArgument(_))));
    }
}
