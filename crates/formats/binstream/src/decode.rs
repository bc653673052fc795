//! Typed decoders. Unsuffixed multi-byte decoders are little-endian; the
//! `_be` variants are big-endian.

use std::fmt;
use std::str::FromStr;

use crate::backing::Backing;
use crate::error::{Error, Result};
use crate::stream::Stream;
use crate::value::Value;

/// Text encoding applied to null-terminated string fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Ascii,
    /// ISO-8859-1: every byte is the code point of the same value.
    Latin1,
}

impl TextEncoding {
    fn decode(self, bytes: Vec<u8>, position: u64) -> Result<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes).map_err(|source| Error::InvalidString { position, source }),
            Self::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(i) => Err(Error::NonAscii {
                    byte: bytes[i],
                    position: position + i as u64,
                }),
                None => Ok(bytes.into_iter().map(char::from).collect()),
            },
            Self::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(Self::Latin1),
            _ => Err(Error::InvalidArgument(format!("unknown text encoding {s:?}"))),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Utf8 => "utf-8",
            Self::Ascii => "ascii",
            Self::Latin1 => "iso-8859-1",
        })
    }
}

macro_rules! int_decoders {
    ($($(#[$doc:meta])* $ty:ty => $le:ident, $be:ident;)+) => {
        $(
            $(#[$doc])*
            pub fn $le(&mut self) -> Result<$ty> {
                let v = <$ty>::from_le_bytes(self.read_array()?);
                self.track(|| v.into());
                Ok(v)
            }

            pub fn $be(&mut self) -> Result<$ty> {
                let v = <$ty>::from_be_bytes(self.read_array()?);
                self.track(|| v.into());
                Ok(v)
            }
        )+
    };
}

macro_rules! float_decoders {
    ($($ty:ty => $le:ident, $be:ident;)+) => {
        $(
            pub fn $le(&mut self) -> Result<$ty> {
                let position = self.tell();
                let v = <$ty>::from_le_bytes(self.read_array()?);
                self.finite(v, v.is_nan(), position)
            }

            pub fn $be(&mut self) -> Result<$ty> {
                let position = self.tell();
                let v = <$ty>::from_be_bytes(self.read_array()?);
                self.finite(v, v.is_nan(), position)
            }
        )+
    };
}

impl<B: Backing> Stream<B> {
    pub fn read_int8(&mut self) -> Result<i8> {
        let [b] = self.read_array::<1>()?;
        let v = b as i8;
        self.track(|| v.into());
        Ok(v)
    }

    pub fn read_uint8(&mut self) -> Result<u8> {
        let [v] = self.read_array::<1>()?;
        self.track(|| v.into());
        Ok(v)
    }

    /// Signed single byte; same as [`read_int8`](Self::read_int8).
    pub fn read_byte(&mut self) -> Result<i8> {
        self.read_int8()
    }

    int_decoders! {
        i16 => read_int16, read_int16_be;
        u16 => read_uint16, read_uint16_be;
        i32 => read_int32, read_int32_be;
        u32 => read_uint32, read_uint32_be;
        i64 => read_int64, read_int64_be;
        u64 => read_uint64, read_uint64_be;
    }

    float_decoders! {
        f32 => read_float, read_float_be;
        f64 => read_double, read_double_be;
    }

    /// Single byte that must be exactly 0 or 1. The byte is consumed even
    /// when it is rejected.
    pub fn read_bool(&mut self) -> Result<bool> {
        let position = self.tell();
        let [b] = self.read_array::<1>()?;
        if b > 1 {
            return Err(Error::InvalidBooleanValue { value: b, position });
        }
        let v = b != 0;
        self.track(|| v.into());
        Ok(v)
    }

    /// Fixed-width string field of `length` bytes, cut at the first NUL.
    /// The full `length` bytes are consumed either way.
    pub fn read_string(&mut self, length: usize, encoding: TextEncoding) -> Result<String> {
        if length == 0 {
            return Err(Error::InvalidLength { length });
        }
        let position = self.tell();
        let mut bytes = self.read(Some(length))?;
        if let Some(nul) = bytes.iter().position(|&b| b == 0) {
            bytes.truncate(nul);
        }
        let s = encoding.decode(bytes, position)?;
        self.track(|| Value::Text(s.clone()));
        Ok(s)
    }

    /// Raw bytes, uninterpreted.
    pub fn read_binary(&mut self, length: usize) -> Result<Vec<u8>> {
        let bytes = self.read(Some(length))?;
        self.track(|| Value::Bytes(bytes.clone()));
        Ok(bytes)
    }

    /// `length` bytes rendered as lowercase hex, high nibble first.
    pub fn read_hex(&mut self, length: usize) -> Result<String> {
        let s = hex::encode(self.read(Some(length))?);
        self.track(|| Value::Hex(s.clone()));
        Ok(s)
    }

    fn finite<T: Copy + Into<Value>>(&self, v: T, is_nan: bool, position: u64) -> Result<T> {
        if is_nan {
            return Err(Error::InvalidFloatValue { position });
        }
        self.track(|| v.into());
        Ok(v)
    }
}
