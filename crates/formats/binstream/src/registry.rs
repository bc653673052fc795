//! Decoders looked up by name, for callers that pick the layout at runtime.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::backing::Backing;
use crate::decode::TextEncoding;
use crate::error::{Error, Result};
use crate::stream::Stream;
use crate::value::Value;

/// A registered decode function.
pub enum Decoder<B: Backing> {
    /// Fixed-width value.
    Fixed(fn(&mut Stream<B>) -> Result<Value>),
    /// Needs a byte length (`string`, `binary`, `hex`).
    Sized(fn(&mut Stream<B>, usize) -> Result<Value>),
}

// Manual impls: derive would demand `B: Clone`.
impl<B: Backing> Clone for Decoder<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Backing> Copy for Decoder<B> {}

/// A decoder name plus an optional length, written `name` or `name:len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    pub name: String,
    pub length: Option<usize>,
}

impl DecodeRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            length: None,
        }
    }

    pub fn sized(name: impl Into<String>, length: usize) -> Self {
        Self {
            name: name.into(),
            length: Some(length),
        }
    }
}

impl FromStr for DecodeRequest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            None => Ok(Self::new(s)),
            Some((name, len)) => {
                let length = len
                    .parse()
                    .map_err(|_| Error::InvalidArgument(format!("bad length {len:?} in {s:?}")))?;
                Ok(Self::sized(name, length))
            }
        }
    }
}

impl fmt::Display for DecodeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length {
            Some(len) => write!(f, "{}:{len}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Name-to-decoder table.
///
/// [`Default`] registers every decoder the stream provides, under its bare
/// name (`uint16`, `floatbe`, `string`, ...) plus the `le` spellings
/// (`uint16le`) and `bool8`.
pub struct DecoderRegistry<B: Backing> {
    decoders: HashMap<&'static str, Decoder<B>>,
}

impl<B: Backing> DecoderRegistry<B> {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &'static str, decoder: Decoder<B>) {
        self.decoders.insert(name, decoder);
    }

    pub fn get(&self, name: &str) -> Option<Decoder<B>> {
        self.decoders.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.decoders.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Decode one value from `stream`.
    pub fn decode(&self, stream: &mut Stream<B>, request: &DecodeRequest) -> Result<Value> {
        let decoder = self.get(&request.name).ok_or_else(|| Error::UnsupportedDecoder {
            name: request.name.clone(),
        })?;
        match (decoder, request.length) {
            (Decoder::Fixed(f), None) => f(stream),
            (Decoder::Fixed(_), Some(_)) => Err(Error::InvalidArgument(format!(
                "decoder {:?} takes no length",
                request.name
            ))),
            (Decoder::Sized(f), Some(len)) => f(stream, len),
            (Decoder::Sized(_), None) => Err(Error::InvalidArgument(format!(
                "decoder {:?} needs a length ({}:N)",
                request.name, request.name
            ))),
        }
    }

    /// Decode each request in order, stopping at the first failure.
    pub fn decode_all(&self, stream: &mut Stream<B>, requests: &[DecodeRequest]) -> Result<Vec<Value>> {
        requests.iter().map(|r| self.decode(stream, r)).collect()
    }
}

macro_rules! fixed {
    ($registry:ident, $($name:literal => $method:ident),+ $(,)?) => {
        $($registry.register($name, Decoder::Fixed(|s| s.$method().map(Value::from)));)+
    };
}

impl<B: Backing> Default for DecoderRegistry<B> {
    fn default() -> Self {
        let mut r = Self::empty();
        fixed!(r,
            "int8" => read_int8,
            "uint8" => read_uint8,
            "byte" => read_byte,
            "bool" => read_bool,
            "bool8" => read_bool,
            "int16" => read_int16,
            "int16le" => read_int16,
            "int16be" => read_int16_be,
            "uint16" => read_uint16,
            "uint16le" => read_uint16,
            "uint16be" => read_uint16_be,
            "int32" => read_int32,
            "int32le" => read_int32,
            "int32be" => read_int32_be,
            "uint32" => read_uint32,
            "uint32le" => read_uint32,
            "uint32be" => read_uint32_be,
            "int64" => read_int64,
            "int64le" => read_int64,
            "int64be" => read_int64_be,
            "uint64" => read_uint64,
            "uint64le" => read_uint64,
            "uint64be" => read_uint64_be,
            "float" => read_float,
            "floatle" => read_float,
            "floatbe" => read_float_be,
            "double" => read_double,
            "doublele" => read_double,
            "doublebe" => read_double_be,
        );
        r.register(
            "string",
            Decoder::Sized(|s, len| s.read_string(len, TextEncoding::Utf8).map(Value::Text)),
        );
        r.register(
            "latin1",
            Decoder::Sized(|s, len| s.read_string(len, TextEncoding::Latin1).map(Value::Text)),
        );
        r.register(
            "ascii",
            Decoder::Sized(|s, len| s.read_string(len, TextEncoding::Ascii).map(Value::Text)),
        );
        r.register("binary", Decoder::Sized(|s, len| s.read_binary(len).map(Value::Bytes)));
        r.register("hex", Decoder::Sized(|s, len| s.read_hex(len).map(Value::Hex)));
        r
    }
}
