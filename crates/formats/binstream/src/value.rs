use std::fmt;

use serde::Serialize;

/// A decoded value, as produced by the registry and recorded by debug sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
    Hex(String),
    /// Cursor position noted while tracing.
    Position(u64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Hex(s) => f.write_str(s),
            Self::Position(p) => write!(f, "Pos={p}"),
        }
    }
}

macro_rules! impl_from {
    ($variant:ident <- $($ty:ty),+) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Self::$variant(v.into())
            }
        })+
    };
}

impl_from!(Int <- i8, i16, i32, i64);
impl_from!(UInt <- u8, u16, u32, u64);
impl_from!(Float <- f32, f64);
impl_from!(Bool <- bool);
impl_from!(Text <- String);
impl_from!(Bytes <- Vec<u8>);
