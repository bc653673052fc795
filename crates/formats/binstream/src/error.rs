use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid length {length}: a length greater than 0 is required")]
    InvalidLength { length: usize },

    #[error("overrun! reading {requested} bytes (remaining={remaining} pos={position})")]
    Overrun {
        requested: u64,
        remaining: u64,
        position: u64,
    },

    #[error("invalid position {proposed}")]
    InvalidPosition { proposed: i64 },

    #[error("expected boolean value of 1 or 0, but got {value} ({value:#04x}) pos={position}")]
    InvalidBooleanValue { value: u8, position: u64 },

    #[error("expected float, but got NaN pos={position}")]
    InvalidFloatValue { position: u64 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported decoder {name:?}")]
    UnsupportedDecoder { name: String },

    #[error("string at pos={position} is not valid UTF-8: {source}")]
    InvalidString {
        position: u64,
        source: std::string::FromUtf8Error,
    },

    #[error("string at pos={position} holds non-ASCII byte {byte:#04x}")]
    NonAscii { byte: u8, position: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
