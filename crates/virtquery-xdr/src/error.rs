//! Error types for XDR encoding and decoding.

use std::fmt;

/// Result type for XDR operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encoding or decoding XDR data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Custom error message from serde.
    #[error("{0}")]
    Message(String),

    /// Input ended before the value was complete.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A boolean field held something other than 0 or 1.
    #[error("invalid boolean value: {0}")]
    InvalidBool(u32),

    /// An optional-value tag held something other than 0 or 1.
    #[error("invalid option tag: {0}")]
    InvalidOptionTag(u32),

    /// A string field was not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// Bytes were left over after a strict decode.
    #[error("trailing data: {0} bytes remaining")]
    TrailingData(usize),

    /// The type is not representable in the XDR subset this codec supports.
    #[error("unsupported type: {0}")]
    Unsupported(&'static str),
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}
