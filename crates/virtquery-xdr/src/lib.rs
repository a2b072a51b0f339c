//! XDR (RFC 4506) serialization for the libvirt RPC payloads used by
//! virtquery.
//!
//! This is a serde codec for the subset of XDR the remote protocol's
//! read-only query surface actually exercises: 32/64-bit integers,
//! booleans, strings, variable and fixed opaques, optional values,
//! counted arrays, and structs. Anything outside that subset is
//! rejected with [`Error::Unsupported`] instead of being given an
//! improvised encoding.

mod de;
mod error;
mod opaque;
mod ser;

pub use de::XdrDecoder;
pub use error::{Error, Result};
pub use opaque::Opaque16;
pub use ser::XdrEncoder;

use serde::{de::DeserializeOwned, Serialize};

/// Serialize a value to XDR bytes.
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut encoder = XdrEncoder::new();
    value.serialize(&mut encoder)?;
    Ok(encoder.into_bytes().to_vec())
}

/// Deserialize a value from XDR bytes, requiring the input to be
/// consumed exactly.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut decoder = XdrDecoder::new(bytes);
    let value = T::deserialize(&mut decoder)?;
    match decoder.remaining() {
        0 => Ok(value),
        n => Err(Error::TrailingData(n)),
    }
}

/// Deserialize a value from the front of the input, ignoring whatever
/// follows it. Used for `remote_error`, whose trailing fields this
/// client has no use for.
pub fn from_bytes_partial<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut decoder = XdrDecoder::new(bytes);
    T::deserialize(&mut decoder)
}
