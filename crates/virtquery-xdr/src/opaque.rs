//! Fixed-length opaque data.
//!
//! XDR fixed-length opaques (the 16-byte domain UUID in the libvirt
//! protocol) are encoded as raw bytes without a length prefix. The
//! codec recognizes the [`FIXED16_TOKEN`] newtype name and switches to
//! that encoding.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Newtype-struct name the codec treats as a 16-byte fixed opaque.
pub(crate) const FIXED16_TOKEN: &str = "XdrOpaque16";

/// A 16-byte fixed-length opaque value (a libvirt domain UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Opaque16(pub [u8; 16]);

impl Opaque16 {
    /// Wrap a byte array.
    pub fn new(data: [u8; 16]) -> Self {
        Self(data)
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Opaque16 {
    /// Lowercase hex with the conventional UUID dash grouping.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                write!(f, "-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for Opaque16 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(FIXED16_TOKEN, &RawBytes(&self.0))
    }
}

/// Serializes as raw bytes; paired with the token above so the encoder
/// skips the length prefix.
struct RawBytes<'a>(&'a [u8]);

impl Serialize for RawBytes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0)
    }
}

impl<'de> Deserialize<'de> for Opaque16 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Opaque16Visitor;

        impl de::Visitor<'_> for Opaque16Visitor {
            type Value = Opaque16;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("16 bytes of opaque data")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                let arr: [u8; 16] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))?;
                Ok(Opaque16(arr))
            }
        }

        deserializer.deserialize_newtype_struct(FIXED16_TOKEN, Opaque16Visitor)
    }
}
