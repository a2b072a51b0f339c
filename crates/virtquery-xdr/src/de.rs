//! XDR decoder.
//!
//! Mirrors the encoder's subset: integers, booleans, strings, opaques,
//! optionals, counted arrays, and structs (decoded positionally).

use serde::de::{self, DeserializeSeed, SeqAccess, Visitor};

use crate::error::{Error, Result};
use crate::opaque::FIXED16_TOKEN;

/// XDR decoder over a borrowed byte slice.
pub struct XdrDecoder<'de> {
    input: &'de [u8],
    pos: usize,
}

impl<'de> XdrDecoder<'de> {
    /// Create a new decoder.
    pub fn new(input: &'de [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'de [u8]> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEof);
        }
        let bytes = &self.input[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn skip_padding(&mut self, len: usize) -> Result<()> {
        let pad = (4 - (len % 4)) % 4;
        if pad > 0 {
            self.take(pad)?;
        }
        Ok(())
    }

    fn take_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        Ok(i64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    fn take_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    fn take_str(&mut self) -> Result<&'de str> {
        let len = self.take_u32()? as usize;
        let bytes = self.take(len)?;
        self.skip_padding(len)?;
        std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
    }
}

impl<'de, 'a> de::Deserializer<'de> for &'a mut XdrDecoder<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::Unsupported("self-describing value"))
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.take_u32()? {
            0 => visitor.visit_bool(false),
            1 => visitor.visit_bool(true),
            other => Err(Error::InvalidBool(other)),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i8(self.take_i32()? as i8)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i16(self.take_i32()? as i16)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i32(self.take_i32()?)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i64(self.take_i64()?)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u8(self.take_u32()? as u8)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u16(self.take_u32()? as u16)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u32(self.take_u32()?)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u64(self.take_u64()?)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::Unsupported("f32"))
    }

    fn deserialize_f64<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::Unsupported("f64"))
    }

    fn deserialize_char<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::Unsupported("char"))
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let s = self.take_str()?;
        visitor.visit_borrowed_str(s)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let s = self.take_str()?;
        visitor.visit_string(s.to_owned())
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let len = self.take_u32()? as usize;
        let bytes = self.take(len)?;
        self.skip_padding(len)?;
        visitor.visit_borrowed_bytes(bytes)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let len = self.take_u32()? as usize;
        let bytes = self.take(len)?;
        self.skip_padding(len)?;
        visitor.visit_byte_buf(bytes.to_vec())
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.take_u32()? {
            0 => visitor.visit_none(),
            1 => visitor.visit_some(self),
            other => Err(Error::InvalidOptionTag(other)),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        if name == FIXED16_TOKEN {
            // Fixed-length opaque: 16 raw bytes, no length prefix,
            // already 4-byte aligned.
            let bytes = self.take(16)?;
            return visitor.visit_bytes(bytes);
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let len = self.take_u32()? as usize;
        visitor.visit_seq(Counted::new(self, len))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        visitor.visit_seq(Counted::new(self, len))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_seq(Counted::new(self, len))
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::Unsupported("map"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_seq(Counted::new(self, fields.len()))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(Error::Unsupported("enum"))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::Unsupported("identifier"))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::Unsupported("ignored value"))
    }
}

/// Yields a fixed number of positional elements.
struct Counted<'a, 'de: 'a> {
    de: &'a mut XdrDecoder<'de>,
    remaining: usize,
}

impl<'a, 'de> Counted<'a, 'de> {
    fn new(de: &'a mut XdrDecoder<'de>, len: usize) -> Self {
        Self { de, remaining: len }
    }
}

impl<'de, 'a> SeqAccess<'de> for Counted<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use crate::{from_bytes, from_bytes_partial, Error};

    #[test]
    fn integers_decode() {
        assert_eq!(from_bytes::<i32>(&[0, 0, 0, 42]).unwrap(), 42);
        assert_eq!(from_bytes::<i32>(&[255, 255, 255, 255]).unwrap(), -1);
        assert_eq!(from_bytes::<u32>(&[255, 255, 255, 255]).unwrap(), u32::MAX);
    }

    #[test]
    fn bools_reject_other_words() {
        assert!(from_bytes::<bool>(&[0, 0, 0, 1]).unwrap());
        assert!(!from_bytes::<bool>(&[0, 0, 0, 0]).unwrap());
        assert!(matches!(
            from_bytes::<bool>(&[0, 0, 0, 2]),
            Err(Error::InvalidBool(2))
        ));
    }

    #[test]
    fn strings_skip_padding() {
        assert_eq!(
            from_bytes::<String>(&[0, 0, 0, 2, b'h', b'i', 0, 0]).unwrap(),
            "hi"
        );
    }

    #[test]
    fn truncated_input_is_an_error() {
        assert!(matches!(
            from_bytes::<String>(&[0, 0, 0, 8, b'h', b'i']),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn vecs_decode_counted() {
        let bytes = [0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 9];
        assert_eq!(from_bytes::<Vec<i32>>(&bytes).unwrap(), vec![3, 9]);
    }

    #[test]
    fn options_decode_by_tag() {
        assert_eq!(
            from_bytes::<Option<i32>>(&[0, 0, 0, 1, 0, 0, 0, 42]).unwrap(),
            Some(42)
        );
        assert_eq!(from_bytes::<Option<i32>>(&[0, 0, 0, 0]).unwrap(), None);
    }

    #[test]
    fn strict_decode_rejects_trailing_bytes() {
        assert!(matches!(
            from_bytes::<i32>(&[0, 0, 0, 1, 0, 0, 0, 2]),
            Err(Error::TrailingData(4))
        ));
    }

    #[test]
    fn partial_decode_ignores_trailing_bytes() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Prefix {
            code: i32,
            domain: i32,
        }

        let bytes = [0, 0, 0, 42, 0, 0, 0, 10, 1, 2, 3, 4];
        assert_eq!(
            from_bytes_partial::<Prefix>(&bytes).unwrap(),
            Prefix { code: 42, domain: 10 }
        );
    }

    #[test]
    fn struct_roundtrip() {
        #[derive(Debug, PartialEq, serde::Serialize, Deserialize)]
        struct Domain {
            name: String,
            id: i32,
            alias: Option<String>,
        }

        let original = Domain {
            name: "alpine-test2".to_owned(),
            id: 3,
            alias: None,
        };
        let bytes = crate::to_bytes(&original).unwrap();
        assert_eq!(from_bytes::<Domain>(&bytes).unwrap(), original);
    }
}
