//! RPC message framing for the libvirt remote protocol.
//!
//! On the wire every message is a 4-byte big-endian total length
//! (which counts itself), a 24-byte header, and an XDR payload:
//!
//! ```plaintext
//! +------------+------------+------------+------------+
//! | length (4) | program(4) | version(4) |procedure(4)|
//! +------------+------------+------------+------------+
//! |  kind (4)  | serial (4) | status (4) |   payload  |
//! +------------+------------+------------+------------+
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Program number of the remote protocol.
pub const REMOTE_PROGRAM: u32 = 0x2000_8086;

/// Version of the remote protocol.
pub const REMOTE_PROTOCOL_VERSION: u32 = 1;

/// Header size in bytes, excluding the length field.
pub const HEADER_LEN: usize = 24;

/// Upper bound on a framed message (4 MiB, per the protocol).
pub const MAX_MESSAGE_LEN: usize = 4 * 1024 * 1024;

/// Message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Kind {
    /// A call from client to daemon.
    Call = 0,
    /// A reply to a call.
    Reply = 1,
    /// An unsolicited event from the daemon.
    Event = 2,
    /// Stream data.
    Stream = 3,
}

impl Kind {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Call),
            1 => Some(Self::Reply),
            2 => Some(Self::Event),
            3 => Some(Self::Stream),
            _ => None,
        }
    }
}

/// Message status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageStatus {
    /// Success; the payload is the procedure's return value.
    Ok = 0,
    /// Failure; the payload is a `remote_error`.
    Error = 1,
    /// More stream data follows.
    Continue = 2,
}

impl MessageStatus {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Ok),
            1 => Some(Self::Error),
            2 => Some(Self::Continue),
            _ => None,
        }
    }
}

/// A decoded RPC message.
#[derive(Debug, Clone)]
pub struct Message {
    /// Procedure number.
    pub procedure: u32,
    /// Message kind.
    pub kind: Kind,
    /// Serial number matching replies to calls (signed in the protocol).
    pub serial: i32,
    /// Status of the message.
    pub status: MessageStatus,
    /// XDR payload.
    pub payload: Bytes,
}

impl Message {
    /// Build a call message.
    pub fn call(procedure: u32, serial: i32, payload: Bytes) -> Self {
        Self {
            procedure,
            kind: Kind::Call,
            serial,
            status: MessageStatus::Ok,
            payload,
        }
    }

    /// Encode to wire form, including the length prefix. Payloads
    /// that would push the frame past the protocol limit are rejected
    /// rather than sent.
    pub fn encode(&self) -> Result<BytesMut, MessageError> {
        let total = 4 + HEADER_LEN + self.payload.len();
        if total > MAX_MESSAGE_LEN {
            return Err(MessageError::Oversized(total));
        }
        let mut buf = BytesMut::with_capacity(total);

        buf.put_u32(total as u32);
        buf.put_u32(REMOTE_PROGRAM);
        buf.put_u32(REMOTE_PROTOCOL_VERSION);
        buf.put_u32(self.procedure);
        buf.put_u32(self.kind as u32);
        buf.put_i32(self.serial);
        buf.put_u32(self.status as u32);
        buf.extend_from_slice(&self.payload);

        Ok(buf)
    }

    /// Decode a message body. The input must not include the length
    /// prefix (the transport has already consumed it).
    pub fn decode(mut body: Bytes) -> Result<Self, MessageError> {
        if body.len() < HEADER_LEN {
            return Err(MessageError::Truncated);
        }

        let program = body.get_u32();
        let version = body.get_u32();
        let procedure = body.get_u32();
        let kind = body.get_u32();
        let serial = body.get_i32();
        let status = body.get_u32();

        if program != REMOTE_PROGRAM {
            return Err(MessageError::WrongProgram(program));
        }
        if version != REMOTE_PROTOCOL_VERSION {
            return Err(MessageError::WrongVersion(version));
        }
        let kind = Kind::from_u32(kind).ok_or(MessageError::UnknownKind(kind))?;
        let status =
            MessageStatus::from_u32(status).ok_or(MessageError::UnknownStatus(status))?;

        Ok(Self {
            procedure,
            kind,
            serial,
            status,
            payload: body,
        })
    }
}

/// Framing errors.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("message shorter than its header")]
    Truncated,
    #[error("unexpected program number {0:#x}")]
    WrongProgram(u32),
    #[error("unexpected protocol version {0}")]
    WrongVersion(u32),
    #[error("unknown message kind {0}")]
    UnknownKind(u32),
    #[error("unknown message status {0}")]
    UnknownStatus(u32),
    #[error("message of {0} bytes exceeds the protocol limit")]
    Oversized(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_roundtrips() {
        let payload = Bytes::from_static(b"abcd");
        let msg = Message::call(212, 7, payload.clone());

        let framed = msg.encode().unwrap();
        assert_eq!(framed.len(), 4 + HEADER_LEN + 4);

        let body = Bytes::copy_from_slice(&framed[4..]);
        let decoded = Message::decode(body).unwrap();
        assert_eq!(decoded.procedure, 212);
        assert_eq!(decoded.kind, Kind::Call);
        assert_eq!(decoded.serial, 7);
        assert_eq!(decoded.status, MessageStatus::Ok);
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn rejects_wrong_program() {
        let mut framed = Message::call(1, 1, Bytes::new()).encode().unwrap();
        framed[4..8].copy_from_slice(&0xdead_beefu32.to_be_bytes());

        let body = Bytes::copy_from_slice(&framed[4..]);
        assert!(matches!(
            Message::decode(body),
            Err(MessageError::WrongProgram(0xdead_beef))
        ));
    }

    #[test]
    fn rejects_unknown_kind() {
        let mut framed = Message::call(1, 1, Bytes::new()).encode().unwrap();
        framed[16..20].copy_from_slice(&9u32.to_be_bytes());

        let body = Bytes::copy_from_slice(&framed[4..]);
        assert!(matches!(
            Message::decode(body),
            Err(MessageError::UnknownKind(9))
        ));
    }

    #[test]
    fn rejects_oversized_payload() {
        let payload = Bytes::from(vec![0u8; MAX_MESSAGE_LEN]);
        assert!(matches!(
            Message::call(1, 1, payload).encode(),
            Err(MessageError::Oversized(_))
        ));
    }

    #[test]
    fn rejects_short_body() {
        assert!(matches!(
            Message::decode(Bytes::from_static(&[0u8; 8])),
            Err(MessageError::Truncated)
        ));
    }
}
