//! The slice of the libvirt remote protocol this crate speaks.
//!
//! Procedure numbers and payload layouts come from libvirt's
//! `remote_protocol.x`. Only the read-only query surface is covered:
//! open/close, the two domain listings, the two lookups, and
//! `DOMAIN_GET_STATE`.

use serde::{Deserialize, Serialize};
use virtquery_xdr::Opaque16;

use crate::error::Error;

pub const PROC_CONNECT_OPEN: u32 = 1;
pub const PROC_CONNECT_CLOSE: u32 = 2;
pub const PROC_CONNECT_LIST_DEFINED_DOMAINS: u32 = 21;
pub const PROC_DOMAIN_LOOKUP_BY_ID: u32 = 22;
pub const PROC_DOMAIN_LOOKUP_BY_NAME: u32 = 23;
pub const PROC_CONNECT_LIST_DOMAINS: u32 = 37;
pub const PROC_AUTH_LIST: u32 = 66;
pub const PROC_DOMAIN_GET_STATE: u32 = 212;

/// Upper bound on names/IDs per listing call (REMOTE_DOMAIN_LIST_MAX).
pub const DOMAIN_LIST_MAX: i32 = 16384;

/// `virConnectFlags`: open the connection read-only.
pub const CONNECT_RO: u32 = 1;

/// `remote_auth_type`: no authentication required.
pub const AUTH_NONE: i32 = 0;

/// `virErrorNumber`: the requested domain does not exist.
pub const ERR_NO_DOMAIN: i32 = 42;

/// `remote_nonnull_domain`: how the daemon identifies a domain on the
/// wire. The ID is -1 while the domain is not running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRef {
    pub name: String,
    pub uuid: Opaque16,
    pub id: i32,
}

#[derive(Debug, Serialize)]
pub struct ConnectOpenArgs {
    pub name: Option<String>,
    pub flags: u32,
}

#[derive(Debug, Serialize)]
pub struct ListDefinedDomainsArgs {
    pub maxnames: i32,
}

#[derive(Debug, Deserialize)]
pub struct ListDefinedDomainsRet {
    pub names: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ListDomainsArgs {
    pub maxids: i32,
}

#[derive(Debug, Deserialize)]
pub struct ListDomainsRet {
    pub ids: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct DomainLookupByIdArgs {
    pub id: i32,
}

#[derive(Debug, Deserialize)]
pub struct DomainLookupByIdRet {
    pub dom: DomainRef,
}

#[derive(Debug, Serialize)]
pub struct DomainLookupByNameArgs {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DomainLookupByNameRet {
    pub dom: DomainRef,
}

#[derive(Debug, Serialize)]
pub struct DomainGetStateArgs {
    pub dom: DomainRef,
    pub flags: u32,
}

#[derive(Debug, Deserialize)]
pub struct DomainGetStateRet {
    pub state: i32,
    pub reason: i32,
}

#[derive(Debug, Deserialize)]
pub struct AuthListRet {
    pub types: Vec<i32>,
}

/// Leading fields of `remote_error`. The struct carries more (level,
/// domain ref, auxiliary strings) that this client ignores, so it is
/// decoded with [`virtquery_xdr::from_bytes_partial`].
#[derive(Debug, Deserialize)]
pub struct ErrorPrefix {
    pub code: i32,
    pub domain: i32,
    pub message: Option<String>,
}

/// Decode an error-status payload into a typed error.
pub fn decode_error(payload: &[u8]) -> Error {
    match virtquery_xdr::from_bytes_partial::<ErrorPrefix>(payload) {
        Ok(err) => Error::Hypervisor {
            code: err.code,
            domain: err.domain,
            message: err.message.unwrap_or_default(),
        },
        Err(e) => Error::Xdr(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_args_encode() {
        let args = ConnectOpenArgs {
            name: Some("qemu:///system".to_owned()),
            flags: CONNECT_RO,
        };
        let bytes = virtquery_xdr::to_bytes(&args).unwrap();

        // option tag, string length, 16 bytes of URI (already aligned), flags
        assert_eq!(&bytes[..4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 14]);
        assert_eq!(&bytes[8..22], b"qemu:///system");
        assert_eq!(&bytes[24..28], &[0, 0, 0, 1]);
    }

    #[test]
    fn domain_ref_roundtrips() {
        let dom = DomainRef {
            name: "alpine-test2".to_owned(),
            uuid: Opaque16::new([9u8; 16]),
            id: 3,
        };
        let bytes = virtquery_xdr::to_bytes(&dom).unwrap();
        assert_eq!(
            virtquery_xdr::from_bytes::<DomainRef>(&bytes).unwrap(),
            dom
        );
    }

    #[test]
    fn error_prefix_ignores_trailing_fields() {
        // code, domain, message present, then a level field we skip.
        let mut payload = virtquery_xdr::to_bytes(&(
            ERR_NO_DOMAIN,
            10i32,
            Some("Domain not found".to_owned()),
        ))
        .unwrap();
        payload.extend_from_slice(&[0, 0, 0, 2]);

        match decode_error(&payload) {
            Error::Hypervisor { code, message, .. } => {
                assert_eq!(code, ERR_NO_DOMAIN);
                assert_eq!(message, "Domain not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
