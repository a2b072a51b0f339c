//! Read-oriented domain queries.
//!
//! Every operation borrows a caller-owned [`Connection`]; acquisition
//! and release of the connection stay entirely at the caller's
//! boundary. Results are re-fetched from the daemon on every call.

use std::collections::BTreeMap;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::proto::{
    DomainGetStateArgs, DomainGetStateRet, DomainLookupByIdArgs, DomainLookupByIdRet,
    DomainLookupByNameArgs, DomainLookupByNameRet, DomainRef, ListDefinedDomainsArgs,
    ListDefinedDomainsRet, ListDomainsArgs, ListDomainsRet, DOMAIN_LIST_MAX, ERR_NO_DOMAIN,
    PROC_CONNECT_LIST_DEFINED_DOMAINS, PROC_CONNECT_LIST_DOMAINS, PROC_DOMAIN_GET_STATE,
    PROC_DOMAIN_LOOKUP_BY_ID, PROC_DOMAIN_LOOKUP_BY_NAME,
};
use crate::state::DomainStatus;

/// Result of listing all domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainListing {
    /// The daemon has no domains at all, defined or active.
    Empty,
    /// Defined-but-inactive names first, in daemon order, followed by
    /// active names resolved through their IDs.
    Names(Vec<String>),
}

/// Result of listing active domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveDomains {
    /// Nothing is currently running.
    Empty,
    /// Running domains keyed by their daemon-assigned numeric ID.
    Domains(BTreeMap<i32, String>),
}

impl Connection {
    /// Names of domains that are defined but not running.
    pub async fn list_defined_domains(&self) -> Result<Vec<String>> {
        let ret: ListDefinedDomainsRet = self
            .call(
                PROC_CONNECT_LIST_DEFINED_DOMAINS,
                &ListDefinedDomainsArgs {
                    maxnames: DOMAIN_LIST_MAX,
                },
            )
            .await
            .map_err(enumeration_failed)?;
        Ok(ret.names)
    }

    /// IDs of currently running domains.
    pub async fn list_active_ids(&self) -> Result<Vec<i32>> {
        let ret: ListDomainsRet = self
            .call(
                PROC_CONNECT_LIST_DOMAINS,
                &ListDomainsArgs {
                    maxids: DOMAIN_LIST_MAX,
                },
            )
            .await
            .map_err(enumeration_failed)?;
        Ok(ret.ids)
    }

    /// Look up an active domain by its numeric ID.
    pub async fn lookup_by_id(&self, id: i32) -> Result<DomainRef> {
        let ret: DomainLookupByIdRet = self
            .call(PROC_DOMAIN_LOOKUP_BY_ID, &DomainLookupByIdArgs { id })
            .await?;
        Ok(ret.dom)
    }

    /// Look up a domain by name. A missing domain surfaces as
    /// [`Error::DomainNotFound`].
    pub async fn lookup_by_name(&self, name: &str) -> Result<DomainRef> {
        let ret: DomainLookupByNameRet = self
            .call(
                PROC_DOMAIN_LOOKUP_BY_NAME,
                &DomainLookupByNameArgs {
                    name: name.to_owned(),
                },
            )
            .await
            .map_err(|e| not_found(name, e))?;
        Ok(ret.dom)
    }

    /// All domain names on the daemon: defined-but-inactive first (in
    /// daemon order), then active names resolved by ID.
    /// [`DomainListing::Empty`] only when neither kind exists.
    pub async fn list_all_domains(&self) -> Result<DomainListing> {
        let mut names = self.list_defined_domains().await?;
        for id in self.list_active_ids().await? {
            names.push(self.lookup_by_id(id).await?.name);
        }
        if names.is_empty() {
            Ok(DomainListing::Empty)
        } else {
            Ok(DomainListing::Names(names))
        }
    }

    /// Active domains as an ID-to-name mapping.
    pub async fn list_active_domains(&self) -> Result<ActiveDomains> {
        let ids = self.list_active_ids().await?;
        if ids.is_empty() {
            return Ok(ActiveDomains::Empty);
        }

        let mut domains = BTreeMap::new();
        for id in ids {
            domains.insert(id, self.lookup_by_id(id).await?.name);
        }
        Ok(ActiveDomains::Domains(domains))
    }

    /// The named domain's decoded lifecycle snapshot.
    pub async fn domain_state(&self, name: &str) -> Result<DomainStatus> {
        let dom = self.lookup_by_name(name).await?;
        let ret: DomainGetStateRet = self
            .call(PROC_DOMAIN_GET_STATE, &DomainGetStateArgs { dom, flags: 0 })
            .await?;
        DomainStatus::from_codes(ret.state, ret.reason)
    }
}

fn enumeration_failed(err: Error) -> Error {
    Error::EnumerationFailed(Box::new(err))
}

fn not_found(name: &str, err: Error) -> Error {
    match err {
        Error::Hypervisor {
            code: ERR_NO_DOMAIN,
            ..
        } => Error::DomainNotFound(name.to_owned()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use bytes::Bytes;
    use serde::Serialize;
    use virtquery_xdr::Opaque16;

    use super::*;
    use crate::message::{Kind, Message, MessageStatus};
    use crate::transport::Transport;

    /// Transport double replaying canned reply payloads in call order.
    struct Scripted {
        replies: VecDeque<(MessageStatus, Vec<u8>)>,
        last_serial: i32,
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&mut self, data: &[u8]) -> crate::Result<()> {
            // Serial sits after length, program, version, procedure, kind.
            self.last_serial = i32::from_be_bytes(data[20..24].try_into().unwrap());
            Ok(())
        }

        async fn recv(&mut self) -> crate::Result<Bytes> {
            let (status, payload) = self.replies.pop_front().expect("unexpected call");
            let mut msg = Message::call(0, self.last_serial, Bytes::from(payload));
            msg.kind = Kind::Reply;
            msg.status = status;
            let framed = msg.encode().unwrap();
            Ok(Bytes::copy_from_slice(&framed[4..]))
        }

        async fn close(&mut self) -> crate::Result<()> {
            Ok(())
        }
    }

    fn conn(replies: Vec<(MessageStatus, Vec<u8>)>) -> Connection {
        Connection::from_transport(
            Scripted {
                replies: replies.into(),
                last_serial: 0,
            },
            None,
        )
    }

    fn ok<T: Serialize>(value: &T) -> (MessageStatus, Vec<u8>) {
        (MessageStatus::Ok, virtquery_xdr::to_bytes(value).unwrap())
    }

    fn daemon_error(code: i32, message: &str) -> (MessageStatus, Vec<u8>) {
        let payload =
            virtquery_xdr::to_bytes(&(code, 10i32, Some(message.to_owned()))).unwrap();
        (MessageStatus::Error, payload)
    }

    fn dom_ref(name: &str, id: i32) -> DomainRef {
        DomainRef {
            name: name.to_owned(),
            uuid: Opaque16::new([1; 16]),
            id,
        }
    }

    #[tokio::test]
    async fn active_domains_map_ids_to_names() {
        let conn = conn(vec![ok(&vec![3i32]), ok(&dom_ref("alpine-test2", 3))]);

        let result = conn.list_active_domains().await.unwrap();
        let expected = BTreeMap::from([(3, "alpine-test2".to_owned())]);
        assert_eq!(result, ActiveDomains::Domains(expected));
    }

    #[tokio::test]
    async fn empty_inventory_is_empty_not_an_error() {
        let conn = conn(vec![ok(&Vec::<String>::new()), ok(&Vec::<i32>::new())]);
        assert_eq!(conn.list_all_domains().await.unwrap(), DomainListing::Empty);
    }

    #[tokio::test]
    async fn no_active_domains_is_empty() {
        let conn = conn(vec![ok(&Vec::<i32>::new())]);
        assert_eq!(
            conn.list_active_domains().await.unwrap(),
            ActiveDomains::Empty
        );
    }

    #[tokio::test]
    async fn all_domains_lists_inactive_then_active() {
        let conn = conn(vec![
            ok(&vec!["alpine-test1".to_owned()]),
            ok(&vec![3i32]),
            ok(&dom_ref("alpine-test2", 3)),
        ]);

        assert_eq!(
            conn.list_all_domains().await.unwrap(),
            DomainListing::Names(vec![
                "alpine-test1".to_owned(),
                "alpine-test2".to_owned()
            ])
        );
    }

    #[tokio::test]
    async fn inactive_only_inventory_still_lists() {
        let conn = conn(vec![
            ok(&vec!["alpine-test1".to_owned()]),
            ok(&Vec::<i32>::new()),
        ]);

        assert_eq!(
            conn.list_all_domains().await.unwrap(),
            DomainListing::Names(vec!["alpine-test1".to_owned()])
        );
    }

    #[tokio::test]
    async fn domain_state_decodes_paused_migration() {
        let conn = conn(vec![ok(&dom_ref("alpine-test2", 3)), ok(&(3i32, 2i32))]);

        let status = conn.domain_state("alpine-test2").await.unwrap();
        assert_eq!(status.state.name(), "VIR_DOMAIN_PAUSED");
        assert_eq!(status.reason, "VIR_DOMAIN_PAUSED_MIGRATION");
    }

    #[tokio::test]
    async fn missing_domain_is_domain_not_found() {
        let conn = conn(vec![daemon_error(ERR_NO_DOMAIN, "Domain not found")]);

        match conn.domain_state("ghost").await {
            Err(Error::DomainNotFound(name)) => assert_eq!(name, "ghost"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn listing_failure_wraps_as_enumeration_failed() {
        let conn = conn(vec![daemon_error(1, "internal error")]);

        assert!(matches!(
            conn.list_active_domains().await,
            Err(Error::EnumerationFailed(_))
        ));
    }

    #[tokio::test]
    async fn unknown_reason_code_surfaces() {
        // Blocked only defines reason 0; the daemon claims reason 5.
        let conn = conn(vec![ok(&dom_ref("vm0", 1)), ok(&(2i32, 5i32))]);

        assert!(matches!(
            conn.domain_state("vm0").await,
            Err(Error::UnknownReasonCode {
                state: "VIR_DOMAIN_BLOCKED",
                code: 5
            })
        ));
    }
}
