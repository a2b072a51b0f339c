//! Error types for virtquery.

use crate::message::MessageError;

/// Result type for virtquery operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while querying the daemon.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The daemon socket could not be opened.
    #[error("failed to connect to {target}")]
    ConnectionUnavailable {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection URI does not name a supported local target.
    #[error("unsupported connection URI: {0}")]
    UnsupportedUri(String),

    /// The connection was closed while a call was outstanding.
    #[error("connection closed")]
    ConnectionClosed,

    /// A call did not complete within the configured timeout.
    #[error("operation timed out")]
    Timeout,

    /// The daemon offered no authentication scheme this client speaks.
    #[error("daemon requires authentication (offered schemes: {0:?})")]
    AuthRequired(Vec<i32>),

    /// The daemon failed to return a domain listing.
    #[error("failed to enumerate domains")]
    EnumerationFailed(#[source] Box<Error>),

    /// A named lookup returned no domain.
    #[error("domain not found: {0}")]
    DomainNotFound(String),

    /// The daemon reported a state code outside the documented range.
    #[error("unknown domain state code {0}")]
    UnknownStateCode(i32),

    /// The daemon reported a reason code its state has no entry for.
    #[error("unknown reason code {code} for state {state}")]
    UnknownReasonCode { state: &'static str, code: i32 },

    /// A typed error reply from the daemon.
    #[error("hypervisor error {code} (domain {domain}): {message}")]
    Hypervisor {
        code: i32,
        domain: i32,
        message: String,
    },

    /// Malformed RPC message.
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// XDR encoding/decoding error.
    #[error("XDR error: {0}")]
    Xdr(#[from] virtquery_xdr::Error),

    /// I/O error on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
