//! Read-oriented domain queries against a local libvirt daemon.
//!
//! This crate opens a connection to the daemon over its Unix socket
//! (speaking the libvirt RPC protocol directly, no C bindings), lists
//! defined and active domains, and decodes a domain's numeric
//! (state, reason) pair into the symbolic `VIR_DOMAIN_*` names.
//!
//! The connection is a caller-owned handle passed to every query;
//! nothing is cached between calls and nothing mutates daemon state.
//!
//! # Example
//!
//! ```ignore
//! use virtquery::{ConnectConfig, Connection, DomainListing};
//!
//! #[tokio::main]
//! async fn main() -> virtquery::Result<()> {
//!     let conn = Connection::open(&ConnectConfig::default()).await?;
//!
//!     match conn.list_all_domains().await? {
//!         DomainListing::Empty => println!("no domains"),
//!         DomainListing::Names(names) => {
//!             for name in names {
//!                 println!("{}: {}", name, conn.domain_state(&name).await?);
//!             }
//!         }
//!     }
//!
//!     conn.close().await
//! }
//! ```

mod connection;
mod error;
mod message;
mod proto;
mod query;
mod state;
mod transport;

pub use connection::{ConnectConfig, Connection, Mode};
pub use error::{Error, Result};
pub use message::MessageError;
pub use proto::DomainRef;
pub use query::{ActiveDomains, DomainListing};
pub use state::{DomainState, DomainStatus};
