//! Connection management.
//!
//! A [`Connection`] is the caller-owned handle every query operation
//! borrows. Opening it performs the socket connect, the AUTH_LIST
//! exchange, and CONNECT_OPEN; a background I/O task matches replies
//! to calls by serial number. Dropping the handle tears the task and
//! the socket down, so the daemon-side connection is released on every
//! exit path.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::message::{Kind, Message, MessageStatus};
use crate::proto::{self, AuthListRet, ConnectOpenArgs};
use crate::transport::{Transport, UnixTransport};

/// Socket of the system daemon.
pub const SYSTEM_SOCKET: &str = "/var/run/libvirt/libvirt-sock";

/// Read-only socket of the system daemon.
pub const SYSTEM_SOCKET_RO: &str = "/var/run/libvirt/libvirt-sock-ro";

/// Socket of the session daemon, relative to XDG_RUNTIME_DIR.
pub const SESSION_SOCKET: &str = "libvirt/libvirt-sock";

/// Access mode of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Query-only access. Uses the read-only system socket and sets
    /// VIR_CONNECT_RO on open.
    #[default]
    ReadOnly,
    /// Full access.
    ReadWrite,
}

/// Where and how to connect. The target is injected here rather than
/// hardcoded at the call sites.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Connection URI: `qemu:///system`, `qemu:///session`, or a
    /// socket path (optionally `unix://`-prefixed).
    pub uri: String,
    /// Access mode.
    pub mode: Mode,
    /// Per-call deadline. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            uri: "qemu:///system".to_owned(),
            mode: Mode::ReadOnly,
            call_timeout: None,
        }
    }
}

impl ConnectConfig {
    /// Config for `uri` with the default read-only mode.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }
}

/// Resolve a connection URI to a socket path.
fn socket_path(uri: &str, mode: Mode) -> Result<String> {
    if let Some(path) = uri.strip_prefix("unix://") {
        return Ok(path.to_owned());
    }
    if uri.starts_with('/') {
        return Ok(uri.to_owned());
    }
    if uri.contains("///system") {
        return Ok(match mode {
            Mode::ReadOnly => SYSTEM_SOCKET_RO.to_owned(),
            Mode::ReadWrite => SYSTEM_SOCKET.to_owned(),
        });
    }
    if uri.contains("///session") {
        let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_owned());
        return Ok(format!("{runtime_dir}/{SESSION_SOCKET}"));
    }
    Err(Error::UnsupportedUri(uri.to_owned()))
}

/// A connection to a local libvirt daemon.
///
/// Not `Clone`: queries issued concurrently need independent
/// connections or external serialization, matching the daemon's own
/// per-connection semantics.
pub struct Connection {
    shared: Arc<Shared>,
    call_timeout: Option<Duration>,
}

struct Shared {
    /// Serial number counter.
    serial: AtomicU32,
    /// Sender to the I/O task.
    tx: mpsc::Sender<Outbound>,
    /// Calls awaiting replies, keyed by serial.
    pending: DashMap<i32, oneshot::Sender<Result<Bytes>>>,
}

struct Outbound {
    serial: i32,
    frame: BytesMut,
}

impl Connection {
    /// Open a connection: connect the socket, verify AUTH_NONE is
    /// accepted, and issue CONNECT_OPEN.
    pub async fn open(config: &ConnectConfig) -> Result<Self> {
        let path = socket_path(&config.uri, config.mode)?;
        let transport = UnixTransport::connect(&path)
            .await
            .map_err(|source| Error::ConnectionUnavailable {
                target: path.clone(),
                source,
            })?;
        tracing::debug!(uri = %config.uri, socket = %path, mode = ?config.mode, "connected");

        Self::handshake(transport, config).await
    }

    /// Run the open handshake over an established transport: AUTH_LIST
    /// must offer AUTH_NONE, then CONNECT_OPEN with the mode's flags.
    pub(crate) async fn handshake<T: Transport + 'static>(
        transport: T,
        config: &ConnectConfig,
    ) -> Result<Self> {
        let conn = Self::from_transport(transport, config.call_timeout);

        let auth: AuthListRet = conn.call(proto::PROC_AUTH_LIST, &()).await?;
        if !auth.types.is_empty() && !auth.types.contains(&proto::AUTH_NONE) {
            return Err(Error::AuthRequired(auth.types));
        }

        let flags = match config.mode {
            Mode::ReadOnly => proto::CONNECT_RO,
            Mode::ReadWrite => 0,
        };
        conn.call::<_, ()>(
            proto::PROC_CONNECT_OPEN,
            &ConnectOpenArgs {
                name: Some(config.uri.clone()),
                flags,
            },
        )
        .await?;

        Ok(conn)
    }

    /// Wrap an established transport and spawn its I/O task. Skips the
    /// open handshake; used by `open` and by tests.
    pub(crate) fn from_transport<T: Transport + 'static>(
        transport: T,
        call_timeout: Option<Duration>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<Outbound>(32);
        let shared = Arc::new(Shared {
            serial: AtomicU32::new(1),
            tx,
            pending: DashMap::new(),
        });

        tokio::spawn(io_task(transport, rx, Arc::clone(&shared)));

        Self {
            shared,
            call_timeout,
        }
    }

    /// Issue a typed call: XDR-encode the args, send, await the reply,
    /// XDR-decode the return value.
    pub(crate) async fn call<A, R>(&self, procedure: u32, args: &A) -> Result<R>
    where
        A: Serialize,
        R: DeserializeOwned,
    {
        let payload = virtquery_xdr::to_bytes(args)?;
        let body = self.call_raw(procedure, Bytes::from(payload)).await?;
        Ok(virtquery_xdr::from_bytes(&body)?)
    }

    async fn call_raw(&self, procedure: u32, payload: Bytes) -> Result<Bytes> {
        let serial = self.shared.serial.fetch_add(1, Ordering::SeqCst) as i32;
        let frame = Message::call(procedure, serial, payload).encode()?;

        let (tx, rx) = oneshot::channel();
        self.shared.pending.insert(serial, tx);

        if self.shared.tx.send(Outbound { serial, frame }).await.is_err() {
            self.shared.pending.remove(&serial);
            return Err(Error::ConnectionClosed);
        }

        let reply = match self.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    self.shared.pending.remove(&serial);
                    return Err(Error::Timeout);
                }
            },
            None => rx.await,
        };
        reply.map_err(|_| Error::ConnectionClosed)?
    }

    /// Issue CONNECT_CLOSE and consume the handle.
    pub async fn close(self) -> Result<()> {
        self.call::<_, ()>(proto::PROC_CONNECT_CLOSE, &()).await
    }
}

/// Background task owning the transport. One reply is read per call
/// sent; unsolicited event messages are skipped.
async fn io_task<T: Transport>(
    mut transport: T,
    mut rx: mpsc::Receiver<Outbound>,
    shared: Arc<Shared>,
) {
    'outer: while let Some(out) = rx.recv().await {
        if let Err(e) = transport.send(&out.frame).await {
            tracing::warn!(serial = out.serial, error = %e, "send failed");
            resolve(&shared, out.serial, Err(e));
            break;
        }

        loop {
            let body = match transport.recv().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(serial = out.serial, error = %e, "receive failed");
                    resolve(&shared, out.serial, Err(e));
                    break 'outer;
                }
            };
            let msg = match Message::decode(body) {
                Ok(msg) => msg,
                Err(e) => {
                    resolve(&shared, out.serial, Err(e.into()));
                    break 'outer;
                }
            };
            if msg.kind != Kind::Reply {
                tracing::debug!(
                    procedure = msg.procedure,
                    kind = ?msg.kind,
                    "ignoring unsolicited message"
                );
                continue;
            }
            let result = match msg.status {
                MessageStatus::Ok => Ok(msg.payload),
                MessageStatus::Error => Err(proto::decode_error(&msg.payload)),
                MessageStatus::Continue => {
                    tracing::warn!(serial = msg.serial, "unexpected continue reply");
                    continue;
                }
            };
            resolve(&shared, msg.serial, result);
            break;
        }
    }

    let _ = transport.close().await;

    // Fail whatever is still outstanding.
    let serials: Vec<i32> = shared.pending.iter().map(|entry| *entry.key()).collect();
    for serial in serials {
        resolve(&shared, serial, Err(Error::ConnectionClosed));
    }
}

fn resolve(shared: &Shared, serial: i32, result: Result<Bytes>) {
    if let Some((_, tx)) = shared.pending.remove(&serial) {
        let _ = tx.send(result);
    } else {
        tracing::warn!(serial, "reply for unknown serial");
    }
}
