//! Example: show a domain's lifecycle state and reason.
//!
//! ```sh
//! cargo run --example domain_state -- <domain-name>
//! ```
//!
//! Requires a running libvirt daemon.

use virtquery::{ConnectConfig, Connection};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let name = std::env::args()
        .nth(1)
        .ok_or("usage: domain_state <domain-name>")?;

    let conn = Connection::open(&ConnectConfig::default()).await?;

    match conn.domain_state(&name).await {
        Ok(status) => println!("{name}: {status}"),
        Err(e) => eprintln!("failed to query {name}: {e}"),
    }

    conn.close().await?;
    Ok(())
}
