//! Example: list defined and active domains.
//!
//! ```sh
//! cargo run --example list_domains
//! ```
//!
//! Requires a running libvirt daemon.

use virtquery::{ActiveDomains, ConnectConfig, Connection, DomainListing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // Try the system daemon first, fall back to the session daemon.
    let conn = match Connection::open(&ConnectConfig::default()).await {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("system connection failed ({e}), trying session daemon");
            Connection::open(&ConnectConfig::new("qemu:///session")).await?
        }
    };

    match conn.list_all_domains().await? {
        DomainListing::Empty => println!("No domains defined or running."),
        DomainListing::Names(names) => {
            println!("All domains:");
            for name in &names {
                println!("  {name}");
            }
        }
    }

    match conn.list_active_domains().await? {
        ActiveDomains::Empty => println!("No active domains."),
        ActiveDomains::Domains(domains) => {
            println!("Active domains:");
            for (id, name) in &domains {
                println!("  {id}: {name}");
            }
        }
    }

    conn.close().await?;
    Ok(())
}
