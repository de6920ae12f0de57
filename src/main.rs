mod cli;
mod codec;
mod errors;
mod parsers;
mod processor;
mod protocol;
mod resolver;
mod response_builder;
mod server;
mod zone;

use std::sync::Arc;

use tracing::{error, info, warn, Level};

use crate::server::DnsServer;
use crate::zone::{load_zone, ZoneTable};

fn build_zone(args: &cli::Args) -> ZoneTable {
    let mut zone = if args.no_defaults {
        ZoneTable::new()
    } else {
        ZoneTable::builtin()
    };

    match load_zone(&args.zone) {
        Ok(records) => {
            info!("Loaded {} records from {}", records.len(), args.zone.display());
            zone.extend(records);
        }
        Err(e) => warn!("{}; serving {} fallback records", e, zone.len()),
    }

    zone
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse_args();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let zone = Arc::new(build_zone(&args));

    // Binding is the only fatal error, anyhow reports it on exit
    let server = DnsServer::bind(args.bind_addr(), zone).await?;

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                // Without a signal handler the server keeps running until killed
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
