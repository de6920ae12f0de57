use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "authoritative-dns")]
#[command(about = "A minimal authoritative DNS server answering A queries", long_about = None)]
pub struct Args {
    /// Interface address to bind
    #[arg(long, default_value = "0.0.0.0", value_parser = parse_ip_addr)]
    pub host: IpAddr,

    /// UDP port to bind (use 5353 or higher when not running as root)
    #[arg(short, long, default_value_t = 53)]
    pub port: u16,

    /// Zone file with `NAME TTL IN A IPV4` lines
    #[arg(short, long, default_value = "example.zone")]
    pub zone: PathBuf,

    /// Start from an empty table instead of the built-in records
    #[arg(long)]
    pub no_defaults: bool,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_ip_addr(s: &str) -> Result<IpAddr, String> {
    s.parse::<IpAddr>()
        .map_err(|_| format!("Invalid host: '{}'. Expected an IP address", s))
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
