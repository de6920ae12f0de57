use std::net::SocketAddr;
use std::path::PathBuf;

/// Errors that can occur during DNS packet codec operations
#[derive(Debug, thiserror::Error)]
pub enum DnsCodecError {
    #[error("Incomplete packet: need at least {needed} bytes, have {available}")]
    IncompletePacket { needed: usize, available: usize },

    #[error("Packet of {size} bytes exceeds the {max} byte UDP message limit")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Packet carries no question")]
    MissingQuestion,

    #[error("Packet is a response, not a query (id {0})")]
    NotAQuery(u16),

    #[error("Nom parsing error: {0}")]
    NomError(String),

    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Reasons a zone file could not contribute any records
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("Failed to read zone file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Zone file {0} contains no A records")]
    NoRecords(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind UDP socket to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to send DNS response to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to receive datagram: {0}")]
    Receive(#[source] std::io::Error),
}
