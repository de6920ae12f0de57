// DNS message structures for the query/response subset this server speaks

use std::net::Ipv4Addr;

/// Classic UDP DNS message limit, RFC 1035 section 4.2.1
pub const MAX_UDP_MESSAGE_SIZE: usize = 512;
pub const HEADER_LEN: usize = 12;

// https://www.rfc-editor.org/rfc/rfc1035#section-3.2.2
pub const DNS_TYPE_A: u16 = 1;
// https://www.rfc-editor.org/rfc/rfc1035#section-3.2.4
pub const DNS_CLASS_IN: u16 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DnsPacketHeader {
    pub id: u16,      // Identifier, 16 bits
    pub qr: bool,     // Query or Response, 1 bit
    pub opcode: u8,   // Operation code, 4 bits
    pub aa: bool,     // Authoritative answer, 1 bit
    pub tc: bool,     // Truncated, 1 bit
    pub rd: bool,     // Recursion desired, 1 bit
    pub ra: bool,     // Recursion available, 1 bit
    pub z: u8,        // Reserved for future use, 3 bits
    pub rcode: u8,    // Response code, 4 bits
    pub qdcount: u16, // Number of questions, 16 bits
    pub ancount: u16, // Number of answers, 16 bits
    pub nscount: u16, // Number of authority records, 16 bits
    pub arcount: u16, // Number of additional records, 16 bits
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: String, // Dot-terminated, case preserved as received
    pub qtype: u16,
    pub qclass: u16,
}

impl DnsQuestion {
    /// True for the only question shape this server answers with data.
    pub fn is_a_in(&self) -> bool {
        self.qtype == DNS_TYPE_A && self.qclass == DNS_CLASS_IN
    }
}

impl std::fmt::Display for DnsQuestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.name, self.qtype, self.qclass)
    }
}

/// A decoded query: the header plus the first entry of the question section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuery {
    pub header: DnsPacketHeader,
    pub question: DnsQuestion,
}

impl DnsQuery {
    pub fn id(&self) -> u16 {
        self.header.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormErr,
    NxDomain,
    Other(u8),
}

impl ResponseCode {
    pub fn as_u8(self) -> u8 {
        match self {
            ResponseCode::NoError => 0,
            ResponseCode::FormErr => 1,
            ResponseCode::NxDomain => 3,
            ResponseCode::Other(code) => code & 0x0F,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResponseCode::NoError => "NOERROR",
            ResponseCode::FormErr => "FORMERR",
            ResponseCode::NxDomain => "NXDOMAIN",
            ResponseCode::Other(_) => "UNKNOWN",
        }
    }
}

impl From<u8> for ResponseCode {
    fn from(code: u8) -> Self {
        match code & 0x0F {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormErr,
            3 => ResponseCode::NxDomain,
            other => ResponseCode::Other(other),
        }
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An IN A resource record. RDLENGTH is always 4 on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsResourceRecord {
    pub name: String,
    pub rtype: u16,
    pub rclass: u16,
    pub ttl: u32,
    pub rdata: Ipv4Addr,
}

impl DnsResourceRecord {
    pub fn a(name: impl Into<String>, ttl: u32, addr: Ipv4Addr) -> Self {
        DnsResourceRecord {
            name: name.into(),
            rtype: DNS_TYPE_A,
            rclass: DNS_CLASS_IN,
            ttl,
            rdata: addr,
        }
    }
}

/// A response carrying the echoed question and at most one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsResponse {
    pub header: DnsPacketHeader,
    pub question: DnsQuestion,
    pub answer: Option<DnsResourceRecord>,
}

impl DnsResponse {
    pub fn id(&self) -> u16 {
        self.header.id
    }

    pub fn rcode(&self) -> ResponseCode {
        ResponseCode::from(self.header.rcode)
    }
}
