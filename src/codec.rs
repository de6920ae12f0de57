//! DNS message codec for tokio_util
//!
//! Decodes a single UDP datagram into a [`DnsQuery`] and encodes a
//! [`DnsResponse`] back into RFC 1035 wire format. Each datagram is one
//! complete message, so the decoder never waits for more bytes: anything it
//! cannot parse is reported as an error and the datagram is dropped.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::errors::DnsCodecError;
use crate::parsers::{parse_dns_packet_header, parse_dns_question};
use crate::protocol::{DnsPacketHeader, DnsQuery, DnsResponse, HEADER_LEN, MAX_UDP_MESSAGE_SIZE};

const IPV4_RDLENGTH: u16 = 4;
const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;

/// DNS message codec for UDP datagrams
#[derive(Debug, Default)]
pub struct DnsCodec;

impl DnsCodec {
    pub fn new() -> Self {
        Self
    }
}

fn from_nom(err: nom::Err<nom::error::Error<&[u8]>>, available: usize) -> DnsCodecError {
    match err {
        nom::Err::Incomplete(needed) => {
            let needed = match needed {
                nom::Needed::Size(n) => available + n.get(),
                nom::Needed::Unknown => available + 1,
            };
            DnsCodecError::IncompletePacket { needed, available }
        }
        // Failures are only raised by the name validation in `parsers`
        nom::Err::Failure(e) => DnsCodecError::InvalidDomainName(format!("{:?}", e.code)),
        nom::Err::Error(e) => DnsCodecError::NomError(format!("{:?}", e.code)),
    }
}

impl Decoder for DnsCodec {
    type Item = DnsQuery;
    type Error = DnsCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let available = src.len();

        if available > MAX_UDP_MESSAGE_SIZE {
            return Err(DnsCodecError::MessageTooLarge {
                size: available,
                max: MAX_UDP_MESSAGE_SIZE,
            });
        }

        if available < HEADER_LEN {
            debug!("Insufficient bytes for DNS header: {} < {}", available, HEADER_LEN);
            return Err(DnsCodecError::IncompletePacket {
                needed: HEADER_LEN,
                available,
            });
        }

        let input_bytes = src.as_ref();
        let (remaining, header) =
            parse_dns_packet_header(input_bytes).map_err(|e| from_nom(e, available))?;

        if header.qr {
            return Err(DnsCodecError::NotAQuery(header.id));
        }

        if header.qdcount == 0 {
            return Err(DnsCodecError::MissingQuestion);
        }

        // Only the first question is answered. Further questions and any
        // answer/authority/additional records are ignored.
        let (_, question) =
            parse_dns_question(input_bytes, remaining).map_err(|e| from_nom(e, available))?;

        // The whole datagram is consumed
        src.clear();

        Ok(Some(DnsQuery { header, question }))
    }
}

impl Encoder<DnsResponse> for DnsCodec {
    type Error = DnsCodecError;

    fn encode(&mut self, item: DnsResponse, dst: &mut BytesMut) -> Result<(), Self::Error> {
        debug!("DnsCodec::encode called for packet ID {}", item.header.id);

        let start = dst.len();

        let mut header = item.header;
        header.qdcount = 1;
        header.ancount = u16::from(item.answer.is_some());
        header.nscount = 0;
        header.arcount = 0;

        self.encode_header(&header, dst);

        self.encode_domain_name(&item.question.name, dst)?;
        dst.put_u16(item.question.qtype);
        dst.put_u16(item.question.qclass);

        if let Some(answer) = &item.answer {
            self.encode_domain_name(&answer.name, dst)?;
            dst.put_u16(answer.rtype);
            dst.put_u16(answer.rclass);
            dst.put_u32(answer.ttl);
            dst.put_u16(IPV4_RDLENGTH);
            dst.put_slice(&answer.rdata.octets());
        }

        let size = dst.len() - start;
        if size > MAX_UDP_MESSAGE_SIZE {
            dst.truncate(start);
            return Err(DnsCodecError::MessageTooLarge {
                size,
                max: MAX_UDP_MESSAGE_SIZE,
            });
        }

        Ok(())
    }
}

impl DnsCodec {
    /// Encode a domain name as length-prefixed labels terminated by a zero
    /// byte. Empty labels (the trailing dot, or the root name) are skipped.
    fn encode_domain_name(
        &self,
        domain_name: &str,
        dst: &mut BytesMut,
    ) -> Result<(), DnsCodecError> {
        let labels: Vec<&str> = domain_name.split('.').filter(|l| !l.is_empty()).collect();

        let total_space: usize = labels.iter().map(|label| 1 + label.len()).sum::<usize>() + 1;
        if total_space > MAX_NAME_LEN {
            return Err(DnsCodecError::InvalidDomainName(format!(
                "'{}' exceeds maximum length of {} bytes",
                domain_name, MAX_NAME_LEN
            )));
        }
        dst.reserve(total_space);

        for label in labels {
            if label.len() > MAX_LABEL_LEN {
                return Err(DnsCodecError::InvalidDomainName(format!(
                    "Label '{}' exceeds maximum length of {} bytes",
                    label, MAX_LABEL_LEN
                )));
            }

            dst.put_u8(label.len() as u8);
            dst.put_slice(label.as_bytes());
        }

        dst.put_u8(0);

        Ok(())
    }

    fn encode_header(&self, header: &DnsPacketHeader, dst: &mut BytesMut) {
        dst.reserve(HEADER_LEN);

        dst.put_u16(header.id);

        let mut flags: u16 = 0;

        // QR - bit 15
        if header.qr {
            flags |= 0x8000;
        }

        // OPCODE - bits 14-11
        flags |= ((header.opcode as u16) & 0x0F) << 11;

        // AA - bit 10
        if header.aa {
            flags |= 0x0400;
        }

        // TC - bit 9
        if header.tc {
            flags |= 0x0200;
        }

        // RD - bit 8
        if header.rd {
            flags |= 0x0100;
        }

        // RA - bit 7
        if header.ra {
            flags |= 0x0080;
        }

        // Z - bits 6-4
        flags |= ((header.z as u16) & 0x07) << 4;

        // RCODE - bits 3-0
        flags |= (header.rcode as u16) & 0x0F;

        dst.put_u16(flags);

        dst.put_u16(header.qdcount);
        dst.put_u16(header.ancount);
        dst.put_u16(header.nscount);
        dst.put_u16(header.arcount);
    }
}
