use bytes::BytesMut;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::UdpSocket;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, info};

use crate::codec::DnsCodec;
use crate::errors::{DnsCodecError, ServerError};
use crate::protocol::{DnsQuery, ResponseCode};
use crate::resolver::{lookup, Lookup};
use crate::response_builder::DnsResponseBuilder;
use crate::zone::ZoneTable;

fn log_query_details(query: &DnsQuery) {
    let header = &query.header;
    debug!(
        target: "dns_server::packet_details",
        packet_id = query.id(),
        opcode = header.opcode,
        truncated = header.tc,
        recursion_desired = header.rd,
        response_code = ResponseCode::from(header.rcode).as_str(),
        question_count = header.qdcount,
        answer_count = header.ancount,
        authority_count = header.nscount,
        additional_count = header.arcount,
        question = %query.question,
        "DNS query header parsed successfully"
    );
}

/// Turn one received datagram into the bytes of its reply.
///
/// Returns an error, and therefore no reply, when the datagram is not a
/// well-formed query.
pub fn handle_datagram(
    packet_data: &[u8],
    zone: &ZoneTable,
) -> Result<BytesMut, DnsCodecError> {
    let mut codec = DnsCodec::new();
    let mut bytes_mut = BytesMut::from(packet_data);

    let query = codec
        .decode(&mut bytes_mut)?
        .ok_or(DnsCodecError::MissingQuestion)?;

    log_query_details(&query);

    let outcome = lookup(&query.question, zone);
    match &outcome {
        Lookup::Answer(record) => info!("Resolved {} -> {}", query.question.name, record.rdata),
        Lookup::NoData => info!("No data for {}", query.question),
        Lookup::NxDomain => info!("NXDOMAIN for {}", query.question.name),
    }

    let mut dns_response_builder = DnsResponseBuilder::new();
    let response = dns_response_builder
        .build_custom_response(&query)
        .with_authoritative(true)
        .with_recursion_available(false)
        .with_lookup(outcome)
        .build();

    debug!("Answering query {} with {}", response.id(), response.rcode());

    let mut response_buf = BytesMut::new();
    codec.encode(response, &mut response_buf)?;

    Ok(response_buf)
}

/// Process one DNS datagram and send the reply back to `addr`.
///
/// Malformed datagrams are logged and dropped. Send failures are logged and
/// never retried.
pub async fn process_dns_query(
    packet_data: Vec<u8>,
    addr: SocketAddr,
    zone: Arc<ZoneTable>,
    sock: Arc<UdpSocket>,
) {
    debug!("Received {} bytes from {}", packet_data.len(), addr);

    let response_buf = match handle_datagram(&packet_data, &zone) {
        Ok(buf) => buf,
        Err(e) => {
            error!("Dropping datagram from {}: {}", addr, e);
            return;
        }
    };

    match sock.send_to(&response_buf, addr).await {
        Ok(response_len) => {
            debug!("Sent DNS response ({} bytes) to {}", response_len, addr);
        }
        Err(source) => {
            error!("{}", ServerError::Send { addr, source });
        }
    }
}
