use nom::{
    self,
    bytes::complete::take,
    number::complete::{be_u16, be_u8},
    IResult,
};

use crate::protocol::{DnsPacketHeader, DnsQuestion};

const MAX_LABEL_LEN: u8 = 63;
const MAX_NAME_LEN: usize = 255;

pub fn parse_dns_packet_header(input: &[u8]) -> IResult<&[u8], DnsPacketHeader> {
    let (input, id) = be_u16(input)?;
    // take 1 bit for qr, 4 bits for opcode, 1 bit for aa,
    // 1 bit for tc, 1 bit for rd, 1 bit for ra, 3 bits for z,
    // and 4 bits for rcode
    let (input, flags) = be_u16(input)?;
    let (input, qdcount) = be_u16(input)?;
    let (input, ancount) = be_u16(input)?;
    let (input, nscount) = be_u16(input)?;
    let (input, arcount) = be_u16(input)?;

    let header = DnsPacketHeader {
        id,
        qr: (flags & 0x8000) != 0,
        // opcode: bits 11-14
        opcode: ((flags & 0x7800) >> 11) as u8,
        aa: (flags & 0x0400) != 0,
        tc: (flags & 0x0200) != 0,
        rd: (flags & 0x0100) != 0,
        ra: (flags & 0x0080) != 0,
        // z: bits 4-6
        z: ((flags & 0x0070) >> 4) as u8,
        rcode: (flags & 0x000F) as u8,
        qdcount,
        ancount,
        nscount,
        arcount,
    };

    Ok((input, header))
}

fn invalid_name<I>(input: I) -> nom::Err<nom::error::Error<I>> {
    nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Verify))
}

/// Recursively parses a domain name, following compression pointers.
///
/// `jump_limit` is the packet offset every pointer must land strictly below.
/// Each followed pointer lowers it to its own target, so pointer chains always
/// terminate and can never reach past the data already seen.
fn parse_name_recursive<'p, 'i>(
    full_packet: &'p [u8],
    input: &'i [u8],
    jump_limit: usize,
) -> IResult<&'i [u8], Vec<String>>
where
    'p: 'i,
{
    let (i, length) = be_u8(input)?;

    match length {
        l if (l & 0b1100_0000) == 0b1100_0000 => {
            let (i, next_byte) = be_u8(i)?;
            let offset = (u16::from_be_bytes([l, next_byte]) & 0x3FFF) as usize;
            if offset >= jump_limit {
                return Err(invalid_name(input));
            }
            let (_, labels) = parse_name_recursive(full_packet, &full_packet[offset..], offset)?;
            Ok((i, labels))
        }
        0 => Ok((i, Vec::new())),
        l if l <= MAX_LABEL_LEN => {
            let (i, label_bytes) = take(l as usize)(i)?;
            // A dot inside a label would merge into the label separator of the
            // text form, and names are ASCII only
            if label_bytes.iter().any(|&b| b == b'.' || !b.is_ascii()) {
                return Err(invalid_name(input));
            }
            let label = String::from_utf8_lossy(label_bytes).to_string();
            let (i, mut next_labels) = parse_name_recursive(full_packet, i, jump_limit)?;
            let mut labels = vec![label];
            labels.append(&mut next_labels);
            Ok((i, labels))
        }
        // 0b01 and 0b10 label types are reserved
        _ => Err(invalid_name(input)),
    }
}

/// Parses a domain name into its dot-terminated text form (`"."` for the root).
pub fn parse_domain_name<'p, 'i>(
    full_packet: &'p [u8],
    input: &'i [u8],
) -> IResult<&'i [u8], String>
where
    'p: 'i,
{
    // `input` is always a suffix of `full_packet`
    let start = full_packet.len() - input.len();
    let (i, labels) = parse_name_recursive(full_packet, input, start)?;

    let wire_len = labels.iter().map(|label| label.len() + 1).sum::<usize>() + 1;
    if wire_len > MAX_NAME_LEN {
        return Err(invalid_name(input));
    }

    if labels.is_empty() {
        return Ok((i, ".".to_string()));
    }

    let mut name = labels.join(".");
    name.push('.');
    Ok((i, name))
}

/// Parse one question entry, requires the full packet for compression.
pub fn parse_dns_question<'p, 'i>(
    full_packet: &'p [u8],
    input: &'i [u8],
) -> IResult<&'i [u8], DnsQuestion>
where
    'p: 'i,
{
    let (input, name) = parse_domain_name(full_packet, input)?;
    let (input, qtype) = be_u16(input)?;
    let (input, qclass) = be_u16(input)?;

    Ok((
        input,
        DnsQuestion {
            name,
            qtype,
            qclass,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY_HEADER: [u8; 12] = [
        0xAB, 0xCD, // id
        0x01, 0x00, // RD
        0x00, 0x01, // qdcount
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn test_parse_header_flags() {
        let bytes = [
            0x12, 0x34, 0x85, 0x83, 0x00, 0x01, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03,
        ];
        let (rest, header) = parse_dns_packet_header(&bytes).unwrap();

        assert!(rest.is_empty());
        assert_eq!(header.id, 0x1234);
        assert!(header.qr);
        assert!(header.aa);
        assert!(header.rd);
        assert!(header.ra);
        assert!(!header.tc);
        assert_eq!(header.opcode, 0);
        assert_eq!(header.rcode, 3);
        assert_eq!(header.qdcount, 1);
        assert_eq!(header.ancount, 1);
        assert_eq!(header.nscount, 2);
        assert_eq!(header.arcount, 3);
    }

    #[test]
    fn test_parse_header_too_short() {
        assert!(parse_dns_packet_header(&QUERY_HEADER[..7]).is_err());
    }

    #[test]
    fn test_parse_question_is_dot_terminated() {
        let mut packet = QUERY_HEADER.to_vec();
        packet.extend_from_slice(b"\x07Example\x03com\x00\x00\x01\x00\x01");

        let (rest, question) = parse_dns_question(&packet, &packet[12..]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(question.name, "Example.com.");
        assert!(question.is_a_in());
    }

    #[test]
    fn test_parse_root_name() {
        let mut packet = QUERY_HEADER.to_vec();
        packet.extend_from_slice(&[0x00, 0x00, 0x01, 0x00, 0x01]);

        let (_, question) = parse_dns_question(&packet, &packet[12..]).unwrap();
        assert_eq!(question.name, ".");
    }

    #[test]
    fn test_parse_name_with_backward_pointer() {
        let mut packet = QUERY_HEADER.to_vec();
        // offset 12: "com."
        packet.extend_from_slice(b"\x03com\x00");
        // offset 17: "www" + pointer to offset 12
        packet.extend_from_slice(b"\x03www\xC0\x0C");

        let (rest, name) = parse_domain_name(&packet, &packet[17..]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(name, "www.com.");
    }

    #[test]
    fn test_parse_name_rejects_self_pointer() {
        let mut packet = QUERY_HEADER.to_vec();
        packet.extend_from_slice(&[0xC0, 0x0C]);

        assert!(parse_domain_name(&packet, &packet[12..]).is_err());
    }

    #[test]
    fn test_parse_name_rejects_pointer_loop() {
        let mut packet = QUERY_HEADER.to_vec();
        // offset 12: "a" then pointer back to 12
        packet.extend_from_slice(b"\x01a\xC0\x0C");
        // offset 16: pointer to 12
        packet.extend_from_slice(&[0xC0, 0x0C]);

        assert!(parse_domain_name(&packet, &packet[16..]).is_err());
    }

    #[test]
    fn test_parse_name_rejects_pointer_past_end() {
        let mut packet = QUERY_HEADER.to_vec();
        packet.extend_from_slice(&[0xC1, 0xFF]);

        assert!(parse_domain_name(&packet, &packet[12..]).is_err());
    }

    #[test]
    fn test_parse_name_rejects_reserved_label_type() {
        let mut packet = QUERY_HEADER.to_vec();
        packet.extend_from_slice(&[0x40, b'a', 0x00]);

        assert!(parse_domain_name(&packet, &packet[12..]).is_err());
    }

    #[test]
    fn test_parse_name_rejects_dot_inside_label() {
        let mut packet = QUERY_HEADER.to_vec();
        packet.extend_from_slice(b"\x0bexample.com\x00");

        assert!(matches!(
            parse_domain_name(&packet, &packet[12..]),
            Err(nom::Err::Failure(_))
        ));
    }

    #[test]
    fn test_parse_name_rejects_non_ascii_label() {
        let mut packet = QUERY_HEADER.to_vec();
        packet.push(30);
        packet.extend_from_slice(&[0xFF; 30]);
        packet.push(0);

        assert!(matches!(
            parse_domain_name(&packet, &packet[12..]),
            Err(nom::Err::Failure(_))
        ));
    }

    #[test]
    fn test_parse_name_rejects_truncated_label() {
        let mut packet = QUERY_HEADER.to_vec();
        packet.extend_from_slice(b"\x07exa");

        assert!(parse_domain_name(&packet, &packet[12..]).is_err());
    }

    #[test]
    fn test_parse_name_rejects_overlong_name() {
        let mut packet = QUERY_HEADER.to_vec();
        for _ in 0..5 {
            packet.push(63);
            packet.extend_from_slice(&[b'a'; 63]);
        }
        packet.push(0);

        assert!(parse_domain_name(&packet, &packet[12..]).is_err());
    }
}
