use crate::protocol::{
    DnsPacketHeader, DnsQuery, DnsResourceRecord, DnsResponse, ResponseCode,
};
use crate::resolver::Lookup;

/// Builder for authoritative responses to decoded queries
pub struct DnsResponseBuilder {
    // Response header template, id and query flags are filled in per query
    response_header: DnsPacketHeader,
    answer: Option<DnsResourceRecord>,
}

impl DnsResponseBuilder {
    pub fn new() -> Self {
        Self {
            response_header: DnsPacketHeader {
                qr: true,  // Always a response
                aa: true,  // We are the source of truth for the zone
                ra: false, // No recursion offered
                ..Default::default()
            },
            answer: None,
        }
    }

    /// Start a fluent response for `query`
    pub fn build_custom_response<'a>(
        &'a mut self,
        query_packet: &'a DnsQuery,
    ) -> ResponseBuilder<'a> {
        self.answer = None;
        self.response_header.rcode = ResponseCode::NoError.as_u8();
        ResponseBuilder {
            builder: self,
            query_packet,
        }
    }
}

/// Fluent interface for building custom responses
pub struct ResponseBuilder<'a> {
    builder: &'a mut DnsResponseBuilder,
    query_packet: &'a DnsQuery,
}

impl<'a> ResponseBuilder<'a> {
    pub fn with_rcode(self, rcode: ResponseCode) -> Self {
        self.builder.response_header.rcode = rcode.as_u8();
        self
    }

    pub fn with_authoritative(self, aa: bool) -> Self {
        self.builder.response_header.aa = aa;
        self
    }

    pub fn with_recursion_available(self, ra: bool) -> Self {
        self.builder.response_header.ra = ra;
        self
    }

    /// Attach the single answer record, which also makes the response NOERROR
    pub fn with_an_answer(self, record: DnsResourceRecord) -> Self {
        self.builder.answer = Some(record);
        self.with_rcode(ResponseCode::NoError)
    }

    pub fn with_lookup(self, lookup: Lookup) -> Self {
        match lookup {
            Lookup::Answer(record) => self.with_an_answer(record),
            Lookup::NoData => self.with_rcode(ResponseCode::NoError),
            Lookup::NxDomain => self.with_rcode(ResponseCode::NxDomain),
        }
    }

    pub fn build(self) -> DnsResponse {
        let query = self.query_packet;
        let mut header = self.builder.response_header;

        header.id = query.header.id;
        header.opcode = query.header.opcode;
        header.rd = query.header.rd;

        let answer = self.builder.answer.take();
        header.qdcount = 1;
        header.ancount = u16::from(answer.is_some());

        let response = DnsResponse {
            header,
            question: query.question.clone(),
            answer,
        };

        tracing::debug!("DNS Response built: {:?}", response.header);

        response
    }
}

impl Default for DnsResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
