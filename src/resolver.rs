use crate::protocol::{DnsQuestion, DnsResourceRecord};
use crate::zone::ZoneTable;

/// TTL attached to every synthesized answer, in seconds
pub const ANSWER_TTL: u32 = 300;

/// What the zone says about a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The name exists and has an A record for this question.
    Answer(DnsResourceRecord),
    /// The name exists but the question asks for a type/class we do not hold.
    NoData,
    /// The name is not in the zone.
    NxDomain,
}

/// Exact, case-insensitive lookup of `name`. No wildcard, suffix or CNAME
/// matching. The record's owner name is `name` as given.
pub fn resolve(name: &str, zone: &ZoneTable) -> Option<DnsResourceRecord> {
    zone.get(&name.to_ascii_lowercase())
        .map(|addr| DnsResourceRecord::a(name, ANSWER_TTL, addr))
}

/// Resolve a full question, distinguishing a missing name from a name that
/// only lacks data for the requested type.
pub fn lookup(question: &DnsQuestion, zone: &ZoneTable) -> Lookup {
    if question.is_a_in() {
        return match resolve(&question.name, zone) {
            Some(record) => Lookup::Answer(record),
            None => Lookup::NxDomain,
        };
    }

    if zone.contains(&question.name.to_ascii_lowercase()) {
        Lookup::NoData
    } else {
        Lookup::NxDomain
    }
}
