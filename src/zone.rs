//! Zone table and the lenient zone-file reader that fills it.
//!
//! Only lines shaped like `<name> <ttl> IN A <ipv4>` contribute records.
//! Everything else (comments, other record types, junk) is skipped without
//! failing the load.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;

use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{digit1, multispace0, multispace1},
    IResult,
};
use tracing::trace;

use crate::errors::ZoneError;

/// Lower-cased, dot-terminated name to IPv4 address.
///
/// Filled during startup, then shared read-only for the lifetime of the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneTable {
    records: HashMap<String, Ipv4Addr>,
}

impl ZoneTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records served when no zone file overrides them.
    pub fn builtin() -> Self {
        let mut zone = Self::new();
        zone.insert("example.com.", Ipv4Addr::new(93, 184, 216, 34));
        zone.insert("rit.edu.", Ipv4Addr::new(129, 21, 1, 16));
        zone
    }

    /// Insert or replace a record. The name is canonicalised to lower case
    /// with a trailing dot.
    pub fn insert(&mut self, name: &str, addr: Ipv4Addr) {
        self.records.insert(canonical_name(name), addr);
    }

    /// Overlay `other` on top of this table, `other` wins on conflicts.
    pub fn extend(&mut self, other: ZoneTable) {
        self.records.extend(other.records);
    }

    /// Exact lookup of an already canonical (lower-cased) name.
    pub fn get(&self, name: &str) -> Option<Ipv4Addr> {
        self.records.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn canonical_name(name: &str) -> String {
    let mut name = name.to_ascii_lowercase();
    if !name.ends_with('.') {
        name.push('.');
    }
    name
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-'
}

fn is_address_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

/// Matches the start of a `NAME TTL IN A ADDRESS` line, returning the name and
/// the address text. Whatever follows the address is left unconsumed.
fn parse_a_record_line(line: &str) -> IResult<&str, (&str, &str)> {
    let (i, _) = multispace0(line)?;
    let (i, name) = take_while1(is_name_char)(i)?;
    let (i, _) = multispace1(i)?;
    let (i, _ttl) = digit1(i)?;
    let (i, _) = multispace1(i)?;
    let (i, _) = tag("IN")(i)?;
    let (i, _) = multispace1(i)?;
    let (i, _) = tag("A")(i)?;
    let (i, _) = multispace1(i)?;
    let (i, address) = take_while1(is_address_char)(i)?;

    Ok((i, (name, address)))
}

/// Build a zone table from zone-file text. Never fails: lines that do not
/// describe an IN A record with a valid IPv4 address are dropped, and a later
/// line for the same name replaces an earlier one.
pub fn parse_zone(text: &str) -> ZoneTable {
    let mut zone = ZoneTable::new();

    for (index, line) in text.lines().enumerate() {
        let parsed = parse_a_record_line(line)
            .ok()
            .and_then(|(_, (name, address))| Some((name, address.parse::<Ipv4Addr>().ok()?)));

        match parsed {
            Some((name, addr)) => zone.insert(name, addr),
            None => {
                let trimmed = line.trim();
                if !trimmed.is_empty() && !trimmed.starts_with(['#', ';']) {
                    trace!("Skipping zone line {}: {:?}", index + 1, trimmed);
                }
            }
        }
    }

    zone
}

/// Read and parse a zone file. An unreadable file or one without a single A
/// record is reported so the caller can fall back to another table.
pub fn load_zone(path: impl AsRef<Path>) -> Result<ZoneTable, ZoneError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ZoneError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let zone = parse_zone(&text);
    if zone.is_empty() {
        return Err(ZoneError::NoRecords(path.to_path_buf()));
    }

    Ok(zone)
}
