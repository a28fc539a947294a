use std::collections::HashMap;

use super::record::{INTEGRITY_LEN, R2_LEN, RecordValue, SessionKeyR1, SupportedKeyFormats};
use super::registry::{self, Direction, TagDescriptor};
use super::{HEADER_LEN, TllvError};

/// One record as it appeared on the wire, plus its decoded value.
#[derive(Debug, Clone)]
pub struct TaggedRecord {
    tag: u64,
    value: Vec<u8>,
    padding: Vec<u8>,
    decoded: RecordValue,
    descriptor: &'static TagDescriptor,
}

impl TaggedRecord {
    /// Build a record from a raw value, decoding it with the registered routine.
    pub fn new(tag: u64, value: impl Into<Vec<u8>>) -> Result<Self, TllvError> {
        let value = value.into();
        let descriptor = registry::lookup(tag);
        let decoded = (descriptor.decode)(&value).map_err(|source| TllvError::Record {
            tag,
            name: descriptor.name,
            source,
        })?;
        Ok(Self {
            tag,
            value,
            padding: Vec::new(),
            decoded,
            descriptor,
        })
    }

    /// Append block padding. The bytes are carried verbatim and never inspected.
    pub fn with_padding(mut self, padding: impl Into<Vec<u8>>) -> Self {
        self.padding = padding.into();
        self
    }

    pub fn tag(&self) -> u64 {
        self.tag
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn padding(&self) -> &[u8] {
        &self.padding
    }

    pub fn block_len(&self) -> usize {
        self.value.len() + self.padding.len()
    }

    pub fn decoded(&self) -> &RecordValue {
        &self.decoded
    }

    pub fn descriptor(&self) -> &'static TagDescriptor {
        self.descriptor
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn is_registered(&self) -> bool {
        self.descriptor.kind != registry::RecordKind::Opaque
    }

    /// Serialize as tag, block length, value length, value, padding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.block_len());
        out.extend_from_slice(&self.tag.to_be_bytes());
        out.extend_from_slice(&(self.block_len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.value.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.value);
        out.extend_from_slice(&self.padding);
        out
    }
}

/// Ordered records of one container, indexed by tag.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<TaggedRecord>,
    by_tag: HashMap<u64, usize>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. A tag may appear at most once.
    pub fn push(&mut self, record: TaggedRecord) -> Result<(), TllvError> {
        if self.by_tag.contains_key(&record.tag) {
            return Err(TllvError::DuplicateTag(record.tag));
        }
        self.by_tag.insert(record.tag, self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn from_records(
        records: impl IntoIterator<Item = TaggedRecord>,
    ) -> Result<Self, TllvError> {
        let mut set = Self::new();
        for r in records {
            set.push(r)?;
        }
        Ok(set)
    }

    pub fn get(&self, tag: u64) -> Option<&TaggedRecord> {
        self.by_tag.get(&tag).map(|&i| &self.records[i])
    }

    /// Look up by symbolic field name, e.g. `"sk_r1"`.
    pub fn get_field(&self, field: &str) -> Option<&TaggedRecord> {
        registry::lookup_field(field).and_then(|d| self.get(d.tag))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaggedRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose registered direction is server-to-client.
    pub fn response_records(&self) -> impl Iterator<Item = &TaggedRecord> {
        self.records
            .iter()
            .filter(|r| r.descriptor.direction == Direction::Response)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.records.iter().flat_map(|r| r.to_bytes()).collect()
    }

    fn decoded(&self, tag: u64) -> Option<&RecordValue> {
        self.get(tag).map(|r| r.decoded())
    }

    pub fn sk_r1(&self) -> Option<&SessionKeyR1> {
        match self.decoded(registry::TAG_SESSION_KEY_R1)? {
            RecordValue::SessionKeyR1(v) => Some(v),
            _ => None,
        }
    }

    pub fn sk_r1_integrity(&self) -> Option<&[u8; INTEGRITY_LEN]> {
        match self.decoded(registry::TAG_SESSION_KEY_R1_INTEGRITY)? {
            RecordValue::SessionKeyR1Integrity(v) => Some(v),
            _ => None,
        }
    }

    pub fn anti_replay_seed(&self) -> Option<&[u8; 16]> {
        match self.decoded(registry::TAG_ANTI_REPLAY_SEED)? {
            RecordValue::AntiReplaySeed(v) => Some(v),
            _ => None,
        }
    }

    pub fn r2(&self) -> Option<&[u8; R2_LEN]> {
        match self.decoded(registry::TAG_R2)? {
            RecordValue::R2(v) => Some(v),
            _ => None,
        }
    }

    pub fn asset_id(&self) -> Option<&[u8]> {
        match self.decoded(registry::TAG_ASSET_ID)? {
            RecordValue::AssetId(v) => Some(v),
            _ => None,
        }
    }

    pub fn transaction_id(&self) -> Option<u64> {
        match self.decoded(registry::TAG_TRANSACTION_ID)? {
            RecordValue::TransactionId(v) => Some(*v),
            _ => None,
        }
    }

    pub fn protocol_version_used(&self) -> Option<u32> {
        match self.decoded(registry::TAG_PROTOCOL_VERSION_USED)? {
            RecordValue::ProtocolVersionUsed(v) => Some(*v),
            _ => None,
        }
    }

    pub fn supported_key_formats(&self) -> Option<&SupportedKeyFormats> {
        match self.decoded(registry::TAG_SUPPORTED_KEY_FORMATS)? {
            RecordValue::SupportedKeyFormats(v) => Some(v),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a TaggedRecord;
    type IntoIter = std::slice::Iter<'a, TaggedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

/// Split a decrypted payload into records and decode each one.
///
/// Fails on a truncated header or block, a value longer than its block, a
/// repeated tag, or a registered value that violates its constraints.
/// Unregistered tags are kept as opaque records.
pub fn parse_container(bytes: &[u8]) -> Result<RecordSet, TllvError> {
    let mut set = RecordSet::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let remaining = bytes.len() - offset;
        if remaining < HEADER_LEN {
            return Err(TllvError::TruncatedHeader { offset, remaining });
        }
        let header = &bytes[offset..offset + HEADER_LEN];
        let tag = u64::from_be_bytes([
            header[0], header[1], header[2], header[3], header[4], header[5], header[6],
            header[7],
        ]);
        let block_len = read_u32(header, 8) as usize;
        let value_len = read_u32(header, 12) as usize;

        if value_len > block_len {
            return Err(TllvError::ValueExceedsBlock {
                tag,
                value_len,
                block_len,
            });
        }
        let body = offset + HEADER_LEN;
        if block_len > bytes.len() - body {
            return Err(TllvError::TruncatedBlock {
                tag,
                block_len,
                remaining: bytes.len() - body,
            });
        }

        let value = &bytes[body..body + value_len];
        let padding = &bytes[body + value_len..body + block_len];
        let record = TaggedRecord::new(tag, value)?.with_padding(padding);
        tracing::debug!(
            tag = format!("{tag:#018x}"),
            name = record.name(),
            value_len,
            block_len,
            "record"
        );
        set.push(record)?;
        offset = body + block_len;
    }

    Ok(set)
}
