//! Record-chunk framing shared by content readers and the record store.
//!
//! Every record travels as a fixed-size header (tag, flags, payload length)
//! followed by a MessagePack payload. Producers and consumers of content
//! feeds go through this crate so the framing lives in one place.

use std::convert::TryFrom;
use std::fmt;

use bytes::Buf;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of the binary chunk header in bytes.
pub const HEADER_LEN: usize = 4 + 4 + 4;

/// The record is a tombstone for its id.
pub const FLAG_DELETED: u32 = 0x0020;

/// Readers that do not understand this record kind must reject the file.
pub const FLAG_REQUIRED: u32 = 0x0001;

/// Carried through untouched; the store attaches no meaning to it.
pub const FLAG_PERSISTENT: u32 = 0x0400;

/// Four-character record kind tag, e.g. `APPA` or `DIAL`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordTag(pub [u8; 4]);

impl RecordTag {
    pub const NULL: RecordTag = RecordTag([0; 4]);

    pub const fn new(bytes: &[u8; 4]) -> Self {
        RecordTag(*bytes)
    }

    pub fn as_str(self) -> Option<String> {
        let bytes = self.0;
        let mut len = 4;
        while len > 0 && bytes[len - 1] == 0 {
            len -= 1;
        }
        if len == 0 {
            return None;
        }
        Some(String::from_utf8_lossy(&bytes[..len]).into_owned())
    }
}

impl fmt::Display for RecordTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(tag) => f.write_str(&tag),
            None => f.write_str("----"),
        }
    }
}

impl fmt::Debug for RecordTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordTag({self})")
    }
}

/// Envelope describing the upcoming payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: RecordTag,
    pub flags: u32,
    pub length: u32,
}

impl ChunkHeader {
    /// Encode the header as little-endian bytes.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..4].copy_from_slice(&self.tag.0);
        out[4..8].copy_from_slice(&self.flags.to_le_bytes());
        out[8..12].copy_from_slice(&self.length.to_le_bytes());
        out
    }

    /// Decode a header from raw bytes.
    pub fn decode(input: &[u8]) -> Result<Self, StreamError> {
        if input.len() < HEADER_LEN {
            return Err(StreamError::TruncatedHeader);
        }
        let mut tag = [0u8; 4];
        tag.copy_from_slice(&input[..4]);
        let mut rest = &input[4..HEADER_LEN];
        let flags = rest.get_u32_le();
        let length = rest.get_u32_le();
        Ok(Self {
            tag: RecordTag(tag),
            flags,
            length,
        })
    }
}

/// A record as it comes off a content feed: kind, flags and undecoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    pub tag: RecordTag,
    pub flags: u32,
    pub payload: &'a [u8],
}

impl<'a> RawRecord<'a> {
    pub fn is_deleted(&self) -> bool {
        self.flags & FLAG_DELETED != 0
    }

    pub fn is_required(&self) -> bool {
        self.flags & FLAG_REQUIRED != 0
    }

    /// Decode the payload into the requested record type.
    pub fn decode<T>(&self) -> Result<T, StreamError>
    where
        T: for<'de> Deserialize<'de>,
    {
        decode_payload(self.payload)
    }
}

/// Sequential "next record" access to one content file.
///
/// `Ok(None)` signals the end of the file.
pub trait RecordSource {
    /// Name used in diagnostics, usually the file name.
    fn name(&self) -> &str;

    fn next_record(&mut self) -> Result<Option<RawRecord<'_>>, StreamError>;

    /// Number of records the source announces up front, if known.
    fn record_count_hint(&self) -> Option<usize> {
        None
    }
}

/// Owned counterpart of [`RawRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedRecord {
    pub tag: RecordTag,
    pub flags: u32,
    pub payload: Vec<u8>,
}

impl OwnedRecord {
    pub fn as_raw(&self) -> RawRecord<'_> {
        RawRecord {
            tag: self.tag,
            flags: self.flags,
            payload: &self.payload,
        }
    }
}

/// In-memory record feed, built record by record.
#[derive(Debug, Clone, Default)]
pub struct RecordBuffer {
    name: String,
    records: Vec<OwnedRecord>,
    cursor: usize,
}

impl RecordBuffer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
            cursor: 0,
        }
    }

    pub fn push<T>(&mut self, tag: RecordTag, deleted: bool, payload: &T) -> Result<(), StreamError>
    where
        T: Serialize,
    {
        let flags = if deleted { FLAG_DELETED } else { 0 };
        self.push_flags(tag, flags, payload)
    }

    pub fn push_flags<T>(
        &mut self,
        tag: RecordTag,
        flags: u32,
        payload: &T,
    ) -> Result<(), StreamError>
    where
        T: Serialize,
    {
        let payload = rmp_serde::to_vec_named(payload)?;
        self.records.push(OwnedRecord {
            tag,
            flags,
            payload,
        });
        Ok(())
    }

    /// Append a record whose payload is already encoded (or deliberately malformed).
    pub fn push_raw(&mut self, record: OwnedRecord) {
        self.records.push(record);
    }

    /// Builder-style variant of [`RecordBuffer::push`].
    pub fn with<T>(
        mut self,
        tag: RecordTag,
        deleted: bool,
        payload: &T,
    ) -> Result<Self, StreamError>
    where
        T: Serialize,
    {
        self.push(tag, deleted, payload)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[OwnedRecord] {
        &self.records
    }

    /// Restart reading from the first record.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl RecordSource for RecordBuffer {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_record(&mut self) -> Result<Option<RawRecord<'_>>, StreamError> {
        let Some(record) = self.records.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        Ok(Some(record.as_raw()))
    }

    fn record_count_hint(&self) -> Option<usize> {
        Some(self.records.len())
    }
}

/// Error conditions returned by the framing helpers.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("chunk header smaller than {HEADER_LEN} bytes")]
    TruncatedHeader,
    #[error("chunk payload truncated: header declared {expected} bytes but only {actual} remain")]
    TruncatedPayload { expected: u32, actual: usize },
    #[error("payload of {0} bytes does not fit a chunk")]
    PayloadTooLarge(usize),
    #[error("{0} bytes follow the last declared record")]
    TrailingBytes(usize),
    #[error("payload decode error: {0}")]
    PayloadDecode(#[from] rmp_serde::decode::Error),
    #[error("payload encode error: {0}")]
    PayloadEncode(#[from] rmp_serde::encode::Error),
}

/// Wraps a payload with framing suitable for a content file.
pub fn encode_record<T>(tag: RecordTag, flags: u32, payload: &T) -> Result<Vec<u8>, StreamError>
where
    T: Serialize,
{
    let payload_bytes = rmp_serde::to_vec_named(payload)?;
    encode_raw(tag, flags, &payload_bytes)
}

/// Frames an already encoded payload.
pub fn encode_raw(tag: RecordTag, flags: u32, payload: &[u8]) -> Result<Vec<u8>, StreamError> {
    let header = ChunkHeader {
        tag,
        flags,
        length: u32::try_from(payload.len())
            .map_err(|_| StreamError::PayloadTooLarge(payload.len()))?,
    };
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Splits one framed record off the front of `bytes`, returning the record
/// and the remaining input.
pub fn decode_chunk(bytes: &[u8]) -> Result<(RawRecord<'_>, &[u8]), StreamError> {
    let header = ChunkHeader::decode(bytes)?;
    let body = &bytes[HEADER_LEN..];
    let length = header.length as usize;
    if body.len() < length {
        return Err(StreamError::TruncatedPayload {
            expected: header.length,
            actual: body.len(),
        });
    }
    let (payload, rest) = body.split_at(length);
    Ok((
        RawRecord {
            tag: header.tag,
            flags: header.flags,
            payload,
        },
        rest,
    ))
}

/// Encode a bare payload without chunk framing.
pub fn encode_payload<T>(payload: &T) -> Result<Vec<u8>, StreamError>
where
    T: Serialize + ?Sized,
{
    Ok(rmp_serde::to_vec_named(payload)?)
}

/// Decode a payload straight into the requested type.
pub fn decode_payload<T>(payload: &[u8]) -> Result<T, StreamError>
where
    T: for<'de> Deserialize<'de>,
{
    let value = rmp_serde::from_slice(payload)?;
    Ok(value)
}
