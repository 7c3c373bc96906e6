use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail, ensure};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use esm_stream::{
    FLAG_DELETED, RawRecord, RecordSource, RecordTag, StreamError, decode_chunk, decode_payload,
    encode_payload, encode_record,
};
use memmap2::{Mmap, MmapOptions};
use serde::{Deserialize, Serialize};

/// Bytes that open every content file.
pub const CONTENT_MAGIC: [u8; 4] = *b"ESMC";

/// Container revision understood by this crate.
pub const CONTENT_VERSION: u32 = 1;

const PREAMBLE_LEN: usize = 16;

/// A master file this content file was authored against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterRef {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub author: String,
    pub description: String,
    #[serde(default)]
    pub masters: Vec<MasterRef>,
}

/// Memory-mapped content file: header plus a stream of framed records.
#[derive(Debug)]
pub struct ContentFile {
    path: PathBuf,
    name: String,
    mmap: Mmap,
    header: FileHeader,
    record_count: usize,
    records_offset: usize,
}

impl ContentFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let file = File::open(&path_buf)
            .with_context(|| format!("opening content file at {}", path_buf.display()))?;
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("memory-mapping content file {}", path_buf.display()))?;

        let (header, record_count, records_offset) = parse_preamble(&mmap)
            .with_context(|| format!("parsing content file {}", path_buf.display()))?;

        let name = path_buf
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_buf.display().to_string());

        Ok(ContentFile {
            path: path_buf,
            name,
            mmap,
            header,
            record_count,
            records_offset,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without the directory, used for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Sequential reader over the records, starting at the first one.
    pub fn records(&self) -> ContentReader<'_> {
        ContentReader {
            name: &self.name,
            remaining: &self.mmap[self.records_offset..],
            left: self.record_count,
            total: self.record_count,
        }
    }
}

fn parse_preamble(bytes: &[u8]) -> Result<(FileHeader, usize, usize)> {
    ensure!(
        bytes.len() >= PREAMBLE_LEN,
        "content file is too small to contain a preamble"
    );

    if bytes[0..4] != CONTENT_MAGIC {
        bail!("content file missing ESMC signature");
    }

    let version = LittleEndian::read_u32(&bytes[4..8]);
    ensure!(
        version == CONTENT_VERSION,
        "unsupported content format version {version}"
    );

    let record_count = LittleEndian::read_u32(&bytes[8..12]) as usize;
    let header_len = LittleEndian::read_u32(&bytes[12..16]) as usize;

    let header_end = PREAMBLE_LEN
        .checked_add(header_len)
        .ok_or_else(|| anyhow!("content header length overflow"))?;
    ensure!(
        header_end <= bytes.len(),
        "content file truncated before end of header"
    );

    let header: FileHeader =
        decode_payload(&bytes[PREAMBLE_LEN..header_end]).context("decoding file header")?;

    Ok((header, record_count, header_end))
}

/// Streams the records of one [`ContentFile`].
#[derive(Debug, Clone)]
pub struct ContentReader<'a> {
    name: &'a str,
    remaining: &'a [u8],
    left: usize,
    total: usize,
}

impl<'a> ContentReader<'a> {
    fn advance(&mut self) -> Result<Option<RawRecord<'a>>, StreamError> {
        if self.left == 0 {
            if !self.remaining.is_empty() {
                return Err(StreamError::TrailingBytes(self.remaining.len()));
            }
            return Ok(None);
        }
        let (record, rest) = decode_chunk(self.remaining)?;
        self.remaining = rest;
        self.left -= 1;
        Ok(Some(record))
    }
}

impl RecordSource for ContentReader<'_> {
    fn name(&self) -> &str {
        self.name
    }

    fn next_record(&mut self) -> Result<Option<RawRecord<'_>>, StreamError> {
        self.advance()
    }

    fn record_count_hint(&self) -> Option<usize> {
        Some(self.total)
    }
}

/// Builds a content file in memory.
#[derive(Debug, Clone, Default)]
pub struct ContentWriter {
    header: FileHeader,
    chunks: Vec<u8>,
    count: u32,
}

impl ContentWriter {
    pub fn new(header: FileHeader) -> Self {
        Self {
            header,
            chunks: Vec::new(),
            count: 0,
        }
    }

    pub fn push<T: Serialize>(&mut self, tag: RecordTag, deleted: bool, payload: &T) -> Result<()> {
        let flags = if deleted { FLAG_DELETED } else { 0 };
        self.push_flags(tag, flags, payload)
    }

    pub fn push_flags<T: Serialize>(
        &mut self,
        tag: RecordTag,
        flags: u32,
        payload: &T,
    ) -> Result<()> {
        let chunk = encode_record(tag, flags, payload)
            .with_context(|| format!("encoding {tag} record"))?;
        self.chunks.extend_from_slice(&chunk);
        self.count += 1;
        Ok(())
    }

    pub fn record_count(&self) -> u32 {
        self.count
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header = encode_payload(&self.header).context("encoding file header")?;
        let header_len = u32::try_from(header.len())
            .map_err(|_| anyhow!("file header of {} bytes is too large", header.len()))?;

        let mut out = Vec::with_capacity(PREAMBLE_LEN + header.len() + self.chunks.len());
        out.extend_from_slice(&CONTENT_MAGIC);
        out.write_u32::<LittleEndian>(CONTENT_VERSION)?;
        out.write_u32::<LittleEndian>(self.count)?;
        out.write_u32::<LittleEndian>(header_len)?;
        out.extend_from_slice(&header);
        out.extend_from_slice(&self.chunks);
        Ok(out)
    }

    pub fn write_to<P: AsRef<Path>>(&self, dest: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(dest.as_ref(), bytes)
            .with_context(|| format!("writing {}", dest.as_ref().display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Lockpick {
        id: String,
        uses: i32,
    }

    fn sample_header() -> FileHeader {
        FileHeader {
            author: "tester".into(),
            description: "two lockpicks".into(),
            masters: vec![MasterRef {
                name: "Morrowind.esm".into(),
                size: 79837557,
            }],
        }
    }

    #[test]
    fn reads_back_written_records() -> Result<()> {
        let mut writer = ContentWriter::new(sample_header());
        writer.push(
            RecordTag::new(b"LOCK"),
            false,
            &Lockpick {
                id: "pick_apprentice_01".into(),
                uses: 25,
            },
        )?;
        writer.push(
            RecordTag::new(b"LOCK"),
            true,
            &Lockpick {
                id: "pick_journeyman_01".into(),
                uses: 0,
            },
        )?;

        let file = NamedTempFile::new()?;
        writer.write_to(file.path())?;

        let content = ContentFile::open(file.path())?;
        assert_eq!(content.header(), &sample_header());
        assert_eq!(content.record_count(), 2);

        let mut reader = content.records();
        let first = reader.next_record()?.expect("first record");
        assert_eq!(first.tag, RecordTag::new(b"LOCK"));
        assert!(!first.is_deleted());
        assert_eq!(first.decode::<Lockpick>()?.uses, 25);

        let second = reader.next_record()?.expect("second record");
        assert!(second.is_deleted());
        assert!(reader.next_record()?.is_none());
        Ok(())
    }

    #[test]
    fn rejects_missing_signature() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"TES3\x01\0\0\0\0\0\0\0\0\0\0\0").unwrap();
        let err = ContentFile::open(file.path()).unwrap_err();
        assert!(format!("{err:?}").contains("ESMC signature"));
    }

    #[test]
    fn truncated_record_stream_surfaces_as_stream_error() -> Result<()> {
        let mut writer = ContentWriter::new(FileHeader::default());
        writer.push(RecordTag::new(b"MISC"), false, &"misc_com_bottle_01")?;
        let mut bytes = writer.to_bytes()?;
        bytes.truncate(bytes.len() - 3);

        let mut file = NamedTempFile::new()?;
        file.write_all(&bytes)?;

        let content = ContentFile::open(file.path())?;
        let mut reader = content.records();
        assert!(matches!(
            reader.next_record(),
            Err(StreamError::TruncatedPayload { .. })
        ));
        Ok(())
    }

    #[test]
    fn bytes_after_the_last_record_are_rejected() -> Result<()> {
        let mut writer = ContentWriter::new(FileHeader::default());
        writer.push(RecordTag::new(b"MISC"), false, &"misc_com_bottle_01")?;
        assert_eq!(writer.record_count(), 1);
        let mut bytes = writer.to_bytes()?;
        bytes.extend_from_slice(&[0xAB; 23]);

        let mut file = NamedTempFile::new()?;
        file.write_all(&bytes)?;

        let content = ContentFile::open(file.path())?;
        let mut reader = content.records();
        assert!(reader.next_record()?.is_some());
        assert!(matches!(
            reader.next_record(),
            Err(StreamError::TrailingBytes(23))
        ));
        Ok(())
    }
}
