//! Fixed-width text records for the `dict`, `post` and `map` files.
//!
//! Each record is one line of exactly `*_RECORD_SIZE` bytes including the
//! trailing newline, so record `i` starts at byte `i * *_RECORD_SIZE`.

use crate::error::{Error, Result};
use crate::DocId;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

pub const TERM_WIDTH: usize = 16;
pub const DOC_COUNT_WIDTH: usize = 4;
pub const POSTING_START_WIDTH: usize = 12;
pub const DOC_ID_WIDTH: usize = 3;
pub const WEIGHT_WIDTH: usize = 9;
pub const MAP_NAME_WIDTH: usize = 13;

pub const DICT_RECORD_SIZE: usize = TERM_WIDTH + 1 + DOC_COUNT_WIDTH + 1 + POSTING_START_WIDTH + 1;
pub const POST_RECORD_SIZE: usize = DOC_ID_WIDTH + 1 + WEIGHT_WIDTH + 1;
pub const MAP_RECORD_SIZE: usize = MAP_NAME_WIDTH + 1;

const NULL_TERM: &str = "!NULL";
const DELETED_TERM: &str = "!DELETED";
const SENTINEL_NUMBER: &str = "-1";

/// Left-justifies `s` in exactly `width` bytes: padded with spaces, or cut at
/// the last char boundary that fits.
pub fn fix_length(s: &str, width: usize) -> String {
    let mut end = s.len().min(width);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(width);
    out.push_str(&s[..end]);
    while out.len() < width {
        out.push(' ');
    }
    out
}

/// A term as it would read back from the dictionary.
pub fn stored_term(term: &str) -> &str {
    let mut end = term.len().min(TERM_WIDTH);
    while !term.is_char_boundary(end) {
        end -= 1;
    }
    &term[..end]
}

/// One dictionary slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionaryEntry {
    Active { term: String, doc_count: u32, posting_start: u64 },
    /// Slot never occupied.
    Null,
    /// Slot held a term that occurred once in one document.
    Deleted,
}

impl DictionaryEntry {
    pub fn encode(&self) -> String {
        match self {
            DictionaryEntry::Active { term, doc_count, posting_start } => {
                dict_line(term, &doc_count.to_string(), &posting_start.to_string())
            }
            DictionaryEntry::Null => dict_line(NULL_TERM, SENTINEL_NUMBER, SENTINEL_NUMBER),
            DictionaryEntry::Deleted => dict_line(DELETED_TERM, SENTINEL_NUMBER, SENTINEL_NUMBER),
        }
    }

    pub fn decode(record: &[u8]) -> Result<Self> {
        let line = record_str(record, DICT_RECORD_SIZE, "dictionary")?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [term, doc_count, posting_start] = fields[..] else {
            return Err(Error::corrupt(format!("dictionary record {line:?} does not have 3 fields")));
        };
        match term {
            NULL_TERM => Ok(DictionaryEntry::Null),
            DELETED_TERM => Ok(DictionaryEntry::Deleted),
            _ => Ok(DictionaryEntry::Active {
                term: term.to_string(),
                doc_count: parse_field(doc_count, "doc_count")?,
                posting_start: parse_field(posting_start, "posting_start")?,
            }),
        }
    }
}

fn dict_line(term: &str, doc_count: &str, posting_start: &str) -> String {
    format!(
        "{} {} {}\n",
        fix_length(term, TERM_WIDTH),
        fix_length(doc_count, DOC_COUNT_WIDTH),
        fix_length(posting_start, POSTING_START_WIDTH)
    )
}

/// One document's weight for a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingEntry {
    pub doc_id: DocId,
    pub weight: u64,
}

impl PostingEntry {
    pub fn encode(&self) -> String {
        format!(
            "{} {}\n",
            fix_length(&self.doc_id.to_string(), DOC_ID_WIDTH),
            fix_length(&self.weight.to_string(), WEIGHT_WIDTH)
        )
    }

    pub fn decode(record: &[u8]) -> Result<Self> {
        let line = record_str(record, POST_RECORD_SIZE, "posting")?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [doc_id, weight] = fields[..] else {
            return Err(Error::corrupt(format!("posting record {line:?} does not have 2 fields")));
        };
        Ok(PostingEntry { doc_id: parse_field(doc_id, "doc_id")?, weight: parse_field(weight, "weight")? })
    }
}

pub fn encode_map_name(name: &str) -> String {
    format!("{}\n", fix_length(name, MAP_NAME_WIDTH))
}

/// Document file name, without padding. Names may contain inner spaces.
pub fn decode_map_name(record: &[u8]) -> Result<String> {
    let line = record_str(record, MAP_RECORD_SIZE, "map")?;
    Ok(line.trim_end_matches(' ').to_string())
}

fn record_str<'a>(record: &'a [u8], size: usize, kind: &str) -> Result<&'a str> {
    if record.len() != size || record[size - 1] != b'\n' {
        return Err(Error::corrupt(format!("{kind} record is not {size} bytes ending in a newline")));
    }
    std::str::from_utf8(&record[..size - 1])
        .map_err(|e| Error::corrupt(format!("{kind} record is not valid UTF-8: {e}")))
}

fn parse_field<T: std::str::FromStr>(field: &str, name: &str) -> Result<T> {
    field.parse().map_err(|_| Error::corrupt(format!("bad {name} field {field:?}")))
}

/// Reads record number `index` of a file made of `size`-byte records.
pub fn read_record<R: Read + Seek>(reader: &mut R, index: u64, size: usize) -> Result<Vec<u8>> {
    read_run(reader, index, 1, size)
}

/// Reads `count` consecutive records starting at record number `first`.
pub fn read_run<R: Read + Seek>(reader: &mut R, first: u64, count: usize, size: usize) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(first * size as u64))?;
    let mut buf = vec![0u8; count * size];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => Error::corrupt(format!("record {} lies past the end of the file", first + count as u64 - 1)),
        _ => Error::Io(e),
    })?;
    Ok(buf)
}
