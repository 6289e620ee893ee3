//! Read cursor over a binary dictionary buffer.

use thiserror::Error;

use crate::entry::{DictionaryEntry, ENTRY_LEN};
use crate::header::{DictionaryHeader, HEADER_LEN};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReaderError {
    #[error("dictionary buffer is shorter than the header ({0} bytes)")]
    TruncatedHeader(usize),
    #[error("entry at offset {0} is truncated or malformed")]
    MalformedEntry(usize),
    #[error("name at offset {offset} (length {length}) runs past the end of the dictionary")]
    NameOutOfBounds { offset: usize, length: usize },
    #[error("name at offset {0} is not valid UTF-8")]
    NameNotUtf8(usize),
}

/// A parsed dictionary buffer: the header plus the ability to read entries
/// at arbitrary `(offset, child_count)` sub-ranges.
#[derive(Debug, Clone, Copy)]
pub struct Dictionary<'a> {
    bytes: &'a [u8],
    pub header: DictionaryHeader,
}

impl<'a> Dictionary<'a> {
    /// # Errors
    ///
    /// Returns [`ReaderError::TruncatedHeader`] if `bytes` is shorter than
    /// the fixed header.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ReaderError> {
        let header =
            DictionaryHeader::from_bytes(bytes).ok_or(ReaderError::TruncatedHeader(bytes.len()))?;
        Ok(Self { bytes, header })
    }

    /// Cursor over the single top-level root entry, immediately after the header.
    #[must_use]
    pub fn root(&self) -> EntryCursor<'a> {
        EntryCursor {
            bytes: self.bytes,
            offset: HEADER_LEN,
            remaining: 1,
        }
    }

    /// Cursor over a child sub-tree starting at an absolute byte `offset`
    /// with `child_count` immediate entries.
    #[must_use]
    pub fn at(&self, offset: u16, child_count: u16) -> EntryCursor<'a> {
        EntryCursor {
            bytes: self.bytes,
            offset: offset as usize,
            remaining: child_count,
        }
    }

    /// Resolves a dictionary entry's NUL-terminated name from the name heap.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError`] if the name bytes are missing or not UTF-8.
    pub fn name_of(&self, entry: DictionaryEntry) -> Result<&'a str, ReaderError> {
        if entry.name_length == 0 {
            return Ok("");
        }
        let start = entry.name_offset as usize;
        let len = entry.name_length as usize - 1; // name_length includes the NUL
        let end = start + len;
        let slice = self
            .bytes
            .get(start..end)
            .ok_or(ReaderError::NameOutOfBounds {
                offset: start,
                length: len,
            })?;
        core::str::from_utf8(slice).map_err(|_| ReaderError::NameNotUtf8(start))
    }
}

/// Iterates the fixed-size entry records of a sub-tree.
#[derive(Debug, Clone, Copy)]
pub struct EntryCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
    remaining: u16,
}

impl<'a> EntryCursor<'a> {
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for EntryCursor<'a> {
    type Item = Result<DictionaryEntry, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let start = self.offset;
        let entry = match self.bytes.get(start..start + ENTRY_LEN) {
            Some(slice) => DictionaryEntry::from_bytes(slice),
            None => None,
        };
        self.remaining -= 1;
        self.offset += ENTRY_LEN;
        Some(entry.ok_or(ReaderError::MalformedEntry(start)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::EntryFlags;
    use crate::writer::{RowInput, write_dictionary};
    use rde_sflv::BejFormat;

    #[test]
    fn read_back_written_rows() {
        let rows = vec![
            RowInput {
                format: BejFormat::Set,
                flags: EntryFlags::default(),
                sequence_number: 0,
                child_pointer_offset: (HEADER_LEN + ENTRY_LEN) as u16,
                child_count: 1,
                name: String::new(),
            },
            RowInput {
                format: BejFormat::String,
                flags: EntryFlags {
                    read_only: false,
                    nullable: true,
                },
                sequence_number: 0,
                child_pointer_offset: 0,
                child_count: 0,
                name: "Name".into(),
            },
        ];
        let bytes = write_dictionary(&rows, 0xFFFF_FFFF, false, None);
        let dict = Dictionary::parse(&bytes).expect("parse");
        assert_eq!(dict.header.entry_count, 2);

        let root_entry = dict.root().next().unwrap().unwrap();
        assert_eq!(root_entry.format, BejFormat::Set);

        let child = dict
            .at(root_entry.child_pointer_offset, 1)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(dict.name_of(child).unwrap(), "Name");
        assert!(child.flags.nullable);
    }
}
