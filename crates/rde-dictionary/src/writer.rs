//! Serializes resolved rows into the binary dictionary wire format.

use std::collections::HashMap;

use rde_sflv::BejFormat;
use tracing::debug;

use crate::entry::{DictionaryEntry, ENTRY_LEN, UNBOUNDED_CHILD_COUNT};
use crate::flags::EntryFlags;
use crate::header::{DictionaryFlags, DictionaryHeader, HEADER_LEN};

/// One fully-resolved row ready to be serialized: every `Offset::Pending`
/// reference must already have been turned into an absolute byte offset by
/// the dictionary builder.
#[derive(Debug, Clone)]
pub struct RowInput {
    pub format: BejFormat,
    pub flags: EntryFlags,
    pub sequence_number: u16,
    /// Absolute byte offset of the child sub-tree, or `0` if this row has no
    /// children (e.g. a primitive property).
    pub child_pointer_offset: u16,
    /// Number of immediate children, or [`UNBOUNDED_CHILD_COUNT`] for an
    /// array element row. The builder is responsible for this distinction;
    /// the writer also forces it for any row with `format == Array`.
    pub child_count: u16,
    /// Empty string for anonymous rows (array element headers).
    pub name: String,
}

/// Serializes `rows` into a complete binary dictionary.
///
/// `rows` must already be in final emission order (dictionary index order);
/// `child_pointer_offset` values must be absolute byte offsets computed by
/// the caller (see `rde-dictionary-builder`).
#[must_use]
pub fn write_dictionary(
    rows: &[RowInput],
    schema_version: u32,
    truncated: bool,
    copyright: Option<&str>,
) -> Vec<u8> {
    let entry_table_len = rows.len() * ENTRY_LEN;
    let name_heap_start = HEADER_LEN + entry_table_len;

    let mut name_to_offset: HashMap<&str, u16> = HashMap::new();
    let mut unique_names: Vec<&str> = Vec::new();
    let mut next_name_offset = name_heap_start;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let (name_length, name_offset) = if row.name.is_empty() {
            (0u8, 0u16)
        } else {
            let offset = *name_to_offset.entry(row.name.as_str()).or_insert_with(|| {
                let offset = u16::try_from(next_name_offset).expect("dictionary exceeds 64KiB");
                unique_names.push(row.name.as_str());
                next_name_offset += row.name.len() + 1;
                offset
            });
            (
                u8::try_from(row.name.len() + 1).expect("property name too long"),
                offset,
            )
        };

        let child_count = if row.format == BejFormat::Array {
            UNBOUNDED_CHILD_COUNT
        } else {
            row.child_count
        };

        entries.push(DictionaryEntry {
            format: row.format,
            flags: row.flags,
            sequence_number: row.sequence_number,
            child_pointer_offset: row.child_pointer_offset,
            child_count,
            name_length,
            name_offset,
        });
    }

    let name_heap_len: usize = unique_names.iter().map(|n| n.len() + 1).sum();
    let copyright_block_len = 1 + copyright.filter(|c| !c.is_empty()).map_or(0, |c| c.len() + 1);
    let dictionary_size = HEADER_LEN + entry_table_len + name_heap_len + copyright_block_len;

    let header = DictionaryHeader {
        version_tag: 0,
        flags: DictionaryFlags { truncated },
        entry_count: u16::try_from(rows.len()).expect("dictionary has too many entries"),
        schema_version,
        dictionary_size: u32::try_from(dictionary_size).expect("dictionary exceeds 4GiB"),
    };

    let mut out = Vec::with_capacity(dictionary_size);
    out.extend_from_slice(&header.to_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.to_bytes());
    }
    for name in &unique_names {
        out.extend_from_slice(name.as_bytes());
        out.push(0);
    }
    match copyright {
        Some(text) if !text.is_empty() => {
            out.push(u8::try_from(text.len() + 1).expect("copyright string too long"));
            out.extend_from_slice(text.as_bytes());
            out.push(0);
        }
        _ => out.push(0),
    }

    debug!(
        rows = rows.len(),
        bytes = out.len(),
        truncated,
        "serialized dictionary"
    );
    debug_assert_eq!(out.len(), dictionary_size);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_matches_declared_header_size() {
        let rows = vec![
            RowInput {
                format: BejFormat::Set,
                flags: EntryFlags::default(),
                sequence_number: 0,
                child_pointer_offset: 0,
                child_count: 1,
                name: String::new(),
            },
            RowInput {
                format: BejFormat::String,
                flags: EntryFlags::default(),
                sequence_number: 0,
                child_pointer_offset: 0,
                child_count: 0,
                name: "Name".into(),
            },
        ];
        let bytes = write_dictionary(&rows, 0xFFFF_FFFF, false, Some("Copyright 2024"));
        let header = DictionaryHeader::from_bytes(&bytes).expect("header");
        assert_eq!(header.dictionary_size as usize, bytes.len());
        assert_eq!(header.entry_count, 2);
    }

    #[test]
    fn duplicate_names_share_one_occurrence() {
        let rows = vec![
            RowInput {
                format: BejFormat::String,
                flags: EntryFlags::default(),
                sequence_number: 0,
                child_pointer_offset: 0,
                child_count: 0,
                name: "Id".into(),
            },
            RowInput {
                format: BejFormat::String,
                flags: EntryFlags::default(),
                sequence_number: 1,
                child_pointer_offset: 0,
                child_count: 0,
                name: "Id".into(),
            },
        ];
        let bytes = write_dictionary(&rows, 0xFFFF_FFFF, false, None);
        let e0 = DictionaryEntry::from_bytes(&bytes[HEADER_LEN..]).unwrap();
        let e1 = DictionaryEntry::from_bytes(&bytes[HEADER_LEN + ENTRY_LEN..]).unwrap();
        assert_eq!(e0.name_offset, e1.name_offset);
    }

    #[test]
    fn no_copyright_ends_in_single_nul() {
        let bytes = write_dictionary(&[], 0xFFFF_FFFF, false, None);
        assert_eq!(bytes.last(), Some(&0));
        assert_eq!(bytes.len(), HEADER_LEN + 1);
    }

    #[test]
    fn empty_copyright_matches_no_copyright() {
        let with_empty = write_dictionary(&[], 0xFFFF_FFFF, false, Some(""));
        let with_none = write_dictionary(&[], 0xFFFF_FFFF, false, None);
        assert_eq!(with_empty, with_none);
        let header = DictionaryHeader::from_bytes(&with_empty).expect("header");
        assert_eq!(header.dictionary_size as usize, with_empty.len());
    }
}
