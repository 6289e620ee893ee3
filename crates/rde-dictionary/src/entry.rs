//! The 10-byte dictionary entry record.

use rde_sflv::{BejFormat, pack_format_byte, unpack_format_byte};

use crate::flags::EntryFlags;

/// Length in bytes of one dictionary entry record.
pub const ENTRY_LEN: usize = 10;

/// Sentinel `ChildCount` wire value marking an unbounded array position.
pub const UNBOUNDED_CHILD_COUNT: u16 = 0xFFFF;

/// A single resolved (wire-ready) dictionary entry record:
/// `FormatByte | SequenceNumber | ChildPointerOffset | ChildCount | NameLength | NameOffset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub format: BejFormat,
    pub flags: EntryFlags,
    pub sequence_number: u16,
    pub child_pointer_offset: u16,
    /// Raw wire value: the child count, or [`UNBOUNDED_CHILD_COUNT`] for arrays.
    pub child_count: u16,
    pub name_length: u8,
    pub name_offset: u16,
}

impl DictionaryEntry {
    #[must_use]
    pub fn to_bytes(self) -> [u8; ENTRY_LEN] {
        let mut out = [0u8; ENTRY_LEN];
        out[0] = pack_format_byte_entry(self.format, self.flags);
        out[1..3].copy_from_slice(&self.sequence_number.to_le_bytes());
        out[3..5].copy_from_slice(&self.child_pointer_offset.to_le_bytes());
        out[5..7].copy_from_slice(&self.child_count.to_le_bytes());
        out[7] = self.name_length;
        out[8..10].copy_from_slice(&self.name_offset.to_le_bytes());
        out
    }

    /// # Errors
    ///
    /// Returns `None` if `bytes` is too short, or the format nibble is
    /// unrecognized.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < ENTRY_LEN {
            return None;
        }
        let (format, flags) = unpack_format_byte(bytes[0])?;
        Some(Self {
            format,
            flags: EntryFlags::from_nibble_bits(flags_bits(bytes[0])),
            sequence_number: u16::from_le_bytes([bytes[1], bytes[2]]),
            child_pointer_offset: u16::from_le_bytes([bytes[3], bytes[4]]),
            child_count: u16::from_le_bytes([bytes[5], bytes[6]]),
            name_length: bytes[7],
            name_offset: u16::from_le_bytes([bytes[8], bytes[9]]),
        })
    }

    #[must_use]
    pub fn is_unbounded_array(self) -> bool {
        self.format == BejFormat::Array && self.child_count == UNBOUNDED_CHILD_COUNT
    }
}

fn flags_bits(format_byte: u8) -> u8 {
    format_byte & 0x0F
}

fn pack_format_byte_entry(format: BejFormat, flags: EntryFlags) -> u8 {
    // EntryFlags shares the same nibble layout the SFLV ValueFlags type uses
    // for packing purposes; reuse `pack_format_byte` via a throwaway
    // conversion so the bit arithmetic lives in one place.
    let raw = pack_format_byte(format, rde_sflv::ValueFlags::default());
    (raw & 0xF0) | flags.to_nibble_bits()
}
